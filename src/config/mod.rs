pub mod model;
pub mod validate;

use std::path::{Path, PathBuf};

use model::Settings;

/// Default settings location: `~/.portward/settings.json`.
pub fn default_settings_path() -> anyhow::Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("could not determine the home directory"))?;
    Ok(home.join(".portward").join("settings.json"))
}

/// Resolve the settings file path: an explicit `-f` flag wins, otherwise the
/// default home-directory location is used.
pub fn resolve_settings_path(explicit: Option<&Path>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_settings_path(),
    }
}

pub fn load_settings(path: &Path) -> anyhow::Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        anyhow::anyhow!("Failed to read settings file {}: {}", path.display(), e)
    })?;
    let settings: Settings = serde_json::from_str(&content).map_err(|e| {
        anyhow::anyhow!("Failed to parse settings file {}: {}", path.display(), e)
    })?;
    Ok(settings)
}

/// Write the settings as pretty-printed JSON, creating parent directories as
/// needed.
pub fn save_settings(path: &Path, settings: &Settings) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            anyhow::anyhow!("Failed to create {}: {}", parent.display(), e)
        })?;
    }
    let content = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, content).map_err(|e| {
        anyhow::anyhow!("Failed to write settings file {}: {}", path.display(), e)
    })?;
    Ok(())
}
