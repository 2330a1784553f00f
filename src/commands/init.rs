use std::path::Path;

use anyhow::Result;

use crate::config;
use crate::config::model::Settings;

/// Write a starter settings file. Refuses to overwrite an existing one.
pub fn run(settings_file: Option<&Path>) -> Result<()> {
    let path = config::resolve_settings_path(settings_file)?;
    if path.exists() {
        anyhow::bail!("settings file already exists at {}", path.display());
    }

    config::save_settings(&path, &Settings::default_example())?;

    println!("Created {}", path.display());
    println!();
    println!("Edit the file, then run `portward start` to begin forwarding.");
    Ok(())
}
