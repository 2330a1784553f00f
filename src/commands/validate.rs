use std::path::Path;

use anyhow::Result;

use crate::config;
use crate::config::validate::validate;

/// Check the settings file for problems and report all of them.
pub fn run(settings_file: Option<&Path>) -> Result<()> {
    let path = config::resolve_settings_path(settings_file)?;
    let settings = config::load_settings(&path)?;

    match validate(&settings) {
        Ok(()) => {
            let count = settings.forwarding_configuration.services.len();
            println!(
                "{} is valid ({} service{})",
                path.display(),
                count,
                if count == 1 { "" } else { "s" }
            );
            Ok(())
        }
        Err(errors) => {
            let mut msg = String::from("Settings errors:\n");
            for err in &errors {
                msg.push_str(&format!("  - {}\n", err));
            }
            anyhow::bail!("{}", msg.trim_end());
        }
    }
}
