use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Result};
use tracing::{error, info};

use crate::cluster::KubectlForwardFactory;
use crate::config;
use crate::config::model::ServiceId;
use crate::config::validate::validate;
use crate::supervisor::SessionSupervisor;
use crate::ui::logs::ConsoleSink;

/// Load the settings, register every configured service, and forward the
/// requested ones (all of them by default) until Ctrl-C.
pub async fn run(settings_file: Option<&Path>, services: Vec<String>) -> Result<()> {
    let settings_path = config::resolve_settings_path(settings_file)?;
    let settings = config::load_settings(&settings_path)?;

    if let Err(errors) = validate(&settings) {
        let mut msg = String::from("Settings errors:\n");
        for err in &errors {
            msg.push_str(&format!("  - {}\n", err));
        }
        bail!("{}", msg.trim_end());
    }

    let definitions = settings.forwarding_configuration.services;

    // Resolve the requested subset before touching any process.
    let selected: Vec<ServiceId> = if services.is_empty() {
        definitions.iter().map(|d| d.id()).collect()
    } else {
        let mut ids = Vec::new();
        for name in &services {
            let matches: Vec<ServiceId> = definitions
                .iter()
                .filter(|d| &d.service_name == name)
                .map(|d| d.id())
                .collect();
            match matches.len() {
                0 => bail!(
                    "unknown service '{}' (available: {:?})",
                    name,
                    definitions
                        .iter()
                        .map(|d| d.service_name.as_str())
                        .collect::<Vec<_>>()
                ),
                _ => ids.extend(matches),
            }
        }
        ids
    };

    let sink = Arc::new(ConsoleSink::new());
    let factory = Arc::new(KubectlForwardFactory);
    let supervisor = SessionSupervisor::new(factory, sink);

    supervisor.reconcile(definitions).await;

    for id in &selected {
        match supervisor.enable(id).await {
            Ok(()) => {}
            Err(e) => error!(service = %id, error = %e, "failed to start forwarding"),
        }
    }

    info!(count = selected.len(), "forwarding started, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.ok();
    eprintln!("\nShutting down...");

    supervisor.disable_all().await;
    Ok(())
}
