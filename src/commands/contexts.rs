use anyhow::{Context, Result};

use crate::cluster::ClusterGateway;

/// Show the current kubectl context and every available one.
pub async fn run() -> Result<()> {
    let gateway = ClusterGateway::new();
    let current = gateway
        .current_context()
        .await
        .context("reading current context")?;
    let contexts = gateway
        .list_contexts()
        .await
        .context("listing contexts")?;

    for context in &contexts {
        let marker = if *context == current { "*" } else { " " };
        println!("  {} {}", marker, context);
    }
    println!();
    Ok(())
}
