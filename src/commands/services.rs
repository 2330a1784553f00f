use anyhow::{Context, Result};

use crate::cluster::ClusterGateway;

/// List (name, namespace) of every service visible in the cluster.
pub async fn run() -> Result<()> {
    let gateway = ClusterGateway::new();
    let services = gateway
        .list_services()
        .await
        .context("listing cluster services")?;

    if services.is_empty() {
        println!("No services found in the cluster.");
        return Ok(());
    }

    println!("  {:<40} NAMESPACE", "SERVICE");
    println!("  {}", "-".repeat(60));
    for service in &services {
        println!("  {:<40} {}", service.name, service.namespace);
    }
    println!();
    Ok(())
}
