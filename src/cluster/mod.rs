use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

use crate::config::model::{ServiceDefinition, ServiceId};
use crate::supervisor::events::{ProcessFactory, ProcessSpec};

/// Bound on every kubectl inventory call; a cluster that takes longer than
/// this to answer is treated as unreachable.
const KUBECTL_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// ClusterError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ClusterError {
    /// Timeout, spawn failure, or non-zero exit talking to the cluster.
    #[error("cluster unreachable: {0}")]
    Unreachable(String),

    /// The cluster replied but the payload didn't decode.
    #[error("malformed cluster response: {0}")]
    MalformedResponse(String),
}

// ---------------------------------------------------------------------------
// ClusterGateway — kubectl-backed context/service inventory
// ---------------------------------------------------------------------------

/// Read-only queries against the current kubectl configuration and cluster.
#[derive(Debug, Default)]
pub struct ClusterGateway;

impl ClusterGateway {
    pub fn new() -> Self {
        Self
    }

    /// Name of the context kubectl would use right now.
    pub async fn current_context(&self) -> Result<String, ClusterError> {
        debug!("reading current kubernetes context");
        let output = run_kubectl(&["config", "current-context"]).await?;
        output
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ClusterError::Unreachable("no current context set".to_string()))
    }

    /// All context names known to the kubectl configuration.
    pub async fn list_contexts(&self) -> Result<Vec<String>, ClusterError> {
        debug!("reading available kubernetes contexts");
        let output = run_kubectl(&["config", "get-contexts", "-o", "name"]).await?;
        Ok(output
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// (name, namespace) of every service visible in the cluster.
    pub async fn list_services(&self) -> Result<Vec<ServiceId>, ClusterError> {
        debug!("reading kubernetes services");
        let output = run_kubectl(&["get", "services", "--all-namespaces", "-o", "json"]).await?;
        parse_service_list(&output)
    }
}

async fn run_kubectl(args: &[&str]) -> Result<String, ClusterError> {
    let child = Command::new("kubectl").args(args).output();

    let output = tokio::time::timeout(KUBECTL_TIMEOUT, child)
        .await
        .map_err(|_| {
            ClusterError::Unreachable(format!(
                "kubectl {} timed out after {}s",
                args.first().unwrap_or(&""),
                KUBECTL_TIMEOUT.as_secs()
            ))
        })?
        .map_err(|e| ClusterError::Unreachable(format!("failed to run kubectl: {}", e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ClusterError::Unreachable(format!(
            "kubectl {} failed: {}",
            args.first().unwrap_or(&""),
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}

#[derive(Deserialize)]
struct ServiceList {
    #[serde(default)]
    items: Vec<ServiceItem>,
}

#[derive(Deserialize)]
struct ServiceItem {
    metadata: ServiceMetadata,
}

#[derive(Deserialize)]
struct ServiceMetadata {
    name: String,
    #[serde(default = "default_namespace")]
    namespace: String,
}

fn default_namespace() -> String {
    "default".to_string()
}

fn parse_service_list(json: &str) -> Result<Vec<ServiceId>, ClusterError> {
    let list: ServiceList = serde_json::from_str(json)
        .map_err(|e| ClusterError::MalformedResponse(e.to_string()))?;
    Ok(list
        .items
        .into_iter()
        .map(|item| ServiceId::new(item.metadata.name, item.metadata.namespace))
        .collect())
}

// ---------------------------------------------------------------------------
// KubectlForwardFactory
// ---------------------------------------------------------------------------

/// Builds `kubectl port-forward` process descriptions from service
/// definitions. stderr is merged into the session's log stream at spawn
/// time, so everything kubectl prints reaches the observer.
#[derive(Debug, Default)]
pub struct KubectlForwardFactory;

impl ProcessFactory for KubectlForwardFactory {
    fn build(&self, definition: &ServiceDefinition) -> ProcessSpec {
        let mut args = vec![
            "port-forward".to_string(),
            "-n".to_string(),
            definition.service_namespace.clone(),
            format!("service/{}", definition.service_name),
        ];
        for port in &definition.ports {
            args.push(format!("{}:{}", port.local, port.remote));
        }
        ProcessSpec {
            program: "kubectl".to_string(),
            args,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
