use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

// ---------------------------------------------------------------------------
// ServiceId — the (name, namespace) identity key
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceId {
    pub name: String,
    pub namespace: String,
}

impl ServiceId {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
        }
    }
}

impl std::fmt::Display for ServiceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.namespace)
    }
}

// ---------------------------------------------------------------------------
// PortMapping
// ---------------------------------------------------------------------------

/// One local↔remote port pair. Ports are kept as text until validation so a
/// hand-edited settings file round-trips untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortMapping {
    pub local: String,
    pub remote: String,
}

impl PortMapping {
    pub fn new(local: impl Into<String>, remote: impl Into<String>) -> Self {
        Self {
            local: local.into(),
            remote: remote.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ServiceDefinition
// ---------------------------------------------------------------------------

/// A remote service plus the ordered list of port pairs to forward.
///
/// Equality and hashing consider only the (name, namespace) identity: two
/// definitions with the same identity but different ports are the same
/// service as far as session mapping is concerned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDefinition {
    pub service_name: String,
    pub service_namespace: String,
    #[serde(default)]
    pub ports: Vec<PortMapping>,
}

impl ServiceDefinition {
    pub fn id(&self) -> ServiceId {
        ServiceId::new(self.service_name.clone(), self.service_namespace.clone())
    }
}

impl PartialEq for ServiceDefinition {
    fn eq(&self, other: &Self) -> bool {
        self.service_name == other.service_name
            && self.service_namespace == other.service_namespace
    }
}

impl Eq for ServiceDefinition {}

impl Hash for ServiceDefinition {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.service_name.hash(state);
        self.service_namespace.hash(state);
    }
}

impl std::fmt::Display for ServiceDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.service_name, self.service_namespace)
    }
}

// ---------------------------------------------------------------------------
// Settings file shape
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForwardingConfig {
    #[serde(default)]
    pub services: Vec<ServiceDefinition>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    #[serde(default)]
    pub forwarding_configuration: ForwardingConfig,
}

impl Settings {
    /// Starter settings written by `portward init`. Meant as an editable
    /// example, not something that forwards anything useful out of the box.
    pub fn default_example() -> Self {
        let services = vec![
            ServiceDefinition {
                service_name: "spring-boot-service".to_string(),
                service_namespace: "default".to_string(),
                ports: vec![PortMapping::new("9090", "9090")],
            },
            ServiceDefinition {
                service_name: "zookeeper-service".to_string(),
                service_namespace: "default".to_string(),
                ports: vec![
                    PortMapping::new("2181", "2181"),
                    PortMapping::new("2888", "2888"),
                    PortMapping::new("8080", "8080"),
                ],
            },
            ServiceDefinition {
                service_name: "postgres-service".to_string(),
                service_namespace: "default".to_string(),
                ports: vec![PortMapping::new("5432", "5432")],
            },
        ];

        Self {
            forwarding_configuration: ForwardingConfig { services },
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
