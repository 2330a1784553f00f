#![allow(dead_code)]
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tempfile::TempDir;

use portward::config::model::{ServiceDefinition, ServiceId};
use portward::supervisor::events::{EventSink, ProcessFactory, ProcessSpec, StopReason};

pub struct TestSettings {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestSettings {
    pub fn new(settings_json: &str) -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, settings_json).unwrap();
        Self { dir, path }
    }

    /// A directory with no settings file yet (for `init`).
    pub fn empty() -> Self {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        Self { dir, path }
    }
}

/// EventSink that records everything for assertions.
#[derive(Default)]
pub struct RecordingSink {
    pub events: Mutex<Vec<SinkEvent>>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SinkEvent {
    Registered(ServiceId),
    Cleared,
    Log(ServiceId, String),
    Stopped(ServiceId, StopReason),
}

impl RecordingSink {
    pub fn events(&self) -> Vec<SinkEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn logs(&self, id: &ServiceId) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Log(sid, text) if &sid == id => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn stop_reasons(&self, id: &ServiceId) -> Vec<StopReason> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                SinkEvent::Stopped(sid, reason) if &sid == id => Some(reason),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn on_registered(&self, id: &ServiceId) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Registered(id.clone()));
    }

    fn on_cleared(&self) {
        self.events.lock().unwrap().push(SinkEvent::Cleared);
    }

    fn on_log(&self, id: &ServiceId, _timestamp: DateTime<Utc>, text: &str) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Log(id.clone(), text.to_string()));
    }

    fn on_stopped(&self, id: &ServiceId, reason: StopReason) {
        self.events
            .lock()
            .unwrap()
            .push(SinkEvent::Stopped(id.clone(), reason));
    }
}

/// ProcessFactory that runs a fixed shell command per service name, so the
/// full session lifecycle can be exercised without kubectl or a cluster.
pub struct ShellFactory {
    pub commands: Vec<(String, String)>,
}

impl ShellFactory {
    pub fn new(commands: &[(&str, &str)]) -> Self {
        Self {
            commands: commands
                .iter()
                .map(|(name, cmd)| (name.to_string(), cmd.to_string()))
                .collect(),
        }
    }
}

impl ProcessFactory for ShellFactory {
    fn build(&self, definition: &ServiceDefinition) -> ProcessSpec {
        let command = self
            .commands
            .iter()
            .find(|(name, _)| name == &definition.service_name)
            .map(|(_, cmd)| cmd.clone())
            .unwrap_or_else(|| "sleep 60".to_string());
        ProcessSpec {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), command],
        }
    }
}

pub async fn wait_until<F>(mut condition: F, timeout: Duration) -> bool
where
    F: FnMut() -> bool,
{
    let start = std::time::Instant::now();
    while start.elapsed() < timeout {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    condition()
}
