use chrono::{DateTime, Utc};

use crate::config::model::{ServiceDefinition, ServiceId};

// ---------------------------------------------------------------------------
// StopReason
// ---------------------------------------------------------------------------

/// Why a forwarding process is no longer running. Observers cannot otherwise
/// distinguish a crash from an operator-initiated stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The process exited cleanly, either on its own or within the grace
    /// period after being asked to stop.
    GracefulExit,
    /// The process ignored the graceful signal and was forcibly killed.
    Killed,
    /// The process exited on its own with a failure status.
    Crashed,
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StopReason::GracefulExit => "graceful exit",
            StopReason::Killed => "killed",
            StopReason::Crashed => "crashed",
        };
        write!(f, "{}", text)
    }
}

// ---------------------------------------------------------------------------
// EventSink
// ---------------------------------------------------------------------------

/// Observer for session lifecycle and process output. Implementations must
/// tolerate concurrent delivery from multiple session readers; ordering is
/// only guaranteed within a single session.
pub trait EventSink: Send + Sync {
    /// A service was registered with the supervisor (inactive).
    fn on_registered(&self, id: &ServiceId);

    /// The whole known-service set was discarded ahead of re-registration.
    fn on_cleared(&self);

    /// One non-blank, trimmed line of forwarding-process output.
    fn on_log(&self, id: &ServiceId, timestamp: DateTime<Utc>, text: &str);

    /// The session's process is confirmed gone.
    fn on_stopped(&self, id: &ServiceId, reason: StopReason);
}

// ---------------------------------------------------------------------------
// ProcessFactory
// ---------------------------------------------------------------------------

/// An unstarted, spawnable process description. Standard error is always
/// merged into the session's log stream when spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSpec {
    pub program: String,
    pub args: Vec<String>,
}

/// Builds the forwarding process for a service definition. Pure: no side
/// effects, never fails. Spawn errors surface later from the supervisor.
pub trait ProcessFactory: Send + Sync {
    fn build(&self, definition: &ServiceDefinition) -> ProcessSpec;
}
