pub mod events;
mod session;

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::model::{ServiceDefinition, ServiceId};
use events::{EventSink, ProcessFactory, StopReason};
use session::{run_session, Session, SessionRuntime};

/// How long a process gets to exit after the graceful signal before it is
/// forcibly killed.
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// Extra slack on top of the grace period when waiting for a session task to
/// confirm termination; covers signal delivery and bookkeeping.
const GRACE_SLACK: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// SupervisorError
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The operation referenced an identity that was never registered.
    #[error("unknown service {0}")]
    UnknownSession(ServiceId),

    /// The OS refused to start the forwarding process.
    #[error("failed to spawn forwarding process for {id}")]
    SpawnFailed {
        id: ServiceId,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// SessionSupervisor
// ---------------------------------------------------------------------------

/// Owns the mapping from service identity to live forwarding process.
///
/// All map and session-field mutation happens behind one mutex; the blocking
/// parts of the process lifecycle (waiting for exit, the kill escalation)
/// run in per-session tasks so a slow shutdown of one session cannot stall
/// operations on the others. `reconcile` is the exception: it tears down
/// every pre-existing session before releasing the lock, so a racing enable
/// can never leave a process running for a definition that is no longer
/// wanted.
pub struct SessionSupervisor {
    state: Mutex<Vec<Session>>,
    factory: Arc<dyn ProcessFactory>,
    sink: Arc<dyn EventSink>,
    grace: Duration,
}

impl SessionSupervisor {
    pub fn new(factory: Arc<dyn ProcessFactory>, sink: Arc<dyn EventSink>) -> Self {
        Self {
            state: Mutex::new(Vec::new()),
            factory,
            sink,
            grace: DEFAULT_GRACE,
        }
    }

    /// Override the grace period (tests use a short one).
    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Replace the whole known-service set.
    ///
    /// Every existing session is disabled first, whether or not its identity
    /// survives into the new list (a service that reappears unchanged still
    /// gets its forward restarted on the next enable). The new sessions are
    /// registered inactive, preserving input order; a duplicate identity in
    /// the input keeps its first position, last definition wins.
    pub async fn reconcile(&self, definitions: Vec<ServiceDefinition>) {
        let mut sessions = self.state.lock().await;
        info!(count = definitions.len(), "reconciling services");

        let old: Vec<Session> = std::mem::take(&mut *sessions);
        for mut session in old {
            session.cancel.cancel();
            if let Some(task) = session.task.take() {
                if tokio::time::timeout(self.grace + GRACE_SLACK, task)
                    .await
                    .is_err()
                {
                    warn!(
                        service = %session.definition,
                        "session did not confirm termination during reconcile",
                    );
                    // Retire on the task's behalf so observers see the
                    // session go down rather than stay live forever.
                    if session.cell.retire(session.cell.generation()) {
                        self.sink
                            .on_stopped(&session.definition.id(), StopReason::Killed);
                    }
                }
            }
        }

        self.sink.on_cleared();

        for definition in definitions {
            self.sink.on_registered(&definition.id());
            match sessions.iter_mut().find(|s| s.definition == definition) {
                Some(existing) => existing.definition = definition,
                None => sessions.push(Session::new(definition)),
            }
        }
    }

    /// Start forwarding for a registered service. A no-op when the session
    /// is already live. Spawn failures surface here synchronously and leave
    /// the session not-live.
    pub async fn enable(&self, id: &ServiceId) -> Result<(), SupervisorError> {
        let ready = {
            let mut sessions = self.state.lock().await;
            let session = find_session(&mut sessions, id)
                .ok_or_else(|| SupervisorError::UnknownSession(id.clone()))?;

            if session.cell.is_live() {
                return Ok(());
            }

            info!(service = %id, "enabling forwarding");
            let generation = session.cell.begin();
            session.cancel = CancellationToken::new();

            let (ready_tx, ready_rx) = oneshot::channel();
            let runtime = SessionRuntime {
                id: id.clone(),
                spec: self.factory.build(&session.definition),
                cell: session.cell.clone(),
                generation,
                cancel: session.cancel.clone(),
                sink: self.sink.clone(),
                grace: self.grace,
            };
            session.task = Some(tokio::spawn(run_session(runtime, ready_tx)));
            ready_rx
        };

        match ready.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(source)) => Err(SupervisorError::SpawnFailed {
                id: id.clone(),
                source,
            }),
            Err(_) => Err(SupervisorError::SpawnFailed {
                id: id.clone(),
                source: std::io::Error::other("session task aborted before spawn"),
            }),
        }
    }

    /// Stop forwarding for a registered service. A no-op when the session is
    /// not live. The caller returns once the process is confirmed gone or
    /// the grace period (plus slack) has elapsed; in the latter case the
    /// session is still marked not-live, since a kill that refuses to land
    /// must not wedge shutdown.
    pub async fn disable(&self, id: &ServiceId) -> Result<(), SupervisorError> {
        let (cell, generation, cancel, task) = {
            let mut sessions = self.state.lock().await;
            let session = find_session(&mut sessions, id)
                .ok_or_else(|| SupervisorError::UnknownSession(id.clone()))?;

            if !session.cell.is_live() {
                return Ok(());
            }

            info!(service = %id, "disabling forwarding");
            (
                session.cell.clone(),
                session.cell.generation(),
                session.cancel.clone(),
                session.task.take(),
            )
        };

        cancel.cancel();
        if let Some(task) = task {
            if tokio::time::timeout(self.grace + GRACE_SLACK, task)
                .await
                .is_err()
            {
                warn!(
                    service = %id,
                    "forwarding process did not confirm termination within the grace period",
                );
            }
        }

        // Normally the session task has already retired the generation and
        // notified the sink; this only fires when the task timed out above.
        if cell.retire(generation) {
            self.sink.on_stopped(id, StopReason::Killed);
        }
        Ok(())
    }

    /// Disable every live session. Never aborts early: one session failing
    /// to terminate must not prevent attempts on the rest.
    pub async fn disable_all(&self) {
        let live: Vec<ServiceId> = {
            let sessions = self.state.lock().await;
            sessions
                .iter()
                .filter(|s| s.cell.is_live())
                .map(|s| s.definition.id())
                .collect()
        };

        if !live.is_empty() {
            info!(count = live.len(), "disabling all forwarding");
        }
        for id in live {
            if let Err(e) = self.disable(&id).await {
                warn!(service = %id, error = %e, "failed to disable forwarding");
            }
        }
    }

    /// True when at least one service is registered, live or not.
    pub async fn is_active(&self) -> bool {
        !self.state.lock().await.is_empty()
    }

    /// Whether the given session currently has a live process.
    pub async fn is_live(&self, id: &ServiceId) -> Result<bool, SupervisorError> {
        let mut sessions = self.state.lock().await;
        let session = find_session(&mut sessions, id)
            .ok_or_else(|| SupervisorError::UnknownSession(id.clone()))?;
        Ok(session.cell.is_live())
    }

    /// Registered identities in registration order.
    pub async fn registered(&self) -> Vec<ServiceId> {
        self.state
            .lock()
            .await
            .iter()
            .map(|s| s.definition.id())
            .collect()
    }
}

fn find_session<'a>(sessions: &'a mut [Session], id: &ServiceId) -> Option<&'a mut Session> {
    sessions.iter_mut().find(|s| {
        s.definition.service_name == id.name && s.definition.service_namespace == id.namespace
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
