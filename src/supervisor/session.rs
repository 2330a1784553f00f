use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::config::model::{ServiceDefinition, ServiceId};
use crate::supervisor::events::{EventSink, ProcessSpec, StopReason};

#[cfg(unix)]
use nix::sys::signal::{killpg, Signal};
#[cfg(unix)]
use nix::unistd::Pid;

// ---------------------------------------------------------------------------
// SessionCell — liveness + generation shared with the session task
// ---------------------------------------------------------------------------

/// The mutable runtime state of one session, shared between the supervisor
/// (which owns the map) and the session's background task. Keeping it in
/// atomics lets the task finish its bookkeeping without taking the
/// supervisor lock, which the supervisor may be holding while it awaits
/// that very task during reconcile.
#[derive(Debug, Default)]
pub(crate) struct SessionCell {
    live: AtomicBool,
    generation: AtomicU64,
}

impl SessionCell {
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Mark the session live under a new generation. Only called while the
    /// supervisor lock is held and the session is not live.
    pub fn begin(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.live.store(true, Ordering::SeqCst);
        generation
    }

    /// Mark the session not-live if `generation` is still current. Returns
    /// true only for the first caller that actually retired this generation,
    /// so the stopped notification fires exactly once. A stale task from a
    /// superseded generation gets false and must not touch anything.
    pub fn retire(&self, generation: u64) -> bool {
        if self.generation.load(Ordering::SeqCst) != generation {
            return false;
        }
        self.live.swap(false, Ordering::SeqCst)
    }
}

// ---------------------------------------------------------------------------
// Session — one entry in the supervisor map
// ---------------------------------------------------------------------------

pub(crate) struct Session {
    pub definition: ServiceDefinition,
    pub cell: Arc<SessionCell>,
    pub cancel: CancellationToken,
    pub task: Option<JoinHandle<()>>,
}

impl Session {
    pub fn new(definition: ServiceDefinition) -> Self {
        Self {
            definition,
            cell: Arc::new(SessionCell::default()),
            cancel: CancellationToken::new(),
            task: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Session task
// ---------------------------------------------------------------------------

pub(crate) struct SessionRuntime {
    pub id: ServiceId,
    pub spec: ProcessSpec,
    pub cell: Arc<SessionCell>,
    pub generation: u64,
    pub cancel: CancellationToken,
    pub sink: Arc<dyn EventSink>,
    pub grace: Duration,
}

/// Runs one generation of a session: spawn the forwarding process, stream
/// its merged output to the sink, wait for exit or cancellation, and retire
/// the generation. The spawn result is reported over `ready` so the caller
/// can surface spawn failures synchronously.
pub(crate) async fn run_session(rt: SessionRuntime, ready: oneshot::Sender<std::io::Result<()>>) {
    // Cancelled before the child ever started (a reconcile won the race).
    if rt.cancel.is_cancelled() {
        debug!(service = %rt.id, "cancelled before spawn");
        let _ = ready.send(Ok(()));
        if rt.cell.retire(rt.generation) {
            rt.sink.on_stopped(&rt.id, StopReason::Killed);
        }
        return;
    }

    let mut cmd = Command::new(&rt.spec.program);
    cmd.args(&rt.spec.args);
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    // On Unix the child runs in its own process group so the graceful signal
    // reaches the whole tree via killpg.
    #[cfg(unix)]
    cmd.process_group(0);

    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            rt.cell.retire(rt.generation);
            let _ = ready.send(Err(e));
            return;
        }
    };

    let child_pid = child.id();
    debug!(service = %rt.id, pid = ?child_pid, "forwarding process spawned");
    let _ = ready.send(Ok(()));

    // Both streams feed the same per-line sink, so the observer sees merged
    // output regardless of which descriptor the process wrote to.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_task = spawn_reader(stdout, rt.id.clone(), rt.cell.clone(), rt.generation, rt.sink.clone());
    let stderr_task = spawn_reader(stderr, rt.id.clone(), rt.cell.clone(), rt.generation, rt.sink.clone());

    let reason = tokio::select! {
        result = child.wait() => {
            match result {
                Ok(status) if status.success() => StopReason::GracefulExit,
                Ok(status) => {
                    debug!(service = %rt.id, %status, "forwarding process exited");
                    StopReason::Crashed
                }
                Err(e) => {
                    error!(service = %rt.id, error = %e, "wait() on forwarding process failed");
                    StopReason::Crashed
                }
            }
        }
        _ = rt.cancel.cancelled() => {
            terminate_child(&mut child, child_pid, rt.grace).await
        }
    };

    // Drain the reader tasks; they exit at stream close.
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    if rt.cell.retire(rt.generation) {
        rt.sink.on_stopped(&rt.id, reason);
    } else {
        debug!(service = %rt.id, generation = rt.generation, "stale session task, dropping exit notification");
    }
}

/// Forwards non-blank, trimmed lines to the sink until the stream closes or
/// the owning generation is superseded.
fn spawn_reader<R>(
    stream: Option<R>,
    id: ServiceId,
    cell: Arc<SessionCell>,
    generation: u64,
    sink: Arc<dyn EventSink>,
) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(stream) = stream else { return };
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        loop {
            line.clear();
            match reader.read_line(&mut line).await {
                Ok(0) => break, // EOF
                Ok(_) => {
                    if cell.generation() != generation {
                        break;
                    }
                    let text = line.trim();
                    if !text.is_empty() {
                        sink.on_log(&id, chrono::Utc::now(), text);
                    }
                }
                Err(e) => {
                    warn!(service = %id, error = %e, "output read error");
                    break;
                }
            }
        }
    })
}

/// Asks the child's process group to terminate, waits up to `grace`, then
/// falls back to an unconditional kill. Kill failures are logged and
/// swallowed; the session is retired either way.
#[cfg(unix)]
async fn terminate_child(
    child: &mut tokio::process::Child,
    child_pid: Option<u32>,
    grace: Duration,
) -> StopReason {
    let Some(pid) = child_pid else {
        let _ = child.kill().await;
        return StopReason::Killed;
    };

    let pgid = Pid::from_raw(pid as i32);
    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => {
            debug!(pid, "sent SIGTERM to process group");
        }
        Err(nix::errno::Errno::ESRCH) => {
            debug!(pid, "process group already exited");
            let _ = child.wait().await;
            return StopReason::GracefulExit;
        }
        Err(e) => {
            warn!(pid, error = %e, "killpg(SIGTERM) failed, falling back to kill");
            if let Err(e) = child.kill().await {
                warn!(pid, error = %e, "kill failed");
            }
            let _ = child.wait().await;
            return StopReason::Killed;
        }
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(_status)) => {
            debug!(pid, "child exited within grace period");
            StopReason::GracefulExit
        }
        _ => {
            warn!(pid, grace_secs = grace.as_secs(), "child did not exit within grace period, sending SIGKILL");
            if let Err(e) = child.kill().await {
                warn!(pid, error = %e, "kill failed");
            }
            let _ = child.wait().await;
            StopReason::Killed
        }
    }
}

#[cfg(not(unix))]
async fn terminate_child(
    child: &mut tokio::process::Child,
    _child_pid: Option<u32>,
    _grace: Duration,
) -> StopReason {
    if let Err(e) = child.kill().await {
        warn!(error = %e, "kill failed");
    }
    let _ = child.wait().await;
    StopReason::Killed
}
