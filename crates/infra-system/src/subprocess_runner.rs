// Subprocess runner implementation
// reason: async-trait, tokio for async process management
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use adbridge_core::context::{CallContext, DoneReason};
use adbridge_core::port::{device_args, ProcessOutput, ProcessRunner, RunError};

use crate::tool_path::{resolve_tool_path, ToolPathError};

/// Time a terminated process gets between SIGTERM and SIGKILL
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// How long captured pipes may stay open after the process exited
/// (a freshly started adb server can inherit them)
pub const PIPE_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runs the adb executable as a child process
///
/// stdout and stderr are drained concurrently into separate buffers. When the
/// call context finishes first the child is terminated and reaped before
/// `run` returns; dropping the `run` future kills the child as well.
pub struct SubprocessRunner {
    tool_path: PathBuf,
    grace_period: Duration,
}

impl SubprocessRunner {
    /// Create a runner for `tool`, resolving it now
    ///
    /// # Example
    /// ```ignore
    /// let runner = SubprocessRunner::new("adb")?;
    /// ```
    pub fn new(tool: impl AsRef<Path>) -> Result<Self, ToolPathError> {
        let tool_path = resolve_tool_path(tool.as_ref())?;
        info!(tool_path = %tool_path.display(), "Resolved device-bridge tool");
        Ok(Self {
            tool_path,
            grace_period: DEFAULT_GRACE_PERIOD,
        })
    }

    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn tool_path(&self) -> &Path {
        &self.tool_path
    }

    fn spawn(&self, argv: &[String]) -> Result<Child, RunError> {
        Command::new(&self.tool_path)
            .args(argv)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RunError::Spawn(format!("{}: {}", self.tool_path.display(), e)))
    }

    /// SIGTERM first, SIGKILL if the process outlives the grace period
    async fn terminate(&self, child: &mut Child) {
        #[cfg(unix)]
        if let Some(pid) = child.id() {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            debug!(pid = %pid, "Sending SIGTERM to device-bridge tool");
            if kill(Pid::from_raw(pid as i32), Signal::SIGTERM).is_ok() {
                if let Ok(Ok(status)) = timeout(self.grace_period, child.wait()).await {
                    debug!(pid = %pid, status = %status, "Process exited after SIGTERM");
                    return;
                }
                warn!(pid = %pid, "Process did not exit after SIGTERM, sending SIGKILL");
            }
        }

        // kill() also waits, so the child is reaped when this returns
        if let Err(e) = child.kill().await {
            warn!(error = %e, "Failed to kill device-bridge tool");
        }
    }
}

/// One captured pipe, read by its own task into a shared buffer
///
/// Bytes already read survive the task being aborted, so output written
/// before the process exited is kept even when a grandchild holds the pipe.
struct Capture {
    name: &'static str,
    buf: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl Capture {
    fn start<R>(name: &'static str, reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buf = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&buf);
        let task = tokio::spawn(async move {
            let Some(mut reader) = reader else {
                return Ok(());
            };
            let mut chunk = [0u8; 8192];
            loop {
                let n = reader.read(&mut chunk).await?;
                if n == 0 {
                    return Ok(());
                }
                sink.lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .extend_from_slice(&chunk[..n]);
            }
        });
        Self { name, buf, task }
    }

    /// Wait for EOF up to `PIPE_DRAIN_TIMEOUT`, then keep what was read
    async fn finish(mut self, pid: Option<u32>) -> Result<Vec<u8>, RunError> {
        match timeout(PIPE_DRAIN_TIMEOUT, &mut self.task).await {
            Ok(Ok(Ok(()))) => {}
            Ok(Ok(Err(e))) => return Err(RunError::Io(e.to_string())),
            Ok(Err(e)) => return Err(RunError::Io(e.to_string())),
            Err(_) => {
                self.task.abort();
                warn!(
                    pid = ?pid,
                    stream = self.name,
                    "Pipe still open after the device-bridge tool exited, keeping captured output"
                );
            }
        }
        Ok(std::mem::take(
            &mut *self.buf.lock().unwrap_or_else(PoisonError::into_inner),
        ))
    }

    fn abort(&self) {
        self.task.abort();
    }
}

#[async_trait]
impl ProcessRunner for SubprocessRunner {
    async fn run(
        &self,
        ctx: &CallContext,
        serial: &str,
        args: &[&str],
    ) -> Result<ProcessOutput, RunError> {
        let argv = device_args(serial, args);
        let started = Instant::now();

        let mut child = self.spawn(&argv)?;
        let pid = child.id();
        debug!(pid = ?pid, args = ?argv, "Spawned device-bridge tool");

        let stdout = Capture::start("stdout", child.stdout.take());
        let stderr = Capture::start("stderr", child.stderr.take());

        let finished = tokio::select! {
            status = child.wait() => Ok(status),
            reason = ctx.done() => Err(reason),
        };

        match finished {
            Ok(status) => {
                let status = status.map_err(|e| RunError::Io(e.to_string()))?;
                let (stdout, stderr) = tokio::join!(stdout.finish(pid), stderr.finish(pid));
                let (stdout, stderr) = (stdout?, stderr?);

                debug!(
                    pid = ?pid,
                    exit_code = ?status.code(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    "Device-bridge tool exited"
                );

                Ok(ProcessOutput {
                    exit_code: status.code(),
                    stdout,
                    stderr,
                })
            }
            Err(reason) => {
                warn!(
                    pid = ?pid,
                    reason = ?reason,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Call context finished before the device-bridge tool, terminating"
                );
                self.terminate(&mut child).await;
                stdout.abort();
                stderr.abort();

                Err(match reason {
                    DoneReason::DeadlineExceeded => RunError::Timeout(started.elapsed()),
                    DoneReason::Cancelled => RunError::Cancelled,
                })
            }
        }
    }
}
