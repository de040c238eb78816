// Process Runner Port
// Abstraction over invoking the external device-bridge tool

use crate::context::CallContext;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Flag selecting the target device
pub const SERIAL_FLAG: &str = "-s";

/// Captured result of a finished tool invocation
///
/// A nonzero exit is still an `Ok(ProcessOutput)`: the streams are what the
/// caller needs to interpret the failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutput {
    /// `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessOutput {
    pub fn new(exit_code: Option<i32>, stdout: impl Into<Vec<u8>>, stderr: impl Into<Vec<u8>>) -> Self {
        Self {
            exit_code,
            stdout: stdout.into(),
            stderr: stderr.into(),
        }
    }

    /// Exit code 0 with the given stdout
    pub fn ok(stdout: impl Into<Vec<u8>>) -> Self {
        Self::new(Some(0), stdout, Vec::new())
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Strict UTF-8 view of stdout (used by the parsers)
    pub fn stdout_text(&self) -> Result<&str, std::str::Utf8Error> {
        std::str::from_utf8(&self.stdout)
    }

    pub fn stdout_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_lossy(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// Invocation errors (the process did not run to completion)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunError {
    #[error("Spawn failed: {0}")]
    Spawn(String),

    #[error("Process terminated after deadline ({0:?} elapsed)")]
    Timeout(Duration),

    #[error("Process terminated after cancellation")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(String),
}

/// Build the argument vector: `-s <serial>` first when a serial is given.
///
/// An empty serial means "no device context" (version and device listing).
pub fn device_args(serial: &str, args: &[&str]) -> Vec<String> {
    let mut argv = Vec::with_capacity(args.len() + 2);
    if !serial.is_empty() {
        argv.push(SERIAL_FLAG.to_string());
        argv.push(serial.to_string());
    }
    argv.extend(args.iter().map(|a| a.to_string()));
    argv
}

/// Process Runner trait
///
/// Implementations:
/// - SubprocessRunner (infra-system): spawns the real tool
/// - MockProcessRunner: scripted replies for tests
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    /// Run the tool against `serial` and wait for it to exit
    ///
    /// # Errors
    /// - RunError::Spawn if the tool cannot be started
    /// - RunError::Timeout / RunError::Cancelled if `ctx` finishes first; the
    ///   process is terminated before this returns and no partial output is kept
    async fn run(
        &self,
        ctx: &CallContext,
        serial: &str,
        args: &[&str],
    ) -> Result<ProcessOutput, RunError>;
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use crate::context::DoneReason;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Scripted reply of the mock runner
    #[derive(Debug, Clone)]
    pub enum MockReply {
        Output(ProcessOutput),
        Fail(RunError),
    }

    /// One finished invocation with its execution window
    #[derive(Debug, Clone)]
    pub struct RecordedCall {
        pub serial: String,
        pub args: Vec<String>,
        pub started: Instant,
        pub finished: Instant,
    }

    impl RecordedCall {
        pub fn overlaps(&self, other: &RecordedCall) -> bool {
            self.started < other.finished && other.started < self.finished
        }
    }

    struct RunningGuard<'a>(&'a AtomicUsize);

    impl Drop for RunningGuard<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Mock Process Runner for testing
    ///
    /// Replies are matched by argument prefix (serial excluded), first match wins.
    /// Unmatched calls exit 0 with empty output. An artificial delay makes
    /// execution windows observable; the delay honours the call context.
    pub struct MockProcessRunner {
        replies: Vec<(Vec<String>, MockReply)>,
        delay: Duration,
        invocations: AtomicUsize,
        running: AtomicUsize,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl Default for MockProcessRunner {
        fn default() -> Self {
            Self::new()
        }
    }

    impl MockProcessRunner {
        pub fn new() -> Self {
            Self {
                replies: Vec::new(),
                delay: Duration::ZERO,
                invocations: AtomicUsize::new(0),
                running: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        pub fn reply(mut self, prefix: &[&str], reply: MockReply) -> Self {
            self.replies
                .push((prefix.iter().map(|s| s.to_string()).collect(), reply));
            self
        }

        /// Exit 0 with `stdout` for calls starting with `prefix`
        pub fn on(self, prefix: &[&str], stdout: &str) -> Self {
            self.reply(prefix, MockReply::Output(ProcessOutput::ok(stdout)))
        }

        /// Number of invocations started (including ones still running)
        pub fn call_count(&self) -> usize {
            self.invocations.load(Ordering::SeqCst)
        }

        /// Invocations currently inside `run`
        pub fn running(&self) -> usize {
            self.running.load(Ordering::SeqCst)
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        fn find_reply(&self, args: &[&str]) -> MockReply {
            self.replies
                .iter()
                .find(|(prefix, _)| {
                    prefix.len() <= args.len() && prefix.iter().zip(args).all(|(p, a)| p == a)
                })
                .map(|(_, reply)| reply.clone())
                .unwrap_or_else(|| MockReply::Output(ProcessOutput::ok("")))
        }
    }

    #[async_trait]
    impl ProcessRunner for MockProcessRunner {
        async fn run(
            &self,
            ctx: &CallContext,
            serial: &str,
            args: &[&str],
        ) -> Result<ProcessOutput, RunError> {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            self.running.fetch_add(1, Ordering::SeqCst);
            let _running = RunningGuard(&self.running);
            let started = Instant::now();

            let interrupted = if self.delay.is_zero() {
                ctx.done_reason()
            } else {
                tokio::select! {
                    _ = tokio::time::sleep(self.delay) => None,
                    reason = ctx.done() => Some(reason),
                }
            };

            let finished = Instant::now();
            self.calls.lock().unwrap().push(RecordedCall {
                serial: serial.to_string(),
                args: args.iter().map(|a| a.to_string()).collect(),
                started,
                finished,
            });

            match interrupted {
                Some(DoneReason::DeadlineExceeded) => Err(RunError::Timeout(finished - started)),
                Some(DoneReason::Cancelled) => Err(RunError::Cancelled),
                None => match self.find_reply(args) {
                    MockReply::Output(output) => Ok(output),
                    MockReply::Fail(err) => Err(err),
                },
            }
        }
    }
}
