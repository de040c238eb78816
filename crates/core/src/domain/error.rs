// Device-bridge Error Types

use crate::domain::Verdict;
use std::time::Duration;
use thiserror::Error;

/// Failure of a single device-bridge operation
///
/// Every variant carries enough context (operation, serial, captured stderr)
/// for the caller to log it and decide whether to retry. The adapter itself
/// never retries.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Invalid input; the external tool was never invoked
    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{operation} failed on '{serial}' (exit code {exit_code:?}): {stderr}")]
    Process {
        operation: &'static str,
        serial: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{operation}: could not start device-bridge tool: {reason}")]
    Spawn {
        operation: &'static str,
        reason: String,
    },

    #[error("{operation} on '{serial}' timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        serial: String,
        after: Duration,
    },

    #[error("{operation} on '{serial}' was cancelled")]
    Cancelled {
        operation: &'static str,
        serial: String,
    },

    #[error("Timed out after {waited:?} waiting for the device lock on '{serial}'")]
    LockTimeout { serial: String, waited: Duration },

    /// Captured output could not be read (distinct from a skipped malformed line)
    #[error("{operation}: unreadable tool output: {reason}")]
    Parse {
        operation: &'static str,
        reason: String,
    },

    /// Process ran but the package-manager markers did not report success
    #[error("{operation} on '{serial}' ended with {verdict}: {output}")]
    Outcome {
        operation: &'static str,
        serial: String,
        verdict: Verdict,
        output: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Whether the same call may succeed if repeated later
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::Timeout { .. }
                | BridgeError::Cancelled { .. }
                | BridgeError::LockTimeout { .. }
                | BridgeError::Spawn { .. }
        )
    }

    /// True for timeouts and cancellations, including lock waits
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            BridgeError::Timeout { .. }
                | BridgeError::Cancelled { .. }
                | BridgeError::LockTimeout { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, BridgeError>;
