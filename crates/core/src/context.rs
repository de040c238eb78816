// Call Context - deadline + cancellation carried by every bridge call

use std::time::Duration;
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

/// Why a context finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DoneReason {
    DeadlineExceeded,
    Cancelled,
}

/// Cancellable call context supplied by the caller
///
/// Derived contexts (`with_timeout`) never outlive their parent: the deadline
/// is the earlier of the two and cancelling the parent cancels the child.
#[derive(Debug, Clone)]
pub struct CallContext {
    deadline: Option<Instant>,
    token: CancellationToken,
}

impl Default for CallContext {
    fn default() -> Self {
        Self::background()
    }
}

impl CallContext {
    /// Root context: no deadline, cancelled only explicitly
    pub fn background() -> Self {
        Self {
            deadline: None,
            token: CancellationToken::new(),
        }
    }

    /// Root context bound to an existing token (e.g. a server shutdown token)
    pub fn with_token(token: CancellationToken) -> Self {
        Self {
            deadline: None,
            token,
        }
    }

    /// Child context expiring after `timeout`, or earlier if the parent does
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Child context expiring at `deadline`, or earlier if the parent does
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.deadline {
            Some(parent) => parent.min(deadline),
            None => deadline,
        };
        Self {
            deadline: Some(deadline),
            token: self.token.child_token(),
        }
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the deadline (`None` when unbounded)
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Cancel this context and every context derived from it
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Non-blocking check
    pub fn done_reason(&self) -> Option<DoneReason> {
        if self.token.is_cancelled() {
            return Some(DoneReason::Cancelled);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Some(DoneReason::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolve once the context is cancelled or its deadline passes
    pub async fn done(&self) -> DoneReason {
        match self.deadline {
            Some(deadline) => tokio::select! {
                biased;
                _ = self.token.cancelled() => DoneReason::Cancelled,
                _ = sleep_until(deadline) => DoneReason::DeadlineExceeded,
            },
            None => {
                self.token.cancelled().await;
                DoneReason::Cancelled
            }
        }
    }
}
