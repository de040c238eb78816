// Scoped staging resources of an install
//
// LocalStaging: a copy of the artifact in temp_dir, removed on drop.
// RemoteStaging: the pushed copy on the device, removed on drop by a detached
// task with its own deadline (the caller's context may already be cancelled).

use crate::application::constants::op;
use crate::context::CallContext;
use crate::port::ProcessRunner;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, warn};

/// Local copy of an artifact, deleted on every exit path
pub(crate) struct LocalStaging {
    path: PathBuf,
}

/// Handoff between the blocking copy and the awaiting future
#[derive(Default)]
struct CopyState {
    finished: bool,
    abandoned: bool,
}

/// Armed while the copy is in flight; whichever side sees the other gone
/// removes the file
struct PendingCopy {
    path: PathBuf,
    state: Arc<Mutex<CopyState>>,
    armed: bool,
}

impl Drop for PendingCopy {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.abandoned = true;
        if state.finished {
            remove_local(&self.path);
        }
    }
}

impl LocalStaging {
    /// Copy `source` to `path`
    ///
    /// The copy runs on a blocking thread that outlives a dropped future, so
    /// an abandoned copy removes its own file once it completes.
    pub(crate) async fn copy_from(source: &Path, path: PathBuf) -> std::io::Result<Self> {
        let state = Arc::new(Mutex::new(CopyState::default()));
        let mut pending = PendingCopy {
            path: path.clone(),
            state: Arc::clone(&state),
            armed: true,
        };

        let (src, dst) = (source.to_path_buf(), path.clone());
        let joined = tokio::task::spawn_blocking(move || {
            let copied = std::fs::copy(&src, &dst);
            let mut state = state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.abandoned {
                remove_local(&dst);
            } else {
                state.finished = true;
            }
            copied
        })
        .await;

        pending.armed = false;
        let staging = Self { path };
        joined.map_err(std::io::Error::other)??;
        Ok(staging)
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LocalStaging {
    fn drop(&mut self) {
        remove_local(&self.path);
    }
}

fn remove_local(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed local staging copy"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove local staging copy"),
    }
}

/// Pushed artifact on the device; dropping schedules its removal
pub(crate) struct RemoteStaging {
    runner: Arc<dyn ProcessRunner>,
    serial: String,
    remote_path: String,
    timeout: Duration,
}

impl RemoteStaging {
    pub(crate) fn new(
        runner: Arc<dyn ProcessRunner>,
        serial: &str,
        remote_path: String,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            serial: serial.to_string(),
            remote_path,
            timeout,
        }
    }

    pub(crate) fn remote_path(&self) -> &str {
        &self.remote_path
    }
}

impl Drop for RemoteStaging {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(serial = %self.serial, path = %self.remote_path, "No runtime available, on-device staging file left behind");
            return;
        };

        let runner = Arc::clone(&self.runner);
        let serial = std::mem::take(&mut self.serial);
        let remote_path = std::mem::take(&mut self.remote_path);
        let timeout = self.timeout;

        handle.spawn(async move {
            let ctx = CallContext::background().with_timeout(timeout);
            match runner
                .run(&ctx, &serial, &["shell", "rm", "-f", &remote_path])
                .await
            {
                Ok(output) if output.success() => {
                    debug!(serial = %serial, path = %remote_path, "Removed on-device staging file");
                }
                Ok(output) => warn!(
                    operation = op::CLEANUP,
                    serial = %serial,
                    path = %remote_path,
                    exit_code = ?output.exit_code,
                    stderr = %output.stderr_lossy().trim(),
                    "On-device cleanup failed"
                ),
                Err(e) => warn!(
                    operation = op::CLEANUP,
                    serial = %serial,
                    path = %remote_path,
                    error = %e,
                    "On-device cleanup failed"
                ),
            }
        });
    }
}
