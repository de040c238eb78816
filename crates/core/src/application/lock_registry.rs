// Per-device lock registry
// Serializes mutating operations (install/uninstall) per serial

use crate::context::{CallContext, DoneReason};
use crate::domain::BridgeError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::time::Instant;
use tracing::debug;

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// Registry of lazily created per-serial locks
///
/// Distinct serials never contend. An entry is created on first use and
/// removed again once no lease holds it and nobody waits on it, so a
/// long-running process does not accumulate one lock per serial ever seen.
#[derive(Default)]
pub struct DeviceLockRegistry {
    entries: Arc<Mutex<LockMap>>,
}

/// Exclusive right to mutate one device; released on drop
pub struct DeviceLease {
    // Field order matters: the guard must be released before the entry
    // reference runs its eviction check.
    _guard: OwnedMutexGuard<()>,
    _entry: EntryRef,
}

/// Counted reference to a registry entry
struct EntryRef {
    serial: String,
    mutex: Arc<AsyncMutex<()>>,
    entries: Arc<Mutex<LockMap>>,
}

impl Drop for EntryRef {
    fn drop(&mut self) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        // Clones are only made under the map lock, so the count is exact here:
        // the map and this reference are the last two owners.
        let unused = entries
            .get(&self.serial)
            .is_some_and(|m| Arc::ptr_eq(m, &self.mutex) && Arc::strong_count(m) == 2);
        if unused {
            entries.remove(&self.serial);
            debug!(serial = %self.serial, "Evicted idle device lock");
        }
    }
}

impl DeviceLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up or create the lock for `serial` atomically
    fn entry(&self, serial: &str) -> EntryRef {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let mutex = entries
            .entry(serial.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone();
        EntryRef {
            serial: serial.to_string(),
            mutex,
            entries: Arc::clone(&self.entries),
        }
    }

    /// Wait (unbounded) until the device lock for `serial` is free
    pub async fn acquire(&self, serial: &str) -> DeviceLease {
        let entry = self.entry(serial);
        let guard = Arc::clone(&entry.mutex).lock_owned().await;
        DeviceLease {
            _guard: guard,
            _entry: entry,
        }
    }

    /// Wait for the device lock, giving up when `ctx` finishes
    ///
    /// # Errors
    /// - BridgeError::LockTimeout when the deadline passes while waiting
    /// - BridgeError::Cancelled when the context is cancelled while waiting
    pub async fn acquire_until(
        &self,
        ctx: &CallContext,
        operation: &'static str,
        serial: &str,
    ) -> Result<DeviceLease, BridgeError> {
        let started = Instant::now();
        tokio::select! {
            biased;
            lease = self.acquire(serial) => Ok(lease),
            reason = ctx.done() => Err(match reason {
                DoneReason::DeadlineExceeded => BridgeError::LockTimeout {
                    serial: serial.to_string(),
                    waited: started.elapsed(),
                },
                DoneReason::Cancelled => BridgeError::Cancelled {
                    operation,
                    serial: serial.to_string(),
                },
            }),
        }
    }

    /// Number of serials with a live lock entry
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
