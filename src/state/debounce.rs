//! Debounce coordinator - collapses bursts of continuous input
//!
//! Every request applies its local (virtual device) write immediately and
//! schedules the remote apply after a fixed delay. A newer request for the
//! same (device, channel) key cancels the scheduled apply and takes its place,
//! so only the last value of a burst ever reaches the remote API.
//!
//! ## Key Features:
//! - **Last-write-wins**: one pending slot per key, replaced atomically
//! - **Epoch check**: a timer that fires after being superseded does nothing
//! - **Fire-and-forget**: remote failures are logged, never retried
//!
//! An apply that has already started when a newer request arrives is not
//! aborted. Two remote calls for the same key can therefore be in flight at
//! once when a request lands just after the previous timer fired.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::types::{Channel, UpdateKey, UpdateValue};
use crate::error::GatewayResult;

/// Default debounce window in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 100;

/// A scheduled remote apply awaiting its timer
struct PendingUpdate {
    value: UpdateValue,
    /// Identifies this schedule; the timer only applies if it is still current
    epoch: u64,
    handle: JoinHandle<()>,
}

/// Per-key debounce scheduler
#[derive(Clone)]
pub struct Debouncer {
    delay: Duration,
    pending: Arc<Mutex<HashMap<UpdateKey, PendingUpdate>>>,
    next_epoch: Arc<AtomicU64>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_epoch: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Apply `value` locally now and remotely after the debounce delay
    ///
    /// `apply_local` runs synchronously before this returns, while the pending
    /// map is locked, so it must not block or call back into the debouncer; an
    /// error from it is logged and swallowed. `apply_remote` runs on a spawned task once the
    /// delay elapses without a newer request for the same key.
    pub fn schedule<L, R, Fut>(
        &self,
        device_id: &str,
        channel: Channel,
        value: UpdateValue,
        apply_local: L,
        apply_remote: R,
    ) where
        L: FnOnce(UpdateValue) -> anyhow::Result<()>,
        R: FnOnce(UpdateValue) -> Fut + Send + 'static,
        Fut: Future<Output = GatewayResult<()>> + Send + 'static,
    {
        let key = UpdateKey::new(device_id, channel);
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed);

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        let task_key = key.clone();

        // Local write, cancel, spawn and insert under one lock: concurrent
        // schedules on the same key cannot leave an orphaned timer behind, and
        // the last local write always belongs to the surviving pending value.
        let mut map = self.pending.lock();
        if let Err(e) = apply_local(value) {
            warn!(key = %key, "Local state write failed: {:#}", e);
        }
        if let Some(prev) = map.remove(&key) {
            trace!(key = %key, superseded = ?prev.value, "Cancelling pending update");
            prev.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let current = {
                let mut map = pending.lock();
                match map.get(&task_key) {
                    Some(entry) if entry.epoch == epoch => map.remove(&task_key).map(|e| e.value),
                    _ => None,
                }
            };

            let Some(value) = current else {
                trace!(key = %task_key, "Stale debounce timer, skipping");
                return;
            };

            debug!(key = %task_key, ?value, "Applying debounced update");
            if let Err(e) = apply_remote(value).await {
                warn!(key = %task_key, "Debounced update failed: {}", e);
            }
        });

        map.insert(key, PendingUpdate { value, epoch, handle });
    }

    /// Latest requested value for a key, if its apply has not fired yet
    pub fn pending_value(&self, device_id: &str, channel: Channel) -> Option<UpdateValue> {
        self.pending
            .lock()
            .get(&UpdateKey::new(device_id, channel))
            .map(|p| p.value)
    }

    pub fn is_pending(&self, device_id: &str, channel: Channel) -> bool {
        self.pending_value(device_id, channel).is_some()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Drop every scheduled apply without running it
    pub fn cancel_all(&self) -> usize {
        let mut map = self.pending.lock();
        let count = map.len();
        for (_, entry) in map.drain() {
            entry.handle.abort();
        }
        count
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(Duration::from_millis(DEFAULT_DEBOUNCE_MS))
    }
}
