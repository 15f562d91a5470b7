//! Pending-write tracking.
//!
//! Deduplicates concurrent access around in-flight writes: `begin` registers
//! a write for a key, `wait` suspends readers until that write releases. We
//! rely on single-process deployment: every caller shares this structure
//! through the engine.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

/// Per-key in-flight write markers.
#[derive(Default, Clone)]
pub struct PendingWrites {
    inner: Arc<DashMap<String, watch::Receiver<()>>>,
}

impl PendingWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an in-flight write for `key`.
    ///
    /// The returned guard releases the registration when dropped, waking
    /// every waiter. Dropping on the error path gives release-on-every-exit
    /// semantics. Two overlapping writes to one key are a caller error; the
    /// engine tolerates them in that each marker still wakes its own
    /// waiters when its guard drops.
    pub fn begin(&self, key: impl Into<String>) -> PendingGuard {
        let key = key.into();
        let (release_tx, release_rx) = watch::channel(());
        self.inner.insert(key.clone(), release_rx);
        debug!(key = key.as_str(), "Pending write registered");
        PendingGuard {
            map: Arc::clone(&self.inner),
            key,
            _release: release_tx,
        }
    }

    /// Suspend until the in-flight write for `key`, if any, releases.
    ///
    /// Resolves immediately when no write is pending.
    pub async fn wait(&self, key: &str) {
        let Some(mut release) = self.inner.get(key).map(|entry| entry.value().clone()) else {
            return;
        };
        // Resolves when the guard drops its sender, closing the channel.
        let _ = release.changed().await;
    }

    /// Number of writes currently in flight.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Releases a pending-write registration on drop.
pub struct PendingGuard {
    map: Arc<DashMap<String, watch::Receiver<()>>>,
    key: String,
    _release: watch::Sender<()>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.map.remove(&self.key);
        debug!(key = self.key.as_str(), "Pending write released");
        // The sender drops with the guard, closing the channel and waking
        // every waiter that grabbed a receiver before the removal.
    }
}
