//! Safety-release timers: one pending timer per device holding wristbands.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::debug;

/// Default safety window: wristbands locked by a configuration are force
/// released this long after the send unless the device confirms completion
/// first. Bounds the worst-case lock when a confirmation is lost.
pub const DEFAULT_RELEASE_WINDOW: Duration = Duration::from_secs(5 * 60);

struct TimerEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

/// One cancellable release timer per device.
///
/// Arming is cancel-then-arm. The old task is aborted, and independently
/// each expiry must claim its own generation under the lock before acting,
/// so a stale timer that already slept through its window can never release
/// a newer reservation.
pub struct ReleaseTimers {
    inner: Arc<Mutex<HashMap<String, TimerEntry>>>,
    next_generation: AtomicU64,
}

impl ReleaseTimers {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(1),
        }
    }

    /// Arm (or re-arm) the timer for a device. `on_expire` runs only if this
    /// timer is still the current one when the window elapses.
    pub async fn arm<F>(&self, raspy_id: &str, window: Duration, on_expire: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut timers = self.inner.lock().await;

        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        if let Some(old) = timers.remove(raspy_id) {
            old.handle.abort();
            debug!(raspy_id = %raspy_id, "Previous release timer replaced");
        }

        let map = Arc::clone(&self.inner);
        let id = raspy_id.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            // The arming call still holds the lock until the new entry is in
            // place, so a zero-length window cannot race the insert below.
            if Self::claim(&map, &id, generation).await {
                on_expire.await;
            }
        });

        timers.insert(raspy_id.to_string(), TimerEntry { generation, handle });
        debug!(raspy_id = %raspy_id, window_secs = window.as_secs(), "Release timer armed");
    }

    /// Cancel the pending timer, if any. Idempotent.
    pub async fn cancel(&self, raspy_id: &str) {
        if let Some(entry) = self.inner.lock().await.remove(raspy_id) {
            entry.handle.abort();
            debug!(raspy_id = %raspy_id, "Release timer cancelled");
        }
    }

    /// Whether a timer is currently pending for the device.
    pub async fn is_armed(&self, raspy_id: &str) -> bool {
        self.inner.lock().await.contains_key(raspy_id)
    }

    /// Remove the device's entry if it still belongs to `generation`.
    /// Returns whether the caller owns the expiry.
    async fn claim(
        map: &Mutex<HashMap<String, TimerEntry>>,
        raspy_id: &str,
        generation: u64,
    ) -> bool {
        let mut timers = map.lock().await;
        match timers.get(raspy_id) {
            Some(entry) if entry.generation == generation => {
                timers.remove(raspy_id);
                true
            }
            _ => false,
        }
    }
}

impl Default for ReleaseTimers {
    fn default() -> Self {
        Self::new()
    }
}
