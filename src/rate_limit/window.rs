//! Window Counter Store
//!
//! Fixed-window request counters with time-to-live expiry. A window is
//! created by the first request after the previous one expired and vanishes
//! on its own; there is no delete path on the hot path.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::error::StoreError;

/// Counter state after an increment attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowState {
    /// Whether this call was counted
    pub admitted: bool,

    /// Requests counted in the window after this call
    pub count: u32,

    /// Time until the window expires
    pub reset_in: Duration,
}

/// Read-only view of a live window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSnapshot {
    pub count: u32,
    pub reset_in: Duration,
}

/// Shared counter store seam.
///
/// Implementations must perform `increment_within_limit` as one atomic
/// compare-and-increment (e.g. a server-side script), never a read followed
/// by a write.
#[async_trait]
pub trait WindowStore: Send + Sync {
    /// Count one request against `key` unless the window already holds `limit`.
    ///
    /// Creates the window with a `window` TTL when none is live.
    async fn increment_within_limit(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<WindowState, StoreError>;

    /// Current window for `key`, if one is live
    async fn peek(&self, key: &str) -> Result<Option<WindowSnapshot>, StoreError>;
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u32,
    expires_at: Instant,
}

impl Window {
    fn remaining(&self, now: Instant) -> Option<Duration> {
        let left = self.expires_at.saturating_duration_since(now);
        (!left.is_zero()).then_some(left)
    }
}

/// In-process window store
#[derive(Debug, Clone, Default)]
pub struct InMemoryWindowStore {
    windows: Arc<RwLock<HashMap<String, Window>>>,
}

impl InMemoryWindowStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove expired windows; returns how many were dropped
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut windows = self.windows.write().await;
        let before = windows.len();
        windows.retain(|_, w| w.remaining(now).is_some());
        before - windows.len()
    }

    /// Start a background task that purges expired windows every `every`
    pub fn spawn_purge_task(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                interval.tick().await;
                let purged = store.purge_expired().await;
                if purged > 0 {
                    tracing::debug!(purged, "Purged expired rate windows");
                }
            }
        })
    }

    /// Number of tracked windows, live or expired
    pub async fn len(&self) -> usize {
        self.windows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.windows.read().await.is_empty()
    }
}

#[async_trait]
impl WindowStore for InMemoryWindowStore {
    async fn increment_within_limit(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<WindowState, StoreError> {
        let now = Instant::now();
        let mut windows = self.windows.write().await;

        let live = windows
            .get(key)
            .and_then(|w| w.remaining(now).map(|left| (*w, left)));

        match live {
            None => {
                if limit == 0 {
                    return Ok(WindowState {
                        admitted: false,
                        count: 0,
                        reset_in: window,
                    });
                }
                windows.insert(
                    key.to_string(),
                    Window {
                        count: 1,
                        expires_at: now + window,
                    },
                );
                Ok(WindowState {
                    admitted: true,
                    count: 1,
                    reset_in: window,
                })
            }
            Some((current, left)) if current.count >= limit => Ok(WindowState {
                admitted: false,
                count: current.count,
                reset_in: left,
            }),
            Some((current, left)) => {
                let count = current.count + 1;
                windows.insert(
                    key.to_string(),
                    Window {
                        count,
                        expires_at: current.expires_at,
                    },
                );
                Ok(WindowState {
                    admitted: true,
                    count,
                    reset_in: left,
                })
            }
        }
    }

    async fn peek(&self, key: &str) -> Result<Option<WindowSnapshot>, StoreError> {
        let now = Instant::now();
        let windows = self.windows.read().await;
        Ok(windows.get(key).and_then(|w| {
            w.remaining(now).map(|reset_in| WindowSnapshot {
                count: w.count,
                reset_in,
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::future::join_all;

    const WINDOW: Duration = Duration::from_secs(60);

    #[tokio::test(start_paused = true)]
    async fn test_first_request_opens_window() {
        let store = InMemoryWindowStore::new();
        let state = store
            .increment_within_limit("ratelimit:u1", 3, WINDOW)
            .await
            .unwrap();

        assert!(state.admitted);
        assert_eq!(state.count, 1);
        assert_eq!(state.reset_in, WINDOW);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejects_at_limit_without_incrementing() {
        let store = InMemoryWindowStore::new();
        for _ in 0..3 {
            store
                .increment_within_limit("ratelimit:u1", 3, WINDOW)
                .await
                .unwrap();
        }

        tokio::time::advance(Duration::from_secs(20)).await;
        let state = store
            .increment_within_limit("ratelimit:u1", 3, WINDOW)
            .await
            .unwrap();

        assert!(!state.admitted);
        assert_eq!(state.count, 3);
        assert_eq!(state.reset_in, Duration::from_secs(40));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_expires() {
        let store = InMemoryWindowStore::new();
        for _ in 0..2 {
            store
                .increment_within_limit("ratelimit:u1", 2, WINDOW)
                .await
                .unwrap();
        }

        tokio::time::advance(WINDOW).await;
        assert!(store.peek("ratelimit:u1").await.unwrap().is_none());

        let state = store
            .increment_within_limit("ratelimit:u1", 2, WINDOW)
            .await
            .unwrap();
        assert!(state.admitted);
        assert_eq!(state.count, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_limit_never_admits() {
        let store = InMemoryWindowStore::new();
        let state = store
            .increment_within_limit("ratelimit:u1", 0, WINDOW)
            .await
            .unwrap();

        assert!(!state.admitted);
        assert!(store.is_empty().await);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_increments_stop_at_limit() {
        let store = InMemoryWindowStore::new();
        let calls = (0..50).map(|_| store.increment_within_limit("ratelimit:u1", 10, WINDOW));
        let admitted = join_all(calls)
            .await
            .into_iter()
            .filter(|s| s.as_ref().unwrap().admitted)
            .count();

        assert_eq!(admitted, 10);
        assert_eq!(store.peek("ratelimit:u1").await.unwrap().unwrap().count, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let store = InMemoryWindowStore::new();
        store
            .increment_within_limit("ratelimit:u1", 1, WINDOW)
            .await
            .unwrap();

        let other = store
            .increment_within_limit("ratelimit:u2", 1, WINDOW)
            .await
            .unwrap();
        assert!(other.admitted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_task_drops_idle_windows() {
        let store = InMemoryWindowStore::new();
        for key in ["ratelimit:u1", "ratelimit:u2", "ratelimit:u3"] {
            store.increment_within_limit(key, 5, WINDOW).await.unwrap();
        }
        let task = store.spawn_purge_task(WINDOW);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(store.len().await, 3);

        // Next tick after expiry clears them without any new traffic
        tokio::time::sleep(Duration::from_secs(95)).await;
        assert!(store.is_empty().await);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_purge_expired() {
        let store = InMemoryWindowStore::new();
        store
            .increment_within_limit("ratelimit:u1", 5, WINDOW)
            .await
            .unwrap();
        store
            .increment_within_limit("ratelimit:u2", 5, Duration::from_secs(120))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(90)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(store.purge_expired().await, 1);
        assert!(store.is_empty().await);
    }
}
