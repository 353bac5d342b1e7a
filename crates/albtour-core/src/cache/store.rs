use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::clock::{Clock, SystemClock};
use super::key::cache_key;

/// TTL for general entries.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3 * 60 * 60);

/// Backstop TTL for the full-collection cache. The same-calendar-day check is
/// what actually decides validity for that entry.
pub const DAILY_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How often the background sweeper evicts expired entries.
pub const SWEEP_INTERVAL: Duration = Duration::from_secs(30 * 60);

/// Shortest period the sweeper accepts; tokio intervals reject zero.
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    pub written_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, now: DateTime<Utc>, ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        Self {
            data,
            written_at: now,
            expires_at: now.checked_add_signed(ttl).unwrap_or(DateTime::<Utc>::MAX_UTC),
        }
    }

    /// Live strictly before `expires_at`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub fn age_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.written_at).num_minutes()
    }

    pub fn age_display(&self, now: DateTime<Utc>) -> String {
        let minutes = self.age_minutes(now);
        if minutes < 1 {
            // Includes negative ages from clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            let hours = minutes / 60;
            if minutes % 60 >= 30 {
                format!("{}h ago", hours + 1)
            } else {
                format!("{}h ago", hours)
            }
        } else {
            let days = minutes / 1440;
            if (minutes % 1440) / 60 >= 12 {
                format!("{}d ago", days + 1)
            } else {
                format!("{}d ago", days)
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    /// Sorted for stable output
    pub keys: Vec<String>,
}

struct Inner {
    entries: Mutex<HashMap<String, CacheEntry<Value>>>,
    /// Keys with a fetch running. The receiver closes when it finishes.
    in_flight: Mutex<HashMap<String, watch::Receiver<()>>>,
    clock: Arc<dyn Clock>,
    default_ttl: Duration,
}

impl Inner {
    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<Value>>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn in_flight(&self) -> MutexGuard<'_, HashMap<String, watch::Receiver<()>>> {
        self.in_flight.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let mut entries = self.entries();
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        before - entries.len()
    }
}

/// Process-wide in-memory TTL cache shared by all fetchers.
///
/// Cloning is cheap and every clone sees the same entries. Values are held as
/// JSON so one store can serve every response type; callers get owned copies.
/// No lock is ever held across an `.await`.
#[derive(Clone)]
pub struct CacheStore {
    inner: Arc<Inner>,
}

impl Default for CacheStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheStore {
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock), DEFAULT_TTL)
    }

    pub fn with_clock(clock: Arc<dyn Clock>, default_ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: Mutex::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                clock,
                default_ttl,
            }),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.inner.clock.now()
    }

    pub fn default_ttl(&self) -> Duration {
        self.inner.default_ttl
    }

    /// Live data for `key`. An expired entry is evicted by the read.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get_entry(key).map(|entry| entry.data)
    }

    /// Like [`get`](Self::get) but keeps the write/expiry timestamps.
    pub fn get_entry<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let now = self.now();
        let entry = {
            let mut entries = self.inner.entries();
            let entry = entries.get(key)?;
            if entry.is_expired(now) {
                entries.remove(key);
                debug!(key = key, "Cache entry expired, evicted on read");
                return None;
            }
            entry.clone()
        };

        match serde_json::from_value::<T>(entry.data) {
            Ok(data) => Some(CacheEntry {
                data,
                written_at: entry.written_at,
                expires_at: entry.expires_at,
            }),
            Err(e) => {
                debug!(key = key, error = %e, "Cached value has unexpected shape, treating as miss");
                None
            }
        }
    }

    /// Store `data` under `key` with the default TTL.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, data: &T) {
        self.set_with_ttl(key, data, self.inner.default_ttl);
    }

    /// Store `data` under `key`, replacing any existing entry.
    pub fn set_with_ttl<T: Serialize + ?Sized>(&self, key: &str, data: &T, ttl: Duration) {
        let value = match serde_json::to_value(data) {
            Ok(value) => value,
            Err(e) => {
                warn!(key = key, error = %e, "Failed to serialize value for cache");
                return;
            }
        };
        let entry = CacheEntry::new(value, self.now(), ttl);
        debug!(key = key, expires_at = %entry.expires_at, "Cache write");
        self.inner.entries().insert(key.to_string(), entry);
    }

    pub fn delete(&self, key: &str) -> bool {
        self.inner.entries().remove(key).is_some()
    }

    /// Remove the entry derived from `(endpoint, params)`.
    pub fn clear_by_key<P: Serialize + ?Sized>(&self, endpoint: &str, params: &P) -> bool {
        self.delete(&cache_key(endpoint, params))
    }

    pub fn clear(&self) {
        self.inner.entries().clear();
    }

    /// Evict every expired entry, returning how many were removed.
    pub fn sweep_expired(&self) -> usize {
        self.inner.sweep_expired()
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.inner.entries();
        let mut keys: Vec<String> = entries.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: entries.len(),
            keys,
        }
    }

    /// Mark `key` as having a fetch in flight. Returns `None` if one already
    /// is; the returned guard clears the mark when dropped.
    pub fn try_begin_flight(&self, key: &str) -> Option<FlightGuard> {
        let mut in_flight = self.inner.in_flight();
        if in_flight.contains_key(key) {
            return None;
        }
        let (done, rx) = watch::channel(());
        in_flight.insert(key.to_string(), rx);
        Some(FlightGuard {
            inner: Arc::clone(&self.inner),
            key: key.to_string(),
            _done: done,
        })
    }

    pub fn is_in_flight(&self, key: &str) -> bool {
        self.inner.in_flight().contains_key(key)
    }

    /// Handle for waiting on the fetch in flight for `key`, or `None` if
    /// there is none.
    pub fn flight_waiter(&self, key: &str) -> Option<FlightWaiter> {
        self.inner
            .in_flight()
            .get(key)
            .map(|rx| FlightWaiter { rx: rx.clone() })
    }

    /// Spawn the periodic sweeper on the current tokio runtime.
    ///
    /// The task only holds a weak reference and exits on its own once every
    /// handle to the store is gone. Call [`SweeperHandle::shutdown`] to stop
    /// it earlier; dropping the handle aborts it.
    ///
    /// Periods shorter than one second are raised to one second.
    pub fn spawn_sweeper(&self, period: Duration) -> SweeperHandle {
        let period = period.max(MIN_SWEEP_PERIOD);
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => {
                        debug!("Cache sweeper stopping");
                        break;
                    }
                    _ = ticker.tick() => {
                        let Some(inner) = weak.upgrade() else {
                            debug!("Cache dropped, sweeper exiting");
                            break;
                        };
                        let removed = inner.sweep_expired();
                        if removed > 0 {
                            info!(removed = removed, "Swept expired cache entries");
                        }
                    }
                }
            }
        });

        SweeperHandle {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }
}

/// In-flight marker for one cache key, released on drop.
pub struct FlightGuard {
    inner: Arc<Inner>,
    key: String,
    /// Dropping the sender wakes every [`FlightWaiter`]
    _done: watch::Sender<()>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.inner.in_flight().remove(&self.key);
    }
}

/// Waits for another caller's fetch of the same key to finish.
pub struct FlightWaiter {
    rx: watch::Receiver<()>,
}

impl FlightWaiter {
    /// Resolves once the matching [`FlightGuard`] is dropped.
    pub async fn finished(mut self) {
        // Nothing is ever sent, so this only returns when the guard closes
        // the channel.
        let _ = self.rx.changed().await;
    }
}

/// Handle to the background sweeper task.
pub struct SweeperHandle {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to finish.
    pub async fn shutdown(mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Cache sweeper ended abnormally");
            }
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::ManualClock;
    use chrono::TimeZone;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 15, 9, 0, 0).unwrap()
    }

    fn store_with_clock() -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(start()));
        (CacheStore::with_clock(clock.clone(), DEFAULT_TTL), clock)
    }

    #[test]
    fn test_get_returns_live_entry() {
        let (store, _clock) = store_with_clock();
        store.set("categories", &vec!["Music", "Food"]);
        let data: Option<Vec<String>> = store.get("categories");
        assert_eq!(data, Some(vec!["Music".to_string(), "Food".to_string()]));
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (store, clock) = store_with_clock();
        store.set_with_ttl("k", &1, Duration::from_secs(60));

        clock.advance(chrono::Duration::seconds(59));
        assert_eq!(store.get::<i32>("k"), Some(1));

        clock.advance(chrono::Duration::seconds(1) + chrono::Duration::milliseconds(1));
        assert_eq!(store.get::<i32>("k"), None);
    }

    #[test]
    fn test_expired_read_evicts_entry() {
        let (store, clock) = store_with_clock();
        store.set_with_ttl("stale", &"old", Duration::from_secs(10));
        store.set("fresh", &"new");
        clock.advance(chrono::Duration::seconds(11));

        assert_eq!(store.stats().keys, vec!["fresh".to_string(), "stale".to_string()]);
        assert_eq!(store.get::<String>("stale"), None);
        assert_eq!(store.stats().keys, vec!["fresh".to_string()]);
    }

    #[test]
    fn test_set_overwrites_and_extends_expiry() {
        let (store, clock) = store_with_clock();
        store.set("k", &1);
        let first = store.get_entry::<i32>("k").expect("entry should be live");

        clock.advance(chrono::Duration::minutes(10));
        store.set("k", &1);
        let second = store.get_entry::<i32>("k").expect("entry should be live");

        assert_eq!(first.data, second.data);
        assert!(second.expires_at > first.expires_at);
        assert_eq!(second.written_at, start() + chrono::Duration::minutes(10));
    }

    #[test]
    fn test_wrong_type_is_a_miss() {
        let (store, _clock) = store_with_clock();
        store.set("k", &"not a number");
        assert_eq!(store.get::<u32>("k"), None);
        // The entry itself stays; another reader may want it as a string
        assert_eq!(store.get::<String>("k"), Some("not a number".to_string()));
    }

    #[test]
    fn test_delete_clear_and_clear_by_key() {
        let (store, _clock) = store_with_clock();
        store.set(&cache_key("beaches", &serde_json::json!({"is_public": true})), &1);
        store.set("categories", &2);
        store.set("municipalities", &3);

        assert!(store.clear_by_key("beaches", &serde_json::json!({"is_public": true})));
        assert!(store.delete("categories"));
        assert!(!store.delete("categories"));
        assert_eq!(store.stats().size, 1);

        store.clear();
        assert_eq!(store.stats(), CacheStats::default());
    }

    #[test]
    fn test_sweep_expired() {
        let (store, clock) = store_with_clock();
        store.set_with_ttl("a", &1, Duration::from_secs(60));
        store.set_with_ttl("b", &2, Duration::from_secs(120));
        store.set("c", &3);

        clock.advance(chrono::Duration::seconds(90));
        assert_eq!(store.sweep_expired(), 1);
        assert_eq!(store.sweep_expired(), 0);
        assert_eq!(store.stats().keys, vec!["b".to_string(), "c".to_string()]);
    }

    #[test]
    fn test_flight_guard_released_on_drop() {
        let (store, _clock) = store_with_clock();
        let guard = store.try_begin_flight("daily-all-events").expect("first flight");
        assert!(store.is_in_flight("daily-all-events"));
        assert!(store.try_begin_flight("daily-all-events").is_none());
        assert!(store.try_begin_flight("other").is_some());

        drop(guard);
        assert!(!store.is_in_flight("daily-all-events"));
        assert!(store.flight_waiter("daily-all-events").is_none());
        assert!(store.try_begin_flight("daily-all-events").is_some());
    }

    #[tokio::test]
    async fn test_flight_waiter_wakes_when_guard_drops() {
        let (store, _clock) = store_with_clock();
        let guard = store.try_begin_flight("daily-all-events").expect("first flight");
        let waiter = store.flight_waiter("daily-all-events").expect("flight running");

        let waiting = tokio::spawn(waiter.finished());
        tokio::task::yield_now().await;
        assert!(!waiting.is_finished());

        drop(guard);
        waiting.await.unwrap();
        assert!(!store.is_in_flight("daily-all-events"));
    }

    #[test]
    fn test_age_display() {
        let entry = CacheEntry::new(1, start(), DEFAULT_TTL);
        assert_eq!(entry.age_display(start()), "just now");
        assert_eq!(entry.age_display(start() - chrono::Duration::minutes(5)), "just now");
        assert_eq!(entry.age_display(start() + chrono::Duration::minutes(5)), "5m ago");
        assert_eq!(entry.age_display(start() + chrono::Duration::minutes(95)), "2h ago");
        assert_eq!(entry.age_display(start() + chrono::Duration::hours(30)), "1d ago");
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_evicts_without_reads() {
        let (store, clock) = store_with_clock();
        store.set_with_ttl("write-once", &1, Duration::from_secs(60));
        store.set("kept", &2);
        clock.advance(chrono::Duration::minutes(5));

        let sweeper = store.spawn_sweeper(SWEEP_INTERVAL);
        tokio::time::sleep(SWEEP_INTERVAL + Duration::from_secs(1)).await;

        assert_eq!(store.stats().keys, vec!["kept".to_string()]);
        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_zero_period_is_clamped() {
        let (store, clock) = store_with_clock();
        store.set_with_ttl("k", &1, Duration::from_secs(10));
        clock.advance(chrono::Duration::seconds(11));

        let sweeper = store.spawn_sweeper(Duration::ZERO);
        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(store.stats().size, 0);
        sweeper.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_exits_when_store_dropped() {
        let (store, _clock) = store_with_clock();
        let sweeper = store.spawn_sweeper(Duration::from_secs(1));
        drop(store);

        tokio::time::sleep(Duration::from_secs(2)).await;
        tokio::task::yield_now().await;
        assert!(sweeper.is_finished());
    }
}
