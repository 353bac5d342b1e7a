//! In-memory TTL caching.
//!
//! This module provides the `CacheStore` shared by every fetcher. Entries
//! live for a TTL (3 hours by default) and are evicted lazily on read or by
//! a periodic background sweep. Keys are derived from an endpoint name and
//! its parameters by [`cache_key`].
//!
//! Nothing is persisted; the cache does not survive a restart.

pub mod clock;
pub mod key;
pub mod store;

pub use clock::{same_local_day, Clock, ManualClock, SystemClock};
pub use key::cache_key;
pub use store::{
    CacheEntry, CacheStats, CacheStore, FlightGuard, FlightWaiter, SweeperHandle, DAILY_TTL,
    DEFAULT_TTL, SWEEP_INTERVAL,
};
