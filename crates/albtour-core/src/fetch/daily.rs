//! Once-a-day walk over the whole event collection.
//!
//! The ranking screens need every event, not a page of them. The walk is
//! cached under [`DAILY_EVENTS_KEY`] and reused for the rest of the local
//! calendar day; the 24h TTL on the entry is only a backstop.

use anyhow::{Context, Result};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::ApiError;
use crate::cache::{same_local_day, CacheStore, DAILY_TTL};
use crate::grouping::{GroupedMunicipality, MunicipalityRanking};
use crate::models::{Event, EventsResponse};

use super::fetcher::{Producer, Sequence, GENERIC_ERROR};
use super::FetchState;

pub const DAILY_EVENTS_KEY: &str = "daily-all-events";

/// Upper bound on pages walked, in case the server never reports a last page.
const MAX_DAILY_PAGES: u32 = 200;

pub struct DailyEventsFetcher {
    store: CacheStore,
    /// Fetches one page by number
    producer: Producer<u32, EventsResponse>,
    seq: Sequence,
    state: watch::Sender<FetchState<MunicipalityRanking>>,
}

impl DailyEventsFetcher {
    pub fn new(store: CacheStore, producer: Producer<u32, EventsResponse>) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            store,
            producer,
            seq: Sequence::default(),
            state,
        }
    }

    pub fn state(&self) -> FetchState<MunicipalityRanking> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<MunicipalityRanking>> {
        self.state.subscribe()
    }

    /// Top municipalities from the current ranking, empty until loaded.
    pub fn featured(&self) -> Vec<GroupedMunicipality> {
        self.state
            .borrow()
            .data
            .as_ref()
            .map(|ranking| ranking.featured().to_vec())
            .unwrap_or_default()
    }

    pub fn search(&self, term: &str) -> Vec<GroupedMunicipality> {
        self.state
            .borrow()
            .data
            .as_ref()
            .map(|ranking| ranking.search(term).into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Load the ranking, from today's cache entry unless `force`.
    ///
    /// Returns whether this call walked the collection. When a walk for the
    /// same key is already running anywhere in the process, it waits for
    /// that walk and settles from what it cached instead, returning `false`.
    pub async fn fetch(&self, force: bool) -> bool {
        if !force {
            if let Some(entry) = self.store.get_entry::<Vec<Event>>(DAILY_EVENTS_KEY) {
                if same_local_day(entry.written_at, self.store.now()) {
                    debug!(events = entry.data.len(), "Daily events served from cache");
                    let seq = self.seq.next();
                    self.apply(seq, FetchState::ready(MunicipalityRanking::from_events(&entry.data)));
                    return true;
                }
                debug!(written_at = %entry.written_at, "Daily events cached on an earlier day");
            }
        }

        let Some(_flight) = self.store.try_begin_flight(DAILY_EVENTS_KEY) else {
            debug!("Daily events walk already in flight, waiting for it");
            if let Some(waiter) = self.store.flight_waiter(DAILY_EVENTS_KEY) {
                waiter.finished().await;
            }
            self.settle_from_cache();
            return false;
        };

        let seq = self.seq.next();
        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        match self.walk_all_pages().await {
            Ok(events) => {
                info!(events = events.len(), "Fetched full event collection");
                self.store.set_with_ttl(DAILY_EVENTS_KEY, &events, DAILY_TTL);
                self.apply(seq, FetchState::ready(MunicipalityRanking::from_events(&events)));
            }
            Err(e) => {
                warn!(error = %e, "Full event collection fetch failed");
                let message = ApiError::user_message(&e, GENERIC_ERROR);
                self.apply(seq, FetchState::failed(message));
            }
        }
        true
    }

    /// Take over the result of a walk run by someone else.
    ///
    /// A missing entry means that walk failed. Its error is not shared, so a
    /// fetcher still loading reports the generic message; one that already
    /// settled keeps what it shows.
    fn settle_from_cache(&self) {
        let seq = self.seq.next();
        let cached = self
            .store
            .get::<Vec<Event>>(DAILY_EVENTS_KEY)
            .map(|events| MunicipalityRanking::from_events(&events));
        self.state.send_if_modified(|state| {
            if !self.seq.is_current(seq) {
                return false;
            }
            match cached {
                Some(ranking) => *state = FetchState::ready(ranking),
                None if state.loading => *state = FetchState::failed(GENERIC_ERROR),
                None => return false,
            }
            true
        });
    }

    pub async fn refetch(&self) -> bool {
        self.fetch(true).await
    }

    /// All pages in order. Any failure abandons the pages already fetched.
    async fn walk_all_pages(&self) -> Result<Vec<Event>> {
        let mut events = Vec::new();
        let mut page = 1;
        loop {
            let response = (self.producer)(page)
                .await
                .with_context(|| format!("Failed to fetch events page {}", page))?;
            debug!(
                page = response.current_page,
                total_pages = response.total_pages,
                count = response.events.len(),
                "Fetched events page"
            );
            let has_next = response.has_next_page();
            events.extend(response.events);

            if !has_next {
                break;
            }
            if page >= MAX_DAILY_PAGES {
                warn!(pages = page, "Stopping daily walk at page limit");
                break;
            }
            page += 1;
        }
        Ok(events)
    }

    fn apply(&self, seq: u64, next: FetchState<MunicipalityRanking>) -> bool {
        self.state.send_if_modified(|state| {
            if !self.seq.is_current(seq) {
                return false;
            }
            *state = next;
            true
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{ManualClock, DEFAULT_TTL};
    use crate::fetch::producer;
    use crate::test_support::event;
    use chrono::{DateTime, Local, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use tokio::sync::Notify;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Local
            .with_ymd_and_hms(y, m, d, h, min, 0)
            .earliest()
            .expect("valid local time")
            .with_timezone(&Utc)
    }

    /// Two pages: three Tirana events then one each for Vlora and Durrës
    fn page(page: u32) -> EventsResponse {
        let events = match page {
            1 => vec![event(1, 1, "Tirana"), event(2, 2, "Vlora"), event(3, 1, "Tirana")],
            _ => vec![event(4, 3, "Durrës"), event(5, 1, "Tirana")],
        };
        EventsResponse {
            events,
            total: 5,
            per_page: 3,
            current_page: page,
            total_pages: 2,
        }
    }

    struct Remote {
        calls: Arc<AtomicUsize>,
        fail_page: Arc<Mutex<Option<u32>>>,
        gate: Option<Arc<Notify>>,
    }

    impl Remote {
        fn new() -> Self {
            Self {
                calls: Arc::new(AtomicUsize::new(0)),
                fail_page: Arc::new(Mutex::new(None)),
                gate: None,
            }
        }

        fn producer(&self) -> Producer<u32, EventsResponse> {
            let calls = self.calls.clone();
            let fail_page = self.fail_page.clone();
            let gate = self.gate.clone();
            producer(move |n: u32| {
                calls.fetch_add(1, Ordering::SeqCst);
                let fail = *fail_page.lock().unwrap() == Some(n);
                let gate = gate.clone();
                async move {
                    if let Some(gate) = gate {
                        gate.notified().await;
                    }
                    if fail {
                        return Err(ApiError::Network("connection reset".to_string()).into());
                    }
                    Ok(page(n))
                }
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    fn store_at(now: DateTime<Utc>) -> (CacheStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(now));
        (CacheStore::with_clock(clock.clone(), DEFAULT_TTL), clock)
    }

    #[tokio::test]
    async fn test_walks_all_pages_and_ranks() {
        let (store, _) = store_at(local(2026, 10, 14, 12, 0));
        let remote = Remote::new();
        let fetcher = DailyEventsFetcher::new(store.clone(), remote.producer());

        assert!(fetcher.fetch(false).await);

        let state = fetcher.state();
        let ranking = state.data.expect("ranking loaded");
        assert_eq!(ranking.total_events(), 5);
        assert_eq!(ranking.groups()[0].municipality_name, "Tirana");
        assert_eq!(ranking.groups()[0].total_count, 3);
        assert_eq!(remote.calls(), 2);

        let cached = store.get::<Vec<Event>>(DAILY_EVENTS_KEY).unwrap();
        assert_eq!(cached.len(), 5);
        assert_eq!(fetcher.featured().len(), 3);
        assert_eq!(fetcher.search("vlo").len(), 1);
    }

    #[tokio::test]
    async fn test_same_day_cache_hit() {
        let (store, clock) = store_at(local(2026, 10, 14, 8, 0));
        let remote = Remote::new();
        let fetcher = DailyEventsFetcher::new(store.clone(), remote.producer());
        fetcher.fetch(false).await;

        clock.set(local(2026, 10, 14, 21, 30));
        let later = DailyEventsFetcher::new(store, remote.producer());
        assert!(later.fetch(false).await);

        assert_eq!(remote.calls(), 2);
        assert_eq!(later.state().data.map(|r| r.total_events()), Some(5));
    }

    #[tokio::test]
    async fn test_entry_from_yesterday_forces_walk() {
        let (store, clock) = store_at(local(2026, 10, 14, 23, 50));
        let remote = Remote::new();
        let fetcher = DailyEventsFetcher::new(store.clone(), remote.producer());
        fetcher.fetch(false).await;

        // Twenty minutes later the TTL is far from up but the date changed
        clock.set(local(2026, 10, 15, 0, 10));
        assert!(store.get::<Vec<Event>>(DAILY_EVENTS_KEY).is_some());
        fetcher.fetch(false).await;
        assert_eq!(remote.calls(), 4);

        let entry = store.get_entry::<Vec<Event>>(DAILY_EVENTS_KEY).unwrap();
        assert_eq!(entry.written_at, local(2026, 10, 15, 0, 10));
    }

    #[tokio::test]
    async fn test_page_failure_discards_partial_results() {
        let (store, _) = store_at(local(2026, 10, 14, 12, 0));
        let remote = Remote::new();
        *remote.fail_page.lock().unwrap() = Some(2);
        let fetcher = DailyEventsFetcher::new(store.clone(), remote.producer());

        fetcher.fetch(false).await;

        let state = fetcher.state();
        assert!(state.data.is_none());
        assert!(!state.loading);
        assert_eq!(state.error.as_deref(), Some("Network error: connection reset"));
        assert!(store.get::<Vec<Event>>(DAILY_EVENTS_KEY).is_none());
        assert!(!store.is_in_flight(DAILY_EVENTS_KEY));
    }

    /// Yield enough for spawned tasks to reach their first await
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_refetch_during_walk_does_not_walk_twice() {
        let (store, _) = store_at(local(2026, 10, 14, 12, 0));
        let gate = Arc::new(Notify::new());
        let remote = Remote {
            gate: Some(gate.clone()),
            ..Remote::new()
        };
        let fetcher = Arc::new(DailyEventsFetcher::new(store.clone(), remote.producer()));

        let walk = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.fetch(false).await })
        };
        while !store.is_in_flight(DAILY_EVENTS_KEY) {
            tokio::task::yield_now().await;
        }
        let again = {
            let fetcher = fetcher.clone();
            tokio::spawn(async move { fetcher.refetch().await })
        };
        settle().await;
        assert_eq!(remote.calls(), 1);

        gate.notify_one();
        // Page 2 waits on the gate as well
        while remote.calls() < 2 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        assert!(walk.await.unwrap());
        assert!(!again.await.unwrap());
        assert_eq!(remote.calls(), 2);
        assert!(!store.is_in_flight(DAILY_EVENTS_KEY));
        assert_eq!(fetcher.state().data.map(|r| r.total_events()), Some(5));
    }

    #[tokio::test]
    async fn test_second_fetcher_takes_result_of_running_walk() {
        let (store, _) = store_at(local(2026, 10, 14, 12, 0));
        let gate = Arc::new(Notify::new());
        let remote = Remote {
            gate: Some(gate.clone()),
            ..Remote::new()
        };
        let first = Arc::new(DailyEventsFetcher::new(store.clone(), remote.producer()));
        let second = Arc::new(DailyEventsFetcher::new(store.clone(), remote.producer()));

        let walk = {
            let first = first.clone();
            tokio::spawn(async move { first.fetch(false).await })
        };
        while !store.is_in_flight(DAILY_EVENTS_KEY) {
            tokio::task::yield_now().await;
        }
        let waiting = {
            let second = second.clone();
            tokio::spawn(async move { second.fetch(false).await })
        };
        settle().await;
        assert!(second.state().loading);

        gate.notify_one();
        while remote.calls() < 2 {
            tokio::task::yield_now().await;
        }
        gate.notify_one();

        assert!(walk.await.unwrap());
        assert!(!waiting.await.unwrap());
        assert_eq!(remote.calls(), 2);

        let state = second.state();
        assert!(!state.loading);
        assert!(state.error.is_none());
        assert_eq!(state.data.map(|r| r.total_events()), Some(5));
    }

    #[tokio::test]
    async fn test_second_fetcher_settles_when_running_walk_fails() {
        let (store, _) = store_at(local(2026, 10, 14, 12, 0));
        let gate = Arc::new(Notify::new());
        let remote = Remote {
            gate: Some(gate.clone()),
            ..Remote::new()
        };
        *remote.fail_page.lock().unwrap() = Some(1);
        let first = Arc::new(DailyEventsFetcher::new(store.clone(), remote.producer()));
        let second = Arc::new(DailyEventsFetcher::new(store.clone(), remote.producer()));

        let walk = {
            let first = first.clone();
            tokio::spawn(async move { first.fetch(false).await })
        };
        while !store.is_in_flight(DAILY_EVENTS_KEY) {
            tokio::task::yield_now().await;
        }
        let waiting = {
            let second = second.clone();
            tokio::spawn(async move { second.fetch(false).await })
        };
        settle().await;

        gate.notify_one();
        walk.await.unwrap();
        waiting.await.unwrap();

        assert_eq!(
            first.state().error.as_deref(),
            Some("Network error: connection reset")
        );
        let state = second.state();
        assert!(!state.loading);
        assert!(state.data.is_none());
        assert_eq!(state.error.as_deref(), Some(GENERIC_ERROR));
        assert_eq!(remote.calls(), 1);
    }
}
