//! Paginated event listing with load-more.
//!
//! Only the first page goes through the cache. Further pages are fetched on
//! demand and appended; a failed append leaves the pages already loaded in
//! place.

use std::sync::Mutex;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::cache::{cache_key, CacheStore};
use crate::models::{Event, EventsQuery, EventsResponse};

use super::fetcher::{lock, Producer, Sequence};
use super::PaginatedFetchState;

pub const EVENTS_ENDPOINT: &str = "events";

const EVENTS_ERROR: &str = "Failed to fetch events";

pub struct EventPager {
    store: CacheStore,
    /// Filters only; the page is chosen per request
    params: Mutex<EventsQuery>,
    producer: Producer<EventsQuery, EventsResponse>,
    seq: Sequence,
    state: watch::Sender<PaginatedFetchState<Event>>,
}

impl EventPager {
    pub fn new(
        store: CacheStore,
        params: EventsQuery,
        producer: Producer<EventsQuery, EventsResponse>,
    ) -> Self {
        let (state, _) = watch::channel(PaginatedFetchState::default());
        Self {
            store,
            params: Mutex::new(EventsQuery { page: None, ..params }),
            producer,
            seq: Sequence::default(),
            state,
        }
    }

    pub fn state(&self) -> PaginatedFetchState<Event> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PaginatedFetchState<Event>> {
        self.state.subscribe()
    }

    pub fn params(&self) -> EventsQuery {
        lock(&self.params).clone()
    }

    pub fn has_next_page(&self) -> bool {
        self.state.borrow().has_next_page
    }

    /// Load page 1, replacing whatever was accumulated.
    pub async fn fetch(&self, force: bool) {
        let query = self.params().with_page(1);
        let key = cache_key(EVENTS_ENDPOINT, &query);
        let seq = self.seq.next();

        if !force {
            if let Some(response) = self.store.get::<EventsResponse>(&key) {
                debug!(key = %key, "Cache hit");
                self.apply(seq, |state| *state = PaginatedFetchState::from_response(response));
                return;
            }
        }

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        match (self.producer)(query).await {
            Ok(response) => {
                self.store.set(&key, &response);
                self.apply(seq, |state| *state = PaginatedFetchState::from_response(response));
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to fetch first page");
                let message = ApiError::user_message(&e, EVENTS_ERROR);
                // Whatever was showing before stays visible under the error
                self.apply(seq, |state| {
                    state.loading = false;
                    state.error = Some(message);
                });
            }
        }
    }

    /// Fetch and append the next page. Returns whether a page was appended.
    ///
    /// A no-op unless there is a next page and nothing is loading. The check
    /// and the claim on `loading` are one state update, so concurrent
    /// callers cannot both proceed.
    pub async fn load_more(&self) -> bool {
        let mut next_page = None;
        self.state.send_if_modified(|state| {
            if state.loading || !state.has_next_page {
                return false;
            }
            state.loading = true;
            state.error = None;
            next_page = Some(state.current_page + 1);
            true
        });
        let Some(page) = next_page else {
            debug!("Load more ignored: loading or no further pages");
            return false;
        };

        let seq = self.seq.next();
        let query = self.params().with_page(page);
        debug!(page = page, "Loading more events");

        match (self.producer)(query).await {
            Ok(response) => self.apply(seq, |state| state.append(response)),
            Err(e) => {
                warn!(page = page, error = %e, "Failed to load more events");
                let message = ApiError::user_message(&e, EVENTS_ERROR);
                self.apply(seq, |state| {
                    state.loading = false;
                    state.error = Some(message);
                });
                false
            }
        }
    }

    /// Keep loading until `pages` pages are in, the last page is reached,
    /// or a load fails.
    pub async fn load_pages(&self, pages: u32) {
        while self.state.borrow().current_page < pages {
            if !self.load_more().await {
                break;
            }
        }
    }

    /// Fresh page 1, bypassing the cache read.
    pub async fn refetch(&self) {
        self.fetch(true).await
    }

    /// Change the filters and start over from page 1 if they differ.
    ///
    /// Pages loaded under the old filters are dropped first, so a failed
    /// first page cannot leave them behind for `load_more` to extend.
    pub async fn set_params(&self, params: EventsQuery) -> bool {
        let params = EventsQuery { page: None, ..params };
        let changed = {
            let mut current = lock(&self.params);
            if *current == params {
                false
            } else {
                *current = params;
                true
            }
        };
        if changed {
            // Anything still in flight belongs to the old filters
            self.seq.next();
            self.state.send_replace(PaginatedFetchState::default());
            self.fetch(false).await;
        }
        changed
    }

    fn apply(&self, seq: u64, update: impl FnOnce(&mut PaginatedFetchState<Event>)) -> bool {
        self.state.send_if_modified(|state| {
            if !self.seq.is_current(seq) {
                debug!(seq = seq, "Discarding superseded page");
                return false;
            }
            update(state);
            true
        })
    }
}
