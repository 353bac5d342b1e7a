//! Generic cache-first fetch orchestrator.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Result;
use futures::future::{BoxFuture, FutureExt};
use serde::{de::DeserializeOwned, Serialize};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::api::ApiError;
use crate::cache::{cache_key, CacheStore};

use super::FetchState;

/// Message used when a failure is not a recognised [`ApiError`].
pub const GENERIC_ERROR: &str = "An error occurred";

/// Async function producing a fetcher's data from its parameters.
pub type Producer<P, T> = Arc<dyn Fn(P) -> BoxFuture<'static, Result<T>> + Send + Sync>;

/// Box an async closure into a [`Producer`].
pub fn producer<P, T, F, Fut>(f: F) -> Producer<P, T>
where
    F: Fn(P) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    Arc::new(move |params| f(params).boxed())
}

/// Monotonic request stamps. A response is only applied if its stamp is
/// still the latest one issued by the same fetcher.
#[derive(Debug, Default)]
pub(crate) struct Sequence(AtomicU64);

impl Sequence {
    pub(crate) fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_current(&self, seq: u64) -> bool {
        self.0.load(Ordering::SeqCst) == seq
    }
}

pub(crate) fn lock<P>(params: &Mutex<P>) -> MutexGuard<'_, P> {
    params.lock().unwrap_or_else(|e| e.into_inner())
}

/// Fetches `T` from parameters `P`, optionally through the shared cache.
///
/// State is published on a watch channel; read it with [`state`](Self::state)
/// or follow transitions with [`subscribe`](Self::subscribe). Nothing is
/// fetched until [`fetch`](Self::fetch) is first called.
pub struct Fetcher<P, T> {
    store: CacheStore,
    endpoint: Option<String>,
    params: Mutex<P>,
    producer: Producer<P, T>,
    fallback_error: String,
    seq: Sequence,
    state: watch::Sender<FetchState<T>>,
}

impl<P, T> Fetcher<P, T>
where
    P: Clone + PartialEq + Serialize + Send + 'static,
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    /// An uncached fetcher. Use [`cached`](Self::cached) to read and write
    /// through the store.
    pub fn new(store: CacheStore, params: P, producer: Producer<P, T>) -> Self {
        let (state, _) = watch::channel(FetchState::default());
        Self {
            store,
            endpoint: None,
            params: Mutex::new(params),
            producer,
            fallback_error: GENERIC_ERROR.to_string(),
            seq: Sequence::default(),
            state,
        }
    }

    /// Cache results under keys derived from `endpoint` and the parameters.
    pub fn cached(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_fallback_error(mut self, message: impl Into<String>) -> Self {
        self.fallback_error = message.into();
        self
    }

    pub fn state(&self) -> FetchState<T> {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<FetchState<T>> {
        self.state.subscribe()
    }

    pub fn params(&self) -> P {
        lock(&self.params).clone()
    }

    /// Cache key for the current parameters, `None` for uncached fetchers.
    pub fn cache_key(&self) -> Option<String> {
        let params = self.params();
        self.endpoint
            .as_deref()
            .map(|endpoint| cache_key(endpoint, &params))
    }

    /// Run the pipeline: cache check (unless `force`), producer, write-through.
    pub async fn fetch(&self, force: bool) {
        let params = self.params();
        let key = self.endpoint.as_deref().map(|e| cache_key(e, &params));
        let seq = self.seq.next();

        if !force {
            if let Some(data) = key.as_deref().and_then(|k| self.store.get::<T>(k)) {
                debug!(key = ?key, "Cache hit");
                self.apply(seq, FetchState::ready(data));
                return;
            }
        }

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });

        match (self.producer)(params).await {
            Ok(data) => {
                if let Some(key) = &key {
                    self.store.set(key, &data);
                }
                self.apply(seq, FetchState::ready(data));
            }
            Err(e) => {
                warn!(key = ?key, error = %e, "Fetch failed");
                let message = ApiError::user_message(&e, &self.fallback_error);
                self.apply(seq, FetchState::failed(message));
            }
        }
    }

    /// Fetch bypassing the cache read. The result is still written through.
    pub async fn refetch(&self) {
        self.fetch(true).await
    }

    /// Replace the parameters and re-run from the cache check if they
    /// changed. Returns whether a fetch was triggered.
    pub async fn set_params(&self, params: P) -> bool {
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
            self.fetch(false).await;
        }
        changed
    }

    fn apply(&self, seq: u64, next: FetchState<T>) -> bool {
        self.state.send_if_modified(|state| {
            if !self.seq.is_current(seq) {
                debug!(seq = seq, "Discarding superseded response");
                return false;
            }
            *state = next;
            true
        })
    }
}
