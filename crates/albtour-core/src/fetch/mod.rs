//! Fetch orchestration.
//!
//! Each fetcher owns a `{ data, loading, error }` state published on a watch
//! channel and runs the same pipeline: check the shared cache, call its
//! producer, write the result through. Failures never escape; they land in
//! the state's `error` field.
//!
//! - [`Fetcher`]: generic single-value fetcher with parameter diffing
//! - [`EventPager`]: paginated events with load-more
//! - [`DailyEventsFetcher`]: whole collection, once per calendar day, ranked
//! - [`Catalog`]: the above bound to an [`ApiClient`](crate::api::ApiClient)

pub mod catalog;
pub mod daily;
pub mod fetcher;
pub mod paginated;
pub mod state;

pub use catalog::Catalog;
pub use daily::{DailyEventsFetcher, DAILY_EVENTS_KEY};
pub use fetcher::{producer, Fetcher, Producer, GENERIC_ERROR};
pub use paginated::{EventPager, EVENTS_ENDPOINT};
pub use state::{FetchState, PaginatedFetchState};
