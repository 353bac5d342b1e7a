//! Client-side data layer for the Albania tourism app.
//!
//! Wraps the tourism REST API behind cache-first fetchers: a shared
//! in-memory TTL cache, paginated and whole-collection event fetchers, and
//! the municipality ranking used by the events screens.

pub mod api;
pub mod cache;
pub mod config;
pub mod fetch;
pub mod grouping;
pub mod models;
pub mod utils;

#[cfg(test)]
mod test_support;
