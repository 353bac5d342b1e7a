//! REST API client module for the tourism backend.
//!
//! This module provides the `ApiClient` for fetching events, categories,
//! municipalities, beaches and exchange rates, and the `ApiError` type that
//! every recognised remote failure is normalised into.

pub mod client;
pub mod error;

pub use client::ApiClient;
pub use error::ApiError;
