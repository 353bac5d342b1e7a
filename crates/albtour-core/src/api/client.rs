//! API client for the tourism REST API.
//!
//! All endpoints are plain `GET`s with query-string parameters. Non-2xx
//! responses and transport failures surface as [`ApiError`]; anything else
//! (e.g. an unparseable body) is an ordinary `anyhow` error.

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{
    Beach, BeachesQuery, Category, DetailedBeach, Event, EventsQuery, EventsResponse,
    ExchangeRates, FilteredEventsQuery, Municipality,
};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Maximum number of retries for rate-limited (429) requests.
const MAX_RATE_LIMIT_RETRIES: u32 = 3;

/// Initial backoff delay in milliseconds for rate limiting.
const INITIAL_BACKOFF_MS: u64 = 1000;

/// API client for the tourism backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    exchange_rates_url: String,
}

impl ApiClient {
    /// Create a new API client from configuration
    pub fn new(config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            exchange_rates_url: config.exchange_rates_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Check if response is successful, returning an error with body if not.
    /// Returns Ok(Some(response)) for success, Ok(None) for rate limit (should retry),
    /// or Err for other errors.
    async fn check_response_for_retry(
        response: reqwest::Response,
    ) -> Result<Option<reqwest::Response>, ApiError> {
        if response.status().is_success() {
            Ok(Some(response))
        } else if response.status().as_u16() == 429 {
            Ok(None)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn get<T, Q>(&self, url: &str, query: Option<&Q>) -> Result<T>
    where
        T: DeserializeOwned,
        Q: Serialize + ?Sized,
    {
        let mut retries = 0;
        let mut backoff_ms = INITIAL_BACKOFF_MS;

        loop {
            let mut request = self
                .client
                .get(url)
                .header(header::ACCEPT, "application/json");
            if let Some(query) = query {
                request = request.query(query);
            }

            let response = request.send().await.map_err(|e| ApiError::transport(&e))?;

            match Self::check_response_for_retry(response).await? {
                Some(response) => {
                    let body = response.text().await.map_err(|e| ApiError::transport(&e))?;
                    debug!(url = url, bytes = body.len(), "Response received");
                    return serde_json::from_str(&body)
                        .with_context(|| format!("Failed to parse JSON response from {}", url));
                }
                None => {
                    retries += 1;
                    if retries > MAX_RATE_LIMIT_RETRIES {
                        return Err(ApiError::RateLimited.into());
                    }
                    warn!(url = url, retry = retries, backoff_ms = backoff_ms, "Rate limited, backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms *= 2;
                }
            }
        }
    }

    // ===== Events =====

    /// Fetch one page of events
    pub async fn fetch_events(&self, query: &EventsQuery) -> Result<EventsResponse> {
        self.get(&self.url("events"), Some(query)).await
    }

    /// Fetch the unpaginated filter endpoint
    pub async fn fetch_filtered_events(&self, query: &FilteredEventsQuery) -> Result<Vec<Event>> {
        self.get(&self.url("events/filter_events"), Some(query)).await
    }

    pub async fn fetch_event(&self, id: i64) -> Result<Event> {
        self.get::<_, ()>(&self.url(&format!("events/{}", id)), None).await
    }

    // ===== Categories =====

    pub async fn fetch_categories(&self) -> Result<Vec<Category>> {
        self.get::<_, ()>(&self.url("categories"), None).await
    }

    pub async fn fetch_category(&self, id: i64) -> Result<Category> {
        self.get::<_, ()>(&self.url(&format!("categories/{}", id)), None).await
    }

    // ===== Municipalities =====

    pub async fn fetch_municipalities(&self) -> Result<Vec<Municipality>> {
        self.get::<_, ()>(&self.url("municipalities"), None).await
    }

    pub async fn fetch_municipality(&self, id: i64) -> Result<Municipality> {
        self.get::<_, ()>(&self.url(&format!("municipalities/{}", id)), None).await
    }

    // ===== Beaches =====

    pub async fn fetch_beaches(&self, query: &BeachesQuery) -> Result<Vec<Beach>> {
        self.get(&self.url("beaches"), Some(query)).await
    }

    /// Fetch a single beach including its nearby places
    pub async fn fetch_beach(&self, id: i64) -> Result<DetailedBeach> {
        self.get::<_, ()>(&self.url(&format!("beaches/{}", id)), None).await
    }

    // ===== Exchange rates =====

    pub async fn fetch_exchange_rates(&self) -> Result<ExchangeRates> {
        self.get::<_, ()>(&self.exchange_rates_url, None).await
    }
}
