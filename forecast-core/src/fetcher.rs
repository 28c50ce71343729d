//! Network adapter: retrieves a weather document for a city from
//! WeatherAPI.com.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::fmt::Debug;
use thiserror::Error;

use crate::model::WeatherDocument;

/// Forecast horizon requested from the API, in days.
pub const FORECAST_DAYS: u8 = 5;

const DEFAULT_BASE_URL: &str = "https://api.weatherapi.com";

/// Why a fetch failed. The `Display` output of a variant is what callers
/// surface to users, so messages stay human-readable.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Weather API request failed with status {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("Failed to parse weather API response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

/// A source of weather documents. One attempt per call, no internal retry;
/// failures come back as a [`FetchError`] for the caller to surface.
#[async_trait]
pub trait WeatherFetcher: Send + Sync + Debug {
    async fn fetch(&self, city: &str) -> Result<WeatherDocument, FetchError>;
}

/// Fetcher backed by WeatherAPI.com's `forecast.json` endpoint.
#[derive(Debug, Clone)]
pub struct WeatherApiFetcher {
    api_key: String,
    base_url: String,
    http: Client,
}

impl WeatherApiFetcher {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, DEFAULT_BASE_URL.to_string())
    }

    /// Point the fetcher at a different host. Used by tests to run against
    /// a local mock server.
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self { api_key, base_url, http: Client::new() }
    }
}

#[async_trait]
impl WeatherFetcher for WeatherApiFetcher {
    async fn fetch(&self, city: &str) -> Result<WeatherDocument, FetchError> {
        let url = format!("{}/v1/forecast.json", self.base_url);

        let res = self
            .http
            .get(&url)
            .query(&[
                ("key", self.api_key.as_str()),
                ("q", city),
                ("days", &FORECAST_DAYS.to_string()),
            ])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(FetchError::Status { status, body: truncate_body(&body) });
        }

        let document: WeatherDocument = serde_json::from_str(&body)?;
        Ok(document)
    }
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.len() > MAX { format!("{}...", &body[..MAX]) } else { body.to_string() }
}
