//! Polymarket REST client shared by the metadata and trade adapters.
//!
//! - **Gamma API** (`gamma-api.polymarket.com`): market metadata
//! - **Data API** (`data-api.polymarket.com`): wallet trade history

use std::time::Duration;

use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::dto::response::{DataApiTrade, GammaMarket};
use super::settings::PolymarketConfig;
use crate::error::Result;

/// Response of a GET that may legitimately be absent.
#[derive(Debug)]
pub enum Fetched<T> {
    Body(T),
    NotFound,
}

/// HTTP client for the Polymarket REST APIs.
#[derive(Clone)]
pub struct PolymarketClient {
    http: HttpClient,
    gamma_url: String,
    data_url: String,
    retry_max_attempts: u32,
    retry_backoff_ms: u64,
}

impl PolymarketClient {
    #[must_use]
    pub fn from_config(config: &PolymarketConfig) -> Self {
        let http = HttpClient::builder()
            .timeout(Duration::from_millis(config.http.timeout_ms))
            .connect_timeout(Duration::from_millis(config.http.connect_timeout_ms))
            .build()
            .unwrap_or_else(|err| {
                warn!(error = %err, "Failed to build HTTP client, using defaults");
                HttpClient::new()
            });

        Self {
            http,
            gamma_url: config.gamma_api_url.trim_end_matches('/').to_string(),
            data_url: config.data_api_url.trim_end_matches('/').to_string(),
            retry_max_attempts: config.http.retry_max_attempts,
            retry_backoff_ms: config.http.retry_backoff_ms,
        }
    }

    async fn get_with_retry<T>(&self, url: &str) -> Result<Fetched<T>>
    where
        T: DeserializeOwned,
    {
        let mut attempt = 0;
        let max_attempts = self.retry_max_attempts.max(1);

        loop {
            attempt += 1;
            let response = match self.http.get(url).send().await {
                Ok(response) => response,
                Err(err) => {
                    if attempt >= max_attempts || !Self::should_retry(&err) {
                        return Err(err.into());
                    }
                    self.backoff(attempt, max_attempts, &err).await;
                    continue;
                }
            };

            if response.status() == StatusCode::NOT_FOUND {
                return Ok(Fetched::NotFound);
            }
            let response = response.error_for_status()?;

            match response.json::<T>().await {
                Ok(parsed) => return Ok(Fetched::Body(parsed)),
                Err(err) => {
                    if attempt >= max_attempts || !Self::should_retry(&err) {
                        return Err(err.into());
                    }
                    self.backoff(attempt, max_attempts, &err).await;
                }
            }
        }
    }

    fn should_retry(err: &reqwest::Error) -> bool {
        err.is_timeout() || err.is_connect()
    }

    async fn backoff(&self, attempt: u32, max_attempts: u32, err: &reqwest::Error) {
        warn!(
            attempt,
            max_attempts,
            error = %err,
            "HTTP request failed, retrying"
        );
        if self.retry_backoff_ms > 0 {
            sleep(Duration::from_millis(self.retry_backoff_ms)).await;
        }
    }

    /// Gamma markets listing the given CLOB token.
    pub async fn markets_for_token(&self, token_id: &str) -> Result<Fetched<Vec<GammaMarket>>> {
        let url = format!("{}/markets?clob_token_ids={}", self.gamma_url, token_id);
        debug!(url = %url, "Fetching market metadata (Gamma)");
        self.get_with_retry(&url).await
    }

    /// Most recent trades for a wallet from the Data API.
    pub async fn trades_for_user(&self, wallet: &str, limit: usize) -> Result<Vec<DataApiTrade>> {
        let url = format!("{}/trades?user={}&limit={}", self.data_url, wallet, limit);
        debug!(url = %url, "Fetching wallet trades (Data API)");
        match self.get_with_retry(&url).await? {
            Fetched::Body(trades) => Ok(trades),
            Fetched::NotFound => Ok(Vec::new()),
        }
    }
}
