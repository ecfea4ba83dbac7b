//! Street data providers.
//!
//! Providers never fail outright: any upstream problem yields an empty,
//! unsuccessful [`StreetDataResponse`] and the optimizer falls back to the
//! degraded route generator.

use futures::future::BoxFuture;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use siren_core::{StreetNetwork, StreetQuery, StreetSegment};
use std::path::Path;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::sleep;

use crate::backoff::Backoff;
use crate::config::Config;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreetDataResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub streets: Vec<StreetSegment>,
}

impl StreetDataResponse {
    pub fn unavailable() -> Self {
        Self::default()
    }

    pub fn is_usable(&self) -> bool {
        self.success && !self.streets.is_empty()
    }
}

pub trait StreetDataProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn get_street_data<'a>(&'a self, query: &'a StreetQuery) -> BoxFuture<'a, StreetDataResponse>;
}

/// Wire shape tolerant of individual bad streets.
#[derive(Debug, Deserialize)]
struct RawStreetResponse {
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    streets: Vec<serde_json::Value>,
}

fn decode_streets(raw: Vec<serde_json::Value>) -> Vec<StreetSegment> {
    let total = raw.len();
    let streets: Vec<StreetSegment> = raw
        .into_iter()
        .filter_map(|value| match serde_json::from_value::<StreetSegment>(value) {
            Ok(street) => Some(street),
            Err(err) => {
                tracing::debug!("Skipping undecodable street: {}", err);
                None
            }
        })
        .collect();
    if streets.len() < total {
        tracing::warn!(
            "Dropped {} of {} streets that failed to decode",
            total - streets.len(),
            total
        );
    }
    streets
}

/// Street data fetched from an HTTP endpoint (`POST` JSON query).
pub struct HttpStreetProvider {
    client: Client,
    url: String,
    timeout: Duration,
    retries: u32,
    retry_backoff_ms: u64,
    cooldown: Mutex<Backoff>,
}

impl HttpStreetProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.street_provider_url.clone(),
            timeout: Duration::from_secs(config.street_timeout_s.max(1)),
            retries: config.street_retries,
            retry_backoff_ms: config.street_retry_backoff_ms.max(1),
            cooldown: Mutex::new(Backoff::new(
                Duration::from_secs(2),
                Duration::from_secs(60),
            )),
        }
    }

    async fn fetch(&self, query: &StreetQuery) -> Result<StreetDataResponse, String> {
        let max_attempts = self.retries.saturating_add(1);
        let mut last_err: Option<String> = None;

        for attempt in 0..max_attempts {
            let response = self
                .client
                .post(&self.url)
                .timeout(self.timeout)
                .json(query)
                .send()
                .await;

            match response {
                Ok(response) if response.status().is_success() => {
                    match response.json::<RawStreetResponse>().await {
                        Ok(raw) => {
                            let streets = decode_streets(raw.streets);
                            return Ok(StreetDataResponse {
                                success: raw.success.unwrap_or(true),
                                streets,
                            });
                        }
                        Err(err) => last_err = Some(err.to_string()),
                    }
                }
                Ok(response) => {
                    last_err = Some(format!("street provider HTTP {}", response.status()));
                }
                Err(err) => last_err = Some(err.to_string()),
            }

            if attempt + 1 < max_attempts {
                let delay_ms = self
                    .retry_backoff_ms
                    .saturating_mul(u64::from(attempt.saturating_add(1)));
                sleep(Duration::from_millis(delay_ms)).await;
            }
        }

        Err(last_err.unwrap_or_else(|| "street request failed".to_string()))
    }
}

impl StreetDataProvider for HttpStreetProvider {
    fn name(&self) -> &'static str {
        "http"
    }

    fn get_street_data<'a>(&'a self, query: &'a StreetQuery) -> BoxFuture<'a, StreetDataResponse> {
        Box::pin(async move {
            if !self.cooldown.lock().await.ready() {
                tracing::debug!("Street provider cooling down, skipping fetch");
                return StreetDataResponse::unavailable();
            }
            match self.fetch(query).await {
                Ok(response) => {
                    self.cooldown.lock().await.succeed();
                    tracing::debug!(
                        "Street provider returned {} streets (success={})",
                        response.streets.len(),
                        response.success
                    );
                    response
                }
                Err(err) => {
                    let delay = self.cooldown.lock().await.fail();
                    tracing::warn!(
                        "Street fetch failed, using fallback routing for {:?}: {}",
                        delay,
                        err
                    );
                    StreetDataResponse::unavailable()
                }
            }
        })
    }
}

/// Street data served from memory, typically loaded from a JSON file.
pub struct StaticStreetProvider {
    network: StreetNetwork,
}

impl StaticStreetProvider {
    pub fn from_segments(segments: Vec<StreetSegment>) -> Self {
        let (network, rejected) = StreetNetwork::from_segments(segments);
        for err in &rejected {
            tracing::warn!("Static street rejected: {}", err);
        }
        Self { network }
    }

    /// Load a file holding either a street array or a `{ "streets": [...] }` object.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|err| format!("read {}: {}", path.display(), err))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|err| format!("parse {}: {}", path.display(), err))?;
        let raw = match value {
            serde_json::Value::Array(items) => items,
            other => serde_json::from_value::<RawStreetResponse>(other)
                .map_err(|err| format!("parse {}: {}", path.display(), err))?
                .streets,
        };
        Ok(Self::from_segments(decode_streets(raw)))
    }

    pub fn len(&self) -> usize {
        self.network.len()
    }

    pub fn is_empty(&self) -> bool {
        self.network.is_empty()
    }
}

impl StreetDataProvider for StaticStreetProvider {
    fn name(&self) -> &'static str {
        "static"
    }

    fn get_street_data<'a>(&'a self, query: &'a StreetQuery) -> BoxFuture<'a, StreetDataResponse> {
        Box::pin(async move {
            let streets = self
                .network
                .query(&query.center(), query.radius_meters, &query.filters());
            StreetDataResponse {
                success: true,
                streets,
            }
        })
    }
}

/// Provider used when no street source is configured.
pub struct NullStreetProvider;

impl StreetDataProvider for NullStreetProvider {
    fn name(&self) -> &'static str {
        "none"
    }

    fn get_street_data<'a>(&'a self, _query: &'a StreetQuery) -> BoxFuture<'a, StreetDataResponse> {
        Box::pin(async { StreetDataResponse::unavailable() })
    }
}
