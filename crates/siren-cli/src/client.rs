//! Blocking HTTP client for the optimization endpoint.

use anyhow::{bail, Context, Result};
use reqwest::blocking::Client;
use serde::Deserialize;
use siren_core::{Coordinate, OptimizationGoal, OptimizationRequest, OptimizationResult, VehicleType};
use std::time::Duration;

/// Error payload of non-optimization endpoints.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

pub struct PlanClient {
    client: Client,
    base_url: String,
}

impl PlanClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("build HTTP client")?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// POST the request. Failed optimizations still return their result body.
    pub fn optimize(&self, request: &OptimizationRequest) -> Result<OptimizationResult> {
        let url = format!("{}/v1/routes/optimize", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .with_context(|| format!("POST {url}"))?;
        let status = response.status();
        let text = response.text().context("read response body")?;

        if let Ok(result) = serde_json::from_str::<OptimizationResult>(&text) {
            return Ok(result);
        }
        match serde_json::from_str::<ErrorBody>(&text) {
            Ok(body) => bail!("server returned {status}: {}", body.error),
            Err(_) => bail!("server returned {status}: {text}"),
        }
    }
}

/// Parse `lon,lat`.
pub fn parse_coordinate(value: &str) -> Result<Coordinate, String> {
    let (lon, lat) = value
        .split_once(',')
        .ok_or_else(|| format!("expected lon,lat but got '{value}'"))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return Err(format!("coordinate out of range: {lon},{lat}"));
    }
    Ok(Coordinate::new(lon, lat))
}

fn parse_snake_case<T: serde::de::DeserializeOwned>(value: &str, what: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(value.trim().to_lowercase()))
        .map_err(|_| format!("unknown {what} '{value}'"))
}

pub fn parse_vehicle(value: &str) -> Result<VehicleType, String> {
    parse_snake_case(value, "vehicle type")
}

pub fn parse_goal(value: &str) -> Result<OptimizationGoal, String> {
    parse_snake_case(value, "optimization goal")
}
