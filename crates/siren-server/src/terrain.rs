//! Terrain elevation providers.
//!
//! NaN is the "no terrain data" value; slope for such samples defaults to 0
//! in the analysis.

use dashmap::DashMap;
use futures::future::{join_all, BoxFuture};
use reqwest::Client;
use serde::Deserialize;
use siren_core::Coordinate;
use std::time::Duration;

use crate::config::Config;

pub trait ElevationProvider: Send + Sync {
    fn query_elevation(&self, coordinate: Coordinate) -> BoxFuture<'_, f64>;

    /// Elevations aligned with `coordinates`.
    fn query_elevations<'a>(&'a self, coordinates: &'a [Coordinate]) -> BoxFuture<'a, Vec<f64>> {
        Box::pin(async move {
            join_all(coordinates.iter().map(|c| self.query_elevation(*c))).await
        })
    }
}

/// Cache key with ~1 m resolution.
type PointKey = (i64, i64);

fn point_key(coordinate: &Coordinate) -> PointKey {
    (
        (coordinate.lat * 1e5).round() as i64,
        (coordinate.lon * 1e5).round() as i64,
    )
}

#[derive(Debug, Deserialize)]
struct OpenMeteoElevationResponse {
    elevation: Option<Vec<f64>>,
}

/// Open-Meteo elevation API client with a per-point process-lifetime cache.
pub struct OpenMeteoElevationProvider {
    client: Client,
    url: String,
    timeout: Duration,
    cache: DashMap<PointKey, f64>,
}

impl OpenMeteoElevationProvider {
    /// Max coordinates per request accepted by the API.
    const MAX_POINTS_PER_REQUEST: usize = 100;

    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.terrain_provider_url.clone(),
            timeout: Duration::from_secs(config.terrain_timeout_s.max(1)),
            cache: DashMap::new(),
        }
    }

    pub fn cached_points(&self) -> usize {
        self.cache.len()
    }

    async fn fetch_batch(&self, points: &[Coordinate]) -> Result<Vec<f64>, String> {
        let latitudes: Vec<f64> = points.iter().map(|p| p.lat).collect();
        let longitudes: Vec<f64> = points.iter().map(|p| p.lon).collect();
        let url = build_provider_url(&self.url, &join_params(&latitudes), &join_params(&longitudes));

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|err| err.to_string())?;
        if !response.status().is_success() {
            return Err(format!("terrain provider HTTP {}", response.status()));
        }
        let payload: OpenMeteoElevationResponse =
            response.json().await.map_err(|err| err.to_string())?;
        let elevations = payload
            .elevation
            .ok_or_else(|| "terrain provider missing elevation".to_string())?;
        if elevations.len() != points.len() {
            return Err("terrain provider returned unexpected sample count".to_string());
        }
        Ok(elevations)
    }
}

impl ElevationProvider for OpenMeteoElevationProvider {
    fn query_elevation(&self, coordinate: Coordinate) -> BoxFuture<'_, f64> {
        Box::pin(async move {
            let values = self.query_elevations(std::slice::from_ref(&coordinate)).await;
            values.first().copied().unwrap_or(f64::NAN)
        })
    }

    fn query_elevations<'a>(&'a self, coordinates: &'a [Coordinate]) -> BoxFuture<'a, Vec<f64>> {
        Box::pin(async move {
            let mut out: Vec<f64> = coordinates
                .iter()
                .map(|c| self.cache.get(&point_key(c)).map(|v| *v).unwrap_or(f64::NAN))
                .collect();
            if self.url.trim().is_empty() {
                return out;
            }

            let missing: Vec<usize> = (0..coordinates.len())
                .filter(|&i| !self.cache.contains_key(&point_key(&coordinates[i])))
                .collect();
            for chunk in missing.chunks(Self::MAX_POINTS_PER_REQUEST) {
                let points: Vec<Coordinate> = chunk.iter().map(|&i| coordinates[i]).collect();
                match self.fetch_batch(&points).await {
                    Ok(values) => {
                        for (&idx, value) in chunk.iter().zip(values) {
                            if value.is_finite() {
                                self.cache.insert(point_key(&coordinates[idx]), value);
                                out[idx] = value;
                            }
                        }
                    }
                    Err(err) => {
                        tracing::warn!(
                            "Terrain fetch failed for {} points, treating as no data: {}",
                            points.len(),
                            err
                        );
                    }
                }
            }
            out
        })
    }
}

/// Provider used when terrain lookups are disabled.
pub struct NullElevationProvider;

impl ElevationProvider for NullElevationProvider {
    fn query_elevation(&self, _coordinate: Coordinate) -> BoxFuture<'_, f64> {
        Box::pin(async { f64::NAN })
    }
}

fn join_params(values: &[f64]) -> String {
    values
        .iter()
        .map(|value| format!("{:.6}", value))
        .collect::<Vec<_>>()
        .join(",")
}

fn build_provider_url(base: &str, latitudes: &str, longitudes: &str) -> String {
    let separator = if base.contains('?') { "&" } else { "?" };
    format!("{base}{separator}latitude={latitudes}&longitude={longitudes}")
}
