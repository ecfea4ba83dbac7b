//! Building and water obstacles near a route, from OpenStreetMap via Overpass.

use dashmap::DashMap;
use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use siren_core::spatial::{meters_to_lat, meters_to_lon};
use siren_core::{Coordinate, Obstacle, ObstacleKind};
use std::collections::HashMap;
use std::time::Duration;

use crate::config::Config;

const BUILDING_RADIUS_M: f64 = 10.0;
const WATER_RADIUS_M: f64 = 40.0;
const QUERY_PADDING_M: f64 = 100.0;

pub trait ObstacleProvider: Send + Sync {
    fn obstacles_near<'a>(&'a self, points: &'a [Coordinate]) -> BoxFuture<'a, Vec<Obstacle>>;
}

#[derive(Debug, Deserialize)]
struct OverpassResponse {
    elements: Vec<OverpassElement>,
}

#[derive(Debug, Deserialize)]
struct OverpassElement {
    lat: Option<f64>,
    lon: Option<f64>,
    center: Option<OverpassCenter>,
    tags: Option<HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct OverpassCenter {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Clone, Copy)]
struct Bounds {
    min_lat: f64,
    min_lon: f64,
    max_lat: f64,
    max_lon: f64,
}

impl Bounds {
    fn around(points: &[Coordinate], padding_m: f64) -> Option<Self> {
        let finite: Vec<&Coordinate> = points.iter().filter(|p| p.is_finite()).collect();
        let first = finite.first()?;
        let mut bounds = Self {
            min_lat: first.lat,
            min_lon: first.lon,
            max_lat: first.lat,
            max_lon: first.lon,
        };
        for p in &finite {
            bounds.min_lat = bounds.min_lat.min(p.lat);
            bounds.max_lat = bounds.max_lat.max(p.lat);
            bounds.min_lon = bounds.min_lon.min(p.lon);
            bounds.max_lon = bounds.max_lon.max(p.lon);
        }
        let mid_lat = (bounds.min_lat + bounds.max_lat) / 2.0;
        let pad_lat = meters_to_lat(padding_m, mid_lat);
        let pad_lon = meters_to_lon(padding_m, mid_lat);
        bounds.min_lat -= pad_lat;
        bounds.max_lat += pad_lat;
        bounds.min_lon -= pad_lon;
        bounds.max_lon += pad_lon;
        Some(bounds)
    }

    fn bbox(&self) -> String {
        format!(
            "{:.6},{:.6},{:.6},{:.6}",
            self.min_lat, self.min_lon, self.max_lat, self.max_lon
        )
    }
}

fn overpass_query(bounds: &Bounds, timeout_s: u64) -> String {
    let bbox = bounds.bbox();
    format!(
        "[out:json][timeout:{timeout_s}];\n(\n  way[\"building\"]({bbox});\n  relation[\"building\"]({bbox});\n  way[\"natural\"=\"water\"]({bbox});\n  relation[\"natural\"=\"water\"]({bbox});\n  way[\"waterway\"~\"river|canal\"]({bbox});\n);\nout center tags;"
    )
}

fn element_to_obstacle(element: OverpassElement) -> Option<Obstacle> {
    let position = match (element.lat, element.lon, element.center) {
        (Some(lat), Some(lon), _) => Coordinate::new(lon, lat),
        (_, _, Some(center)) => Coordinate::new(center.lon, center.lat),
        _ => return None,
    };
    let tags = element.tags.unwrap_or_default();
    let is_water = tags.get("natural").map(String::as_str) == Some("water")
        || tags.contains_key("waterway");
    let (kind, radius_m) = if is_water {
        (ObstacleKind::Water, WATER_RADIUS_M)
    } else if tags.contains_key("building") {
        (ObstacleKind::Building, BUILDING_RADIUS_M)
    } else {
        return None;
    };
    Some(Obstacle {
        kind,
        position,
        radius_m,
        label: tags.get("name").cloned(),
    })
}

pub struct OverpassObstacleProvider {
    client: Client,
    url: String,
    timeout_s: u64,
    cache: DashMap<String, Vec<Obstacle>>,
}

impl OverpassObstacleProvider {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            url: config.obstacle_overpass_url.clone(),
            timeout_s: config.obstacle_timeout_s.max(1),
            cache: DashMap::new(),
        }
    }

    async fn fetch(&self, bounds: &Bounds) -> Result<Vec<Obstacle>, String> {
        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "text/plain")
            .timeout(Duration::from_secs(self.timeout_s))
            .body(overpass_query(bounds, self.timeout_s))
            .send()
            .await
            .map_err(|err| err.to_string())?;
        if !response.status().is_success() {
            return Err(format!("Overpass HTTP {}", response.status()));
        }
        let payload: OverpassResponse = response.json().await.map_err(|err| err.to_string())?;
        Ok(payload
            .elements
            .into_iter()
            .filter_map(element_to_obstacle)
            .collect())
    }
}

impl ObstacleProvider for OverpassObstacleProvider {
    fn obstacles_near<'a>(&'a self, points: &'a [Coordinate]) -> BoxFuture<'a, Vec<Obstacle>> {
        Box::pin(async move {
            if self.url.trim().is_empty() {
                return Vec::new();
            }
            let Some(bounds) = Bounds::around(points, QUERY_PADDING_M) else {
                return Vec::new();
            };
            let key = format!("obstacles:{}", bounds.bbox());
            if let Some(cached) = self.cache.get(&key) {
                return cached.clone();
            }
            match self.fetch(&bounds).await {
                Ok(obstacles) => {
                    tracing::debug!("Overpass returned {} obstacles", obstacles.len());
                    self.cache.insert(key, obstacles.clone());
                    obstacles
                }
                Err(err) => {
                    tracing::warn!("Obstacle fetch failed, analyzing without obstacles: {}", err);
                    Vec::new()
                }
            }
        })
    }
}

pub struct NullObstacleProvider;

impl ObstacleProvider for NullObstacleProvider {
    fn obstacles_near<'a>(&'a self, _points: &'a [Coordinate]) -> BoxFuture<'a, Vec<Obstacle>> {
        Box::pin(async { Vec::new() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elements_map_to_building_and_water() {
        let payload: OverpassResponse = serde_json::from_value(serde_json::json!({
            "elements": [
                {"type": "way", "id": 1, "center": {"lat": 37.78, "lon": -122.41}, "tags": {"building": "yes", "name": "Depot"}},
                {"type": "way", "id": 2, "center": {"lat": 37.79, "lon": -122.40}, "tags": {"natural": "water"}},
                {"type": "node", "id": 3, "lat": 37.77, "lon": -122.42, "tags": {"amenity": "bench"}},
                {"type": "way", "id": 4, "tags": {"building": "yes"}}
            ]
        }))
        .unwrap();
        let obstacles: Vec<Obstacle> = payload
            .elements
            .into_iter()
            .filter_map(element_to_obstacle)
            .collect();
        assert_eq!(obstacles.len(), 2);
        assert_eq!(obstacles[0].kind, ObstacleKind::Building);
        assert_eq!(obstacles[0].label.as_deref(), Some("Depot"));
        assert_eq!(obstacles[1].kind, ObstacleKind::Water);
        assert_eq!(obstacles[1].radius_m, WATER_RADIUS_M);
    }

    #[test]
    fn bounds_are_padded_and_query_lists_bbox() {
        let bounds = Bounds::around(
            &[Coordinate::new(-122.42, 37.77), Coordinate::new(-122.40, 37.79)],
            100.0,
        )
        .unwrap();
        assert!(bounds.min_lat < 37.77 && bounds.max_lat > 37.79);
        assert!(bounds.min_lon < -122.42 && bounds.max_lon > -122.40);
        let query = overpass_query(&bounds, 10);
        assert!(query.starts_with("[out:json][timeout:10];"));
        assert!(query.contains(&bounds.bbox()));
        assert!(Bounds::around(&[], 100.0).is_none());
    }

    #[tokio::test]
    async fn disabled_provider_returns_nothing() {
        let provider = OverpassObstacleProvider::new(Client::new(), &Config::default());
        let points = [Coordinate::new(-122.42, 37.77)];
        assert!(provider.obstacles_near(&points).await.is_empty());
    }
}
