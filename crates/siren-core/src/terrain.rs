//! Enhanced terrain and obstacle analysis along a route.
//!
//! Elevation and obstacle data are fetched by the caller; this module only
//! samples the route and turns the data into slope, clearance, coverage and
//! a composite safety score.

use serde::{Deserialize, Serialize};

use crate::models::{HazardZone, Route};
use crate::spatial::{sample_polyline, Coordinate};
use crate::street_index::StreetNetwork;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub samples: usize,
    /// Minimum distance from an obstacle's edge for a sample to count as clear.
    pub obstacle_clearance_m: f64,
    /// A sample within this distance of a street counts as on-road.
    pub road_tolerance_m: f64,
    pub max_average_slope_deg: f64,
    pub min_obstacle_avoidance_pct: f64,
    pub min_road_coverage_pct: f64,
    pub min_safety_score: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            samples: 16,
            obstacle_clearance_m: 25.0,
            road_tolerance_m: 30.0,
            max_average_slope_deg: 15.0,
            min_obstacle_avoidance_pct: 80.0,
            min_road_coverage_pct: 70.0,
            min_safety_score: 70.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObstacleKind {
    Building,
    Hazard,
    Water,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Obstacle {
    pub kind: ObstacleKind,
    pub position: Coordinate,
    pub radius_m: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

impl Obstacle {
    /// Active hazard zones count as obstacles of their effective radius.
    pub fn from_zone(zone: &HazardZone) -> Option<Self> {
        if !zone.active {
            return None;
        }
        Some(Self {
            kind: ObstacleKind::Hazard,
            position: zone.center()?,
            radius_m: zone.effective_radius_m(),
            label: Some(zone.name.clone()),
        })
    }

    fn clearance_from(&self, point: &Coordinate) -> f64 {
        self.position.distance_to(point) - self.radius_m.max(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainSample {
    pub coordinate: Coordinate,
    /// `None` when the provider had no data for this point.
    pub elevation_m: Option<f64>,
    /// Grade of the stretch leading to this sample; 0 when elevation is missing.
    pub slope_deg: f64,
    pub on_road: bool,
    pub nearest_obstacle_m: Option<f64>,
    pub clear: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerrainAnalysis {
    pub route_id: String,
    pub samples: Vec<TerrainSample>,
    pub terrain_data_available: bool,
    pub average_slope_deg: f64,
    pub max_slope_deg: f64,
    pub obstacle_avoidance_pct: f64,
    pub road_coverage_pct: f64,
    pub safety_score: f64,
    pub warnings: Vec<String>,
}

/// Evenly spaced sample points along the route geometry.
pub fn sample_points(route: &Route, config: &AnalysisConfig) -> Vec<Coordinate> {
    sample_polyline(&route.geometry(), config.samples)
}

fn sample_slopes(points: &[Coordinate], elevations: &[Option<f64>]) -> Vec<f64> {
    let mut slopes = vec![0.0; points.len()];
    for i in 1..points.len() {
        let (Some(a), Some(b)) = (elevations[i - 1], elevations[i]) else {
            continue;
        };
        let run = points[i - 1].distance_to(&points[i]);
        if run > f64::EPSILON {
            slopes[i] = ((b - a).abs() / run).atan().to_degrees();
        }
    }
    slopes
}

/// Analyze pre-fetched terrain and obstacle data for the given samples.
///
/// `elevations` aligns with `points`; NaN entries mean "no terrain data".
pub fn analyze(
    route_id: &str,
    points: &[Coordinate],
    elevations: &[f64],
    obstacles: &[Obstacle],
    network: &StreetNetwork,
    config: &AnalysisConfig,
) -> TerrainAnalysis {
    let mut analysis = TerrainAnalysis {
        route_id: route_id.to_string(),
        ..TerrainAnalysis::default()
    };
    if points.is_empty() {
        analysis.warnings.push("route has no geometry to analyze".to_string());
        return analysis;
    }

    let elevations: Vec<Option<f64>> = (0..points.len())
        .map(|i| elevations.get(i).copied().filter(|e| e.is_finite()))
        .collect();
    let slopes = sample_slopes(points, &elevations);

    analysis.samples = points
        .iter()
        .enumerate()
        .map(|(i, point)| {
            let nearest = obstacles
                .iter()
                .map(|o| o.clearance_from(point))
                .fold(None, |best: Option<f64>, d| Some(best.map_or(d, |b| b.min(d))));
            TerrainSample {
                coordinate: *point,
                elevation_m: elevations[i],
                slope_deg: slopes[i],
                on_road: network.distance_to_network_m(point) <= config.road_tolerance_m,
                nearest_obstacle_m: nearest,
                clear: nearest.map_or(true, |d| d > config.obstacle_clearance_m),
            }
        })
        .collect();

    let n = analysis.samples.len() as f64;
    analysis.terrain_data_available = elevations.iter().any(Option::is_some);
    analysis.average_slope_deg = slopes.iter().sum::<f64>() / n;
    analysis.max_slope_deg = slopes.iter().copied().fold(0.0, f64::max);
    analysis.obstacle_avoidance_pct =
        100.0 * analysis.samples.iter().filter(|s| s.clear).count() as f64 / n;
    analysis.road_coverage_pct =
        100.0 * analysis.samples.iter().filter(|s| s.on_road).count() as f64 / n;

    let slope_score = 100.0 * (1.0 - (analysis.average_slope_deg / 30.0).min(1.0));
    analysis.safety_score = (0.4 * analysis.obstacle_avoidance_pct
        + 0.3 * analysis.road_coverage_pct
        + 0.3 * slope_score)
        .clamp(0.0, 100.0);

    if analysis.average_slope_deg > config.max_average_slope_deg {
        analysis.warnings.push(format!(
            "average slope {:.1} deg exceeds {:.0} deg",
            analysis.average_slope_deg, config.max_average_slope_deg
        ));
    }
    if analysis.obstacle_avoidance_pct < config.min_obstacle_avoidance_pct {
        analysis.warnings.push(format!(
            "obstacle avoidance {:.0}% is below {:.0}%",
            analysis.obstacle_avoidance_pct, config.min_obstacle_avoidance_pct
        ));
    }
    if analysis.road_coverage_pct < config.min_road_coverage_pct {
        analysis.warnings.push(format!(
            "road coverage {:.0}% is below {:.0}%",
            analysis.road_coverage_pct, config.min_road_coverage_pct
        ));
    }
    if analysis.safety_score < config.min_safety_score {
        analysis.warnings.push(format!(
            "safety score {:.0} is below {:.0}",
            analysis.safety_score, config.min_safety_score
        ));
    }
    analysis
}
