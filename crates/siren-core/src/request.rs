//! Optimization request and result payloads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, Result, RoutingError};
use crate::metrics::RouteMetrics;
use crate::models::{EmergencyPriority, Route, RouteVariant, VehicleType};
use crate::spatial::Coordinate;
use crate::terrain::TerrainAnalysis;
use crate::validator::ConstraintReport;

/// What the caller wants the route optimized for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationGoal {
    Fastest,
    Shortest,
    Safest,
    MostAccessible,
    #[default]
    Balanced,
}

impl OptimizationGoal {
    /// Structural variants searched for this goal, in generation order.
    pub fn variants(self) -> &'static [RouteVariant] {
        match self {
            Self::Fastest => &[
                RouteVariant::DirectFastest,
                RouteVariant::Highway,
                RouteVariant::Arterial,
            ],
            Self::Shortest => &[RouteVariant::DirectShortest, RouteVariant::LocalRoads],
            Self::Safest => &[RouteVariant::HazardAvoiding, RouteVariant::LowSlope],
            Self::MostAccessible => &[RouteVariant::EmergencyAccess, RouteVariant::BuildingAccess],
            Self::Balanced => &[
                RouteVariant::DirectFastest,
                RouteVariant::Highway,
                RouteVariant::Arterial,
                RouteVariant::DirectShortest,
                RouteVariant::LocalRoads,
                RouteVariant::HazardAvoiding,
                RouteVariant::LowSlope,
                RouteVariant::EmergencyAccess,
                RouteVariant::BuildingAccess,
            ],
        }
    }
}

/// Hard limits a returned route must respect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteConstraints {
    pub max_distance_m: Option<f64>,
    pub max_time_s: Option<f64>,
    pub max_slope_deg: Option<f64>,
    pub avoid_hazards: bool,
}

impl RouteConstraints {
    fn validate(&self) -> Result<()> {
        let limits = [
            ("maxDistanceM", self.max_distance_m),
            ("maxTimeS", self.max_time_s),
            ("maxSlopeDeg", self.max_slope_deg),
        ];
        for (name, limit) in limits {
            if let Some(value) = limit {
                if !value.is_finite() || value < 0.0 {
                    return Err(RoutingError::InvalidRequest(format!(
                        "{name} must be a non-negative number"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Scoring weights. Used as given, never normalized.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreferenceWeights {
    pub distance: f64,
    pub time: f64,
    pub safety: f64,
    pub accessibility: f64,
}

impl Default for PreferenceWeights {
    fn default() -> Self {
        Self {
            distance: 1.0,
            time: 1.0,
            safety: 1.0,
            accessibility: 1.0,
        }
    }
}

impl PreferenceWeights {
    pub fn validate(&self) -> Result<()> {
        let all = [
            ("distance", self.distance),
            ("time", self.time),
            ("safety", self.safety),
            ("accessibility", self.accessibility),
        ];
        match all.iter().find(|(_, w)| !w.is_finite() || *w < 0.0) {
            Some((name, weight)) => Err(RoutingError::InvalidRequest(format!(
                "weight {name} must be non-negative, got {weight}"
            ))),
            None => Ok(()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimizationRequest {
    pub origin: Option<Coordinate>,
    pub destination: Option<Coordinate>,
    pub waypoints: Vec<Coordinate>,
    pub vehicle_type: VehicleType,
    pub goal: OptimizationGoal,
    pub constraints: RouteConstraints,
    pub weights: PreferenceWeights,
    pub priority: Option<EmergencyPriority>,
}

impl OptimizationRequest {
    pub fn new(origin: Coordinate, destination: Coordinate) -> Self {
        Self {
            origin: Some(origin),
            destination: Some(destination),
            ..Self::default()
        }
    }

    /// Reject malformed input before any computation.
    pub fn validate(&self) -> Result<()> {
        let origin = self
            .origin
            .ok_or_else(|| RoutingError::MissingCoordinate("origin".to_string()))?;
        let destination = self
            .destination
            .ok_or_else(|| RoutingError::MissingCoordinate("destination".to_string()))?;
        for (name, coord) in [("origin", origin), ("destination", destination)] {
            if !coord.is_valid() {
                return Err(RoutingError::InvalidRequest(format!(
                    "{name} is not a valid [lon, lat] pair"
                )));
            }
        }
        if let Some(idx) = self.waypoints.iter().position(|w| !w.is_valid()) {
            return Err(RoutingError::InvalidRequest(format!(
                "waypoint {idx} is not a valid [lon, lat] pair"
            )));
        }
        self.constraints.validate()?;
        self.weights.validate()
    }

    /// Origin, waypoints and destination in travel order.
    pub fn stops(&self) -> Result<Vec<Coordinate>> {
        let origin = self
            .origin
            .ok_or_else(|| RoutingError::MissingCoordinate("origin".to_string()))?;
        let destination = self
            .destination
            .ok_or_else(|| RoutingError::MissingCoordinate("destination".to_string()))?;
        let mut stops = Vec::with_capacity(self.waypoints.len() + 2);
        stops.push(origin);
        stops.extend(self.waypoints.iter().copied());
        stops.push(destination);
        Ok(stops)
    }

    pub fn effective_priority(&self) -> EmergencyPriority {
        self.priority
            .unwrap_or_else(|| EmergencyPriority::default_for(self.vehicle_type))
    }

    /// Canonical cache key. Coordinates are rounded to ~0.1 m so float noise
    /// from clients does not split entries.
    pub fn cache_key(&self) -> String {
        fn round(value: f64) -> f64 {
            let rounded = (value * 1e6).round() / 1e6;
            if rounded == 0.0 {
                0.0
            } else {
                rounded
            }
        }
        fn coord(c: &Option<Coordinate>) -> Option<[f64; 2]> {
            c.map(|c| [round(c.lon), round(c.lat)])
        }

        #[derive(Serialize)]
        struct KeyParts<'a> {
            origin: Option<[f64; 2]>,
            destination: Option<[f64; 2]>,
            waypoints: Vec<[f64; 2]>,
            vehicle: &'a str,
            goal: OptimizationGoal,
            constraints: &'a RouteConstraints,
            weights: &'a PreferenceWeights,
            priority: EmergencyPriority,
        }

        let parts = KeyParts {
            origin: coord(&self.origin),
            destination: coord(&self.destination),
            waypoints: self
                .waypoints
                .iter()
                .map(|w| [round(w.lon), round(w.lat)])
                .collect(),
            vehicle: self.vehicle_type.as_str(),
            goal: self.goal,
            constraints: &self.constraints,
            weights: &self.weights,
            priority: self.effective_priority(),
        };
        serde_json::to_string(&parts).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptimizationResult {
    pub success: bool,
    /// Every surviving candidate, ranked best first.
    pub routes: Vec<Route>,
    pub best_route: Option<Route>,
    /// Up to three runners-up.
    pub alternatives: Vec<Route>,
    /// Per-candidate metrics, aligned with `routes`.
    pub metrics: Vec<RouteMetrics>,
    /// Enhanced terrain/obstacle analysis of the best route.
    pub terrain: Option<TerrainAnalysis>,
    pub optimization_time_ms: f64,
    pub constraints: ConstraintReport,
    pub recommendations: Vec<String>,
    /// Built from the fallback generator instead of street data.
    pub degraded: bool,
    pub cached: bool,
    pub error: Option<String>,
    pub error_kind: Option<ErrorKind>,
    pub generated_at: DateTime<Utc>,
}

impl OptimizationResult {
    /// Well-formed failure with zeroed metrics.
    pub fn failure(error: &RoutingError, optimization_time_ms: f64) -> Self {
        Self {
            success: false,
            routes: Vec::new(),
            best_route: None,
            alternatives: Vec::new(),
            metrics: Vec::new(),
            terrain: None,
            optimization_time_ms,
            constraints: ConstraintReport::default(),
            recommendations: Vec::new(),
            degraded: false,
            cached: false,
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
            generated_at: Utc::now(),
        }
    }
}
