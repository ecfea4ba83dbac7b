//! Core data models for street segments, routes, hazards and traffic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, RoutingError};
use crate::spatial::{
    distance_to_polyline_m, point_in_polygon, polyline_center, polyline_length_m, Coordinate,
};

pub type SegmentId = String;

// ========== STREET NETWORK ==========

/// Surface/maintenance state reported by the street provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoadCondition {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
    Closed,
}

/// Functional road class used in route output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadType {
    Highway,
    Arterial,
    Collector,
    #[default]
    Local,
    Service,
}

impl RoadType {
    /// Map an OSM-style `highway` class onto a road type.
    pub fn from_class(class: &str) -> Self {
        match class {
            "motorway" | "motorway_link" | "trunk" | "trunk_link" => Self::Highway,
            "primary" | "primary_link" | "secondary" | "secondary_link" => Self::Arterial,
            "tertiary" | "tertiary_link" => Self::Collector,
            "service" | "track" => Self::Service,
            _ => Self::Local,
        }
    }
}

/// Physical and operational attributes of a street segment.
///
/// Every field has a default so sparse provider payloads still deserialize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreetProperties {
    /// Length in meters; zero means "derive from geometry".
    pub length_m: f64,
    pub speed_limit_kmh: f64,
    pub lanes: u32,
    pub one_way: bool,
    pub surface: String,
    /// OSM-like road class (`primary`, `residential`, ...).
    pub highway: String,
    /// Capacity ratings. `None` means unrestricted.
    pub max_weight_kg: Option<f64>,
    pub max_height_m: Option<f64>,
    pub max_width_m: Option<f64>,
    pub emergency_access: bool,
    pub evacuation_route: bool,
    pub hazard_zone: bool,
    pub condition: RoadCondition,
    pub lighting: bool,
    pub sidewalk: bool,
    pub bike_lane: bool,
    /// Signed grade along the digitized direction.
    pub incline_percent: f64,
}

impl Default for StreetProperties {
    fn default() -> Self {
        Self {
            length_m: 0.0,
            speed_limit_kmh: 40.0,
            lanes: 2,
            one_way: false,
            surface: "asphalt".to_string(),
            highway: "residential".to_string(),
            max_weight_kg: None,
            max_height_m: None,
            max_width_m: None,
            emergency_access: false,
            evacuation_route: false,
            hazard_zone: false,
            condition: RoadCondition::Good,
            lighting: false,
            sidewalk: false,
            bike_lane: false,
            incline_percent: 0.0,
        }
    }
}

/// A routable street segment. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreetSegment {
    pub id: SegmentId,
    pub geometry: Vec<Coordinate>,
    #[serde(default)]
    pub properties: StreetProperties,
}

impl StreetSegment {
    /// Validate geometry and fill derived properties.
    pub fn normalized(mut self) -> Result<Self> {
        if self.geometry.len() < 2 {
            return Err(RoutingError::MalformedSegment {
                id: self.id,
                reason: "geometry needs at least 2 coordinates".to_string(),
            });
        }
        if self.geometry.iter().any(|c| !c.is_finite()) {
            return Err(RoutingError::MalformedSegment {
                id: self.id,
                reason: "geometry contains non-finite coordinates".to_string(),
            });
        }
        if self.geometry.iter().any(|c| !c.is_valid()) {
            return Err(RoutingError::MalformedSegment {
                id: self.id,
                reason: "geometry coordinate outside [-180, 180] x [-90, 90]".to_string(),
            });
        }
        if !(self.properties.length_m.is_finite() && self.properties.length_m > 0.0) {
            self.properties.length_m = polyline_length_m(&self.geometry);
        }
        if !(self.properties.speed_limit_kmh.is_finite() && self.properties.speed_limit_kmh > 0.0)
        {
            self.properties.speed_limit_kmh = StreetProperties::default().speed_limit_kmh;
        }
        if !self.properties.incline_percent.is_finite() {
            self.properties.incline_percent = 0.0;
        }
        Ok(self)
    }

    pub fn start(&self) -> Coordinate {
        self.geometry[0]
    }

    pub fn end(&self) -> Coordinate {
        self.geometry[self.geometry.len() - 1]
    }

    /// Distance-weighted center of the polyline.
    pub fn center(&self) -> Coordinate {
        polyline_center(&self.geometry).unwrap_or_else(|| self.start())
    }

    pub fn length_m(&self) -> f64 {
        self.properties.length_m
    }

    pub fn length_km(&self) -> f64 {
        self.properties.length_m / 1000.0
    }

    pub fn road_type(&self) -> RoadType {
        RoadType::from_class(&self.properties.highway)
    }

    /// Free-flow travel time in seconds.
    pub fn travel_time_s(&self) -> f64 {
        let speed_mps = self.properties.speed_limit_kmh / 3.6;
        self.properties.length_m / speed_mps.max(0.1)
    }

    pub fn slope_deg(&self) -> f64 {
        (self.properties.incline_percent / 100.0).atan().to_degrees()
    }
}

// ========== VEHICLES ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VehicleType {
    #[default]
    Civilian,
    FireEngine,
    Ambulance,
    PoliceCar,
    RescueTruck,
}

impl VehicleType {
    pub fn is_emergency(self) -> bool {
        !matches!(self, Self::Civilian)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Civilian => "civilian",
            Self::FireEngine => "fire_engine",
            Self::Ambulance => "ambulance",
            Self::PoliceCar => "police_car",
            Self::RescueTruck => "rescue_truck",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmergencyPriority {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl EmergencyPriority {
    pub fn default_for(vehicle: VehicleType) -> Self {
        if vehicle.is_emergency() {
            Self::High
        } else {
            Self::Low
        }
    }
}

// ========== ROUTES ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteStatus {
    #[default]
    Planned,
    Active,
    Completed,
    Blocked,
}

impl RouteStatus {
    pub fn can_transition_to(self, next: RouteStatus) -> bool {
        matches!(
            (self, next),
            (Self::Planned, Self::Active)
                | (Self::Planned, Self::Blocked)
                | (Self::Active, Self::Completed)
                | (Self::Active, Self::Blocked)
                | (Self::Blocked, Self::Planned)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PointRole {
    Start,
    Waypoint,
    Destination,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PointAccessibility {
    pub emergency_access: bool,
    pub building_access: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePoint {
    pub coordinate: Coordinate,
    pub role: PointRole,
    /// Elevation relative to the route start, from segment grades.
    pub elevation_m: f64,
    pub accessibility: PointAccessibility,
}

/// Per-segment accessibility flags used by the scorer and metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentAccessibility {
    pub emergency_access: bool,
    /// Evacuation route or emergency-access segment.
    pub high_priority: bool,
    pub impassable: bool,
    pub restricted: bool,
    pub building_access: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegmentProperties {
    pub distance_m: f64,
    pub travel_time_s: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    /// Absolute grade in degrees.
    pub slope_deg: f64,
    pub road_type: RoadType,
    pub condition: RoadCondition,
    pub lit: bool,
    pub hazards_detected: Vec<String>,
    pub traffic: Vec<String>,
    pub accessibility: SegmentAccessibility,
}

/// One edge of an output route, linking consecutive route points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    /// Source street segment, absent for synthetic fallback segments.
    pub street_id: Option<SegmentId>,
    pub start: Coordinate,
    pub end: Coordinate,
    pub geometry: Vec<Coordinate>,
    pub properties: RouteSegmentProperties,
}

/// Structural bias a candidate was generated under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteVariant {
    DirectFastest,
    Highway,
    Arterial,
    DirectShortest,
    LocalRoads,
    HazardAvoiding,
    LowSlope,
    EmergencyAccess,
    BuildingAccess,
}

impl RouteVariant {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DirectFastest => "direct_fastest",
            Self::Highway => "highway",
            Self::Arterial => "arterial",
            Self::DirectShortest => "direct_shortest",
            Self::LocalRoads => "local_roads",
            Self::HazardAvoiding => "hazard_avoiding",
            Self::LowSlope => "low_slope",
            Self::EmergencyAccess => "emergency_access",
            Self::BuildingAccess => "building_access",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::DirectFastest => "Direct (fastest)",
            Self::Highway => "Highway priority",
            Self::Arterial => "Arterial roads",
            Self::DirectShortest => "Direct (shortest)",
            Self::LocalRoads => "Local roads",
            Self::HazardAvoiding => "Hazard avoiding",
            Self::LowSlope => "Low slope",
            Self::EmergencyAccess => "Emergency access",
            Self::BuildingAccess => "Building access",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationMetadata {
    /// `a_star` or `fallback`.
    pub method: String,
    pub variant: RouteVariant,
    pub performance_score: f64,
    pub reliability_score: f64,
    pub nodes_visited: usize,
}

/// A complete start-to-destination route candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: String,
    pub name: String,
    pub points: Vec<RoutePoint>,
    pub segments: Vec<RouteSegment>,
    pub total_distance_m: f64,
    pub total_time_s: f64,
    pub elevation_gain_m: f64,
    pub elevation_loss_m: f64,
    pub max_slope_deg: f64,
    pub average_slope_deg: f64,
    pub vehicle_type: VehicleType,
    pub priority: EmergencyPriority,
    pub status: RouteStatus,
    pub optimization: OptimizationMetadata,
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// Assemble a route and derive its aggregate totals from the segments.
    pub fn assemble(
        id: String,
        points: Vec<RoutePoint>,
        segments: Vec<RouteSegment>,
        vehicle_type: VehicleType,
        priority: EmergencyPriority,
        optimization: OptimizationMetadata,
    ) -> Self {
        let total_distance_m = segments.iter().map(|s| s.properties.distance_m).sum();
        let total_time_s = segments.iter().map(|s| s.properties.travel_time_s).sum();
        let elevation_gain_m = segments.iter().map(|s| s.properties.elevation_gain_m).sum();
        let elevation_loss_m = segments.iter().map(|s| s.properties.elevation_loss_m).sum();
        let max_slope_deg = segments
            .iter()
            .map(|s| s.properties.slope_deg)
            .fold(0.0, f64::max);
        let average_slope_deg = if segments.is_empty() {
            0.0
        } else {
            segments.iter().map(|s| s.properties.slope_deg).sum::<f64>() / segments.len() as f64
        };

        Self {
            id,
            name: optimization.variant.label().to_string(),
            points,
            segments,
            total_distance_m,
            total_time_s,
            elevation_gain_m,
            elevation_loss_m,
            max_slope_deg,
            average_slope_deg,
            vehicle_type,
            priority,
            status: RouteStatus::Planned,
            optimization,
            created_at: Utc::now(),
        }
    }

    /// Total hazards reported across all segments.
    pub fn hazard_count(&self) -> usize {
        self.segments
            .iter()
            .map(|s| s.properties.hazards_detected.len())
            .sum()
    }

    /// Full route geometry with joints deduplicated.
    pub fn geometry(&self) -> Vec<Coordinate> {
        let mut out: Vec<Coordinate> = Vec::new();
        for segment in &self.segments {
            for coord in &segment.geometry {
                if out.last() != Some(coord) {
                    out.push(*coord);
                }
            }
        }
        out
    }

    /// Apply a lifecycle transition requested by an external caller.
    pub fn transition(&mut self, next: RouteStatus) -> Result<()> {
        if !self.status.can_transition_to(next) {
            return Err(RoutingError::InvalidRequest(format!(
                "route {} cannot move from {:?} to {:?}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        Ok(())
    }
}

// ========== HAZARDS ==========

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AvoidancePolicy {
    Ignore,
    #[default]
    PreferAvoid,
    MustAvoid,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum HazardShape {
    Circle { center: Coordinate, radius_m: f64 },
    Polygon { vertices: Vec<Coordinate> },
}

/// A danger area routes should steer around.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardZone {
    pub id: String,
    pub name: String,
    pub shape: HazardShape,
    /// 1 (minor) to 5 (extreme)
    pub severity: u8,
    pub policy: AvoidancePolicy,
    /// Extra clearance applied around the shape for intersection tests.
    #[serde(default)]
    pub buffer_m: f64,
    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

impl HazardZone {
    /// Check whether a point lies inside the zone including its buffer.
    pub fn contains(&self, point: &Coordinate) -> bool {
        let buffer = self.buffer_m.max(0.0);
        match &self.shape {
            HazardShape::Circle { center, radius_m } => {
                center.distance_to(point) <= radius_m.max(0.0) + buffer
            }
            HazardShape::Polygon { vertices } => {
                if point_in_polygon(point, vertices) {
                    return true;
                }
                if buffer <= 0.0 || vertices.len() < 2 {
                    return false;
                }
                let mut ring = vertices.clone();
                ring.push(vertices[0]);
                distance_to_polyline_m(point, &ring) <= buffer
            }
        }
    }

    /// Check whether a polyline passes through the zone.
    pub fn intersects_polyline(&self, polyline: &[Coordinate]) -> bool {
        if !self.active || self.policy == AvoidancePolicy::Ignore {
            return false;
        }
        match &self.shape {
            HazardShape::Circle { center, radius_m } => {
                distance_to_polyline_m(center, polyline) <= radius_m.max(0.0) + self.buffer_m.max(0.0)
            }
            HazardShape::Polygon { .. } => {
                const STEP_M: f64 = 25.0;
                polyline.windows(2).any(|pair| {
                    let distance_m = pair[0].distance_to(&pair[1]);
                    let steps = ((distance_m / STEP_M).ceil() as usize).clamp(1, 200);
                    (0..=steps).any(|i| {
                        let t = i as f64 / steps as f64;
                        let sample = Coordinate::new(
                            pair[0].lon + t * (pair[1].lon - pair[0].lon),
                            pair[0].lat + t * (pair[1].lat - pair[0].lat),
                        );
                        self.contains(&sample)
                    })
                })
            }
        }
    }

    /// Representative center, used for obstacle proximity sampling.
    pub fn center(&self) -> Option<Coordinate> {
        match &self.shape {
            HazardShape::Circle { center, .. } => Some(*center),
            HazardShape::Polygon { vertices } => {
                if vertices.is_empty() {
                    return None;
                }
                let n = vertices.len() as f64;
                Some(Coordinate::new(
                    vertices.iter().map(|v| v.lon).sum::<f64>() / n,
                    vertices.iter().map(|v| v.lat).sum::<f64>() / n,
                ))
            }
        }
    }

    /// Approximate radius of influence in meters.
    pub fn effective_radius_m(&self) -> f64 {
        let base = match &self.shape {
            HazardShape::Circle { radius_m, .. } => *radius_m,
            HazardShape::Polygon { vertices } => match self.center() {
                Some(center) => vertices
                    .iter()
                    .map(|v| v.distance_to(&center))
                    .fold(0.0, f64::max),
                None => 0.0,
            },
        };
        base.max(0.0) + self.buffer_m.max(0.0)
    }

    /// Validate zone configuration.
    /// Returns list of validation errors (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        match &self.shape {
            HazardShape::Circle { center, radius_m } => {
                if !center.is_finite() {
                    errors.push("Circle center must be finite".to_string());
                }
                if !(radius_m.is_finite() && *radius_m > 0.0) {
                    errors.push("Circle radius must be > 0".to_string());
                }
            }
            HazardShape::Polygon { vertices } => {
                if vertices.len() < 3 {
                    errors.push("Polygon must have at least 3 vertices".to_string());
                }
                if vertices.iter().any(|v| !v.is_finite()) {
                    errors.push("Polygon vertices must be finite".to_string());
                }
            }
        }
        if !(1..=5).contains(&self.severity) {
            errors.push(format!("Severity {} must be between 1 and 5", self.severity));
        }
        if !self.buffer_m.is_finite() || self.buffer_m < 0.0 {
            errors.push("Buffer cannot be negative".to_string());
        }
        errors
    }
}

// ========== TRAFFIC ==========

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrafficKind {
    Accident,
    Construction,
    Closure,
    Congestion,
}

/// A point-like disruption tested against routes by proximity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrafficCondition {
    pub id: String,
    pub kind: TrafficKind,
    pub position: Coordinate,
    /// 1 (minor) to 5 (extreme)
    pub severity: u8,
    #[serde(default)]
    pub affected_lanes: u32,
    #[serde(default = "default_traffic_radius")]
    pub radius_m: f64,
}

fn default_traffic_radius() -> f64 {
    100.0
}

impl TrafficCondition {
    pub fn affects_polyline(&self, polyline: &[Coordinate]) -> bool {
        distance_to_polyline_m(&self.position, polyline) <= self.radius_m.max(0.0)
    }

    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        if !self.position.is_finite() {
            errors.push("Position must be finite".to_string());
        }
        if !(self.radius_m.is_finite() && self.radius_m > 0.0) {
            errors.push("Radius must be > 0".to_string());
        }
        if !(1..=5).contains(&self.severity) {
            errors.push(format!("Severity {} must be between 1 and 5", self.severity));
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, coords: &[[f64; 2]]) -> StreetSegment {
        StreetSegment {
            id: id.to_string(),
            geometry: coords.iter().map(|c| Coordinate::from(*c)).collect(),
            properties: StreetProperties::default(),
        }
    }

    #[test]
    fn normalized_derives_length_from_geometry() {
        let seg = segment("s1", &[[-122.42, 37.77], [-122.42, 37.771]])
            .normalized()
            .unwrap();
        assert!((seg.length_m() - 111.2).abs() < 1.0);
    }

    #[test]
    fn normalized_rejects_single_point_geometry() {
        let err = segment("bad", &[[-122.42, 37.77]]).normalized().unwrap_err();
        assert!(matches!(err, RoutingError::MalformedSegment { .. }));
    }

    #[test]
    fn road_type_maps_osm_classes() {
        assert_eq!(RoadType::from_class("motorway"), RoadType::Highway);
        assert_eq!(RoadType::from_class("secondary"), RoadType::Arterial);
        assert_eq!(RoadType::from_class("residential"), RoadType::Local);
        assert_eq!(RoadType::from_class("unknown"), RoadType::Local);
    }

    #[test]
    fn status_transitions_follow_lifecycle() {
        assert!(RouteStatus::Planned.can_transition_to(RouteStatus::Active));
        assert!(RouteStatus::Active.can_transition_to(RouteStatus::Completed));
        assert!(!RouteStatus::Completed.can_transition_to(RouteStatus::Active));
        assert!(!RouteStatus::Planned.can_transition_to(RouteStatus::Completed));
    }

    #[test]
    fn circle_hazard_intersects_nearby_polyline() {
        let zone = HazardZone {
            id: "h1".to_string(),
            name: "Fire".to_string(),
            shape: HazardShape::Circle {
                center: Coordinate::new(-122.41, 37.78),
                radius_m: 50.0,
            },
            severity: 4,
            policy: AvoidancePolicy::MustAvoid,
            buffer_m: 10.0,
            active: true,
        };
        let through = vec![Coordinate::new(-122.412, 37.78), Coordinate::new(-122.408, 37.78)];
        let far = vec![Coordinate::new(-122.42, 37.79), Coordinate::new(-122.419, 37.79)];
        assert!(zone.intersects_polyline(&through));
        assert!(!zone.intersects_polyline(&far));

        let ignored = HazardZone {
            policy: AvoidancePolicy::Ignore,
            ..zone
        };
        assert!(!ignored.intersects_polyline(&through));
    }

    #[test]
    fn hazard_validation_reports_bad_fields() {
        let zone = HazardZone {
            id: "h2".to_string(),
            name: "Bad".to_string(),
            shape: HazardShape::Polygon {
                vertices: vec![Coordinate::new(0.0, 0.0), Coordinate::new(1.0, 1.0)],
            },
            severity: 9,
            policy: AvoidancePolicy::PreferAvoid,
            buffer_m: 0.0,
            active: true,
        };
        let errors = zone.validate();
        assert_eq!(errors.len(), 2, "{errors:?}");
    }

    #[test]
    fn hazard_shape_uses_tagged_json() {
        let json = serde_json::json!({
            "id": "h3",
            "name": "Flood",
            "shape": {"type": "circle", "center": [-122.41, 37.78], "radius_m": 120.0},
            "severity": 3,
            "policy": "must_avoid"
        });
        let zone: HazardZone = serde_json::from_value(json).unwrap();
        assert!(zone.active);
        assert_eq!(zone.policy, AvoidancePolicy::MustAvoid);
    }
}
