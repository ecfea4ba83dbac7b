//! Edge cost strategies for the pathfinding engine.
//!
//! Cost starts at segment length in km and is scaled by three tables:
//! vehicle penalties, priority adjustments and variant biases. Each table is
//! a list of [`PenaltyRule`]s so the multipliers can be tested in isolation.
//!
//! The A* heuristic is straight-line km, which is admissible only while every
//! factor is >= 1. The `fastest` priority divides by the speed limit and
//! breaks that property; [`CostModel::is_admissible`] reports it.

use serde::{Deserialize, Serialize};

use crate::models::{
    AvoidancePolicy, HazardZone, RoadCondition, RoadType, RouteVariant, StreetSegment, VehicleType,
};

/// Anything that prices a street segment for the search.
pub trait EdgeCost {
    fn cost(&self, segment: &StreetSegment) -> f64;

    /// Whether cost never drops below geometric length in km.
    fn is_admissible(&self) -> bool {
        true
    }
}

impl<F> EdgeCost for F
where
    F: Fn(&StreetSegment) -> f64,
{
    fn cost(&self, segment: &StreetSegment) -> f64 {
        self(segment)
    }
}

/// A named multiplicative penalty.
#[derive(Debug, Clone, Copy)]
pub struct PenaltyRule {
    pub name: &'static str,
    pub factor: f64,
    pub applies: fn(&StreetSegment) -> bool,
}

impl PenaltyRule {
    fn factor_for(&self, segment: &StreetSegment) -> f64 {
        if (self.applies)(segment) {
            self.factor
        } else {
            1.0
        }
    }
}

fn lacks_emergency_access(s: &StreetSegment) -> bool {
    !s.properties.emergency_access
}

fn narrower_than_3m(s: &StreetSegment) -> bool {
    s.properties.max_width_m.is_some_and(|w| w < 3.0)
}

fn rated_below_15t(s: &StreetSegment) -> bool {
    s.properties.max_weight_kg.is_some_and(|w| w < 15_000.0)
}

fn rated_below_12t(s: &StreetSegment) -> bool {
    s.properties.max_weight_kg.is_some_and(|w| w < 12_000.0)
}

fn in_hazard_zone(s: &StreetSegment) -> bool {
    s.properties.hazard_zone
}

fn poor_condition(s: &StreetSegment) -> bool {
    s.properties.condition == RoadCondition::Poor
}

fn not_excellent(s: &StreetSegment) -> bool {
    s.properties.condition != RoadCondition::Excellent
}

fn unlit(s: &StreetSegment) -> bool {
    !s.properties.lighting
}

fn minor_road(s: &StreetSegment) -> bool {
    matches!(s.road_type(), RoadType::Local | RoadType::Service)
}

fn collector_road(s: &StreetSegment) -> bool {
    s.road_type() == RoadType::Collector
}

fn highway_road(s: &StreetSegment) -> bool {
    s.road_type() == RoadType::Highway
}

fn arterial_road(s: &StreetSegment) -> bool {
    s.road_type() == RoadType::Arterial
}

fn no_sidewalk(s: &StreetSegment) -> bool {
    !s.properties.sidewalk
}

fn fast_traffic(s: &StreetSegment) -> bool {
    s.properties.speed_limit_kmh > 60.0
}

const CIVILIAN_PENALTIES: &[PenaltyRule] = &[
    PenaltyRule { name: "hazard_zone", factor: 10.0, applies: in_hazard_zone },
    PenaltyRule { name: "poor_condition", factor: 3.0, applies: poor_condition },
];

const FIRE_ENGINE_PENALTIES: &[PenaltyRule] = &[
    PenaltyRule { name: "no_emergency_access", factor: 10.0, applies: lacks_emergency_access },
    PenaltyRule { name: "narrow", factor: 5.0, applies: narrower_than_3m },
    PenaltyRule { name: "low_weight_rating", factor: 3.0, applies: rated_below_15t },
];

const AMBULANCE_PENALTIES: &[PenaltyRule] = &[
    PenaltyRule { name: "no_emergency_access", factor: 5.0, applies: lacks_emergency_access },
    PenaltyRule { name: "poor_condition", factor: 2.0, applies: poor_condition },
];

const POLICE_PENALTIES: &[PenaltyRule] = &[
    PenaltyRule { name: "no_emergency_access", factor: 3.0, applies: lacks_emergency_access },
];

const RESCUE_TRUCK_PENALTIES: &[PenaltyRule] = &[
    PenaltyRule { name: "no_emergency_access", factor: 8.0, applies: lacks_emergency_access },
    PenaltyRule { name: "narrow", factor: 4.0, applies: narrower_than_3m },
    PenaltyRule { name: "low_weight_rating", factor: 2.0, applies: rated_below_12t },
];

const SAFEST_ADJUSTMENTS: &[PenaltyRule] = &[
    PenaltyRule { name: "not_excellent", factor: 2.0, applies: not_excellent },
    PenaltyRule { name: "unlit", factor: 1.5, applies: unlit },
];

const HIGHWAY_BIAS: &[PenaltyRule] = &[
    PenaltyRule { name: "minor_road", factor: 2.0, applies: minor_road },
    PenaltyRule { name: "collector_road", factor: 1.3, applies: collector_road },
];

const ARTERIAL_BIAS: &[PenaltyRule] = &[
    PenaltyRule { name: "minor_road", factor: 1.5, applies: minor_road },
    PenaltyRule { name: "highway_road", factor: 1.2, applies: highway_road },
];

const LOCAL_BIAS: &[PenaltyRule] = &[
    PenaltyRule { name: "highway_road", factor: 1.5, applies: highway_road },
    PenaltyRule { name: "arterial_road", factor: 1.2, applies: arterial_road },
];

const HAZARD_BIAS: &[PenaltyRule] = &[
    PenaltyRule { name: "hazard_zone", factor: 5.0, applies: in_hazard_zone },
];

const EMERGENCY_BIAS: &[PenaltyRule] = &[
    PenaltyRule { name: "no_emergency_access", factor: 4.0, applies: lacks_emergency_access },
];

const BUILDING_ACCESS_BIAS: &[PenaltyRule] = &[
    PenaltyRule { name: "no_sidewalk", factor: 2.0, applies: no_sidewalk },
    PenaltyRule { name: "fast_traffic", factor: 1.5, applies: fast_traffic },
];

/// Vehicle-specific penalty table.
pub fn vehicle_penalties(vehicle: VehicleType) -> &'static [PenaltyRule] {
    match vehicle {
        VehicleType::Civilian => CIVILIAN_PENALTIES,
        VehicleType::FireEngine => FIRE_ENGINE_PENALTIES,
        VehicleType::Ambulance => AMBULANCE_PENALTIES,
        VehicleType::PoliceCar => POLICE_PENALTIES,
        VehicleType::RescueTruck => RESCUE_TRUCK_PENALTIES,
    }
}

/// Variant-specific bias table. Low-slope bias is continuous and applied separately.
pub fn variant_bias(variant: RouteVariant) -> &'static [PenaltyRule] {
    match variant {
        RouteVariant::Highway => HIGHWAY_BIAS,
        RouteVariant::Arterial => ARTERIAL_BIAS,
        RouteVariant::LocalRoads => LOCAL_BIAS,
        RouteVariant::HazardAvoiding => HAZARD_BIAS,
        RouteVariant::EmergencyAccess => EMERGENCY_BIAS,
        RouteVariant::BuildingAccess => BUILDING_ACCESS_BIAS,
        RouteVariant::DirectFastest | RouteVariant::DirectShortest | RouteVariant::LowSlope => &[],
    }
}

/// How base cost is adjusted for the request priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostPriority {
    Fastest,
    Shortest,
    Safest,
}

impl CostPriority {
    pub fn for_variant(variant: RouteVariant) -> Self {
        match variant {
            RouteVariant::DirectFastest | RouteVariant::Highway | RouteVariant::Arterial => {
                Self::Fastest
            }
            RouteVariant::HazardAvoiding | RouteVariant::LowSlope => Self::Safest,
            RouteVariant::DirectShortest
            | RouteVariant::LocalRoads
            | RouteVariant::EmergencyAccess
            | RouteVariant::BuildingAccess => Self::Shortest,
        }
    }
}

const MUST_AVOID_FACTOR: f64 = 1_000.0;

/// Multiplier for a segment crossing caller-registered hazard zones.
///
/// Finite even for `must_avoid`, so an unavoidable hazard still yields a path
/// that the validator can report.
pub fn hazard_zone_factor(segment: &StreetSegment, zones: &[HazardZone]) -> f64 {
    zones
        .iter()
        .filter(|zone| zone.intersects_polyline(&segment.geometry))
        .map(|zone| match zone.policy {
            AvoidancePolicy::Ignore => 1.0,
            AvoidancePolicy::PreferAvoid => 1.0 + zone.severity as f64,
            AvoidancePolicy::MustAvoid => MUST_AVOID_FACTOR,
        })
        .product()
}

/// Composite cost for one (vehicle, priority, variant) combination.
#[derive(Debug, Clone, Copy)]
pub struct CostModel<'a> {
    pub vehicle: VehicleType,
    pub priority: CostPriority,
    pub variant: RouteVariant,
    pub hazard_zones: &'a [HazardZone],
    pub apply_hazard_zones: bool,
}

impl<'a> CostModel<'a> {
    pub fn new(vehicle: VehicleType, variant: RouteVariant) -> Self {
        Self {
            vehicle,
            priority: CostPriority::for_variant(variant),
            variant,
            hazard_zones: &[],
            apply_hazard_zones: variant == RouteVariant::HazardAvoiding,
        }
    }

    pub fn with_hazard_zones(mut self, zones: &'a [HazardZone], always_apply: bool) -> Self {
        self.hazard_zones = zones;
        self.apply_hazard_zones = always_apply || self.variant == RouteVariant::HazardAvoiding;
        self
    }

    fn priority_factor(&self, segment: &StreetSegment) -> f64 {
        match self.priority {
            CostPriority::Fastest => 1.0 / segment.properties.speed_limit_kmh.max(1.0),
            CostPriority::Shortest => 1.0,
            CostPriority::Safest => SAFEST_ADJUSTMENTS
                .iter()
                .map(|rule| rule.factor_for(segment))
                .product(),
        }
    }

    fn slope_factor(&self, segment: &StreetSegment) -> f64 {
        if self.variant == RouteVariant::LowSlope {
            1.0 + segment.properties.incline_percent.abs() / 5.0
        } else {
            1.0
        }
    }
}

impl EdgeCost for CostModel<'_> {
    fn cost(&self, segment: &StreetSegment) -> f64 {
        let base = segment.length_km();
        let vehicle: f64 = vehicle_penalties(self.vehicle)
            .iter()
            .map(|rule| rule.factor_for(segment))
            .product();
        let bias: f64 = variant_bias(self.variant)
            .iter()
            .map(|rule| rule.factor_for(segment))
            .product();
        let zones = if self.apply_hazard_zones {
            hazard_zone_factor(segment, self.hazard_zones)
        } else {
            1.0
        };
        base * vehicle * self.priority_factor(segment) * bias * self.slope_factor(segment) * zones
    }

    fn is_admissible(&self) -> bool {
        self.priority != CostPriority::Fastest
    }
}
