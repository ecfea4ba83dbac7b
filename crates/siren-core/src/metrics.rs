//! Per-route elevation, slope, accessibility and performance metrics.

use serde::{Deserialize, Serialize};

use crate::models::{RoadCondition, Route, RouteSegment};

pub const STEEP_SLOPE_DEG: f64 = 15.0;
pub const MODERATE_SLOPE_DEG: f64 = 5.0;
/// Steepest grade an emergency vehicle is assumed to manage.
pub const EMERGENCY_MAX_SLOPE_DEG: f64 = 20.0;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElevationStats {
    pub gain_m: f64,
    pub loss_m: f64,
    pub net_m: f64,
    pub min_m: f64,
    pub max_m: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlopeDistribution {
    /// Segments steeper than 15 degrees.
    pub steep: usize,
    /// Segments between 5 and 15 degrees.
    pub moderate: usize,
    /// Segments under 5 degrees.
    pub gentle: usize,
    pub max_deg: f64,
    pub average_deg: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityMetrics {
    pub emergency_compatible: bool,
    pub restricted_count: usize,
    pub hazard_count: usize,
    pub hazard_avoidance_score: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceScores {
    pub fuel_efficiency: f64,
    pub time_reliability: f64,
    pub safety: f64,
    pub overall: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteMetrics {
    pub route_id: String,
    pub elevation: ElevationStats,
    pub slopes: SlopeDistribution,
    pub accessibility: AccessibilityMetrics,
    pub performance: PerformanceScores,
}

/// Points deducted from each performance sub-score per offending segment.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Deductions {
    steep: f64,
    moderate: f64,
    poor_road: f64,
    closed_road: f64,
    congestion: f64,
    hazard: f64,
}

const FUEL_DEDUCTIONS: Deductions = Deductions {
    steep: 10.0,
    moderate: 3.0,
    poor_road: 2.0,
    closed_road: 5.0,
    congestion: 4.0,
    hazard: 0.0,
};

const RELIABILITY_DEDUCTIONS: Deductions = Deductions {
    steep: 2.0,
    moderate: 0.0,
    poor_road: 5.0,
    closed_road: 20.0,
    congestion: 8.0,
    hazard: 5.0,
};

const SAFETY_DEDUCTIONS: Deductions = Deductions {
    steep: 8.0,
    moderate: 2.0,
    poor_road: 6.0,
    closed_road: 20.0,
    congestion: 5.0,
    hazard: 15.0,
};

fn sub_score(segments: &[RouteSegment], table: &Deductions) -> f64 {
    let deducted: f64 = segments
        .iter()
        .map(|segment| {
            let props = &segment.properties;
            let mut points = 0.0;
            if props.slope_deg > STEEP_SLOPE_DEG {
                points += table.steep;
            } else if props.slope_deg >= MODERATE_SLOPE_DEG {
                points += table.moderate;
            }
            match props.condition {
                RoadCondition::Poor => points += table.poor_road,
                RoadCondition::Closed => points += table.closed_road,
                _ => {}
            }
            points += table.congestion * props.traffic.len() as f64;
            points += table.hazard * props.hazards_detected.len() as f64;
            points
        })
        .sum();
    (100.0 - deducted).max(0.0)
}

/// Fuel, reliability and safety sub-scores, each 100 minus deductions, floored at 0.
pub fn performance_scores(segments: &[RouteSegment]) -> PerformanceScores {
    let fuel_efficiency = sub_score(segments, &FUEL_DEDUCTIONS);
    let time_reliability = sub_score(segments, &RELIABILITY_DEDUCTIONS);
    let safety = sub_score(segments, &SAFETY_DEDUCTIONS);
    PerformanceScores {
        fuel_efficiency,
        time_reliability,
        safety,
        overall: (fuel_efficiency + time_reliability + safety) / 3.0,
    }
}

pub fn slope_distribution(segments: &[RouteSegment]) -> SlopeDistribution {
    let mut dist = SlopeDistribution::default();
    for segment in segments {
        let slope = segment.properties.slope_deg;
        if slope > STEEP_SLOPE_DEG {
            dist.steep += 1;
        } else if slope >= MODERATE_SLOPE_DEG {
            dist.moderate += 1;
        } else {
            dist.gentle += 1;
        }
        dist.max_deg = dist.max_deg.max(slope);
    }
    if !segments.is_empty() {
        dist.average_deg =
            segments.iter().map(|s| s.properties.slope_deg).sum::<f64>() / segments.len() as f64;
    }
    dist
}

pub fn elevation_stats(route: &Route) -> ElevationStats {
    let elevations: Vec<f64> = route
        .points
        .iter()
        .map(|p| p.elevation_m)
        .filter(|e| e.is_finite())
        .collect();
    let (Some(first), Some(last)) = (elevations.first(), elevations.last()) else {
        return ElevationStats {
            gain_m: route.elevation_gain_m,
            loss_m: route.elevation_loss_m,
            ..ElevationStats::default()
        };
    };
    ElevationStats {
        gain_m: route.elevation_gain_m,
        loss_m: route.elevation_loss_m,
        net_m: last - first,
        min_m: elevations.iter().copied().fold(f64::INFINITY, f64::min),
        max_m: elevations.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

pub fn accessibility_metrics(route: &Route) -> AccessibilityMetrics {
    let hazard_count = route.hazard_count();
    let hazard_capacity = route.segments.len().max(1) as f64;
    let impassable = route
        .segments
        .iter()
        .any(|s| s.properties.accessibility.impassable);
    AccessibilityMetrics {
        emergency_compatible: !impassable && route.max_slope_deg <= EMERGENCY_MAX_SLOPE_DEG,
        restricted_count: route
            .segments
            .iter()
            .filter(|s| s.properties.accessibility.restricted)
            .count(),
        hazard_count,
        hazard_avoidance_score: (100.0 * (1.0 - hazard_count as f64 / hazard_capacity)).max(0.0),
    }
}

pub fn route_metrics(route: &Route) -> RouteMetrics {
    RouteMetrics {
        route_id: route.id.clone(),
        elevation: elevation_stats(route),
        slopes: slope_distribution(&route.segments),
        accessibility: accessibility_metrics(route),
        performance: performance_scores(&route.segments),
    }
}
