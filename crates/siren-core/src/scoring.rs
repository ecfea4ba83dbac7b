//! Weighted multi-criteria ranking.
//!
//! Each component lies in [0, 1]:
//! distance `1/(1+km)`, time `1/(1+minutes)`, safety `1/(1+hazards)` and
//! accessibility as the share of high-priority or emergency-access segments.
//! The total is the weighted sum with the caller's weights taken as-is.

use serde::{Deserialize, Serialize};

use crate::models::Route;
use crate::request::PreferenceWeights;

pub const MAX_ALTERNATIVES: usize = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub distance: f64,
    pub time: f64,
    pub safety: f64,
    pub accessibility: f64,
    pub total: f64,
}

pub fn score_components(route: &Route) -> ScoreBreakdown {
    let km = route.total_distance_m.max(0.0) / 1000.0;
    let minutes = route.total_time_s.max(0.0) / 60.0;
    let accessibility = if route.segments.is_empty() {
        0.0
    } else {
        route
            .segments
            .iter()
            .filter(|s| {
                s.properties.accessibility.high_priority || s.properties.accessibility.emergency_access
            })
            .count() as f64
            / route.segments.len() as f64
    };
    ScoreBreakdown {
        distance: 1.0 / (1.0 + km),
        time: 1.0 / (1.0 + minutes),
        safety: 1.0 / (1.0 + route.hazard_count() as f64),
        accessibility,
        total: 0.0,
    }
}

pub fn score(route: &Route, weights: &PreferenceWeights) -> ScoreBreakdown {
    let mut breakdown = score_components(route);
    breakdown.total = weights.distance * breakdown.distance
        + weights.time * breakdown.time
        + weights.safety * breakdown.safety
        + weights.accessibility * breakdown.accessibility;
    breakdown
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRoute {
    pub route: Route,
    pub score: ScoreBreakdown,
}

/// Sort routes by descending total score. Equal scores keep input order.
pub fn rank_routes(routes: Vec<Route>, weights: &PreferenceWeights) -> Vec<ScoredRoute> {
    let mut scored: Vec<ScoredRoute> = routes
        .into_iter()
        .map(|route| {
            let score = score(&route, weights);
            ScoredRoute { route, score }
        })
        .collect();
    scored.sort_by(|a, b| b.score.total.total_cmp(&a.score.total));
    scored
}

/// Best route plus up to [`MAX_ALTERNATIVES`] runners-up.
pub fn best_and_alternatives(ranked: &[ScoredRoute]) -> (Option<Route>, Vec<Route>) {
    let best = ranked.first().map(|s| s.route.clone());
    let alternatives = ranked
        .iter()
        .skip(1)
        .take(MAX_ALTERNATIVES)
        .map(|s| s.route.clone())
        .collect();
    (best, alternatives)
}
