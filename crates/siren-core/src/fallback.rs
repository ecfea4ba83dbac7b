//! Degraded route generation when no street data is available.
//!
//! Produces a straight line through the stops, subdivided into synthetic
//! steps with bounded perpendicular jitter. The jitter is seeded from the
//! stop coordinates so a repeated request yields the same geometry.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::candidates::{synthesize_route, CandidateContext, RouteMethod};
use crate::models::{Route, StreetProperties, StreetSegment};
use crate::request::OptimizationGoal;
use crate::spatial::{bearing, offset_by_bearing, Coordinate};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallbackConfig {
    pub steps_per_leg: usize,
    pub max_jitter_m: f64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            steps_per_leg: 8,
            max_jitter_m: 30.0,
        }
    }
}

fn seed_for(stops: &[Coordinate]) -> u64 {
    stops.iter().fold(0xcbf2_9ce4_8422_2325_u64, |hash, c| {
        [c.lon.to_bits(), c.lat.to_bits()]
            .into_iter()
            .fold(hash, |h, bits| (h ^ bits).wrapping_mul(0x0100_0000_01b3))
    })
}

fn synthetic_properties() -> StreetProperties {
    StreetProperties {
        emergency_access: true,
        ..StreetProperties::default()
    }
}

/// Jittered straight-line segments through `stops`.
pub fn fallback_segments(stops: &[Coordinate], config: &FallbackConfig) -> Vec<StreetSegment> {
    let mut rng = StdRng::seed_from_u64(seed_for(stops));
    let steps = config.steps_per_leg.max(1);
    let mut segments = Vec::new();

    for (leg_idx, pair) in stops.windows(2).enumerate() {
        let (from, to) = (pair[0], pair[1]);
        if from.distance_to(&to) <= f64::EPSILON {
            continue;
        }
        let heading = bearing(from.lat, from.lon, to.lat, to.lon);
        let mut nodes = Vec::with_capacity(steps + 1);
        nodes.push(from);
        for step in 1..steps {
            let t = step as f64 / steps as f64;
            let on_line = Coordinate::new(
                from.lon + (to.lon - from.lon) * t,
                from.lat + (to.lat - from.lat) * t,
            );
            let jitter = if config.max_jitter_m > 0.0 {
                rng.random_range(-config.max_jitter_m..=config.max_jitter_m)
            } else {
                0.0
            };
            let (lat, lon) = offset_by_bearing(
                on_line.lat,
                on_line.lon,
                jitter,
                heading + std::f64::consts::FRAC_PI_2,
            );
            nodes.push(Coordinate::new(lon, lat));
        }
        nodes.push(to);

        for (step_idx, pair) in nodes.windows(2).enumerate() {
            let raw = StreetSegment {
                id: format!("fallback-{leg_idx}-{step_idx}"),
                geometry: vec![pair[0], pair[1]],
                properties: synthetic_properties(),
            };
            if let Ok(segment) = raw.normalized() {
                segments.push(segment);
            }
        }
    }
    segments
}

/// One synthetic route per variant of `goal`, all sharing the same geometry.
pub fn fallback_routes(
    ctx: &CandidateContext<'_>,
    stops: &[Coordinate],
    goal: OptimizationGoal,
    config: &FallbackConfig,
) -> Vec<Route> {
    let segments = fallback_segments(stops, config);
    if segments.is_empty() {
        return Vec::new();
    }
    goal.variants()
        .iter()
        .map(|&variant| synthesize_route(ctx, variant, RouteMethod::Fallback, &segments, stops, 0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmergencyPriority, RoadType, RouteVariant, VehicleType};
    use crate::pathfinding::SearchConfig;
    use crate::street_index::StreetNetwork;

    fn stops() -> Vec<Coordinate> {
        vec![Coordinate::new(-122.42, 37.77), Coordinate::new(-122.40, 37.79)]
    }

    #[test]
    fn fallback_is_deterministic_and_bounded() {
        let config = FallbackConfig::default();
        let a = fallback_segments(&stops(), &config);
        let b = fallback_segments(&stops(), &config);
        assert_eq!(a, b);
        assert_eq!(a.len(), 8);
        assert_eq!(a[0].start(), stops()[0]);
        assert_eq!(a[a.len() - 1].end(), stops()[1]);

        let straight = stops()[0].distance_to(&stops()[1]);
        let total: f64 = a.iter().map(|s| s.length_m()).sum();
        assert!(total >= straight - 1e-6);
        // Each interior node moves at most 30 m off the line.
        assert!(total <= straight + 2.0 * 30.0 * 8.0);
    }

    #[test]
    fn identical_stops_produce_nothing() {
        let p = Coordinate::new(-122.42, 37.77);
        assert!(fallback_segments(&[p, p], &FallbackConfig::default()).is_empty());
    }

    #[test]
    fn fallback_routes_keep_variant_semantics() {
        let network = StreetNetwork::default();
        let ctx = CandidateContext {
            network: &network,
            vehicle: VehicleType::FireEngine,
            priority: EmergencyPriority::High,
            hazard_zones: &[],
            traffic: &[],
            avoid_hazards: false,
            search: SearchConfig::default(),
        };
        let routes = fallback_routes(&ctx, &stops(), OptimizationGoal::Fastest, &FallbackConfig::default());
        assert_eq!(routes.len(), 3);
        assert!(routes.iter().all(|r| r.total_distance_m > 0.0));
        assert!(routes.iter().all(|r| r.optimization.method == "fallback"));
        assert!(routes.iter().all(|r| r.segments.iter().all(|s| s.street_id.is_none())));
        let highway = routes
            .iter()
            .find(|r| r.optimization.variant == RouteVariant::Highway)
            .unwrap();
        assert_eq!(highway.segments[0].properties.road_type, RoadType::Highway);
    }
}
