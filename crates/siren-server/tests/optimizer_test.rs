//! End-to-end optimizer scenarios over in-memory street data.

use siren_core::{
    AvoidancePolicy, Coordinate, HazardShape, HazardZone, OptimizationGoal, OptimizationRequest,
    PreferenceWeights, RoadType, RouteConstraints, StreetProperties, StreetSegment, VehicleType,
};
use siren_server::config::Config;
use siren_server::obstacles::NullObstacleProvider;
use siren_server::optimizer::RouteOptimizer;
use siren_server::streets::{NullStreetProvider, StaticStreetProvider};
use siren_server::terrain::NullElevationProvider;
use std::sync::Arc;

fn origin() -> Coordinate {
    Coordinate::new(-122.42, 37.77)
}

fn destination() -> Coordinate {
    Coordinate::new(-122.40, 37.79)
}

fn emergency_street(id: &str, from: Coordinate, to: Coordinate) -> StreetSegment {
    StreetSegment {
        id: id.to_string(),
        geometry: vec![from, to],
        properties: StreetProperties {
            emergency_access: true,
            highway: "primary".to_string(),
            speed_limit_kmh: 50.0,
            lighting: true,
            ..StreetProperties::default()
        },
    }
}

fn corridor(steps: usize) -> Vec<StreetSegment> {
    let (a, b) = (origin(), destination());
    let point = |i: usize| {
        let t = i as f64 / steps as f64;
        Coordinate::new(a.lon + (b.lon - a.lon) * t, a.lat + (b.lat - a.lat) * t)
    };
    (0..steps)
        .map(|i| emergency_street(&format!("c{i}"), point(i), point(i + 1)))
        .collect()
}

fn optimizer_with(streets: Vec<StreetSegment>) -> RouteOptimizer {
    RouteOptimizer::new(
        Arc::new(StaticStreetProvider::from_segments(streets)),
        Arc::new(NullElevationProvider),
        Arc::new(NullObstacleProvider),
        &Config::default(),
    )
}

fn fire_engine_request(goal: OptimizationGoal) -> OptimizationRequest {
    OptimizationRequest {
        vehicle_type: VehicleType::FireEngine,
        goal,
        ..OptimizationRequest::new(origin(), destination())
    }
}

fn covering_zone(center: Coordinate, radius_m: f64) -> HazardZone {
    HazardZone {
        id: "fire-1".to_string(),
        name: "Structure fire".to_string(),
        shape: HazardShape::Circle { center, radius_m },
        severity: 5,
        policy: AvoidancePolicy::MustAvoid,
        buffer_m: 50.0,
        active: true,
    }
}

#[tokio::test]
async fn fire_engine_fastest_offers_highway_candidate() {
    let optimizer = optimizer_with(corridor(8));
    let result = optimizer
        .optimize(&fire_engine_request(OptimizationGoal::Fastest), &[], &[])
        .await;

    assert!(result.success, "{:?}", result.error);
    assert!(!result.degraded);
    let best = result.best_route.as_ref().expect("best route");
    assert_eq!(best.vehicle_type, VehicleType::FireEngine);
    assert!(result
        .routes
        .iter()
        .any(|r| r.segments.iter().any(|s| s.properties.road_type == RoadType::Highway)));
    assert!(result.alternatives.len() <= 3);
    assert_eq!(result.metrics.len(), result.routes.len());

    for route in &result.routes {
        let sum: f64 = route.segments.iter().map(|s| s.properties.distance_m).sum();
        assert!((route.total_distance_m - sum).abs() <= 1e-6 * sum.max(1.0));
        assert_eq!(route.points.len(), route.segments.len() + 1);
    }

    let terrain = result.terrain.as_ref().expect("terrain analysis");
    assert!(!terrain.terrain_data_available);
    assert_eq!(terrain.route_id, best.id);
}

#[tokio::test]
async fn out_of_range_street_is_dropped_from_static_data() {
    let mut streets = corridor(8);
    let tail = streets[7].end();
    streets.push(emergency_street("bad", tail, Coordinate::new(1e30, 37.78)));
    let provider = StaticStreetProvider::from_segments(streets.clone());
    assert_eq!(provider.len(), 8);

    let optimizer = optimizer_with(streets);
    let result = optimizer
        .optimize(&fire_engine_request(OptimizationGoal::Fastest), &[], &[])
        .await;
    assert!(result.success, "{:?}", result.error);
    assert!(!result.degraded);
    assert!(result
        .routes
        .iter()
        .all(|r| r.segments.iter().all(|s| s.street_id.as_deref() != Some("bad"))));
}

#[tokio::test]
async fn unavoidable_hazard_still_returns_route_with_warning() {
    let only = emergency_street("only", origin(), destination());
    let zone = covering_zone(only.center(), 2_000.0);
    let optimizer = optimizer_with(vec![only]);
    let request = OptimizationRequest {
        constraints: RouteConstraints {
            avoid_hazards: true,
            ..RouteConstraints::default()
        },
        ..fire_engine_request(OptimizationGoal::Safest)
    };

    let result = optimizer.optimize(&request, &[zone], &[]).await;

    assert!(result.success);
    let best = result.best_route.as_ref().expect("a route is still returned");
    assert!(best.hazard_count() > 0);
    assert!(!result.constraints.warnings.is_empty());
    assert!(result
        .constraints
        .warnings
        .iter()
        .any(|w| w.contains("hazard-free")));
    assert!(!result.constraints.satisfied.iter().any(|s| s == "avoid_hazards"));
}

#[tokio::test]
async fn identical_stops_inside_hazard_return_warning() {
    let only = emergency_street("only", origin(), destination());
    let zone = covering_zone(only.center(), 2_000.0);
    let optimizer = optimizer_with(vec![only]);
    let request = OptimizationRequest {
        constraints: RouteConstraints {
            avoid_hazards: true,
            ..RouteConstraints::default()
        },
        vehicle_type: VehicleType::FireEngine,
        ..OptimizationRequest::new(origin(), origin())
    };

    let result = optimizer.optimize(&request, &[zone], &[]).await;

    assert!(result.success);
    assert!(result.best_route.is_some());
    assert!(!result.constraints.warnings.is_empty());
}

#[tokio::test]
async fn missing_street_data_falls_back_to_synthetic_path() {
    let optimizer = RouteOptimizer::new(
        Arc::new(NullStreetProvider),
        Arc::new(NullElevationProvider),
        Arc::new(NullObstacleProvider),
        &Config::default(),
    );
    let result = optimizer
        .optimize(&fire_engine_request(OptimizationGoal::Fastest), &[], &[])
        .await;

    assert!(result.success);
    assert!(result.degraded);
    let best = result.best_route.as_ref().expect("fallback route");
    assert!(best.total_distance_m > 0.0);
    assert_eq!(best.optimization.method, "fallback");
    assert!(result
        .recommendations
        .iter()
        .any(|r| r.contains("simplified data")));
    // Degraded results are not memoized.
    assert!(optimizer.cache().is_empty());
}

#[tokio::test]
async fn empty_provider_response_falls_back() {
    let optimizer = optimizer_with(Vec::new());
    let result = optimizer
        .optimize(&OptimizationRequest::new(origin(), destination()), &[], &[])
        .await;
    assert!(result.success);
    assert!(result.degraded);
    assert!(result.best_route.is_some());
}

#[tokio::test]
async fn repeated_request_hits_cache_with_same_geometry() {
    let optimizer = optimizer_with(corridor(6));
    let request = fire_engine_request(OptimizationGoal::Balanced);

    let first = optimizer.optimize(&request, &[], &[]).await;
    let second = optimizer.optimize(&request, &[], &[]).await;

    assert!(!first.cached);
    assert!(second.cached);
    let geometry = |r: &siren_core::OptimizationResult| {
        r.best_route.as_ref().map(|route| route.geometry())
    };
    assert_eq!(geometry(&first), geometry(&second));
    assert!(second.optimization_time_ms <= first.optimization_time_ms.max(1.0));
    assert_eq!(optimizer.cache().stats().hits, 1);
}

#[tokio::test]
async fn vehicle_filter_leaving_nothing_reports_no_path() {
    let mut street = emergency_street("narrow", origin(), destination());
    street.properties.max_width_m = Some(2.0);
    let optimizer = optimizer_with(vec![street]);

    let result = optimizer
        .optimize(&fire_engine_request(OptimizationGoal::Fastest), &[], &[])
        .await;

    assert!(result.success);
    assert!(result.routes.is_empty());
    assert!(result.best_route.is_none());
    assert!(result
        .constraints
        .warnings
        .iter()
        .any(|w| w.contains("fire_engine")));
}

#[tokio::test]
async fn disconnected_network_reports_no_path() {
    let near_origin = emergency_street(
        "west",
        origin(),
        Coordinate::new(origin().lon + 0.001, origin().lat),
    );
    let near_destination = emergency_street(
        "east",
        Coordinate::new(destination().lon - 0.001, destination().lat),
        destination(),
    );
    let optimizer = optimizer_with(vec![near_origin, near_destination]);

    let result = optimizer
        .optimize(&fire_engine_request(OptimizationGoal::Shortest), &[], &[])
        .await;

    assert!(result.success);
    assert!(result.routes.is_empty());
    assert!(result
        .constraints
        .warnings
        .iter()
        .any(|w| w.contains("no path")));
}

#[tokio::test]
async fn invalid_request_is_rejected_without_computation() {
    let optimizer = optimizer_with(corridor(4));
    let request = OptimizationRequest {
        weights: PreferenceWeights {
            time: -2.0,
            ..PreferenceWeights::default()
        },
        ..OptimizationRequest::new(origin(), destination())
    };

    let result = optimizer.optimize(&request, &[], &[]).await;

    assert!(!result.success);
    assert!(result.error.is_some());
    assert!(result.routes.is_empty());
    assert!(optimizer.cache().is_empty());
}

#[tokio::test]
async fn impossible_distance_limit_keeps_least_bad_route() {
    let optimizer = optimizer_with(corridor(4));
    let request = OptimizationRequest {
        constraints: RouteConstraints {
            max_distance_m: Some(10.0),
            ..RouteConstraints::default()
        },
        ..fire_engine_request(OptimizationGoal::Shortest)
    };

    let result = optimizer.optimize(&request, &[], &[]).await;

    assert!(result.success);
    assert_eq!(result.routes.len(), 1);
    assert!(!result.constraints.violated.is_empty());
    assert!(result
        .constraints
        .warnings
        .iter()
        .any(|w| w.contains("least-bad")));
}
