//! Candidate generation: one A* search per route variant, then synthesis of
//! the segment chain into an output [`Route`].

use serde::{Deserialize, Serialize};

use crate::cost::CostModel;
use crate::metrics::performance_scores;
use crate::models::{
    EmergencyPriority, HazardZone, OptimizationMetadata, PointAccessibility, PointRole,
    RoadCondition, RoadType, Route, RoutePoint, RouteSegment, RouteSegmentProperties,
    RouteVariant, SegmentAccessibility, StreetSegment, TrafficCondition, VehicleType,
};
use crate::pathfinding::{search, SearchConfig};
use crate::request::OptimizationGoal;
use crate::spatial::Coordinate;
use crate::street_index::StreetNetwork;

/// How a route's segment chain was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMethod {
    AStar,
    Fallback,
}

impl RouteMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AStar => "a_star",
            Self::Fallback => "fallback",
        }
    }
}

/// Everything a candidate search needs besides the stops.
#[derive(Debug, Clone, Copy)]
pub struct CandidateContext<'a> {
    /// Network already narrowed by the vehicle filter.
    pub network: &'a StreetNetwork,
    pub vehicle: VehicleType,
    pub priority: EmergencyPriority,
    pub hazard_zones: &'a [HazardZone],
    pub traffic: &'a [TrafficCondition],
    /// Apply caller hazard zones to every variant's cost, not just hazard-avoiding.
    pub avoid_hazards: bool,
    pub search: SearchConfig,
}

#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    pub routes: Vec<Route>,
    /// Variants whose search found no path.
    pub unreachable: Vec<RouteVariant>,
    /// At least one leg hit the expansion bound.
    pub truncated: bool,
    pub nodes_visited: usize,
}

struct LegChain {
    segments: Vec<StreetSegment>,
    nodes_visited: usize,
    truncated: bool,
}

/// Search each consecutive pair of stops and join the legs.
///
/// A segment shared at a leg joint is kept once. Any unreachable leg makes
/// the whole chain empty.
fn search_legs(
    ctx: &CandidateContext<'_>,
    stops: &[Coordinate],
    cost: &CostModel<'_>,
) -> LegChain {
    let mut chain = LegChain {
        segments: Vec::new(),
        nodes_visited: 0,
        truncated: false,
    };
    for pair in stops.windows(2) {
        let (Some(start), Some(end)) = (
            ctx.network.nearest_segment(&pair[0]),
            ctx.network.nearest_segment(&pair[1]),
        ) else {
            chain.segments.clear();
            return chain;
        };
        let leg = search(ctx.network, start, end, cost, &ctx.search);
        chain.nodes_visited += leg.nodes_visited;
        chain.truncated |= leg.truncated;
        if !leg.found() {
            chain.segments.clear();
            return chain;
        }
        let mut leg_segments = leg.segments.into_iter().peekable();
        if let (Some(last), Some(first)) = (chain.segments.last(), leg_segments.peek()) {
            if last.id == first.id {
                leg_segments.next();
            }
        }
        chain.segments.extend(leg_segments);
    }
    chain
}

/// Run one search per variant of `goal` and synthesize the resulting routes.
pub fn generate_candidates(
    ctx: &CandidateContext<'_>,
    stops: &[Coordinate],
    goal: OptimizationGoal,
) -> CandidateSet {
    let mut set = CandidateSet::default();
    if stops.len() < 2 || ctx.network.is_empty() {
        set.unreachable = goal.variants().to_vec();
        return set;
    }

    for &variant in goal.variants() {
        let cost = CostModel::new(ctx.vehicle, variant)
            .with_hazard_zones(ctx.hazard_zones, ctx.avoid_hazards);
        let chain = search_legs(ctx, stops, &cost);
        set.nodes_visited += chain.nodes_visited;
        set.truncated |= chain.truncated;
        if chain.segments.is_empty() {
            set.unreachable.push(variant);
            continue;
        }
        set.routes.push(synthesize_route(
            ctx,
            variant,
            RouteMethod::AStar,
            &chain.segments,
            stops,
            chain.nodes_visited,
        ));
    }
    set
}

/// Orient each segment so the chain runs from the first stop to the last.
fn orient_chain(segments: &[StreetSegment], origin: Coordinate) -> Vec<(Vec<Coordinate>, bool)> {
    let mut oriented: Vec<(Vec<Coordinate>, bool)> = Vec::with_capacity(segments.len());
    let mut cursor = origin;
    for (idx, segment) in segments.iter().enumerate() {
        let reversed = if idx == 0 {
            match segments.get(1) {
                // Leave the first segment from the end that does not touch the second.
                Some(next) => {
                    let joint = |c: &Coordinate| {
                        c.distance_to(&next.start()).min(c.distance_to(&next.end()))
                    };
                    joint(&segment.start()) < joint(&segment.end())
                }
                None => segment.end().distance_to(&cursor) < segment.start().distance_to(&cursor),
            }
        } else {
            segment.end().distance_to(&cursor) < segment.start().distance_to(&cursor)
        };
        let mut geometry = segment.geometry.clone();
        if reversed {
            geometry.reverse();
        }
        cursor = geometry[geometry.len() - 1];
        oriented.push((geometry, reversed));
    }
    oriented
}

/// Travel-time scale a variant applies to its estimates.
fn time_factor(variant: RouteVariant) -> f64 {
    match variant {
        RouteVariant::Highway => 0.5,
        RouteVariant::Arterial => 0.75,
        RouteVariant::LocalRoads => 1.2,
        _ => 1.0,
    }
}

fn mapped_road_type(variant: RouteVariant, native: RoadType) -> RoadType {
    match variant {
        RouteVariant::Highway => RoadType::Highway,
        RouteVariant::Arterial if native != RoadType::Highway => RoadType::Arterial,
        _ => native,
    }
}

fn detected_hazards(segment: &StreetSegment, geometry: &[Coordinate], zones: &[HazardZone]) -> Vec<String> {
    let mut hazards = Vec::new();
    if segment.properties.hazard_zone {
        hazards.push(format!("street:{}", segment.id));
    }
    hazards.extend(
        zones
            .iter()
            .filter(|zone| zone.intersects_polyline(geometry))
            .map(|zone| zone.id.clone()),
    );
    hazards
}

/// Chain street segments into an output route under a variant's property mapping.
pub fn synthesize_route(
    ctx: &CandidateContext<'_>,
    variant: RouteVariant,
    method: RouteMethod,
    segments: &[StreetSegment],
    stops: &[Coordinate],
    nodes_visited: usize,
) -> Route {
    let origin = stops
        .first()
        .copied()
        .or_else(|| segments.first().map(|s| s.start()))
        .unwrap_or(Coordinate::new(0.0, 0.0));
    let oriented = orient_chain(segments, origin);

    let mut points: Vec<RoutePoint> = Vec::with_capacity(segments.len() + 1);
    let mut route_segments: Vec<RouteSegment> = Vec::with_capacity(segments.len());
    let mut elevation = 0.0;

    for (idx, (segment, (geometry, reversed))) in segments.iter().zip(oriented).enumerate() {
        let props = &segment.properties;
        let start = geometry[0];
        let end = geometry[geometry.len() - 1];

        if idx == 0 {
            points.push(RoutePoint {
                coordinate: start,
                role: PointRole::Start,
                elevation_m: elevation,
                accessibility: PointAccessibility {
                    emergency_access: props.emergency_access,
                    building_access: props.sidewalk,
                },
            });
        }

        let grade = if reversed {
            -props.incline_percent
        } else {
            props.incline_percent
        };
        let rise = props.length_m * grade / 100.0;
        elevation += rise;

        let building_access = props.sidewalk || variant == RouteVariant::BuildingAccess;
        let emergency_access = props.emergency_access;
        let restricted = props.max_weight_kg.is_some()
            || props.max_height_m.is_some()
            || props.max_width_m.is_some();
        let start_point = points[points.len() - 1].coordinate;

        points.push(RoutePoint {
            coordinate: end,
            role: if idx + 1 == segments.len() {
                PointRole::Destination
            } else {
                PointRole::Waypoint
            },
            elevation_m: elevation,
            accessibility: PointAccessibility {
                emergency_access,
                building_access,
            },
        });

        route_segments.push(RouteSegment {
            street_id: match method {
                RouteMethod::AStar => Some(segment.id.clone()),
                RouteMethod::Fallback => None,
            },
            start: start_point,
            end,
            properties: RouteSegmentProperties {
                distance_m: props.length_m,
                travel_time_s: segment.travel_time_s() * time_factor(variant),
                elevation_gain_m: rise.max(0.0),
                elevation_loss_m: (-rise).max(0.0),
                slope_deg: segment.slope_deg().abs(),
                road_type: mapped_road_type(variant, segment.road_type()),
                condition: props.condition,
                lit: props.lighting,
                hazards_detected: detected_hazards(segment, &geometry, ctx.hazard_zones),
                traffic: ctx
                    .traffic
                    .iter()
                    .filter(|t| t.affects_polyline(&geometry))
                    .map(|t| t.id.clone())
                    .collect(),
                accessibility: SegmentAccessibility {
                    emergency_access,
                    high_priority: emergency_access
                        || props.evacuation_route
                        || variant == RouteVariant::EmergencyAccess,
                    impassable: props.condition == RoadCondition::Closed,
                    restricted,
                    building_access,
                },
            },
            geometry,
        });
    }

    let performance = performance_scores(&route_segments);
    Route::assemble(
        format!("{}-{}", variant.as_str(), ctx.vehicle.as_str()),
        points,
        route_segments,
        ctx.vehicle,
        ctx.priority,
        OptimizationMetadata {
            method: method.as_str().to_string(),
            variant,
            performance_score: performance.overall,
            reliability_score: performance.time_reliability,
            nodes_visited,
        },
    )
}
