pub mod candidates;
pub mod cost;
pub mod error;
pub mod fallback;
pub mod metrics;
pub mod models;
pub mod pathfinding;
pub mod request;
pub mod scoring;
pub mod spatial;
pub mod street_index;
pub mod terrain;
pub mod validator;
pub mod vehicle;

pub use candidates::{generate_candidates, synthesize_route, CandidateContext, CandidateSet, RouteMethod};
pub use cost::{CostModel, CostPriority, EdgeCost, PenaltyRule};
pub use error::{ErrorKind, Result, RoutingError};
pub use fallback::{fallback_routes, fallback_segments, FallbackConfig};
pub use metrics::{route_metrics, RouteMetrics};
pub use models::{
    AvoidancePolicy, EmergencyPriority, HazardShape, HazardZone, OptimizationMetadata, PointRole,
    RoadCondition, RoadType, Route, RoutePoint, RouteSegment, RouteStatus, RouteVariant,
    StreetProperties, StreetSegment, TrafficCondition, TrafficKind, VehicleType,
};
pub use pathfinding::{find_path, PathResult, SearchConfig};
pub use request::{
    OptimizationGoal, OptimizationRequest, OptimizationResult, PreferenceWeights, RouteConstraints,
};
pub use scoring::{best_and_alternatives, rank_routes, score, ScoreBreakdown, ScoredRoute};
pub use spatial::{haversine_distance, Coordinate};
pub use street_index::{StreetFilters, StreetNetwork, StreetQuery, CONNECTION_TOLERANCE_M};
pub use terrain::{analyze, AnalysisConfig, Obstacle, ObstacleKind, TerrainAnalysis};
pub use validator::{validate_routes, ConstraintReport, Validation};
pub use vehicle::{filter_segments, VehicleProfile};
