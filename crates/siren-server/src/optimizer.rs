//! Optimization pipeline.
//!
//! validate -> cache -> street fetch (or fallback) -> vehicle filter ->
//! candidates -> constraints -> ranking -> metrics -> terrain -> cache.

use reqwest::Client;
use siren_core::metrics::STEEP_SLOPE_DEG;
use siren_core::terrain::sample_points;
use siren_core::{
    analyze, best_and_alternatives, fallback_routes, filter_segments, generate_candidates,
    rank_routes, route_metrics, validate_routes, AnalysisConfig, CandidateContext,
    ConstraintReport, Coordinate, FallbackConfig, HazardZone, Obstacle, OptimizationRequest,
    OptimizationResult, Route, RouteMetrics, RoutingError, SearchConfig, StreetNetwork,
    StreetQuery, TerrainAnalysis, TrafficCondition,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::cache::OptimizationCache;
use crate::config::Config;
use crate::obstacles::{NullObstacleProvider, ObstacleProvider, OverpassObstacleProvider};
use crate::streets::{
    HttpStreetProvider, NullStreetProvider, StaticStreetProvider, StreetDataProvider,
};
use crate::terrain::{ElevationProvider, NullElevationProvider, OpenMeteoElevationProvider};

pub struct RouteOptimizer {
    streets: Arc<dyn StreetDataProvider>,
    elevation: Arc<dyn ElevationProvider>,
    obstacles: Arc<dyn ObstacleProvider>,
    cache: OptimizationCache,
    search: SearchConfig,
    analysis: AnalysisConfig,
    fallback: FallbackConfig,
    query_padding_m: f64,
}

/// Street network after the provider call, or the reason there is none.
enum StreetSource {
    Network(StreetNetwork),
    Unavailable,
}

impl RouteOptimizer {
    pub fn new(
        streets: Arc<dyn StreetDataProvider>,
        elevation: Arc<dyn ElevationProvider>,
        obstacles: Arc<dyn ObstacleProvider>,
        config: &Config,
    ) -> Self {
        Self {
            streets,
            elevation,
            obstacles,
            cache: OptimizationCache::new(config.cache_capacity),
            search: config.search_config(),
            analysis: config.analysis_config(),
            fallback: FallbackConfig::default(),
            query_padding_m: config.street_query_padding_m,
        }
    }

    /// Wire providers from configuration. Unset endpoints get null providers.
    pub fn from_config(config: &Config) -> Self {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|err| {
                tracing::warn!("HTTP client build failed, using defaults: {}", err);
                Client::new()
            });

        let streets: Arc<dyn StreetDataProvider> = if !config.street_provider_url.trim().is_empty()
        {
            Arc::new(HttpStreetProvider::new(client.clone(), config))
        } else if !config.street_data_path.trim().is_empty() {
            match StaticStreetProvider::from_file(&config.street_data_path) {
                Ok(provider) => {
                    tracing::info!("Loaded {} static streets", provider.len());
                    Arc::new(provider)
                }
                Err(err) => {
                    tracing::warn!("Static street data unavailable, routing degraded: {}", err);
                    Arc::new(NullStreetProvider)
                }
            }
        } else {
            tracing::warn!("No street source configured, every route will be degraded");
            Arc::new(NullStreetProvider)
        };

        let elevation: Arc<dyn ElevationProvider> =
            if config.terrain_provider_url.trim().is_empty() {
                Arc::new(NullElevationProvider)
            } else {
                Arc::new(OpenMeteoElevationProvider::new(client.clone(), config))
            };

        let obstacles: Arc<dyn ObstacleProvider> =
            if config.obstacle_overpass_url.trim().is_empty() {
                Arc::new(NullObstacleProvider)
            } else {
                Arc::new(OverpassObstacleProvider::new(client, config))
            };

        tracing::info!("Street provider: {}", streets.name());
        Self::new(streets, elevation, obstacles, config)
    }

    pub fn cache(&self) -> &OptimizationCache {
        &self.cache
    }

    /// Run one optimization. Always returns a well-formed result.
    pub async fn optimize(
        &self,
        request: &OptimizationRequest,
        hazards: &[HazardZone],
        traffic: &[TrafficCondition],
    ) -> OptimizationResult {
        let started = Instant::now();
        if let Err(err) = request.validate() {
            tracing::debug!("Rejected optimization request: {}", err);
            return OptimizationResult::failure(&err, elapsed_ms(started));
        }

        let key = request.cache_key();
        if let Some(mut cached) = self.cache.get(&key) {
            tracing::debug!("Optimization cache hit");
            cached.cached = true;
            cached.optimization_time_ms = elapsed_ms(started);
            return cached;
        }

        match self.compute(request, hazards, traffic, started).await {
            Ok(result) => {
                if result.success && !result.degraded {
                    self.cache.insert(key, result.clone());
                }
                result
            }
            Err(err) => {
                tracing::warn!("Optimization failed: {}", err);
                OptimizationResult::failure(&err, elapsed_ms(started))
            }
        }
    }

    async fn compute(
        &self,
        request: &OptimizationRequest,
        hazards: &[HazardZone],
        traffic: &[TrafficCondition],
        started: Instant,
    ) -> Result<OptimizationResult, RoutingError> {
        let stops = request.stops()?;
        let query = StreetQuery::covering(&stops, self.query_padding_m)
            .ok_or_else(|| RoutingError::InvalidRequest("stops have no finite extent".to_string()))?;

        let source = self.fetch_network(&query).await;
        let degraded = matches!(source, StreetSource::Unavailable);
        let full_network = match source {
            StreetSource::Network(network) => network,
            StreetSource::Unavailable => StreetNetwork::default(),
        };
        let network =
            full_network.with_segments(filter_segments(full_network.segments(), request.vehicle_type));

        let ctx = CandidateContext {
            network: &network,
            vehicle: request.vehicle_type,
            priority: request.effective_priority(),
            hazard_zones: hazards,
            traffic,
            avoid_hazards: request.constraints.avoid_hazards,
            search: self.search,
        };

        let mut warnings = Vec::new();
        let candidates = if degraded {
            warnings.push("street data unavailable; using simplified fallback routes".to_string());
            fallback_routes(&ctx, &stops, request.goal, &self.fallback)
        } else if network.is_empty() {
            warnings.push(format!(
                "no streets in the area are usable by {}",
                request.vehicle_type.as_str()
            ));
            Vec::new()
        } else {
            let set = generate_candidates(&ctx, &stops, request.goal);
            tracing::debug!(
                "Generated {} candidates ({} unreachable, {} nodes)",
                set.routes.len(),
                set.unreachable.len(),
                set.nodes_visited
            );
            if set.truncated {
                warnings.push(format!(
                    "search stopped after {} node expansions; routes may be suboptimal",
                    self.search.max_expanded_nodes
                ));
            }
            if set.routes.is_empty() {
                warnings.push(
                    "no path connects the requested stops on the available street network"
                        .to_string(),
                );
            }
            set.routes
        };

        let validation = validate_routes(candidates, &request.constraints);
        let mut report = validation.report;
        report.warnings.extend(warnings);

        let ranked = rank_routes(validation.accepted, &request.weights);
        let (best_route, alternatives) = best_and_alternatives(&ranked);
        let routes: Vec<Route> = ranked.into_iter().map(|scored| scored.route).collect();
        let metrics: Vec<RouteMetrics> = routes.iter().map(route_metrics).collect();

        let terrain = match &best_route {
            Some(best) => Some(self.analyze_terrain(best, hazards, &full_network).await),
            None => None,
        };

        let recommendations = recommendations(
            best_route.as_ref(),
            metrics.first(),
            terrain.as_ref(),
            &report,
            degraded,
        );

        Ok(OptimizationResult {
            success: true,
            routes,
            best_route,
            alternatives,
            metrics,
            terrain,
            optimization_time_ms: elapsed_ms(started),
            constraints: report,
            recommendations,
            degraded,
            cached: false,
            error: None,
            error_kind: None,
            generated_at: chrono::Utc::now(),
        })
    }

    async fn fetch_network(&self, query: &StreetQuery) -> StreetSource {
        let response = self.streets.get_street_data(query).await;
        if !response.is_usable() {
            tracing::warn!(
                "Street provider {} returned no usable data, falling back",
                self.streets.name()
            );
            return StreetSource::Unavailable;
        }
        let (network, rejected) = StreetNetwork::from_segments(response.streets);
        for err in &rejected {
            tracing::warn!("Skipping street: {}", err);
        }
        if network.is_empty() {
            tracing::warn!("Every street from {} was malformed, falling back", self.streets.name());
            return StreetSource::Unavailable;
        }
        StreetSource::Network(network)
    }

    /// Terrain and obstacle lookups run concurrently.
    async fn analyze_terrain(
        &self,
        route: &Route,
        hazards: &[HazardZone],
        network: &StreetNetwork,
    ) -> TerrainAnalysis {
        let points: Vec<Coordinate> = sample_points(route, &self.analysis);
        let (elevations, mut obstacles) = tokio::join!(
            self.elevation.query_elevations(&points),
            self.obstacles.obstacles_near(&points)
        );
        obstacles.extend(hazards.iter().filter_map(Obstacle::from_zone));
        analyze(&route.id, &points, &elevations, &obstacles, network, &self.analysis)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn recommendations(
    best: Option<&Route>,
    metrics: Option<&RouteMetrics>,
    terrain: Option<&TerrainAnalysis>,
    report: &ConstraintReport,
    degraded: bool,
) -> Vec<String> {
    let mut out = Vec::new();
    let Some(best) = best else {
        out.push("No route available; widen constraints or check the street data".to_string());
        return out;
    };

    let emergency_only = best
        .segments
        .iter()
        .filter(|s| s.properties.accessibility.emergency_access)
        .count();
    if emergency_only > 0 && best.vehicle_type.is_emergency() {
        out.push(format!(
            "Best route uses {} emergency-access segments; confirm access is open",
            emergency_only
        ));
    }
    if best.max_slope_deg > STEEP_SLOPE_DEG {
        out.push(format!(
            "Steep slopes up to {:.1} deg on route; reduce speed",
            best.max_slope_deg
        ));
    }
    let disrupted = best
        .segments
        .iter()
        .filter(|s| !s.properties.traffic.is_empty())
        .count();
    if disrupted > 0 {
        out.push(format!(
            "Traffic disruptions on {} segments of the best route",
            disrupted
        ));
    }
    if best.hazard_count() > 0 {
        out.push(format!(
            "Route passes {} hazard-flagged segments; proceed with caution",
            best.hazard_count()
        ));
    }
    if let Some(metrics) = metrics {
        if !metrics.accessibility.emergency_compatible && best.vehicle_type.is_emergency() {
            out.push("Best route is not fully emergency-vehicle compatible".to_string());
        }
    }
    if degraded {
        out.push("Route built from simplified data; verify conditions on arrival".to_string());
    }
    if !report.violated.is_empty() && report.warnings.iter().any(|w| w.contains("least-bad")) {
        out.push("No candidate met every constraint; review the limits".to_string());
    }
    if let Some(terrain) = terrain {
        out.extend(terrain.warnings.iter().map(|w| format!("Terrain: {w}")));
    }
    out
}
