//! REST API routes.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    routing::{delete, get, post},
    Json, Router,
};
use serde_json::{json, Value};
use siren_core::{ErrorKind, OptimizationRequest, OptimizationResult, RoutingError};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::api::hazards;
use crate::api::request_id::ensure_request_id;
use crate::cache::CacheStats;
use crate::state::AppState;

/// Create the API router.
pub fn create_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/v1/routes/optimize", post(optimize_route))
        .route("/v1/routes/cache", get(cache_stats).delete(clear_cache))
        .route(
            "/v1/hazards",
            get(hazards::list_hazards).post(hazards::create_hazard),
        )
        .route(
            "/v1/hazards/:id",
            get(hazards::get_hazard)
                .put(hazards::update_hazard)
                .delete(hazards::delete_hazard),
        )
        .route(
            "/v1/traffic",
            get(hazards::list_traffic).post(hazards::create_traffic),
        )
        .route("/v1/traffic/:id", delete(hazards::delete_traffic))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(ensure_request_id))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// HTTP status for an optimization outcome.
fn status_for(result: &OptimizationResult) -> StatusCode {
    match (result.success, result.error_kind) {
        (true, _) => StatusCode::OK,
        (false, Some(ErrorKind::InvalidInput)) => StatusCode::BAD_REQUEST,
        (false, _) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

async fn optimize_route(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<OptimizationRequest>, JsonRejection>,
) -> (StatusCode, Json<OptimizationResult>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            let error = RoutingError::InvalidRequest(rejection.body_text());
            tracing::warn!("Rejected optimization payload: {}", error);
            return (
                StatusCode::BAD_REQUEST,
                Json(OptimizationResult::failure(&error, 0.0)),
            );
        }
    };
    let result = state.optimize(&request).await;
    let status = status_for(&result);
    match &result.best_route {
        Some(best) => tracing::info!(
            "Optimized {} route: best {} ({:.0} m, {:.0} s) of {} candidates in {:.1} ms{}",
            request.vehicle_type.as_str(),
            best.id,
            best.total_distance_m,
            best.total_time_s,
            result.routes.len(),
            result.optimization_time_ms,
            if result.cached { " [cached]" } else { "" }
        ),
        None if result.success => {
            tracing::info!("Optimization found no route: {:?}", result.constraints.warnings)
        }
        None => tracing::warn!(
            "Optimization failed ({}): {}",
            status,
            result.error.as_deref().unwrap_or("unknown error")
        ),
    }
    (status, Json(result))
}

async fn cache_stats(State(state): State<Arc<AppState>>) -> Json<CacheStats> {
    Json(state.optimizer().cache().stats())
}

async fn clear_cache(State(state): State<Arc<AppState>>) -> StatusCode {
    state.optimizer().cache().clear();
    tracing::info!("Cleared optimization cache");
    StatusCode::NO_CONTENT
}
