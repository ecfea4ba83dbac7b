//! Hazard zone and traffic condition endpoints.
//!
//! Every mutation clears the optimization cache.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use siren_core::{
    AvoidancePolicy, Coordinate, HazardShape, HazardZone, TrafficCondition, TrafficKind,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::state::AppState;

type ApiError = (StatusCode, Json<Value>);

fn bad_request(errors: Vec<String>) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({ "error": errors.join("; ") })),
    )
}

fn default_true() -> bool {
    true
}

fn default_traffic_radius() -> f64 {
    100.0
}

#[derive(Debug, Deserialize)]
pub struct HazardPayload {
    pub name: String,
    pub shape: HazardShape,
    pub severity: u8,
    #[serde(default)]
    pub policy: AvoidancePolicy,
    #[serde(default)]
    pub buffer_m: f64,
    #[serde(default = "default_true")]
    pub active: bool,
}

impl HazardPayload {
    fn into_zone(self, id: String) -> HazardZone {
        HazardZone {
            id,
            name: self.name,
            shape: self.shape,
            severity: self.severity,
            policy: self.policy,
            buffer_m: self.buffer_m,
            active: self.active,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TrafficPayload {
    pub kind: TrafficKind,
    pub position: Coordinate,
    pub severity: u8,
    #[serde(default)]
    pub affected_lanes: u32,
    #[serde(default = "default_traffic_radius")]
    pub radius_m: f64,
}

/// Create a new hazard zone.
pub async fn create_hazard(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<HazardPayload>,
) -> Result<(StatusCode, Json<HazardZone>), ApiError> {
    let zone = payload.into_zone(Uuid::new_v4().to_string());
    let errors = zone.validate();
    if !errors.is_empty() {
        return Err(bad_request(errors));
    }
    state.upsert_hazard(zone.clone());
    tracing::info!("Created hazard zone '{}' ({})", zone.name, zone.id);
    Ok((StatusCode::CREATED, Json(zone)))
}

pub async fn list_hazards(State(state): State<Arc<AppState>>) -> Json<Vec<HazardZone>> {
    Json(state.get_hazards())
}

pub async fn get_hazard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<HazardZone>, StatusCode> {
    state.get_hazard(&id).map(Json).ok_or(StatusCode::NOT_FOUND)
}

/// Replace an existing hazard zone, keeping its id.
pub async fn update_hazard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<HazardPayload>,
) -> Result<Json<HazardZone>, ApiError> {
    if state.get_hazard(&id).is_none() {
        return Err((
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("hazard {id} not found") })),
        ));
    }
    let zone = payload.into_zone(id);
    let errors = zone.validate();
    if !errors.is_empty() {
        return Err(bad_request(errors));
    }
    state.upsert_hazard(zone.clone());
    tracing::info!("Updated hazard zone {}", zone.id);
    Ok(Json(zone))
}

pub async fn delete_hazard(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.remove_hazard(&id) {
        tracing::info!("Deleted hazard zone {}", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn create_traffic(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<TrafficPayload>,
) -> Result<(StatusCode, Json<TrafficCondition>), ApiError> {
    let condition = TrafficCondition {
        id: Uuid::new_v4().to_string(),
        kind: payload.kind,
        position: payload.position,
        severity: payload.severity,
        affected_lanes: payload.affected_lanes,
        radius_m: payload.radius_m,
    };
    let errors = condition.validate();
    if !errors.is_empty() {
        return Err(bad_request(errors));
    }
    state.upsert_traffic(condition.clone());
    tracing::info!("Created {:?} traffic condition {}", condition.kind, condition.id);
    Ok((StatusCode::CREATED, Json(condition)))
}

pub async fn list_traffic(State(state): State<Arc<AppState>>) -> Json<Vec<TrafficCondition>> {
    Json(state.get_traffic())
}

pub async fn delete_traffic(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> StatusCode {
    if state.remove_traffic(&id) {
        tracing::info!("Deleted traffic condition {}", id);
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
