//! HTTP API handlers.
//!
//! Reads go through the `StatusAggregator`; occupancy pushes write to the
//! `LivenessRegistry`; stop requests go through the `Decommissioner`.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use tracing::info;

use crate::ApiState;

/// Response wrapper for consistent API format.
#[derive(serde::Serialize)]
struct ApiResponse<T: serde::Serialize> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: serde::Serialize> ApiResponse<T> {
    fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
            error: None,
        })
    }
}

fn error_response(msg: &str, status: StatusCode) -> impl IntoResponse {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(msg.to_string()),
        }),
    )
}

// ── Health ─────────────────────────────────────────────────────

/// GET /api/health
pub async fn health() -> impl IntoResponse {
    ApiResponse::ok(serde_json::json!({ "status": "ok" }))
}

// ── Status ─────────────────────────────────────────────────────

/// GET /api/servers
pub async fn list_servers(State(state): State<ApiState>) -> impl IntoResponse {
    match state.aggregator.list_statuses() {
        Ok(statuses) => ApiResponse::ok(statuses).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

/// GET /api/servers/{name}
pub async fn get_server(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    match state.aggregator.status(&name) {
        Ok(Some(status)) => ApiResponse::ok(status).into_response(),
        Ok(None) => error_response("server not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Lifecycle ──────────────────────────────────────────────────

/// POST /api/servers/{name}/stop
pub async fn stop_server(
    State(state): State<ApiState>,
    Path(name): Path<String>,
) -> impl IntoResponse {
    info!(server = %name, "stop requested over the API");
    match state.decommissioner.stop(&name).await {
        Ok(true) => ApiResponse::ok("stopped").into_response(),
        Ok(false) => error_response("server not found", StatusCode::NOT_FOUND).into_response(),
        Err(e) => error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR).into_response(),
    }
}

// ── Occupancy pushes ───────────────────────────────────────────

/// Body for a current-count-only push.
#[derive(serde::Deserialize)]
pub struct PlayersRequest {
    pub current: i32,
}

/// POST /api/servers/{name}/players
///
/// Updates only the current count; the instance must already be known.
pub async fn push_players(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(req): Json<PlayersRequest>,
) -> impl IntoResponse {
    if state.registry.set_current_only(&name, req.current) {
        ApiResponse::ok("updated").into_response()
    } else {
        error_response("server not found", StatusCode::NOT_FOUND).into_response()
    }
}

/// Body for a full occupancy push.
#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CountsRequest {
    pub current: i32,
    pub max: i32,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// POST /api/servers/{name}/counts
///
/// Full upsert; an unknown name gets a registry entry. The entry stays
/// while its pushes keep it fresh; once stale the renewal loop removes it.
pub async fn push_counts(
    State(state): State<ApiState>,
    Path(name): Path<String>,
    Json(req): Json<CountsRequest>,
) -> impl IntoResponse {
    state
        .registry
        .set_counts_with_display(&name, req.display_name.as_deref(), req.current, req.max);
    ApiResponse::ok("updated").into_response()
}
