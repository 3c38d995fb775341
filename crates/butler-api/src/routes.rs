//! HTTP handlers

use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::{websocket, AppState};

/// Envelope for the auxiliary endpoints
#[derive(Serialize)]
pub struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn success<T: Serialize>(data: T) -> Self {
        Self {
            success: true,
            data: Some(serde_json::to_value(data).unwrap_or(serde_json::Value::Null)),
            error: None,
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
        }
    }
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ApiResponse::error(msg))).into_response()
}

fn ha_disabled() -> Response {
    error_response(
        StatusCode::BAD_REQUEST,
        "Home Assistant integration is disabled",
    )
}

#[derive(Deserialize)]
pub struct ChatRequest {
    message: String,
}

pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Run one conversational turn and return the reply with the device map
pub async fn chat(State(state): State<AppState>, Json(req): Json<ChatRequest>) -> Response {
    if req.message.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "Empty message");
    }

    match state.butler.chat(&req.message).await {
        Ok(response) => Json(json!({
            "response": response,
            "devices": state.devices.get_all(),
        }))
        .into_response(),
        Err(e) => {
            tracing::error!("Chat failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

pub async fn list_devices(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.devices.get_all())
}

#[derive(Deserialize)]
pub struct LogQuery {
    #[serde(default = "default_log_limit")]
    limit: usize,
}

fn default_log_limit() -> usize {
    10
}

/// Most recent device changes, oldest first
pub async fn device_log(
    State(state): State<AppState>,
    Query(query): Query<LogQuery>,
) -> impl IntoResponse {
    Json(ApiResponse::success(state.devices.recent_changes(query.limit)))
}

/// Every known task, ordered by trigger time
pub async fn list_schedules(State(state): State<AppState>) -> impl IntoResponse {
    let mut tasks = state.schedules.all_tasks();
    schedule_engine::evaluator::sort_by_trigger(&mut tasks);
    Json(tasks)
}

pub async fn delete_schedule(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    if state.schedules.delete_task(&id) {
        Json(ApiResponse::success(json!({ "deleted": id }))).into_response()
    } else {
        error_response(StatusCode::NOT_FOUND, format!("Task {id} not found"))
    }
}

/// Forget the conversation and resync (or reseed) the devices
pub async fn reset(State(state): State<AppState>) -> impl IntoResponse {
    state.butler.reset().await;

    if state.sync.is_enabled() {
        let synced = state.sync.pull_sync(&state.devices).await;
        tracing::info!("Reset: resynced {} devices", synced);
    } else {
        state.devices.reset_to_seed();
        tracing::info!("Reset: restored seed devices");
    }

    Json(json!({ "status": "ok" }))
}

pub async fn ha_status(State(state): State<AppState>) -> Response {
    match state.sync.status().await {
        Some(status) => Json(ApiResponse::success(status)).into_response(),
        None => ha_disabled(),
    }
}

pub async fn ha_sync(State(state): State<AppState>) -> Response {
    if !state.sync.is_enabled() {
        return ha_disabled();
    }
    let synced = state.sync.pull_sync(&state.devices).await;
    Json(ApiResponse::success(json!({
        "synced": synced,
        "devices": state.devices.get_all(),
    })))
    .into_response()
}

#[derive(Deserialize)]
pub struct EntitiesQuery {
    domain: Option<String>,
}

pub async fn ha_entities(
    State(state): State<AppState>,
    Query(query): Query<EntitiesQuery>,
) -> Response {
    let domain = query.domain.as_deref().filter(|d| !d.is_empty());
    match state.sync.entities(domain).await {
        Some(Ok(entities)) => Json(ApiResponse::success(entities)).into_response(),
        Some(Err(e)) => error_response(StatusCode::BAD_GATEWAY, e.to_string()),
        None => ha_disabled(),
    }
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| websocket::handle_socket(socket, state))
}
