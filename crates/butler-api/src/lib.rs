//! Butler - conversational home assistant API
//!
//! Wires the device store, schedule store, external sync adapter and
//! reasoning service behind an axum router.

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use home_state::{DeviceController, DeviceStateStore, SyncAdapter};
use schedule_engine::{ScheduleStore, Scheduler};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod butler;
pub mod config;
pub mod openai;
pub mod reasoning;
pub mod routes;
pub mod tools;
mod websocket;

pub use butler::Butler;
pub use config::AppConfig;
pub use reasoning::{ReasoningError, ReasoningReply, ReasoningService, ToolCall};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub devices: Arc<DeviceStateStore>,
    pub schedules: Arc<ScheduleStore>,
    pub sync: SyncAdapter,
    pub butler: Arc<Butler>,
    pub scheduler: Arc<Scheduler>,
}

impl AppState {
    /// Assemble the shared services around existing stores
    pub fn new(
        devices: Arc<DeviceStateStore>,
        schedules: Arc<ScheduleStore>,
        sync: SyncAdapter,
        reasoner: Option<Arc<dyn ReasoningService>>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        let controller = DeviceController::new(devices.clone(), sync.clone());
        let butler = Arc::new(Butler::new(controller, schedules.clone(), reasoner));
        Self {
            devices,
            schedules,
            sync,
            butler,
            scheduler,
        }
    }
}

/// Build the HTTP router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/chat", post(routes::chat))
        .route("/devices", get(routes::list_devices))
        .route("/devices/log", get(routes::device_log))
        .route("/schedules", get(routes::list_schedules))
        .route("/schedules/:id", delete(routes::delete_schedule))
        .route("/reset", post(routes::reset))
        .route("/ha/status", get(routes::ha_status))
        .route("/ha/sync", post(routes::ha_sync))
        .route("/ha/entities", get(routes::ha_entities))
        .route("/ws", get(routes::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
