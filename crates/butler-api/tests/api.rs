//! HTTP surface tests driven through the router without binding a port

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use butler_api::{router, AppState, ReasoningError, ReasoningReply, ReasoningService};
use butler_api::reasoning::ReasoningTurn;
use chrono::{Duration as ChronoDuration, Local};
use ha_client::{AutomationBackend, ConnectionStatus, EntityState, HaError, ServiceCall};
use home_state::{DeviceController, DeviceStateStore, SyncAdapter};
use http_body_util::BodyExt;
use schedule_engine::{ActionExecutor, NewTask, Repeat, ScheduleStore, Scheduler};
use serde_json::{json, Value};
use tower::ServiceExt;

struct EchoReasoner;

#[async_trait]
impl ReasoningService for EchoReasoner {
    async fn respond(&self, turn: ReasoningTurn<'_>) -> Result<ReasoningReply, ReasoningError> {
        Ok(ReasoningReply::answer(format!(
            "{} messages so far",
            turn.transcript.len()
        )))
    }
}

struct FailingReasoner;

#[async_trait]
impl ReasoningService for FailingReasoner {
    async fn respond(&self, _turn: ReasoningTurn<'_>) -> Result<ReasoningReply, ReasoningError> {
        Err(ReasoningError::Status(502))
    }
}

#[derive(Default)]
struct StubBackend {
    calls: Mutex<Vec<ServiceCall>>,
}

#[async_trait]
impl AutomationBackend for StubBackend {
    async fn check_connection(&self) -> ConnectionStatus {
        ConnectionStatus {
            connected: true,
            message: "API running.".into(),
        }
    }

    async fn get_states(&self) -> Result<Vec<EntityState>, HaError> {
        Ok(vec![
            EntityState::new("light.kitchen_ceiling", "on").with_attribute("brightness", 255),
            EntityState::new("switch.garden_pump", "off"),
        ])
    }

    async fn call_service(&self, call: &ServiceCall) -> Result<(), HaError> {
        self.calls.lock().unwrap().push(call.clone());
        Ok(())
    }
}

struct Harness {
    app: Router,
    devices: Arc<DeviceStateStore>,
    schedules: Arc<ScheduleStore>,
}

fn harness(sync: SyncAdapter, reasoner: Option<Arc<dyn ReasoningService>>) -> Harness {
    let devices = Arc::new(DeviceStateStore::with_seed());
    let schedules = Arc::new(ScheduleStore::new());
    let controller = DeviceController::new(devices.clone(), sync.clone());
    let scheduler = Arc::new(Scheduler::new(
        schedules.clone(),
        ActionExecutor::new(controller),
        Duration::from_secs(30),
    ));
    let state = AppState::new(devices.clone(), schedules.clone(), sync, reasoner, scheduler);
    Harness {
        app: router(state),
        devices,
        schedules,
    }
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn test_health_reports_ok() {
    let h = harness(SyncAdapter::disabled(), None);
    let (status, body) = send(&h.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_chat_fast_path_returns_devices() {
    let h = harness(SyncAdapter::disabled(), None);
    let (status, body) = send(
        &h.app,
        "POST",
        "/chat",
        Some(json!({"message": "turn on bedroom light"})),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["response"], "Turned on Bedroom light.");
    assert_eq!(body["devices"]["light_bedroom"]["status"], "on");
    assert_eq!(body["devices"]["light_bedroom"]["properties"]["brightness"], 100);
}

#[tokio::test]
async fn test_chat_rejects_empty_message() {
    let h = harness(SyncAdapter::disabled(), None);
    let (status, body) = send(&h.app, "POST", "/chat", Some(json!({"message": "   "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_chat_uses_reasoner_and_reset_forgets() {
    let h = harness(SyncAdapter::disabled(), Some(Arc::new(EchoReasoner)));

    let (_, first) = send(&h.app, "POST", "/chat", Some(json!({"message": "hello"}))).await;
    assert_eq!(first["response"], "1 messages so far");
    let (_, second) = send(&h.app, "POST", "/chat", Some(json!({"message": "again"}))).await;
    assert_eq!(second["response"], "3 messages so far");

    let (status, _) = send(&h.app, "POST", "/reset", None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, third) = send(&h.app, "POST", "/chat", Some(json!({"message": "hi"}))).await;
    assert_eq!(third["response"], "1 messages so far");
}

#[tokio::test]
async fn test_chat_reasoner_failure_is_500() {
    let h = harness(SyncAdapter::disabled(), Some(Arc::new(FailingReasoner)));
    let (status, body) = send(&h.app, "POST", "/chat", Some(json!({"message": "weather?"}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().unwrap().contains("502"));
}

#[tokio::test]
async fn test_devices_and_log() {
    let h = harness(SyncAdapter::disabled(), None);
    let (_, devices) = send(&h.app, "GET", "/devices", None).await;
    let ids: Vec<&String> = devices.as_object().unwrap().keys().collect();
    assert_eq!(ids.len(), 5);
    assert_eq!(ids[0], "light_bedroom");

    send(&h.app, "POST", "/chat", Some(json!({"message": "turn off living room ac"}))).await;
    send(&h.app, "POST", "/chat", Some(json!({"message": "turn on bedroom light"}))).await;
    let (status, log) = send(&h.app, "GET", "/devices/log?limit=5", None).await;
    assert_eq!(status, StatusCode::OK);
    // Oldest first
    assert_eq!(log["data"][0]["device_id"], "ac_living_room");
    assert_eq!(log["data"][1]["device_id"], "light_bedroom");

    let (_, latest) = send(&h.app, "GET", "/devices/log?limit=1", None).await;
    assert_eq!(latest["data"].as_array().unwrap().len(), 1);
    assert_eq!(latest["data"][0]["device_id"], "light_bedroom");
}

#[tokio::test]
async fn test_schedules_sorted_and_deletable() {
    let h = harness(SyncAdapter::disabled(), None);
    let now = Local::now().naive_local();
    let later = h.schedules.create_task(
        NewTask::reminder("later", now + ChronoDuration::hours(2), Repeat::Once).unwrap(),
    );
    let sooner = h.schedules.create_task(
        NewTask::reminder("sooner", now + ChronoDuration::hours(1), Repeat::Daily).unwrap(),
    );

    let (_, list) = send(&h.app, "GET", "/schedules", None).await;
    let ids: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, [sooner.id.as_str(), later.id.as_str()]);

    let uri = format!("/schedules/{}", later.id);
    let (status, _) = send(&h.app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&h.app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(h.schedules.get_task(&later.id).is_none());
}

#[tokio::test]
async fn test_reset_reseeds_when_disabled() {
    let h = harness(SyncAdapter::disabled(), None);
    send(&h.app, "POST", "/chat", Some(json!({"message": "turn off living room light"}))).await;
    assert!(!h.devices.get("light_living_room").unwrap().status.is_on());

    send(&h.app, "POST", "/reset", None).await;
    assert!(h.devices.get("light_living_room").unwrap().status.is_on());
}

#[tokio::test]
async fn test_ha_endpoints_disabled() {
    let h = harness(SyncAdapter::disabled(), None);
    for (method, uri) in [
        ("GET", "/ha/status"),
        ("POST", "/ha/sync"),
        ("GET", "/ha/entities?domain=light"),
    ] {
        let (status, body) = send(&h.app, method, uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{method} {uri}");
        assert_eq!(body["success"], false);
    }
}

#[tokio::test]
async fn test_ha_endpoints_enabled() {
    let backend = Arc::new(StubBackend::default());
    let h = harness(SyncAdapter::new(backend.clone()), None);

    let (_, status) = send(&h.app, "GET", "/ha/status", None).await;
    assert_eq!(status["data"]["connected"], true);

    let (_, entities) = send(&h.app, "GET", "/ha/entities?domain=light", None).await;
    assert_eq!(entities["data"].as_array().unwrap().len(), 1);

    let (status, synced) = send(&h.app, "POST", "/ha/sync", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(synced["data"]["synced"], 1);
    assert!(h.devices.get("light_bedroom").is_none());
    assert_eq!(
        h.devices.get("light_kitchen").unwrap().properties["brightness"],
        100
    );

    send(&h.app, "POST", "/chat", Some(json!({"message": "turn off kitchen light"}))).await;
    let calls = backend.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].service, "turn_off");
    assert_eq!(calls[0].entity_id, "light.kitchen_ceiling");
}
