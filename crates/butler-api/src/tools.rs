//! Tool catalogue offered to the reasoning service and its dispatcher

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use home_state::DeviceController;
use schedule_engine::{
    parse_time_expression, DeviceAction, NewTask, Repeat, ScheduleStore, TaskType,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::reasoning::{ToolCall, ToolSpec};

#[derive(Deserialize)]
struct LightArgs {
    room: String,
    action: String,
    brightness: Option<f64>,
}

#[derive(Deserialize)]
struct AcArgs {
    room: String,
    action: String,
    temperature: Option<f64>,
    mode: Option<String>,
}

#[derive(Deserialize)]
struct SpeakerArgs {
    room: String,
    action: String,
    song: Option<String>,
    volume: Option<f64>,
}

#[derive(Deserialize)]
struct ReminderArgs {
    message: String,
    time: String,
    #[serde(default)]
    repeat: Option<String>,
}

#[derive(Deserialize)]
struct DeviceScheduleArgs {
    description: String,
    time: String,
    device_type: String,
    room: String,
    action: String,
    #[serde(default)]
    repeat: Option<String>,
    #[serde(default)]
    parameters: Option<Value>,
}

#[derive(Deserialize)]
struct CancelArgs {
    task_id: String,
}

/// Executes tool calls against the device controller and schedule store
#[derive(Clone)]
pub struct Toolbox {
    controller: DeviceController,
    schedules: Arc<ScheduleStore>,
}

impl Toolbox {
    pub fn new(controller: DeviceController, schedules: Arc<ScheduleStore>) -> Self {
        Self {
            controller,
            schedules,
        }
    }

    /// Run a tool call using the current local time
    pub async fn dispatch(&self, call: &ToolCall) -> String {
        self.dispatch_at(call, Local::now().naive_local()).await
    }

    /// Run a tool call; relative time expressions resolve against `now`.
    /// Every outcome, including bad arguments, is reported as text.
    pub async fn dispatch_at(&self, call: &ToolCall, now: NaiveDateTime) -> String {
        tracing::debug!("Tool call {}({})", call.name, call.arguments);

        match call.name.as_str() {
            "control_light" => match args::<LightArgs>(call) {
                Ok(a) => {
                    self.controller
                        .control_light(&a.room, &a.action, a.brightness.map(percent))
                        .await
                }
                Err(e) => e,
            },
            "control_ac" => match args::<AcArgs>(call) {
                Ok(a) => {
                    self.controller
                        .control_ac(&a.room, &a.action, a.temperature, a.mode.as_deref())
                        .await
                }
                Err(e) => e,
            },
            "control_speaker" => match args::<SpeakerArgs>(call) {
                Ok(a) => {
                    self.controller
                        .control_speaker(
                            &a.room,
                            &a.action,
                            a.song.as_deref(),
                            a.volume.map(percent),
                        )
                        .await
                }
                Err(e) => e,
            },
            "get_device_status" => self.controller.device_status(),
            "create_reminder" => match args::<ReminderArgs>(call) {
                Ok(a) => self.create_reminder(a, now),
                Err(e) => e,
            },
            "create_device_schedule" => match args::<DeviceScheduleArgs>(call) {
                Ok(a) => self.create_device_schedule(a, now),
                Err(e) => e,
            },
            "list_schedules" => self.list_schedules(),
            "cancel_schedule" => match args::<CancelArgs>(call) {
                Ok(a) => self.cancel_schedule(&a.task_id),
                Err(e) => e,
            },
            other => format!("Unknown tool: {other}"),
        }
    }

    fn create_reminder(&self, a: ReminderArgs, now: NaiveDateTime) -> String {
        let trigger_time = parse_time_expression(&a.time, now);
        let repeat = repeat_or_once(a.repeat.as_deref());
        let request = match NewTask::reminder(a.message.clone(), trigger_time, repeat) {
            Ok(request) => request,
            Err(e) => return format!("Could not create reminder: {e}"),
        };
        let task = self.schedules.create_task(request);

        format!(
            "Reminder set for {}{}: {} [ID: {}]",
            trigger_time.format("%Y-%m-%d %H:%M"),
            repeat_suffix(repeat),
            a.message,
            task.id
        )
    }

    fn create_device_schedule(&self, a: DeviceScheduleArgs, now: NaiveDateTime) -> String {
        let trigger_time = parse_time_expression(&a.time, now);
        let repeat = repeat_or_once(a.repeat.as_deref());
        let action = DeviceAction {
            device_type: a.device_type,
            room: a.room,
            action: a.action,
            parameters: parameter_map(a.parameters),
        };
        let task = self.schedules.create_task(NewTask::device_control(
            a.description.clone(),
            trigger_time,
            repeat,
            action,
        ));

        format!(
            "Scheduled: {} at {}{} [ID: {}]",
            a.description,
            trigger_time.format("%Y-%m-%d %H:%M"),
            repeat_suffix(repeat),
            task.id
        )
    }

    fn list_schedules(&self) -> String {
        let tasks = self.schedules.pending_sorted();
        if tasks.is_empty() {
            return "No scheduled tasks or reminders.".to_string();
        }

        let mut lines = vec!["Scheduled tasks:".to_string()];
        for task in tasks {
            let when = task.trigger_time.format("%m-%d %H:%M");
            let repeat = match task.repeat {
                Repeat::Once => String::new(),
                other => format!(" [{}]", other.as_str()),
            };
            let what = match task.task_type() {
                TaskType::Reminder => format!("Reminder - {}", task.message()),
                TaskType::DeviceControl => task.description.clone(),
            };
            lines.push(format!("- {when}{repeat}: {what} (ID: {})", task.id));
        }
        lines.join("\n")
    }

    fn cancel_schedule(&self, task_id: &str) -> String {
        let Some(task) = self.schedules.get_task(task_id) else {
            return format!("Task {task_id} not found.");
        };
        if self.schedules.cancel_task(task_id) {
            format!("Cancelled: {}", task.description)
        } else {
            format!("Failed to cancel task {task_id}.")
        }
    }
}

fn args<T: DeserializeOwned>(call: &ToolCall) -> Result<T, String> {
    serde_json::from_value(call.arguments.clone())
        .map_err(|e| format!("Invalid arguments for {}: {e}", call.name))
}

fn percent(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

fn repeat_or_once(repeat: Option<&str>) -> Repeat {
    repeat.and_then(|r| r.parse().ok()).unwrap_or_default()
}

fn repeat_suffix(repeat: Repeat) -> String {
    match repeat {
        Repeat::Once => String::new(),
        other => format!(" (repeats {other})"),
    }
}

/// Extra action parameters may arrive as an object or a JSON-encoded
/// string; anything else becomes an empty map
fn parameter_map(parameters: Option<Value>) -> Map<String, Value> {
    match parameters {
        Some(Value::Object(map)) => map,
        Some(Value::String(raw)) => match serde_json::from_str(&raw) {
            Ok(Value::Object(map)) => map,
            _ => {
                tracing::debug!("Ignoring malformed action parameters: {raw}");
                Map::new()
            }
        },
        _ => Map::new(),
    }
}

/// Tool descriptions handed to the reasoning service
pub fn catalogue() -> Vec<ToolSpec> {
    let repeat = json!({
        "type": "string",
        "enum": ["once", "daily", "weekly"],
        "description": "How often the task repeats"
    });
    let time = json!({
        "type": "string",
        "description": "When to trigger, e.g. \"10 minutes\", \"tomorrow 9:00\", \"14:30\", \"2024-12-25 14:00\""
    });

    vec![
        ToolSpec {
            name: "control_light",
            description: "Turn a light on or off, or dim it",
            parameters: json!({
                "type": "object",
                "properties": {
                    "room": {"type": "string"},
                    "action": {"type": "string", "enum": ["turn_on", "turn_off", "dim"]},
                    "brightness": {"type": "integer", "minimum": 0, "maximum": 100}
                },
                "required": ["room", "action"]
            }),
        },
        ToolSpec {
            name: "control_ac",
            description: "Turn an air conditioner on or off, or set its temperature",
            parameters: json!({
                "type": "object",
                "properties": {
                    "room": {"type": "string"},
                    "action": {"type": "string", "enum": ["turn_on", "turn_off", "set_temp"]},
                    "temperature": {"type": "number", "minimum": 16, "maximum": 30},
                    "mode": {"type": "string", "enum": ["cool", "heat", "auto"]}
                },
                "required": ["room", "action"]
            }),
        },
        ToolSpec {
            name: "control_speaker",
            description: "Play, pause or stop music, or change the volume",
            parameters: json!({
                "type": "object",
                "properties": {
                    "room": {"type": "string"},
                    "action": {"type": "string", "enum": ["play", "pause", "stop", "set_volume"]},
                    "song": {"type": "string"},
                    "volume": {"type": "integer", "minimum": 0, "maximum": 100}
                },
                "required": ["room", "action"]
            }),
        },
        ToolSpec {
            name: "get_device_status",
            description: "Report the current status of every device",
            parameters: json!({"type": "object", "properties": {}}),
        },
        ToolSpec {
            name: "create_reminder",
            description: "Create a reminder for the user",
            parameters: json!({
                "type": "object",
                "properties": {
                    "message": {"type": "string"},
                    "time": time,
                    "repeat": repeat
                },
                "required": ["message", "time"]
            }),
        },
        ToolSpec {
            name: "create_device_schedule",
            description: "Schedule a device action for later, optionally repeating",
            parameters: json!({
                "type": "object",
                "properties": {
                    "description": {"type": "string"},
                    "time": time,
                    "device_type": {"type": "string", "enum": ["light", "ac", "speaker"]},
                    "room": {"type": "string"},
                    "action": {"type": "string"},
                    "repeat": repeat,
                    "parameters": {
                        "type": "string",
                        "description": "JSON object of extra parameters such as brightness, temperature, mode, song or volume"
                    }
                },
                "required": ["description", "time", "device_type", "room", "action"]
            }),
        },
        ToolSpec {
            name: "list_schedules",
            description: "List pending scheduled tasks and reminders",
            parameters: json!({"type": "object", "properties": {}}),
        },
        ToolSpec {
            name: "cancel_schedule",
            description: "Cancel a scheduled task or reminder by id",
            parameters: json!({
                "type": "object",
                "properties": {"task_id": {"type": "string"}},
                "required": ["task_id"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use home_state::{DeviceStateStore, DeviceStatus, SyncAdapter};
    use schedule_engine::TaskStatus;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap()
    }

    fn setup() -> (Toolbox, Arc<DeviceStateStore>, Arc<ScheduleStore>) {
        let devices = Arc::new(DeviceStateStore::with_seed());
        let schedules = Arc::new(ScheduleStore::new());
        let controller = DeviceController::new(devices.clone(), SyncAdapter::disabled());
        (Toolbox::new(controller, schedules.clone()), devices, schedules)
    }

    fn call(name: &str, arguments: Value) -> ToolCall {
        ToolCall {
            id: "call_1".into(),
            name: name.into(),
            arguments,
        }
    }

    #[test]
    fn test_catalogue_names() {
        let names: Vec<_> = catalogue().iter().map(|t| t.name).collect();
        assert_eq!(
            names,
            [
                "control_light",
                "control_ac",
                "control_speaker",
                "get_device_status",
                "create_reminder",
                "create_device_schedule",
                "list_schedules",
                "cancel_schedule"
            ]
        );
    }

    #[tokio::test]
    async fn test_light_tool_updates_store() {
        let (tools, devices, _) = setup();
        let result = tools
            .dispatch_at(
                &call("control_light", json!({"room": "卧室", "action": "dim", "brightness": 20})),
                now(),
            )
            .await;
        assert_eq!(result, "Light in 卧室 dimmed to 20%");

        let light = devices.get("light_bedroom").unwrap();
        assert_eq!(light.status, DeviceStatus::On);
        assert_eq!(light.properties["brightness"], 20);
    }

    #[tokio::test]
    async fn test_reminder_tool() {
        let (tools, _, schedules) = setup();
        let result = tools
            .dispatch_at(
                &call(
                    "create_reminder",
                    json!({"message": "call mom", "time": "30 minutes", "repeat": "daily"}),
                ),
                now(),
            )
            .await;
        assert!(result.starts_with("Reminder set for 2024-03-10 08:30 (repeats daily): call mom [ID: "));

        let tasks = schedules.all_tasks();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].description, "Reminder: call mom");
        assert_eq!(tasks[0].repeat, Repeat::Daily);
    }

    #[tokio::test]
    async fn test_reminder_requires_message() {
        let (tools, _, schedules) = setup();
        let result = tools
            .dispatch_at(
                &call("create_reminder", json!({"message": "  ", "time": "10 minutes"})),
                now(),
            )
            .await;
        assert_eq!(
            result,
            "Could not create reminder: Invalid task: reminder task requires a message"
        );
        assert!(schedules.all_tasks().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_repeat_falls_back_to_once() {
        let (tools, _, schedules) = setup();
        let result = tools
            .dispatch_at(
                &call(
                    "create_reminder",
                    json!({"message": "water plants", "time": "10:00", "repeat": "hourly"}),
                ),
                now(),
            )
            .await;
        assert!(result.starts_with("Reminder set for 2024-03-10 10:00: water plants"));
        assert_eq!(schedules.all_tasks()[0].repeat, Repeat::Once);
    }

    #[tokio::test]
    async fn test_device_schedule_parameters() {
        let (tools, _, schedules) = setup();

        tools
            .dispatch_at(
                &call(
                    "create_device_schedule",
                    json!({
                        "description": "Wake-up light",
                        "time": "tomorrow 7:00",
                        "device_type": "light",
                        "room": "bedroom",
                        "action": "dim",
                        "parameters": "{\"brightness\": 40}"
                    }),
                ),
                now(),
            )
            .await;
        tools
            .dispatch_at(
                &call(
                    "create_device_schedule",
                    json!({
                        "description": "Evening AC",
                        "time": "18:00",
                        "device_type": "ac",
                        "room": "living_room",
                        "action": "turn_on",
                        "parameters": "{not json"
                    }),
                ),
                now(),
            )
            .await;

        let tasks = schedules.pending_sorted();
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].description, "Evening AC");
        assert!(tasks[0].action().unwrap().parameters.is_empty());
        assert_eq!(tasks[1].action().unwrap().parameters["brightness"], 40);
    }

    #[tokio::test]
    async fn test_list_and_cancel() {
        let (tools, _, schedules) = setup();
        assert_eq!(
            tools.dispatch_at(&call("list_schedules", json!({})), now()).await,
            "No scheduled tasks or reminders."
        );

        let task = schedules.create_task(
            NewTask::reminder("stretch", now() + chrono::Duration::hours(1), Repeat::Weekly)
                .unwrap(),
        );
        let listing = tools.dispatch_at(&call("list_schedules", json!({})), now()).await;
        assert_eq!(
            listing,
            format!("Scheduled tasks:\n- 03-10 09:00 [weekly]: Reminder - stretch (ID: {})", task.id)
        );

        let cancel = call("cancel_schedule", json!({"task_id": task.id}));
        assert_eq!(tools.dispatch_at(&cancel, now()).await, "Cancelled: Reminder: stretch");
        assert_eq!(
            schedules.get_task(&task.id).unwrap().status,
            TaskStatus::Cancelled
        );
        assert_eq!(
            tools.dispatch_at(&cancel, now()).await,
            format!("Failed to cancel task {}.", task.id)
        );
        assert_eq!(
            tools
                .dispatch_at(&call("cancel_schedule", json!({"task_id": "nope"})), now())
                .await,
            "Task nope not found."
        );
    }

    #[tokio::test]
    async fn test_bad_calls_reported_as_text() {
        let (tools, _, _) = setup();
        let missing = tools
            .dispatch_at(&call("control_ac", json!({"room": "bedroom"})), now())
            .await;
        assert!(missing.starts_with("Invalid arguments for control_ac"));
        assert_eq!(
            tools.dispatch_at(&call("search_web", json!({})), now()).await,
            "Unknown tool: search_web"
        );
    }
}
