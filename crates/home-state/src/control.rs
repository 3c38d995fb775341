//! Device control operations
//!
//! These are the mutations exposed to the reasoning layer as tools and
//! used by scheduled device actions. Each successful local update is
//! followed by a best-effort push to the external backend.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::device::{device_id, DeviceStatus, DeviceType, DeviceUpdate};
use crate::room;
use crate::store::DeviceStateStore;
use crate::sync::{DeviceCommand, SyncAdapter};

/// Default track for `play` without a song
const DEFAULT_TRACK: &str = "ambient music";
const DEFAULT_VOLUME: u8 = 50;

/// Executes control commands against the store and mirrors them outward
#[derive(Clone)]
pub struct DeviceController {
    store: Arc<DeviceStateStore>,
    sync: SyncAdapter,
}

impl DeviceController {
    pub fn new(store: Arc<DeviceStateStore>, sync: SyncAdapter) -> Self {
        Self { store, sync }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<DeviceStateStore> {
        &self.store
    }

    #[must_use]
    pub fn sync(&self) -> &SyncAdapter {
        &self.sync
    }

    /// Update locally, then push when mirroring is enabled.
    /// Returns false when the device is unknown.
    async fn apply(&self, device_id: &str, update: DeviceUpdate, command: DeviceCommand) -> bool {
        if !self.store.update(device_id, update) {
            return false;
        }
        if self.sync.is_enabled() {
            self.sync.push(&self.store, device_id, &command).await;
        }
        true
    }

    /// Control a light: `turn_on`, `turn_off` or `dim`
    pub async fn control_light(&self, room: &str, action: &str, brightness: Option<u8>) -> String {
        let room_key = room::normalize(room);
        let id = device_id(DeviceType::Light, &room_key);

        let (update, command, reply) = match action {
            "turn_on" => {
                let level = brightness.filter(|b| *b > 0).unwrap_or(100).min(100);
                (
                    DeviceUpdate::status(DeviceStatus::On).property("brightness", level),
                    DeviceCommand::LightOn {
                        brightness: Some(level),
                    },
                    format!("Light in {room} turned on, brightness {level}%"),
                )
            }
            "turn_off" => (
                DeviceUpdate::status(DeviceStatus::Off).property("brightness", 0),
                DeviceCommand::LightOff,
                format!("Light in {room} turned off"),
            ),
            "dim" => {
                let level = brightness.filter(|b| *b > 0).unwrap_or(50).min(100);
                (
                    DeviceUpdate::status(DeviceStatus::On).property("brightness", level),
                    DeviceCommand::LightOn {
                        brightness: Some(level),
                    },
                    format!("Light in {room} dimmed to {level}%"),
                )
            }
            other => return format!("Unknown action: {other}"),
        };

        if self.apply(&id, update, command).await {
            reply
        } else {
            format!("Device not found: {id}")
        }
    }

    /// Control an air conditioner: `turn_on`, `turn_off` or `set_temp`
    pub async fn control_ac(
        &self,
        room: &str,
        action: &str,
        temperature: Option<f64>,
        mode: Option<&str>,
    ) -> String {
        let room_key = room::normalize(room);
        let id = device_id(DeviceType::Ac, &room_key);

        let (update, command, reply) = match action {
            "turn_on" => {
                let temperature = temperature.unwrap_or(26.0);
                let mode = mode.unwrap_or("cool");
                (
                    DeviceUpdate::status(DeviceStatus::On)
                        .property("temperature", number(temperature))
                        .property("mode", mode),
                    DeviceCommand::ClimateSet {
                        temperature: Some(temperature),
                        mode: Some(mode.to_string()),
                    },
                    format!(
                        "AC in {room} turned on, {}°C, mode: {mode}",
                        number(temperature)
                    ),
                )
            }
            "turn_off" => (
                DeviceUpdate::status(DeviceStatus::Off),
                DeviceCommand::ClimateOff,
                format!("AC in {room} turned off"),
            ),
            "set_temp" => {
                let Some(temperature) = temperature else {
                    return "A temperature is required for set_temp".to_string();
                };
                let mut update = DeviceUpdate::default().property("temperature", number(temperature));
                if let Some(mode) = mode {
                    update = update.property("mode", mode);
                }
                (
                    update,
                    DeviceCommand::ClimateSet {
                        temperature: Some(temperature),
                        mode: mode.map(str::to_string),
                    },
                    format!("AC in {room} set to {}°C", number(temperature)),
                )
            }
            other => return format!("Unknown action: {other}"),
        };

        if self.apply(&id, update, command).await {
            reply
        } else {
            format!("Device not found: {id}")
        }
    }

    /// Control a speaker: `play`, `pause`, `stop` or `set_volume`
    pub async fn control_speaker(
        &self,
        room: &str,
        action: &str,
        song: Option<&str>,
        volume: Option<u8>,
    ) -> String {
        let room_key = room::normalize(room);
        let id = device_id(DeviceType::Speaker, &room_key);

        let (update, command, reply) = match action {
            "play" => {
                let track = song.filter(|s| !s.trim().is_empty()).unwrap_or(DEFAULT_TRACK);
                let volume = volume.unwrap_or(DEFAULT_VOLUME).min(100);
                (
                    DeviceUpdate::status(DeviceStatus::On)
                        .property("playing", track)
                        .property("volume", volume),
                    DeviceCommand::MediaPlay {
                        volume: Some(volume),
                    },
                    format!("Now playing: {track}"),
                )
            }
            "pause" | "stop" => (
                DeviceUpdate::status(DeviceStatus::Off).property("playing", Value::Null),
                if action == "pause" {
                    DeviceCommand::MediaPause
                } else {
                    DeviceCommand::MediaStop
                },
                "Playback stopped".to_string(),
            ),
            "set_volume" => {
                let Some(volume) = volume else {
                    return "A volume is required for set_volume".to_string();
                };
                let volume = volume.min(100);
                (
                    DeviceUpdate::default().property("volume", volume),
                    DeviceCommand::SetVolume { volume },
                    format!("Volume set to {volume}%"),
                )
            }
            other => return format!("Unknown action: {other}"),
        };

        if self.apply(&id, update, command).await {
            reply
        } else {
            format!("Device not found: {id}")
        }
    }

    /// Current device status as text
    #[must_use]
    pub fn device_status(&self) -> String {
        self.store.render_context()
    }

    /// Run a scheduled action payload (device type, room, verb, extra
    /// parameters such as brightness/temperature/mode/song/volume)
    pub async fn execute(
        &self,
        device_type: &str,
        room: &str,
        action: &str,
        params: &Map<String, Value>,
    ) -> String {
        match DeviceType::parse(device_type) {
            Some(DeviceType::Light) => {
                self.control_light(room, action, param_u8(params, "brightness"))
                    .await
            }
            Some(DeviceType::Ac) => {
                let temperature = params.get("temperature").and_then(Value::as_f64);
                let mode = params.get("mode").and_then(Value::as_str);
                self.control_ac(room, action, temperature, mode).await
            }
            Some(DeviceType::Speaker) => {
                let song = params.get("song").and_then(Value::as_str);
                self.control_speaker(room, action, song, param_u8(params, "volume"))
                    .await
            }
            None => format!("Unknown device type: {device_type}"),
        }
    }
}

/// Integral temperatures stay integers in state and text
fn number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

fn param_u8(params: &Map<String, Value>, key: &str) -> Option<u8> {
    params
        .get(key)
        .and_then(Value::as_f64)
        .map(|v| v.clamp(0.0, 255.0).round() as u8)
}
