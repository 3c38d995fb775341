//! Two-way mirror between the device store and Home Assistant

use std::sync::Arc;

use ha_client::{
    AutomationBackend, ConnectionStatus, EntityState, HaError, ServiceCall, DOMAIN_CLIMATE,
    DOMAIN_LIGHT, DOMAIN_MEDIA_PLAYER,
};
use serde_json::Value;

use crate::device::{Device, DeviceStatus, DeviceType};
use crate::room;
use crate::store::DeviceStateStore;

/// Entity domains mirrored into the store
pub const SYNCED_DOMAINS: &[&str] = &[DOMAIN_LIGHT, DOMAIN_CLIMATE, DOMAIN_MEDIA_PLAYER];

/// A local command to project onto the backend
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    LightOn { brightness: Option<u8> },
    LightOff,
    ClimateOn,
    ClimateOff,
    ClimateSet {
        temperature: Option<f64>,
        mode: Option<String>,
    },
    /// Resume playback; `volume` is pushed as well when the play changed it
    MediaPlay { volume: Option<u8> },
    MediaPause,
    MediaStop,
    SetVolume { volume: u8 },
}

impl DeviceCommand {
    /// Backend service calls for this command, in order
    #[must_use]
    pub fn service_calls(&self, entity_id: &str) -> Vec<ServiceCall> {
        match self {
            Self::LightOn { brightness } => {
                let call = ServiceCall::new(DOMAIN_LIGHT, "turn_on", entity_id);
                vec![match brightness {
                    Some(pct) => call.with_data("brightness_pct", *pct),
                    None => call,
                }]
            }
            Self::LightOff => vec![ServiceCall::new(DOMAIN_LIGHT, "turn_off", entity_id)],
            Self::ClimateOn => vec![ServiceCall::new(DOMAIN_CLIMATE, "turn_on", entity_id)],
            Self::ClimateOff => vec![ServiceCall::new(DOMAIN_CLIMATE, "turn_off", entity_id)],
            Self::ClimateSet { temperature, mode } => {
                let mut calls = Vec::new();
                if let Some(mode) = mode {
                    calls.push(
                        ServiceCall::new(DOMAIN_CLIMATE, "set_hvac_mode", entity_id)
                            .with_data("hvac_mode", mode.clone()),
                    );
                }
                if let Some(temperature) = temperature {
                    calls.push(
                        ServiceCall::new(DOMAIN_CLIMATE, "set_temperature", entity_id)
                            .with_data("temperature", *temperature),
                    );
                }
                calls
            }
            Self::MediaPlay { volume } => {
                let mut calls = vec![ServiceCall::new(DOMAIN_MEDIA_PLAYER, "media_play", entity_id)];
                if let Some(volume) = volume {
                    calls.extend(Self::SetVolume { volume: *volume }.service_calls(entity_id));
                }
                calls
            }
            Self::MediaPause => {
                vec![ServiceCall::new(DOMAIN_MEDIA_PLAYER, "media_pause", entity_id)]
            }
            Self::MediaStop => vec![ServiceCall::new(DOMAIN_MEDIA_PLAYER, "media_stop", entity_id)],
            Self::SetVolume { volume } => vec![ServiceCall::new(
                DOMAIN_MEDIA_PLAYER,
                "volume_set",
                entity_id,
            )
            .with_data("volume_level", f64::from(*volume) / 100.0)],
        }
    }
}

/// Sync adapter; disabled when no backend is configured
#[derive(Clone, Default)]
pub struct SyncAdapter {
    backend: Option<Arc<dyn AutomationBackend>>,
}

impl SyncAdapter {
    /// Adapter that never talks to a backend
    #[must_use]
    pub fn disabled() -> Self {
        Self { backend: None }
    }

    /// Adapter mirroring against `backend`
    #[must_use]
    pub fn new(backend: Arc<dyn AutomationBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Whether a backend is configured (not whether it is reachable)
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Probe backend connectivity; `None` when disabled
    pub async fn status(&self) -> Option<ConnectionStatus> {
        match &self.backend {
            Some(backend) => Some(backend.check_connection().await),
            None => None,
        }
    }

    /// List backend entities, optionally filtered by domain; `None` when disabled
    pub async fn entities(
        &self,
        domain: Option<&str>,
    ) -> Option<Result<Vec<EntityState>, HaError>> {
        let backend = self.backend.as_ref()?;
        Some(match domain {
            Some(domain) => backend.get_entities_by_domain(domain).await,
            None => backend.get_states().await,
        })
    }

    /// Rebuild the store from backend entities.
    ///
    /// The device set is replaced wholesale so no stale device survives.
    /// Returns the number of devices synced; 0 with the store untouched when
    /// disabled or when the backend cannot be read.
    pub async fn pull_sync(&self, store: &DeviceStateStore) -> usize {
        let Some(backend) = &self.backend else {
            return 0;
        };

        let states = match backend.get_states().await {
            Ok(states) => states,
            Err(e) => {
                tracing::warn!("Home Assistant sync failed, keeping local state: {}", e);
                return 0;
            }
        };

        let devices: Vec<Device> = states
            .iter()
            .filter(|s| SYNCED_DOMAINS.contains(&s.domain()))
            .filter_map(device_from_entity)
            .collect();

        store.replace_all(devices);
        let count = store.len();
        tracing::info!("Synced {} devices from Home Assistant", count);
        count
    }

    /// Project a command for `device_id` onto the backend.
    ///
    /// Failures are logged and reported as `false`; they never undo the
    /// local update.
    pub async fn push(
        &self,
        store: &DeviceStateStore,
        device_id: &str,
        command: &DeviceCommand,
    ) -> bool {
        let Some(backend) = &self.backend else {
            return false;
        };
        let Some(entity_id) = store.resolve_external_entity(device_id) else {
            tracing::debug!("{} has no external entity, skipping push", device_id);
            return false;
        };

        for call in command.service_calls(&entity_id) {
            if let Err(e) = backend.call_service(&call).await {
                tracing::warn!(
                    "Push {}.{} to {} failed: {}",
                    call.domain,
                    call.service,
                    entity_id,
                    e
                );
                return false;
            }
        }
        true
    }
}

/// Map one backend entity onto a local device
fn device_from_entity(entity: &EntityState) -> Option<Device> {
    let device_type = DeviceType::from_domain(entity.domain())?;
    let room = room::derive(entity.object_id(), entity.friendly_name());
    let state = entity.state.as_str();

    let device = match device_type {
        DeviceType::Light => {
            let on = state == "on";
            let brightness = entity
                .attribute_f64("brightness")
                .map_or(0, |b| (b * 100.0 / 255.0).round() as i64);
            Device::new(device_type, room, status(on)).with_property("brightness", brightness)
        }
        DeviceType::Ac => {
            let on = !matches!(state, "off" | "unavailable" | "unknown");
            let temperature = entity
                .attribute_f64("temperature")
                .map_or(Value::Null, Value::from);
            let mode = if on {
                Value::from(state)
            } else {
                entity
                    .attribute_str("hvac_mode")
                    .map_or(Value::Null, Value::from)
            };
            Device::new(device_type, room, status(on))
                .with_property("temperature", temperature)
                .with_property("mode", mode)
        }
        DeviceType::Speaker => {
            let on = matches!(state, "on" | "playing");
            let volume = entity
                .attribute_f64("volume_level")
                .map_or(0, |v| (v * 100.0).round() as i64);
            let playing = entity
                .attribute_str("media_title")
                .map_or(Value::Null, Value::from);
            Device::new(device_type, room, status(on))
                .with_property("volume", volume)
                .with_property("playing", playing)
        }
    };

    Some(device.with_external_entity(entity.entity_id.clone()))
}

fn status(on: bool) -> DeviceStatus {
    if on {
        DeviceStatus::On
    } else {
        DeviceStatus::Off
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-process backend recording service calls
    #[derive(Default)]
    pub struct FakeBackend {
        pub states: Mutex<Vec<EntityState>>,
        pub calls: Mutex<Vec<ServiceCall>>,
        pub fail: bool,
    }

    #[async_trait]
    impl AutomationBackend for FakeBackend {
        async fn check_connection(&self) -> ConnectionStatus {
            ConnectionStatus {
                connected: !self.fail,
                message: "API running.".to_string(),
            }
        }

        async fn get_states(&self) -> Result<Vec<EntityState>, HaError> {
            if self.fail {
                return Err(HaError::Status {
                    status: 502,
                    endpoint: "/api/states".to_string(),
                });
            }
            Ok(self.states.lock().unwrap().clone())
        }

        async fn call_service(&self, call: &ServiceCall) -> Result<(), HaError> {
            if self.fail {
                return Err(HaError::Status {
                    status: 502,
                    endpoint: call.path(),
                });
            }
            self.calls.lock().unwrap().push(call.clone());
            Ok(())
        }
    }

    fn sample_states() -> Vec<EntityState> {
        vec![
            EntityState::new("light.bedroom_ceiling", "on").with_attribute("brightness", 255),
            EntityState::new("climate.living_room", "heat").with_attribute("temperature", 21.5),
            EntityState::new("media_player.kitchen_speaker", "playing")
                .with_attribute("volume_level", 0.35)
                .with_attribute("media_title", "Blue in Green"),
            EntityState::new("sensor.outdoor_temperature", "12"),
        ]
    }

    #[tokio::test]
    async fn test_pull_sync_mirrors_backend_exactly() {
        let backend = Arc::new(FakeBackend::default());
        *backend.states.lock().unwrap() = sample_states();
        let adapter = SyncAdapter::new(backend);
        let store = DeviceStateStore::with_seed();

        assert_eq!(adapter.pull_sync(&store).await, 3);

        let ids: Vec<String> = store.get_all().keys().cloned().collect();
        assert_eq!(ids, vec!["light_bedroom", "ac_living_room", "speaker_kitchen"]);

        let light = store.get("light_bedroom").unwrap();
        assert_eq!(light.status, DeviceStatus::On);
        assert_eq!(light.properties["brightness"], 100);
        assert_eq!(light.external_entity_id.as_deref(), Some("light.bedroom_ceiling"));

        let ac = store.get("ac_living_room").unwrap();
        assert_eq!(ac.properties["temperature"], 21.5);
        assert_eq!(ac.properties["mode"], "heat");

        let speaker = store.get("speaker_kitchen").unwrap();
        assert_eq!(speaker.properties["volume"], 35);
        assert_eq!(speaker.properties["playing"], "Blue in Green");
    }

    #[tokio::test]
    async fn test_pull_sync_drops_stale_devices() {
        let backend = Arc::new(FakeBackend::default());
        *backend.states.lock().unwrap() = sample_states();
        let adapter = SyncAdapter::new(backend.clone());
        let store = DeviceStateStore::with_seed();
        adapter.pull_sync(&store).await;

        *backend.states.lock().unwrap() =
            vec![EntityState::new("light.office_desk", "off")];
        assert_eq!(adapter.pull_sync(&store).await, 1);
        let ids: Vec<String> = store.get_all().keys().cloned().collect();
        assert_eq!(ids, vec!["light_office"]);
    }

    #[tokio::test]
    async fn test_pull_sync_disabled_or_failing_leaves_store() {
        let store = DeviceStateStore::with_seed();
        assert_eq!(SyncAdapter::disabled().pull_sync(&store).await, 0);

        let failing = SyncAdapter::new(Arc::new(FakeBackend {
            fail: true,
            ..Default::default()
        }));
        assert_eq!(failing.pull_sync(&store).await, 0);
        assert_eq!(store.len(), 5);
    }

    #[tokio::test]
    async fn test_push_translates_command() {
        let backend = Arc::new(FakeBackend::default());
        *backend.states.lock().unwrap() = sample_states();
        let adapter = SyncAdapter::new(backend.clone());
        let store = DeviceStateStore::empty();
        adapter.pull_sync(&store).await;

        let command = DeviceCommand::ClimateSet {
            temperature: Some(23.0),
            mode: Some("cool".to_string()),
        };
        assert!(adapter.push(&store, "ac_living_room", &command).await);
        assert!(
            adapter
                .push(&store, "speaker_kitchen", &DeviceCommand::SetVolume { volume: 40 })
                .await
        );

        let calls = backend.calls.lock().unwrap();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].service, "set_hvac_mode");
        assert_eq!(calls[1].service, "set_temperature");
        assert_eq!(calls[1].data["temperature"], 23.0);
        assert_eq!(calls[2].data["volume_level"], 0.4);
    }

    #[tokio::test]
    async fn test_push_failure_is_swallowed() {
        let store = DeviceStateStore::empty();
        store.replace_all(vec![Device::new(DeviceType::Light, "bedroom", DeviceStatus::Off)
            .with_external_entity("light.bedroom")]);
        let adapter = SyncAdapter::new(Arc::new(FakeBackend {
            fail: true,
            ..Default::default()
        }));
        assert!(!adapter.push(&store, "light_bedroom", &DeviceCommand::LightOff).await);
        // Device without an entity is skipped
        assert!(
            !SyncAdapter::disabled()
                .push(&store, "light_bedroom", &DeviceCommand::LightOff)
                .await
        );
    }
}
