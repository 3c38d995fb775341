//! In-memory device state store

use chrono::{DateTime, Local};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

use crate::device::{Device, DeviceSnapshot, DeviceStatus, DeviceType, DeviceUpdate};
use crate::room;

/// One recorded mutation
#[derive(Debug, Clone, Serialize)]
pub struct AuditEntry {
    pub time: DateTime<Local>,
    pub device_id: String,
    /// Names of the fields the update touched
    pub fields: Vec<String>,
    /// The update as applied
    pub changes: DeviceUpdate,
}

#[derive(Default)]
struct Inner {
    /// Devices in creation/sync order
    devices: IndexMap<String, Device>,
    log: Vec<AuditEntry>,
}

/// Source of truth for device state.
///
/// Every operation takes the single inner lock, so each call is atomic with
/// respect to other calls on the same store.
pub struct DeviceStateStore {
    inner: Mutex<Inner>,
}

impl Default for DeviceStateStore {
    fn default() -> Self {
        Self::with_seed()
    }
}

impl DeviceStateStore {
    /// Create an empty store
    #[must_use]
    pub fn empty() -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Create a store holding the built-in mock devices
    #[must_use]
    pub fn with_seed() -> Self {
        let store = Self::empty();
        store.reset_to_seed();
        store
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // A panic while holding the lock cannot leave a torn device: updates
        // are applied to a single entry after all checks.
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Get a device by id
    #[must_use]
    pub fn get(&self, device_id: &str) -> Option<Device> {
        self.lock().devices.get(device_id).cloned()
    }

    /// Apply a partial update. Returns false (and records nothing) when the
    /// device is unknown.
    pub fn update(&self, device_id: &str, update: DeviceUpdate) -> bool {
        let mut inner = self.lock();
        let Some(device) = inner.devices.get_mut(device_id) else {
            tracing::debug!("Update for unknown device {}", device_id);
            return false;
        };
        update.apply(device);

        let fields = update.changed_fields();
        tracing::debug!("Updated {} ({})", device_id, fields.join(", "));
        inner.log.push(AuditEntry {
            time: Local::now(),
            device_id: device_id.to_string(),
            fields,
            changes: update,
        });
        true
    }

    /// Snapshot of every device keyed by id, in store order
    #[must_use]
    pub fn get_all(&self) -> IndexMap<String, DeviceSnapshot> {
        self.lock()
            .devices
            .iter()
            .map(|(id, device)| (id.clone(), device.snapshot()))
            .collect()
    }

    /// Full device records in store order
    #[must_use]
    pub fn devices(&self) -> Vec<Device> {
        self.lock().devices.values().cloned().collect()
    }

    /// Number of devices
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// External entity associated with a device
    #[must_use]
    pub fn resolve_external_entity(&self, device_id: &str) -> Option<String> {
        self.lock()
            .devices
            .get(device_id)
            .and_then(|d| d.external_entity_id.clone())
    }

    /// Replace the whole device set. Later devices with a duplicate id
    /// replace earlier ones.
    pub fn replace_all(&self, devices: Vec<Device>) {
        let mut inner = self.lock();
        inner.devices.clear();
        for device in devices {
            inner.devices.insert(device.device_id.clone(), device);
        }
    }

    /// Replace all devices with the built-in seed set. The audit log is kept.
    pub fn reset_to_seed(&self) {
        self.replace_all(seed_devices());
        tracing::info!("Device state reset to built-in seed set");
    }

    /// Last `limit` audit entries, oldest first
    #[must_use]
    pub fn recent_changes(&self, limit: usize) -> Vec<AuditEntry> {
        let inner = self.lock();
        let start = inner.log.len().saturating_sub(limit);
        inner.log[start..].to_vec()
    }

    /// Render device state as text for the reasoning layer
    #[must_use]
    pub fn render_context(&self) -> String {
        let inner = self.lock();
        let mut lines = vec!["[Current Device Status]".to_string()];
        for device in inner.devices.values() {
            let marker = if device.status.is_on() { "ON" } else { "OFF" };
            let props = device
                .properties
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| format!("{k}={}", display_value(v)))
                .collect::<Vec<_>>()
                .join(", ");
            let mut line = format!(
                "- {} {}: {}",
                room::label(&device.room),
                device.device_type,
                marker
            );
            if !props.is_empty() {
                line.push_str(&format!(" ({props})"));
            }
            lines.push(line);
        }
        lines.join("\n")
    }
}

/// Strings render without quotes, everything else as JSON
fn display_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Built-in mock devices
fn seed_devices() -> Vec<Device> {
    vec![
        Device::new(DeviceType::Light, "bedroom", DeviceStatus::Off).with_property("brightness", 0),
        Device::new(DeviceType::Light, "living_room", DeviceStatus::On)
            .with_property("brightness", 80),
        Device::new(DeviceType::Ac, "bedroom", DeviceStatus::Off)
            .with_property("temperature", 26)
            .with_property("mode", "cool"),
        Device::new(DeviceType::Ac, "living_room", DeviceStatus::On)
            .with_property("temperature", 24)
            .with_property("mode", "cool"),
        Device::new(DeviceType::Speaker, "living_room", DeviceStatus::Off)
            .with_property("volume", 50)
            .with_property("playing", serde_json::Value::Null),
    ]
}
