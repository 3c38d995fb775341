//! Device representation

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Type-specific device attributes, kept in insertion order
pub type Properties = IndexMap<String, Value>;

/// Kind of controllable device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Light,
    Ac,
    Speaker,
}

impl DeviceType {
    /// Prefix used in local device ids
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Ac => "ac",
            Self::Speaker => "speaker",
        }
    }

    /// Parse a device type name as used by tools and scheduled actions
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "light" | "lights" => Some(Self::Light),
            "ac" | "air_conditioner" | "climate" => Some(Self::Ac),
            "speaker" | "media_player" => Some(Self::Speaker),
            _ => None,
        }
    }

    /// Local type for a Home Assistant entity domain
    #[must_use]
    pub fn from_domain(domain: &str) -> Option<Self> {
        match domain {
            ha_client::DOMAIN_LIGHT => Some(Self::Light),
            ha_client::DOMAIN_CLIMATE => Some(Self::Ac),
            ha_client::DOMAIN_MEDIA_PLAYER => Some(Self::Speaker),
            _ => None,
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Power status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    On,
    Off,
}

impl DeviceStatus {
    #[must_use]
    pub fn is_on(&self) -> bool {
        matches!(self, Self::On)
    }
}

/// A device held in the state store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Device {
    /// Local id, `{type}_{room}`
    pub device_id: String,
    /// Fixed for the device's lifetime
    pub device_type: DeviceType,
    /// Canonical room key (e.g., "living_room")
    pub room: String,
    pub status: DeviceStatus,
    pub properties: Properties,
    /// Back-reference to the Home Assistant entity, if mirrored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_entity_id: Option<String>,
}

impl Device {
    /// Create a local device; the id is derived from type and room
    pub fn new(device_type: DeviceType, room: impl Into<String>, status: DeviceStatus) -> Self {
        let room = room.into();
        Self {
            device_id: device_id(device_type, &room),
            device_type,
            room,
            status,
            properties: Properties::new(),
            external_entity_id: None,
        }
    }

    /// Builder-style property setter
    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Attach the external entity association
    #[must_use]
    pub fn with_external_entity(mut self, entity_id: impl Into<String>) -> Self {
        self.external_entity_id = Some(entity_id.into());
        self
    }

    /// Plain snapshot for API responses and reasoning context
    #[must_use]
    pub fn snapshot(&self) -> DeviceSnapshot {
        DeviceSnapshot {
            room: self.room.clone(),
            device_type: self.device_type,
            status: self.status,
            properties: self.properties.clone(),
        }
    }
}

/// Compose a local device id
#[must_use]
pub fn device_id(device_type: DeviceType, room: &str) -> String {
    format!("{}_{}", device_type.as_str(), room)
}

/// Snapshot of a device as exposed by `GET /devices`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSnapshot {
    pub room: String,
    #[serde(rename = "type")]
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub properties: Properties,
}

/// A partial device update; absent fields are left untouched.
///
/// Identity (type, room, external entity) is fixed at creation, so an
/// update never re-keys a device.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DeviceUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<DeviceStatus>,
    /// Merged key by key into the existing properties
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
}

impl DeviceUpdate {
    #[must_use]
    pub fn status(status: DeviceStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Add a property to the update
    #[must_use]
    pub fn property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }

    /// Names of the fields this update touches
    #[must_use]
    pub fn changed_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.status.is_some() {
            fields.push("status".to_string());
        }
        if let Some(props) = &self.properties {
            fields.extend(props.keys().map(|k| format!("properties.{k}")));
        }
        fields
    }

    /// Apply to a device in place
    pub fn apply(&self, device: &mut Device) {
        if let Some(status) = self.status {
            device.status = status;
        }
        if let Some(props) = &self.properties {
            for (key, value) in props {
                device.properties.insert(key.clone(), value.clone());
            }
        }
    }
}
