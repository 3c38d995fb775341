//! Home Assistant wire types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::HaError;

/// Entity domain for lights
pub const DOMAIN_LIGHT: &str = "light";
/// Entity domain for climate units
pub const DOMAIN_CLIMATE: &str = "climate";
/// Entity domain for media players
pub const DOMAIN_MEDIA_PLAYER: &str = "media_player";

/// State of a single entity as returned by `GET /api/states`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    /// Entity id (e.g., "light.bedroom_ceiling")
    pub entity_id: String,
    /// Raw state string ("on", "off", "playing", "cool", ...)
    pub state: String,
    /// Entity attributes
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl EntityState {
    /// Create an entity state with no attributes
    pub fn new(entity_id: impl Into<String>, state: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes: Map::new(),
        }
    }

    /// Builder-style attribute setter
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Domain part of the entity id ("light" for "light.kitchen")
    #[must_use]
    pub fn domain(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(domain, _)| domain)
    }

    /// Object id part of the entity id ("kitchen" for "light.kitchen")
    #[must_use]
    pub fn object_id(&self) -> &str {
        self.entity_id
            .split_once('.')
            .map_or(self.entity_id.as_str(), |(_, object)| object)
    }

    /// The `friendly_name` attribute, if any
    #[must_use]
    pub fn friendly_name(&self) -> Option<&str> {
        self.attributes.get("friendly_name").and_then(Value::as_str)
    }

    /// Numeric attribute lookup
    #[must_use]
    pub fn attribute_f64(&self, key: &str) -> Option<f64> {
        self.attributes.get(key).and_then(Value::as_f64)
    }

    /// String attribute lookup
    #[must_use]
    pub fn attribute_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }
}

/// Result of `GET /api/`
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionStatus {
    pub connected: bool,
    pub message: String,
}

/// A service invocation (`POST /api/services/{domain}/{service}`)
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    pub domain: String,
    pub service: String,
    pub entity_id: String,
    pub data: Map<String, Value>,
}

impl ServiceCall {
    /// Create a service call targeting one entity
    pub fn new(
        domain: impl Into<String>,
        service: impl Into<String>,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            domain: domain.into(),
            service: service.into(),
            entity_id: entity_id.into(),
            data: Map::new(),
        }
    }

    /// Attach a service data field
    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// Request path for this call
    #[must_use]
    pub fn path(&self) -> String {
        format!("/api/services/{}/{}", self.domain, self.service)
    }

    /// JSON body: the service data plus the target `entity_id`
    #[must_use]
    pub fn body(&self) -> Value {
        let mut body = self.data.clone();
        body.insert("entity_id".into(), Value::String(self.entity_id.clone()));
        Value::Object(body)
    }
}

/// Check that an entity id has the `domain.object_id` shape
pub fn validate_entity_id(entity_id: &str) -> Result<(), HaError> {
    match entity_id.split_once('.') {
        Some((domain, object)) if !domain.is_empty() && !object.is_empty() => Ok(()),
        _ => Err(HaError::InvalidEntityId(entity_id.to_string())),
    }
}
