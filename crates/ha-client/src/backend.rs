//! Abstraction over the external automation backend

use async_trait::async_trait;

use crate::error::HaError;
use crate::types::{ConnectionStatus, EntityState, ServiceCall};

/// Operations the sync layer needs from a home-automation backend
#[async_trait]
pub trait AutomationBackend: Send + Sync {
    /// Probe the backend API root
    async fn check_connection(&self) -> ConnectionStatus;

    /// Fetch every entity state
    async fn get_states(&self) -> Result<Vec<EntityState>, HaError>;

    /// Invoke a service against one entity
    async fn call_service(&self, call: &ServiceCall) -> Result<(), HaError>;

    /// Fetch the entities of one domain
    async fn get_entities_by_domain(&self, domain: &str) -> Result<Vec<EntityState>, HaError> {
        let states = self.get_states().await?;
        Ok(states
            .into_iter()
            .filter(|s| s.domain() == domain)
            .collect())
    }
}
