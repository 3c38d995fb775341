//! Home Assistant REST client
//!
//! This crate implements the small slice of the Home Assistant REST API
//! used to mirror device state: listing entity states and calling services.

pub mod backend;
pub mod client;
pub mod error;
pub mod types;

pub use backend::AutomationBackend;
pub use client::HaClient;
pub use error::HaError;
pub use types::*;
