//! Device state layer
//!
//! This crate owns the in-memory device state store, mirrors it to and
//! from an external Home Assistant instance, and provides the device
//! control operations and the fast-path command matcher built on top.

pub mod control;
pub mod device;
pub mod room;
pub mod rules;
pub mod store;
pub mod sync;

pub use control::DeviceController;
pub use device::{Device, DeviceSnapshot, DeviceStatus, DeviceType, DeviceUpdate, Properties};
pub use rules::{RuleMatcher, RuleOutcome};
pub use store::{AuditEntry, DeviceStateStore};
pub use sync::{DeviceCommand, SyncAdapter};
