//! Speedwall display service
//!
//! Serves the public infraction wall and the admin telemetry view over
//! SSE, accepts uploads from the roadside sensor, and keeps every
//! connected viewer in sync through the process-wide event bus.

pub mod api;
pub mod assets;
pub mod config_store;
pub mod error;
pub mod infractions;
pub mod rotation;
pub mod state;
pub mod telemetry;
pub mod viewer;
