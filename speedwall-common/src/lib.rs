//! # Speedwall Common Library
//!
//! Shared code for the Speedwall display service including:
//! - Domain models (Infraction, Asset, DetectionConfig, TelemetrySample)
//! - Event types and the topic-based EventBus
//! - Database initialization and row mapping
//! - Error taxonomy
//! - Server settings resolution

pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod settings;

pub use error::{Error, FieldErrors, Result};
