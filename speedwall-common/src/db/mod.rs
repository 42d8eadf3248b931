//! Database access layer
//!
//! Schema initialization plus row types bridging sqlite rows and the
//! domain models in [`crate::models`].

pub mod init;

pub use init::init_database;

use sqlx::FromRow;

use crate::error::{Error, Result};
use crate::models::{Asset, DetectionConfig, Infraction, InfractionKind, InfractionWithAsset};

/// Flat row for the infractions ⋈ assets join used by viewer queries
#[derive(Debug, FromRow)]
pub struct InfractionAssetRow {
    pub id: i64,
    pub captured_at: chrono::DateTime<chrono::Utc>,
    pub recorded_speed: i16,
    pub authorized_speed: i16,
    pub location: String,
    pub kind: String,
    pub asset_id: i64,
    pub filename: String,
    pub content_type: String,
    pub byte_size: i64,
    pub storage_key: String,
}

impl InfractionAssetRow {
    /// Convert into the joined read model, rejecting unknown kind tags
    pub fn into_model(self) -> Result<InfractionWithAsset> {
        let kind = InfractionKind::parse(&self.kind)
            .ok_or_else(|| Error::Internal(format!("unknown infraction kind: {}", self.kind)))?;
        Ok(InfractionWithAsset {
            infraction: Infraction {
                id: self.id,
                captured_at: self.captured_at,
                recorded_speed: self.recorded_speed,
                authorized_speed: self.authorized_speed,
                location: self.location,
                asset_id: self.asset_id,
                kind,
            },
            asset: Asset {
                id: self.asset_id,
                filename: self.filename,
                content_type: self.content_type,
                byte_size: self.byte_size,
                storage_key: self.storage_key,
            },
        })
    }
}

/// Row for the singleton detection_config table
#[derive(Debug, FromRow)]
pub struct DetectionConfigRow {
    pub authorized_speed: i16,
    pub min_trigger_distance: f64,
    pub max_trigger_distance: f64,
    pub trigger_cooldown_ms: i64,
}

impl From<DetectionConfigRow> for DetectionConfig {
    fn from(row: DetectionConfigRow) -> Self {
        DetectionConfig {
            authorized_speed: row.authorized_speed,
            min_trigger_distance: row.min_trigger_distance,
            max_trigger_distance: row.max_trigger_distance,
            trigger_cooldown_ms: row.trigger_cooldown_ms,
        }
    }
}
