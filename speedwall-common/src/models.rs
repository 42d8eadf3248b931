//! Domain models shared across the Speedwall service
//!
//! Row types map 1:1 onto the sqlite tables created in [`crate::db`];
//! `TelemetrySample` is the one ephemeral type and is never persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FieldErrors;

/// Maximum accepted length for an infraction's free-text location
pub const MAX_LOCATION_LEN: usize = 120;

/// Classification of a recorded infraction
///
/// Open enumeration: only speed tickets exist today, but the wire and
/// storage formats carry the tag as a string so new kinds can be added
/// without a schema change.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfractionKind {
    SpeedTicket,
}

impl InfractionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InfractionKind::SpeedTicket => "speed_ticket",
        }
    }

    /// Parse the storage tag; unknown tags are rejected by the caller
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "speed_ticket" => Some(InfractionKind::SpeedTicket),
            _ => None,
        }
    }
}

impl Default for InfractionKind {
    fn default() -> Self {
        InfractionKind::SpeedTicket
    }
}

/// One recorded speed violation tied to one captured image
///
/// Immutable after creation; removed only when its asset row is deleted
/// (foreign key cascade). Identifiers are sqlite rowids, so they sort by
/// creation order and tie-break the `captured_at` ordering deterministically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Infraction {
    pub id: i64,
    pub captured_at: DateTime<Utc>,
    pub recorded_speed: i16,
    pub authorized_speed: i16,
    pub location: String,
    pub asset_id: i64,
    pub kind: InfractionKind,
}

/// The binary image object backing one infraction
///
/// `storage_key` is opaque outside the asset store; callers must not derive
/// meaning from it. An asset may exist without an owning infraction in
/// partially-failed saga states, so asset existence never proves an
/// infraction exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Asset {
    pub id: i64,
    pub filename: String,
    pub content_type: String,
    pub byte_size: i64,
    pub storage_key: String,
}

/// Joined read model: an infraction together with its asset
///
/// This is what viewers receive in events and API responses.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfractionWithAsset {
    #[serde(flatten)]
    pub infraction: Infraction,
    pub asset: Asset,
}

/// Write model for the infraction creation saga
#[derive(Debug, Clone)]
pub struct NewInfraction {
    pub photo: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    pub captured_at: DateTime<Utc>,
    pub recorded_speed: i16,
    pub authorized_speed: i16,
    pub location: String,
    pub kind: InfractionKind,
}

impl NewInfraction {
    /// Field-level validation applied inside the saga's transaction step
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.recorded_speed <= 0 {
            errors.push("recorded_speed", "must be strictly positive");
        }
        if self.authorized_speed <= 0 {
            errors.push("authorized_speed", "must be strictly positive");
        }
        if self.location.trim().is_empty() {
            errors.push("location", "must not be empty");
        } else if self.location.len() > MAX_LOCATION_LEN {
            errors.push(
                "location",
                format!("must be at most {} bytes", MAX_LOCATION_LEN),
            );
        }
        errors
    }
}

/// The single active detection configuration
///
/// Exactly one row exists; it is seeded at database initialization and only
/// ever replaced whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Speed limit enforced by the sensor (km/h)
    pub authorized_speed: i16,
    /// Targets closer than this are ignored (cm)
    pub min_trigger_distance: f64,
    /// Targets farther than this are ignored (cm)
    pub max_trigger_distance: f64,
    /// Minimum delay between two captures (ms)
    pub trigger_cooldown_ms: i64,
}

impl DetectionConfig {
    pub fn validate(&self) -> FieldErrors {
        let mut errors = FieldErrors::new();
        if self.authorized_speed <= 0 {
            errors.push("authorized_speed", "must be strictly positive");
        }
        if self.min_trigger_distance < 0.0 {
            errors.push("min_trigger_distance", "must not be negative");
        }
        if self.max_trigger_distance <= 0.0 {
            errors.push("max_trigger_distance", "must be strictly positive");
        }
        if self.min_trigger_distance > self.max_trigger_distance {
            errors.push(
                "min_trigger_distance",
                "must not exceed max_trigger_distance",
            );
        }
        if self.trigger_cooldown_ms < 0 {
            errors.push("trigger_cooldown_ms", "must not be negative");
        }
        errors
    }
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            authorized_speed: 50,
            min_trigger_distance: 0.0,
            max_trigger_distance: 10_000.0,
            trigger_cooldown_ms: 1000,
        }
    }
}

/// Partial update for [`DetectionConfig`]; absent fields keep their value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DetectionConfigPatch {
    pub authorized_speed: Option<i16>,
    pub min_trigger_distance: Option<f64>,
    pub max_trigger_distance: Option<f64>,
    pub trigger_cooldown_ms: Option<i64>,
}

impl DetectionConfigPatch {
    /// Merge this patch over `current`, producing the candidate full row
    pub fn apply(&self, current: &DetectionConfig) -> DetectionConfig {
        DetectionConfig {
            authorized_speed: self.authorized_speed.unwrap_or(current.authorized_speed),
            min_trigger_distance: self
                .min_trigger_distance
                .unwrap_or(current.min_trigger_distance),
            max_trigger_distance: self
                .max_trigger_distance
                .unwrap_or(current.max_trigger_distance),
            trigger_cooldown_ms: self.trigger_cooldown_ms.unwrap_or(current.trigger_cooldown_ms),
        }
    }
}

/// One radar measurement relayed to the admin plot
///
/// Ephemeral: exists only on the event bus and in each relay's throttle
/// window. Position is relative to the sensor; `distance` is precomputed by
/// the sensor bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySample {
    pub x: i16,
    pub y: i16,
    pub speed: i16,
    pub distance: f64,
    pub triggered: bool,
    pub received_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_new_infraction() -> NewInfraction {
        NewInfraction {
            photo: vec![0xFF, 0xD8],
            filename: "capture.jpg".to_string(),
            content_type: "image/jpeg".to_string(),
            captured_at: Utc::now(),
            recorded_speed: 72,
            authorized_speed: 50,
            location: "Lorgues".to_string(),
            kind: InfractionKind::SpeedTicket,
        }
    }

    #[test]
    fn new_infraction_accepts_valid_fields() {
        assert!(valid_new_infraction().validate().is_empty());
    }

    #[test]
    fn new_infraction_rejects_non_positive_speeds() {
        let mut new = valid_new_infraction();
        new.recorded_speed = 0;
        new.authorized_speed = -10;
        let errors = new.validate();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["recorded_speed", "authorized_speed"]);
    }

    #[test]
    fn new_infraction_rejects_empty_and_oversized_location() {
        let mut new = valid_new_infraction();
        new.location = "   ".to_string();
        assert!(!new.validate().is_empty());

        new.location = "x".repeat(MAX_LOCATION_LEN + 1);
        assert!(!new.validate().is_empty());
    }

    #[test]
    fn detection_config_default_is_valid() {
        assert!(DetectionConfig::default().validate().is_empty());
    }

    #[test]
    fn detection_config_rejects_inverted_distances() {
        let config = DetectionConfig {
            min_trigger_distance: 500.0,
            max_trigger_distance: 100.0,
            ..DetectionConfig::default()
        };
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.field == "min_trigger_distance"));
    }

    #[test]
    fn patch_applies_only_present_fields() {
        let current = DetectionConfig::default();
        let patch = DetectionConfigPatch {
            authorized_speed: Some(70),
            ..DetectionConfigPatch::default()
        };
        let next = patch.apply(&current);
        assert_eq!(next.authorized_speed, 70);
        assert_eq!(next.trigger_cooldown_ms, current.trigger_cooldown_ms);
    }

    #[test]
    fn infraction_kind_round_trips_through_storage_tag() {
        let kind = InfractionKind::SpeedTicket;
        assert_eq!(InfractionKind::parse(kind.as_str()), Some(kind));
        assert_eq!(InfractionKind::parse("parking_ticket"), None);
    }
}
