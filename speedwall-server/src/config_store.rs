//! Detection configuration store
//!
//! Holds the single active detection configuration. Updates are
//! operator-driven and low-frequency, so writes are serialized through one
//! async mutex rather than optimistic locking: last committed write wins,
//! and interleaved partial updates cannot occur.

use chrono::Utc;
use sqlx::SqlitePool;
use tokio::sync::Mutex;
use tracing::info;

use speedwall_common::db::DetectionConfigRow;
use speedwall_common::events::{EventBus, SpeedwallEvent};
use speedwall_common::models::{DetectionConfig, DetectionConfigPatch};
use speedwall_common::{Error, Result};

pub struct ConfigStore {
    pool: SqlitePool,
    bus: EventBus,
    write_lock: Mutex<()>,
}

impl ConfigStore {
    pub fn new(pool: SqlitePool, bus: EventBus) -> Self {
        Self {
            pool,
            bus,
            write_lock: Mutex::new(()),
        }
    }

    /// Read the current configuration
    ///
    /// The row is seeded at database initialization; its absence is a
    /// startup invariant violation, not a recoverable condition.
    pub async fn get(&self) -> Result<DetectionConfig> {
        let row: Option<DetectionConfigRow> = sqlx::query_as(
            "SELECT authorized_speed, min_trigger_distance, max_trigger_distance, trigger_cooldown_ms
             FROM detection_config WHERE id = 1",
        )
        .fetch_optional(&self.pool)
        .await?;
        row.map(DetectionConfig::from)
            .ok_or_else(|| Error::Internal("detection_config row is missing".to_string()))
    }

    /// Validate and apply a partial update, replacing the whole row
    ///
    /// On success the `ConfigChanged` event is published before returning,
    /// synchronously with the commit. On validation failure nothing is
    /// written and no event is published.
    pub async fn update(&self, patch: DetectionConfigPatch) -> Result<DetectionConfig> {
        let _guard = self.write_lock.lock().await;

        let current = self.get().await?;
        let candidate = patch.apply(&current);
        candidate.validate().into_result()?;

        sqlx::query(
            "UPDATE detection_config
             SET authorized_speed = ?, min_trigger_distance = ?,
                 max_trigger_distance = ?, trigger_cooldown_ms = ?
             WHERE id = 1",
        )
        .bind(candidate.authorized_speed)
        .bind(candidate.min_trigger_distance)
        .bind(candidate.max_trigger_distance)
        .bind(candidate.trigger_cooldown_ms)
        .execute(&self.pool)
        .await?;

        info!(
            authorized_speed = candidate.authorized_speed,
            min_trigger_distance = candidate.min_trigger_distance,
            max_trigger_distance = candidate.max_trigger_distance,
            trigger_cooldown_ms = candidate.trigger_cooldown_ms,
            "detection configuration updated"
        );

        self.bus.publish(SpeedwallEvent::ConfigChanged {
            config: candidate.clone(),
            timestamp: Utc::now(),
        });

        Ok(candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use speedwall_common::db::init_database;
    use speedwall_common::events::Topic;

    async fn store_with_bus() -> (ConfigStore, EventBus, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let pool = init_database(&dir.path().join("test.db")).await.unwrap();
        let bus = EventBus::new(16);
        (ConfigStore::new(pool, bus.clone()), bus, dir)
    }

    #[tokio::test]
    async fn get_returns_seeded_defaults() {
        let (store, _bus, _dir) = store_with_bus().await;
        assert_eq!(store.get().await.unwrap(), DetectionConfig::default());
    }

    #[tokio::test]
    async fn update_persists_and_publishes_the_full_config() {
        let (store, bus, _dir) = store_with_bus().await;
        let mut rx = bus.subscribe(Topic::Config);

        let patch = DetectionConfigPatch {
            authorized_speed: Some(70),
            trigger_cooldown_ms: Some(2000),
            ..DetectionConfigPatch::default()
        };
        let updated = store.update(patch).await.unwrap();
        assert_eq!(updated.authorized_speed, 70);
        assert_eq!(updated.trigger_cooldown_ms, 2000);

        // Event carries the new full config, published before update returned
        match rx.try_recv().unwrap() {
            SpeedwallEvent::ConfigChanged { config, .. } => assert_eq!(config, updated),
            other => panic!("wrong event: {other:?}"),
        }

        // And the write is durable
        assert_eq!(store.get().await.unwrap(), updated);
    }

    #[tokio::test]
    async fn invalid_update_writes_nothing_and_publishes_nothing() {
        let (store, bus, _dir) = store_with_bus().await;
        let mut rx = bus.subscribe(Topic::Config);
        let before = store.get().await.unwrap();

        let patch = DetectionConfigPatch {
            authorized_speed: Some(0),
            ..DetectionConfigPatch::default()
        };
        assert!(matches!(store.update(patch).await, Err(Error::Validation(_))));

        assert_eq!(store.get().await.unwrap(), before);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn inverted_distances_are_rejected_as_a_pair() {
        let (store, _bus, _dir) = store_with_bus().await;
        let patch = DetectionConfigPatch {
            min_trigger_distance: Some(5000.0),
            max_trigger_distance: Some(100.0),
            ..DetectionConfigPatch::default()
        };
        assert!(matches!(store.update(patch).await, Err(Error::Validation(_))));
    }
}
