//! Infraction record store and the asset+record creation saga
//!
//! The blob store and the relational store share no transaction, so
//! creation runs as a two-phase write with compensation:
//!
//! 1. Reject missing payload/filename (`InvalidInput`, no side effects)
//! 2. Store the photo under a fresh key (`StorageFailure` aborts cleanly)
//! 3. Insert asset and infraction rows in one sqlite transaction
//! 4. On step-3 failure, delete the stored photo and surface the original
//!    error; a failed delete is logged, never raised
//! 5. Publish `InfractionCreated` and return the joined model
//!
//! Retrying after `StorageFailure` is safe: a fresh key is generated each
//! attempt and no relational state exists yet.

use std::sync::Arc;

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{error, info, warn};

use speedwall_common::error::FieldErrors;
use speedwall_common::events::{EventBus, SpeedwallEvent};
use speedwall_common::db::InfractionAssetRow;
use speedwall_common::models::{Asset, Infraction, InfractionWithAsset, NewInfraction};
use speedwall_common::{Error, Result};

use crate::assets::{generate_storage_key, AssetStore};

const RECENT_QUERY: &str = "\
    SELECT i.id, i.captured_at, i.recorded_speed, i.authorized_speed, i.location, i.kind, \
           i.asset_id, a.filename, a.content_type, a.byte_size, a.storage_key \
    FROM infractions i JOIN assets a ON a.id = i.asset_id";

/// Facade over the relational store and the blob store collaborator
#[derive(Clone)]
pub struct InfractionStore {
    pool: SqlitePool,
    assets: Arc<dyn AssetStore>,
    bus: EventBus,
}

impl InfractionStore {
    pub fn new(pool: SqlitePool, assets: Arc<dyn AssetStore>, bus: EventBus) -> Self {
        Self { pool, assets, bus }
    }

    /// Run the creation saga for one captured infraction
    pub async fn create(&self, new: NewInfraction) -> Result<InfractionWithAsset> {
        if new.photo.is_empty() {
            return Err(Error::InvalidInput("photo payload is empty".to_string()));
        }
        if new.filename.trim().is_empty() {
            return Err(Error::InvalidInput("photo filename is missing".to_string()));
        }

        let key = generate_storage_key(&new.filename, Utc::now());
        self.assets.put(&key, &new.photo, &new.content_type).await?;

        match self.insert_records(&new, &key).await {
            Ok(created) => {
                info!(
                    infraction_id = created.infraction.id,
                    recorded_speed = created.infraction.recorded_speed,
                    "infraction recorded"
                );
                self.bus.publish(SpeedwallEvent::InfractionCreated {
                    infraction: created.clone(),
                    timestamp: Utc::now(),
                });
                Ok(created)
            }
            Err(err) => {
                // Compensation: the photo was stored but no record exists.
                // An orphaned asset is tolerated over masking the original
                // error, so a failed delete is only logged.
                if let Err(delete_err) = self.assets.delete(&key).await {
                    error!(
                        storage_key = %key,
                        "asset compensation failed after rejected record: {delete_err}"
                    );
                }
                Err(err)
            }
        }
    }

    /// Step 3 of the saga: both inserts under one local transaction
    async fn insert_records(&self, new: &NewInfraction, key: &str) -> Result<InfractionWithAsset> {
        new.validate().into_result()?;

        let mut tx = self.pool.begin().await?;

        let asset_id = sqlx::query(
            "INSERT INTO assets (filename, content_type, byte_size, storage_key)
             VALUES (?, ?, ?, ?)",
        )
        .bind(&new.filename)
        .bind(&new.content_type)
        .bind(new.photo.len() as i64)
        .bind(key)
        .execute(&mut *tx)
        .await
        .map_err(constraint_to_validation)?
        .last_insert_rowid();

        let infraction_id = sqlx::query(
            "INSERT INTO infractions
             (captured_at, recorded_speed, authorized_speed, location, kind, asset_id)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(new.captured_at)
        .bind(new.recorded_speed)
        .bind(new.authorized_speed)
        .bind(&new.location)
        .bind(new.kind.as_str())
        .bind(asset_id)
        .execute(&mut *tx)
        .await
        .map_err(constraint_to_validation)?
        .last_insert_rowid();

        tx.commit().await?;

        Ok(InfractionWithAsset {
            infraction: Infraction {
                id: infraction_id,
                captured_at: new.captured_at,
                recorded_speed: new.recorded_speed,
                authorized_speed: new.authorized_speed,
                location: new.location.clone(),
                asset_id,
                kind: new.kind,
            },
            asset: Asset {
                id: asset_id,
                filename: new.filename.clone(),
                content_type: new.content_type.clone(),
                byte_size: new.photo.len() as i64,
                storage_key: key.to_string(),
            },
        })
    }

    /// Most recent infractions with their assets
    ///
    /// Ordered by captured-at descending, tie-broken by id descending so
    /// every wall viewer loads an identical snapshot.
    pub async fn recent(&self, limit: usize) -> Result<Vec<InfractionWithAsset>> {
        let rows: Vec<InfractionAssetRow> =
            sqlx::query_as(&format!("{RECENT_QUERY} ORDER BY i.captured_at DESC, i.id DESC LIMIT ?"))
                .bind(limit as i64)
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(InfractionAssetRow::into_model).collect()
    }

    /// Look up one infraction by id
    pub async fn get(&self, id: i64) -> Result<InfractionWithAsset> {
        let row: Option<InfractionAssetRow> =
            sqlx::query_as(&format!("{RECENT_QUERY} WHERE i.id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or_else(|| Error::NotFound(format!("infraction {id}")))?
            .into_model()
    }

    /// Remove an asset; its infraction (if any) goes with it via cascade
    ///
    /// The stored object is deleted best-effort after the row: a stale
    /// object is preferable to a record pointing at nothing.
    pub async fn delete_asset(&self, asset_id: i64) -> Result<()> {
        let key: Option<String> = sqlx::query_scalar("SELECT storage_key FROM assets WHERE id = ?")
            .bind(asset_id)
            .fetch_optional(&self.pool)
            .await?;
        let key = key.ok_or_else(|| Error::NotFound(format!("asset {asset_id}")))?;

        sqlx::query("DELETE FROM assets WHERE id = ?")
            .bind(asset_id)
            .execute(&self.pool)
            .await?;

        if let Err(err) = self.assets.delete(&key).await {
            warn!(storage_key = %key, "stored object removal failed: {err}");
        }
        Ok(())
    }
}

/// Constraint violations are caller errors, not infrastructure failures
fn constraint_to_validation(err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(db)
            if db.is_check_violation()
                || db.is_unique_violation()
                || db.is_foreign_key_violation() =>
        {
            let mut fields = FieldErrors::new();
            fields.push("database", db.message().to_string());
            Error::Validation(fields)
        }
        _ => Error::Database(err),
    }
}
