//! Database initialization
//!
//! Creates the sqlite database on first run, applies the schema
//! idempotently, and seeds the singleton detection configuration row.
//! A missing config row after initialization is a fatal startup invariant
//! violation for the config store, so the seed happens here, not lazily.

use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

use crate::models::DetectionConfig;
use crate::Result;

/// Initialize database connection and create tables if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    // Create parent directory if it doesn't exist
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // Foreign keys drive the asset → infraction delete cascade
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;

    // WAL allows concurrent readers with one writer
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;

    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_assets_table(&pool).await?;
    create_infractions_table(&pool).await?;
    create_detection_config_table(&pool).await?;

    seed_detection_config(&pool).await?;

    Ok(pool)
}

async fn create_assets_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS assets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            filename TEXT NOT NULL,
            content_type TEXT NOT NULL,
            byte_size INTEGER NOT NULL,
            storage_key TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_infractions_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS infractions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            captured_at TEXT NOT NULL,
            recorded_speed INTEGER NOT NULL CHECK (recorded_speed > 0),
            authorized_speed INTEGER NOT NULL CHECK (authorized_speed > 0),
            location TEXT NOT NULL CHECK (length(location) > 0),
            kind TEXT NOT NULL DEFAULT 'speed_ticket',
            asset_id INTEGER NOT NULL UNIQUE
                REFERENCES assets(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Serves the "most recent N" wall query
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_infractions_captured_at
         ON infractions(captured_at DESC, id DESC)",
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_detection_config_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS detection_config (
            id INTEGER PRIMARY KEY CHECK (id = 1),
            authorized_speed INTEGER NOT NULL,
            min_trigger_distance REAL NOT NULL,
            max_trigger_distance REAL NOT NULL,
            trigger_cooldown_ms INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// Seed the singleton config row on first run; no-op when present
async fn seed_detection_config(pool: &SqlitePool) -> Result<()> {
    let defaults = DetectionConfig::default();
    let result = sqlx::query(
        "INSERT OR IGNORE INTO detection_config
         (id, authorized_speed, min_trigger_distance, max_trigger_distance, trigger_cooldown_ms)
         VALUES (1, ?, ?, ?, ?)",
    )
    .bind(defaults.authorized_speed)
    .bind(defaults.min_trigger_distance)
    .bind(defaults.max_trigger_distance)
    .bind(defaults.trigger_cooldown_ms)
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!("Seeded default detection configuration");
    }
    Ok(())
}
