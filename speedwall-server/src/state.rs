//! Shared application state handed to every handler and viewer session

use std::sync::Arc;
use std::time::Duration;

use sqlx::SqlitePool;

use speedwall_common::events::EventBus;

use crate::assets::AssetStore;
use crate::config_store::ConfigStore;
use crate::infractions::InfractionStore;

#[derive(Clone)]
pub struct AppState {
    pub bus: EventBus,
    pub pool: SqlitePool,
    pub assets: Arc<dyn AssetStore>,
    pub config_store: Arc<ConfigStore>,
    pub infractions: Arc<InfractionStore>,
    /// How long one infraction stays on the wall before rotation advances
    pub display_duration: Duration,
    /// Minimum interval between telemetry samples forwarded to a viewer
    pub telemetry_interval: Duration,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        assets: Arc<dyn AssetStore>,
        bus: EventBus,
        display_duration: Duration,
        telemetry_interval: Duration,
    ) -> Self {
        let config_store = Arc::new(ConfigStore::new(pool.clone(), bus.clone()));
        let infractions = Arc::new(InfractionStore::new(
            pool.clone(),
            assets.clone(),
            bus.clone(),
        ));
        Self {
            bus,
            pool,
            assets,
            config_store,
            infractions,
            display_duration,
            telemetry_interval,
        }
    }
}
