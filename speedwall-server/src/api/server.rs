//! HTTP server setup and routing
//!
//! Routes the public wall stream, the admin telemetry stream, the ingest
//! boundary and the config endpoints. Stored photos are served statically
//! under `/assets`.

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// Build the application router
pub fn create_router(state: AppState, asset_dir: std::path::PathBuf) -> Router {
    Router::new()
        // Health endpoint
        .route("/health", get(super::handlers::health))
        // Public wall and admin plot streams
        .route("/api/events/wall", get(super::sse::wall_events))
        .route("/api/events/telemetry", get(super::sse::telemetry_events))
        // Infraction history
        .route("/api/infractions", get(super::handlers::list_infractions))
        .route("/api/infractions/:id", get(super::handlers::get_infraction))
        // Detection configuration
        .route("/api/config", get(super::handlers::get_config))
        .route("/api/config", put(super::handlers::put_config))
        // Sensor bridge boundaries
        .route("/api/telemetry", post(super::handlers::post_telemetry))
        .route("/api/photos", post(super::handlers::post_photo))
        .route("/api/assets/:id", delete(super::handlers::delete_asset))
        // Stored photo objects
        .nest_service("/assets", ServeDir::new(asset_dir))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
