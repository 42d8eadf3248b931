//! HTTP request handlers
//!
//! Request/response types live next to their handlers; errors propagate
//! through [`crate::error::ApiError`] for uniform status mapping.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use speedwall_common::events::SpeedwallEvent;
use speedwall_common::models::{
    DetectionConfig, DetectionConfigPatch, InfractionKind, InfractionWithAsset, NewInfraction,
    TelemetrySample,
};
use speedwall_common::settings::ROTATION_CAPACITY;
use speedwall_common::Error;

use crate::error::ApiResult;
use crate::state::AppState;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: String,
    module: String,
    version: String,
}

/// One infraction plus the URL its photo is served from
#[derive(Debug, Serialize)]
pub struct InfractionView {
    #[serde(flatten)]
    item: InfractionWithAsset,
    photo_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InfractionListResponse {
    infractions: Vec<InfractionView>,
    count: usize,
}

/// Sensor bridge telemetry payload; `distance` may be precomputed
#[derive(Debug, Deserialize)]
pub struct TelemetryRequest {
    x: i16,
    y: i16,
    speed: i16,
    distance: Option<f64>,
    #[serde(default)]
    triggered: bool,
}

#[derive(Debug, Serialize)]
pub struct AcceptedResponse {
    status: &'static str,
}

/// Structured fields accompanying an uploaded photo
#[derive(Debug, Deserialize)]
struct IngestMetadata {
    captured_at: Option<DateTime<Utc>>,
    recorded_speed: i16,
    authorized_speed: i16,
    location: String,
    kind: Option<InfractionKind>,
}

#[derive(Debug, Serialize)]
pub struct IngestResponse {
    infraction_id: i64,
    asset_id: i64,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health - Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        module: "speedwall".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET /api/infractions - Recent infractions, most recent first
pub async fn list_infractions(
    State(state): State<AppState>,
) -> ApiResult<Json<InfractionListResponse>> {
    let items = state.infractions.recent(ROTATION_CAPACITY).await?;
    let mut infractions = Vec::with_capacity(items.len());
    for item in items {
        infractions.push(view_of(&state, item).await);
    }
    let count = infractions.len();
    Ok(Json(InfractionListResponse { infractions, count }))
}

/// GET /api/infractions/:id - One infraction by id
pub async fn get_infraction(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<Json<InfractionView>> {
    let item = state.infractions.get(id).await?;
    Ok(Json(view_of(&state, item).await))
}

async fn view_of(state: &AppState, item: InfractionWithAsset) -> InfractionView {
    let photo_url = state.assets.url_for(&item.asset.storage_key).await.ok();
    InfractionView {
        item,
        photo_url,
    }
}

/// DELETE /api/assets/:id - Remove a stored photo and its infraction
pub async fn delete_asset(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.infractions.delete_asset(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/config - Current detection configuration
pub async fn get_config(State(state): State<AppState>) -> ApiResult<Json<DetectionConfig>> {
    Ok(Json(state.config_store.get().await?))
}

/// PUT /api/config - Patch the detection configuration
///
/// Returns the new full configuration; subscribed viewers receive the
/// same config through `ConfigChanged` on the bus.
pub async fn put_config(
    State(state): State<AppState>,
    Json(patch): Json<DetectionConfigPatch>,
) -> ApiResult<Json<DetectionConfig>> {
    Ok(Json(state.config_store.update(patch).await?))
}

/// POST /api/telemetry - One radar measurement from the sensor bridge
///
/// Samples are never persisted; they only transit the event bus.
pub async fn post_telemetry(
    State(state): State<AppState>,
    Json(request): Json<TelemetryRequest>,
) -> (StatusCode, Json<AcceptedResponse>) {
    let distance = request.distance.unwrap_or_else(|| {
        (f64::from(request.x).powi(2) + f64::from(request.y).powi(2)).sqrt()
    });
    state.bus.publish(SpeedwallEvent::TelemetrySample {
        sample: TelemetrySample {
            x: request.x,
            y: request.y,
            speed: request.speed,
            distance,
            triggered: request.triggered,
            received_at: Utc::now(),
        },
    });
    (StatusCode::ACCEPTED, Json(AcceptedResponse { status: "accepted" }))
}

/// POST /api/photos - Ingest one captured infraction
///
/// Multipart form: a `photo` file part and an `infraction` JSON part.
/// Invokes the creation saga exactly once per request.
pub async fn post_photo(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<(StatusCode, Json<IngestResponse>)> {
    let mut photo: Option<(Vec<u8>, String, String)> = None;
    let mut metadata: Option<IngestMetadata> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidInput(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("photo") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::InvalidInput(format!("unreadable photo part: {e}")))?;
                photo = Some((bytes.to_vec(), filename, content_type));
            }
            Some("infraction") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| Error::InvalidInput(format!("unreadable infraction part: {e}")))?;
                metadata = Some(
                    serde_json::from_str(&text)
                        .map_err(|e| Error::InvalidInput(format!("bad infraction JSON: {e}")))?,
                );
            }
            _ => {}
        }
    }

    let (bytes, filename, content_type) =
        photo.ok_or_else(|| Error::InvalidInput("photo part is missing".to_string()))?;
    let metadata =
        metadata.ok_or_else(|| Error::InvalidInput("infraction part is missing".to_string()))?;

    let created = state
        .infractions
        .create(NewInfraction {
            photo: bytes,
            filename,
            content_type,
            captured_at: metadata.captured_at.unwrap_or_else(Utc::now),
            recorded_speed: metadata.recorded_speed,
            authorized_speed: metadata.authorized_speed,
            location: metadata.location,
            kind: metadata.kind.unwrap_or_default(),
        })
        .await?;

    info!(infraction_id = created.infraction.id, "photo ingested");
    Ok((
        StatusCode::CREATED,
        Json(IngestResponse {
            infraction_id: created.infraction.id,
            asset_id: created.asset.id,
        }),
    ))
}
