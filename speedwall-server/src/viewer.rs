//! Per-viewer session tasks
//!
//! One spawned task per connected viewer, cooperatively driven by its bus
//! subscriptions and its own timer. Tasks never share mutable state; the
//! outbound mpsc channel is the viewer transport, and the SSE layer turns
//! it into a stream. When the viewer disconnects the channel closes, the
//! task returns, and its subscriptions and any pending sleep are dropped
//! with it in one step. Nothing can touch session state after teardown.
//!
//! Missed or lagged bus deliveries are transient here: the next event or
//! the next timer fire corrects the display, so neither session escalates.

use chrono::Utc;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::time::{sleep_until, Instant};
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use speedwall_common::events::{SpeedwallEvent, Topic};
use speedwall_common::settings::ROTATION_CAPACITY;

use crate::rotation::{RotationEngine, RotationState};
use crate::state::AppState;
use crate::telemetry::{RelayDecision, TelemetryRelay};

/// Outbound channel depth per viewer; small because frames supersede
/// each other and SSE consumers drain quickly
const SESSION_BUFFER: usize = 16;

/// What the public wall renders
#[derive(Debug, Clone, Serialize)]
pub struct WallFrame {
    /// Currently displayed infraction; `None` renders the idle screen
    pub infraction: Option<speedwall_common::models::InfractionWithAsset>,
    /// Resolved photo URL for the displayed infraction
    pub photo_url: Option<String>,
    /// 0-based position within the rotation
    pub position: usize,
    pub total: usize,
}

/// Spawn the rotation session for one wall viewer
pub fn spawn_wall_session(state: AppState) -> mpsc::Receiver<WallFrame> {
    let (tx, rx) = mpsc::channel(SESSION_BUFFER);
    let session_id = Uuid::new_v4();
    let span = info_span!("wall_session", %session_id);
    tokio::spawn(run_wall_session(state, tx).instrument(span));
    rx
}

async fn run_wall_session(state: AppState, tx: mpsc::Sender<WallFrame>) {
    // Subscribe before loading so a capture committed during the load is
    // not missed; the engine deduplicates one delivered twice.
    let mut events = state.bus.subscribe(Topic::Infractions);

    let snapshot = match state.infractions.recent(ROTATION_CAPACITY).await {
        Ok(snapshot) => snapshot,
        Err(err) => {
            error!("initial snapshot load failed: {err}");
            return;
        }
    };

    let mut engine = RotationEngine::new(
        snapshot,
        ROTATION_CAPACITY,
        state.display_duration,
        Instant::now(),
    );
    info!(entries = engine.len(), "wall viewer connected");

    if !send_wall_frame(&state, &tx, &engine).await {
        return;
    }

    loop {
        let deadline = engine.deadline();
        let changed = tokio::select! {
            event = events.recv() => match event {
                Ok(SpeedwallEvent::InfractionCreated { infraction, .. }) => {
                    engine.on_created(infraction, Instant::now());
                    true
                }
                Ok(_) => false,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "wall session lagged behind the bus");
                    false
                }
                Err(RecvError::Closed) => break,
            },
            _ = sleep_until(deadline.map_or_else(Instant::now, |d| d.at)),
                if deadline.is_some() =>
            {
                // The generation check makes a sleep armed before a reset
                // a no-op even if it wakes after the reset.
                engine.on_timer(deadline.expect("guarded").generation, Instant::now())
            }
            _ = tx.closed() => break,
        };

        if changed && !send_wall_frame(&state, &tx, &engine).await {
            break;
        }
    }
    info!("wall viewer disconnected");
}

async fn send_wall_frame(
    state: &AppState,
    tx: &mpsc::Sender<WallFrame>,
    engine: &RotationEngine,
) -> bool {
    let frame = match engine.state() {
        RotationState::Empty => WallFrame {
            infraction: None,
            photo_url: None,
            position: 0,
            total: 0,
        },
        RotationState::Showing(position) => {
            let current = engine.current().cloned();
            let photo_url = match &current {
                Some(item) => match state.assets.url_for(&item.asset.storage_key).await {
                    Ok(url) => Some(url),
                    Err(err) => {
                        warn!("photo url resolution failed: {err}");
                        None
                    }
                },
                None => None,
            };
            WallFrame {
                infraction: current,
                photo_url,
                position,
                total: engine.len(),
            }
        }
    };
    tx.send(frame).await.is_ok()
}

/// Spawn the throttled telemetry session for one admin viewer
///
/// The first frame is always the current detection configuration, so the
/// plot overlay starts correct without waiting for an update.
pub fn spawn_telemetry_session(state: AppState) -> mpsc::Receiver<SpeedwallEvent> {
    let (tx, rx) = mpsc::channel(SESSION_BUFFER);
    let session_id = Uuid::new_v4();
    let span = info_span!("telemetry_session", %session_id);
    tokio::spawn(run_telemetry_session(state, tx).instrument(span));
    rx
}

async fn run_telemetry_session(state: AppState, tx: mpsc::Sender<SpeedwallEvent>) {
    let mut samples = state.bus.subscribe(Topic::Telemetry);
    let mut configs = state.bus.subscribe(Topic::Config);
    let mut relay = TelemetryRelay::new(state.telemetry_interval);

    match state.config_store.get().await {
        Ok(config) => {
            let initial = SpeedwallEvent::ConfigChanged {
                config,
                timestamp: Utc::now(),
            };
            if tx.send(initial).await.is_err() {
                return;
            }
        }
        Err(err) => {
            error!("config snapshot load failed: {err}");
            return;
        }
    }
    info!("telemetry viewer connected");

    loop {
        tokio::select! {
            event = samples.recv() => match event {
                Ok(event @ SpeedwallEvent::TelemetrySample { .. }) => {
                    if relay.on_sample(Instant::now()) == RelayDecision::Forward
                        && tx.send(event).await.is_err()
                    {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    // Dropping samples is the relay's job anyway
                    warn!(skipped, "telemetry session lagged behind the bus");
                }
                Err(RecvError::Closed) => break,
            },
            event = configs.recv() => match event {
                Ok(event @ SpeedwallEvent::ConfigChanged { .. }) => {
                    if relay.on_config_changed() == RelayDecision::Forward
                        && tx.send(event).await.is_err()
                    {
                        break;
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "config updates lagged; latest wins on next delivery");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tx.closed() => break,
        }
    }
    info!("telemetry viewer disconnected");
}
