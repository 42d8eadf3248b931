//! Event types and the EventBus for the Speedwall service
//!
//! All real-time coordination goes through the bus: the ingest path
//! publishes `InfractionCreated`, the sensor bridge publishes
//! `TelemetrySample`, and the config store publishes `ConfigChanged`.
//! Viewer sessions subscribe per topic and never share mutable state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::{DetectionConfig, InfractionWithAsset, TelemetrySample};

/// Speedwall event types
///
/// Events are broadcast via [`EventBus`] and serialized for SSE
/// transmission with the variant name as the event tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SpeedwallEvent {
    /// A new infraction was committed by the creation saga
    ///
    /// Triggers:
    /// - Wall sessions: reset rotation to the new arrival
    InfractionCreated {
        /// Fully populated infraction, asset included
        infraction: InfractionWithAsset,
        /// When the saga committed
        timestamp: DateTime<Utc>,
    },

    /// One radar measurement arrived from the sensor bridge
    ///
    /// Triggers:
    /// - Telemetry sessions: forward to the plot, subject to throttling
    TelemetrySample {
        sample: TelemetrySample,
    },

    /// The detection configuration was replaced
    ///
    /// Triggers:
    /// - Telemetry sessions: forward immediately, bypassing the throttle
    ConfigChanged {
        /// The new full configuration
        config: DetectionConfig,
        /// When the update committed
        timestamp: DateTime<Utc>,
    },
}

impl SpeedwallEvent {
    /// Get event type as string for SSE event naming and filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            SpeedwallEvent::InfractionCreated { .. } => "InfractionCreated",
            SpeedwallEvent::TelemetrySample { .. } => "TelemetrySample",
            SpeedwallEvent::ConfigChanged { .. } => "ConfigChanged",
        }
    }

    /// The topic this event is published on
    pub fn topic(&self) -> Topic {
        match self {
            SpeedwallEvent::InfractionCreated { .. } => Topic::Infractions,
            SpeedwallEvent::TelemetrySample { .. } => Topic::Telemetry,
            SpeedwallEvent::ConfigChanged { .. } => Topic::Config,
        }
    }
}

/// Named topics carried by the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Topic {
    Infractions,
    Telemetry,
    Config,
}

/// Central event distribution bus
///
/// One tokio broadcast channel per topic, providing:
/// - Non-blocking publish (slow subscribers never block producers)
/// - FIFO delivery within a topic (each channel serializes sends)
/// - No ordering guarantee across topics
/// - No replay: a receiver only sees events published after `subscribe`
/// - Automatic cleanup when receivers drop (dropping is the unsubscribe)
///
/// Telemetry arrives at sensor rate, so the per-topic capacity should be
/// generous enough that a briefly-busy viewer sees `Lagged` rather than
/// stalling the plot; lagged reads are treated as transient by subscribers.
#[derive(Clone)]
pub struct EventBus {
    infractions_tx: broadcast::Sender<SpeedwallEvent>,
    telemetry_tx: broadcast::Sender<SpeedwallEvent>,
    config_tx: broadcast::Sender<SpeedwallEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with the given per-topic channel capacity
    pub fn new(capacity: usize) -> Self {
        let (infractions_tx, _) = broadcast::channel(capacity);
        let (telemetry_tx, _) = broadcast::channel(capacity);
        let (config_tx, _) = broadcast::channel(capacity);
        Self {
            infractions_tx,
            telemetry_tx,
            config_tx,
            capacity,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<SpeedwallEvent> {
        match topic {
            Topic::Infractions => &self.infractions_tx,
            Topic::Telemetry => &self.telemetry_tx,
            Topic::Config => &self.config_tx,
        }
    }

    /// Publish an event on its topic
    ///
    /// Fire-and-forget: delivery to each current subscriber is at most
    /// once, and a topic with no subscribers silently drops the event.
    pub fn publish(&self, event: SpeedwallEvent) {
        let _ = self.sender(event.topic()).send(event);
    }

    /// Subscribe to all future events on `topic`
    ///
    /// Events published before the subscribe call are not received.
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<SpeedwallEvent> {
        self.sender(topic).subscribe()
    }

    /// Current number of active subscribers on `topic`
    ///
    /// Useful for debugging and monitoring
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.sender(topic).receiver_count()
    }

    /// Get the configured per-topic channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Asset, Infraction, InfractionKind};

    fn sample_event() -> SpeedwallEvent {
        SpeedwallEvent::TelemetrySample {
            sample: TelemetrySample {
                x: 10,
                y: -4,
                speed: 62,
                distance: 1077.0,
                triggered: false,
                received_at: Utc::now(),
            },
        }
    }

    fn infraction_event(id: i64) -> SpeedwallEvent {
        SpeedwallEvent::InfractionCreated {
            infraction: InfractionWithAsset {
                infraction: Infraction {
                    id,
                    captured_at: Utc::now(),
                    recorded_speed: 70,
                    authorized_speed: 50,
                    location: "Lorgues".to_string(),
                    asset_id: id,
                    kind: InfractionKind::SpeedTicket,
                },
                asset: Asset {
                    id,
                    filename: "capture.jpg".to_string(),
                    content_type: "image/jpeg".to_string(),
                    byte_size: 2,
                    storage_key: format!("key-{id}.jpg"),
                },
            },
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn bus_tracks_subscribers_per_topic() {
        let bus = EventBus::new(16);
        assert_eq!(bus.capacity(), 16);
        assert_eq!(bus.subscriber_count(Topic::Telemetry), 0);

        let _rx = bus.subscribe(Topic::Telemetry);
        assert_eq!(bus.subscriber_count(Topic::Telemetry), 1);
        assert_eq!(bus.subscriber_count(Topic::Infractions), 0);
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let bus = EventBus::new(16);
        // Must not panic or block
        bus.publish(sample_event());
    }

    #[tokio::test]
    async fn subscriber_receives_events_published_after_subscribe() {
        let bus = EventBus::new(16);
        bus.publish(infraction_event(1)); // before subscribe: not replayed

        let mut rx = bus.subscribe(Topic::Infractions);
        bus.publish(infraction_event(2));

        match rx.recv().await.unwrap() {
            SpeedwallEvent::InfractionCreated { infraction, .. } => {
                assert_eq!(infraction.infraction.id, 2);
            }
            other => panic!("wrong event: {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn delivery_is_fifo_within_a_topic() {
        let bus = EventBus::new(64);
        let mut rx = bus.subscribe(Topic::Infractions);
        for id in 1..=10 {
            bus.publish(infraction_event(id));
        }
        for expected in 1..=10 {
            match rx.recv().await.unwrap() {
                SpeedwallEvent::InfractionCreated { infraction, .. } => {
                    assert_eq!(infraction.infraction.id, expected);
                }
                other => panic!("wrong event: {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn topics_are_isolated() {
        let bus = EventBus::new(16);
        let mut telemetry_rx = bus.subscribe(Topic::Telemetry);
        let mut config_rx = bus.subscribe(Topic::Config);

        bus.publish(sample_event());

        assert!(matches!(
            telemetry_rx.recv().await.unwrap(),
            SpeedwallEvent::TelemetrySample { .. }
        ));
        assert!(config_rx.try_recv().is_err());
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(sample_event()).unwrap();
        assert_eq!(json["type"], "TelemetrySample");
        assert_eq!(json["sample"]["speed"], 62);
    }
}
