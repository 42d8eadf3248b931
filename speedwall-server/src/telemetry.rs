//! Telemetry forwarding throttle
//!
//! The sensor publishes samples at whatever rate it measures; a live plot
//! needs freshness, not completeness. Each viewer session owns one relay
//! that forwards at most one sample per interval and drops the rest.
//! Excess samples are never queued, so the plot can never fall behind.
//! Configuration changes bypass the throttle entirely.

use std::time::Duration;

use tokio::time::Instant;

/// Whether an event is forwarded to the viewer or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayDecision {
    Forward,
    Drop,
}

pub struct TelemetryRelay {
    interval: Duration,
    last_forwarded: Option<Instant>,
}

impl TelemetryRelay {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_forwarded: None,
        }
    }

    /// Admit or drop one telemetry sample
    ///
    /// The first sample is always forwarded; afterwards one sample per
    /// interval passes and the window restarts from the forwarded sample.
    pub fn on_sample(&mut self, now: Instant) -> RelayDecision {
        match self.last_forwarded {
            Some(last) if now.duration_since(last) < self.interval => RelayDecision::Drop,
            _ => {
                self.last_forwarded = Some(now);
                RelayDecision::Forward
            }
        }
    }

    /// Config changes are forwarded immediately and unconditionally
    ///
    /// The sample throttle window is left untouched: a config change must
    /// not delay nor hasten the next sample.
    pub fn on_config_changed(&mut self) -> RelayDecision {
        RelayDecision::Forward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(100);

    #[test]
    fn first_sample_is_forwarded() {
        let mut relay = TelemetryRelay::new(INTERVAL);
        assert_eq!(relay.on_sample(Instant::now()), RelayDecision::Forward);
    }

    #[test]
    fn burst_is_throttled_to_one_sample_per_interval() {
        let mut relay = TelemetryRelay::new(INTERVAL);
        let start = Instant::now();

        // 100 samples over 1s, 10ms apart: expect one per 100ms window
        let mut forwarded = 0;
        for i in 0..100 {
            let now = start + Duration::from_millis(i * 10);
            if relay.on_sample(now) == RelayDecision::Forward {
                forwarded += 1;
            }
        }
        let expected = 1000 / 100;
        assert!(
            (forwarded as i64 - expected).abs() <= 1,
            "forwarded {forwarded}, expected about {expected}"
        );
    }

    #[test]
    fn sample_inside_the_window_is_dropped_without_queueing() {
        let mut relay = TelemetryRelay::new(INTERVAL);
        let start = Instant::now();

        assert_eq!(relay.on_sample(start), RelayDecision::Forward);
        assert_eq!(
            relay.on_sample(start + Duration::from_millis(50)),
            RelayDecision::Drop
        );
        // The dropped sample did not move the window
        assert_eq!(
            relay.on_sample(start + Duration::from_millis(100)),
            RelayDecision::Forward
        );
    }

    #[test]
    fn config_changes_bypass_the_throttle() {
        let mut relay = TelemetryRelay::new(INTERVAL);
        let start = Instant::now();

        assert_eq!(relay.on_sample(start), RelayDecision::Forward);
        // Mid-window: sample would be dropped, config still passes
        assert_eq!(relay.on_config_changed(), RelayDecision::Forward);
        assert_eq!(relay.on_config_changed(), RelayDecision::Forward);

        // And the config forwards did not perturb the sample window
        assert_eq!(
            relay.on_sample(start + Duration::from_millis(50)),
            RelayDecision::Drop
        );
        assert_eq!(
            relay.on_sample(start + Duration::from_millis(110)),
            RelayDecision::Forward
        );
    }
}
