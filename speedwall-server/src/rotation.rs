//! Display rotation state machine
//!
//! Decides which infraction a wall viewer shows and when it advances.
//! The engine owns no real timer: it exposes a generation-tagged deadline
//! and the owning session sleeps until it, reporting the fire back with
//! the generation it observed. A sleep that was started before a reset
//! carries a stale generation and its fire is a guaranteed no-op, so a
//! session can never double-advance.
//!
//! A newly created infraction always takes display priority: the snapshot
//! is prepended, the index resets to 0 and the timer restarts, so a fresh
//! capture is visible immediately and for a full display period no matter
//! what the rotation was showing.

use std::collections::VecDeque;
use std::time::Duration;

use tokio::time::Instant;

use speedwall_common::models::InfractionWithAsset;

/// What the viewer is currently showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationState {
    /// No infractions known; no timer armed
    Empty,
    /// Showing the snapshot entry at `index`
    Showing(usize),
}

/// A pending advance, tagged so stale fires can be recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    pub generation: u64,
    pub at: Instant,
}

pub struct RotationEngine {
    /// Most-recent-first, bounded snapshot of recent infractions
    snapshot: VecDeque<InfractionWithAsset>,
    capacity: usize,
    period: Duration,
    state: RotationState,
    generation: u64,
    deadline: Option<Deadline>,
}

impl RotationEngine {
    /// Build the engine from the snapshot loaded at viewer connect
    ///
    /// `snapshot` must already be ordered most-recent-first; entries past
    /// `capacity` are dropped. A non-empty snapshot starts at index 0 with
    /// a timer armed for one display period.
    pub fn new(
        snapshot: Vec<InfractionWithAsset>,
        capacity: usize,
        period: Duration,
        now: Instant,
    ) -> Self {
        let mut engine = Self {
            snapshot: snapshot.into_iter().take(capacity).collect(),
            capacity,
            period,
            state: RotationState::Empty,
            generation: 0,
            deadline: None,
        };
        if !engine.snapshot.is_empty() {
            engine.state = RotationState::Showing(0);
            engine.arm(now);
        }
        engine
    }

    fn arm(&mut self, now: Instant) {
        self.generation += 1;
        self.deadline = Some(Deadline {
            generation: self.generation,
            at: now + self.period,
        });
    }

    /// React to a newly created infraction
    ///
    /// Prepends (evicting the oldest entry past capacity), resets to
    /// index 0 unconditionally and restarts the timer. This is also the
    /// Empty → Showing transition, which arms the first timer.
    pub fn on_created(&mut self, infraction: InfractionWithAsset, now: Instant) {
        // An arrival already present (delivered between subscribe and the
        // initial snapshot load) is moved back to the front, not duplicated.
        self.snapshot.retain(|i| i.infraction.id != infraction.infraction.id);
        self.snapshot.push_front(infraction);
        self.snapshot.truncate(self.capacity);

        self.state = RotationState::Showing(0);
        self.arm(now);
    }

    /// React to the advance timer firing
    ///
    /// Returns `true` when the display changed. A fire whose generation
    /// does not match the armed deadline is stale and does nothing.
    pub fn on_timer(&mut self, generation: u64, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline.generation == generation => {}
            _ => return false,
        }

        if self.snapshot.is_empty() {
            // Entries were purged since the timer was armed
            self.state = RotationState::Empty;
            self.deadline = None;
            return true;
        }

        let index = match self.state {
            RotationState::Showing(index) => index,
            RotationState::Empty => 0,
        };
        self.state = RotationState::Showing((index + 1) % self.snapshot.len());
        self.arm(now);
        true
    }

    /// The infraction currently on display
    pub fn current(&self) -> Option<&InfractionWithAsset> {
        match self.state {
            RotationState::Showing(index) => self.snapshot.get(index),
            RotationState::Empty => None,
        }
    }

    pub fn state(&self) -> RotationState {
        self.state
    }

    /// The pending advance, if a timer is armed
    pub fn deadline(&self) -> Option<Deadline> {
        self.deadline
    }

    pub fn len(&self) -> usize {
        self.snapshot.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.is_empty()
    }
}
