//! Logical event log used to check per-transaction stage ordering.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Pipeline stage that produced an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Generate,
    Drive,
    Sample,
    Verdict,
}

/// One stage event for one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEvent {
    /// Strictly increasing logical timestamp
    pub tick: u64,

    /// Harness time when the event was recorded (ns)
    pub time_ns: u64,

    pub stage: Stage,
    pub txn_id: u64,
}

/// Events kept per run; later ones only advance the tick counter.
pub const MAX_TIMELINE_EVENTS: usize = 4096;

type Clock = Box<dyn Fn() -> Duration + Send + Sync>;

/// Shared, append-only event log.
///
/// Harness time can repeat (the scoreboard runs at the monitor's instant),
/// so ordering checks use the logical `tick` instead.
///
/// At most `limit` events are kept (default [`MAX_TIMELINE_EVENTS`]); ticks
/// keep increasing past the limit and [`Timeline::dropped`] counts the rest.
pub struct Timeline {
    next_tick: AtomicU64,
    clock: Clock,
    limit: usize,
    events: Mutex<Vec<TimelineEvent>>,
}

impl Timeline {
    /// Creates a timeline stamping events with `clock`.
    pub fn with_clock(clock: impl Fn() -> Duration + Send + Sync + 'static) -> Self {
        Self {
            next_tick: AtomicU64::new(0),
            clock: Box::new(clock),
            limit: MAX_TIMELINE_EVENTS,
            events: Mutex::new(Vec::new()),
        }
    }

    /// Sets how many events are kept.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    fn events_mut(&self) -> MutexGuard<'_, Vec<TimelineEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Records `stage` for `txn_id`.
    pub fn record(&self, stage: Stage, txn_id: u64) -> TimelineEvent {
        let mut events = self.events_mut();
        let event = TimelineEvent {
            tick: self.next_tick.fetch_add(1, Ordering::SeqCst),
            time_ns: (self.clock)().as_nanos() as u64,
            stage,
            txn_id,
        };
        if events.len() < self.limit {
            events.push(event);
        }
        event
    }

    /// Number of events recorded but not kept.
    pub fn dropped(&self) -> u64 {
        let events = self.events_mut();
        self.next_tick.load(Ordering::SeqCst) - events.len() as u64
    }

    /// Returns a copy of all events.
    pub fn events(&self) -> Vec<TimelineEvent> {
        self.events_mut().clone()
    }

    /// Returns the first `stage` event for `txn_id`.
    pub fn find(&self, stage: Stage, txn_id: u64) -> Option<TimelineEvent> {
        self.events_mut()
            .iter()
            .find(|e| e.stage == stage && e.txn_id == txn_id)
            .copied()
    }

    /// Returns the number of `stage` events.
    pub fn count(&self, stage: Stage) -> usize {
        self.events_mut().iter().filter(|e| e.stage == stage).count()
    }

    /// Checks drive < sample < verdict for `txn_id`.
    pub fn is_ordered(&self, txn_id: u64) -> bool {
        let ticks = [Stage::Drive, Stage::Sample, Stage::Verdict]
            .map(|stage| self.find(stage, txn_id).map(|e| e.tick));

        match ticks {
            [Some(drive), Some(sample), Some(verdict)] => drive < sample && sample < verdict,
            _ => false,
        }
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::with_clock(|| Duration::ZERO)
    }
}
