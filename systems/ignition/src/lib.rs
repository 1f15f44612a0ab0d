#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic ignition system responsible for staggered fire activation.

use std::{cmp::Reverse, collections::BinaryHeap, time::Duration};

use fire_drill_core::{Command, Event, FireId, FireProfile};
use tracing::debug;

/// Pure system that ignites scheduled fires once their delay has elapsed.
///
/// Delays are measured in simulated time, so ticks withheld while the
/// simulation is paused also hold back pending ignitions.
#[derive(Debug, Default)]
pub struct IgnitionSchedule {
    elapsed: Duration,
    next_sequence: u64,
    pending: BinaryHeap<Reverse<PendingIgnition>>,
}

impl IgnitionSchedule {
    /// Creates an empty schedule anchored at simulated time zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `fire` to ignite once `delay` of simulated time has passed.
    ///
    /// Entries sharing an activation time ignite in the order they were scheduled.
    pub fn schedule(&mut self, fire: FireId, profile: FireProfile, delay: Duration) {
        let entry = PendingIgnition {
            due: self.elapsed.saturating_add(delay),
            sequence: self.next_sequence,
            fire,
            profile,
        };
        self.next_sequence += 1;
        self.pending.push(Reverse(entry));
    }

    /// Number of fires waiting to ignite.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Reports whether every scheduled fire has been ignited.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty()
    }

    /// Simulated time observed by the schedule so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Consumes world events and emits ignition commands for due fires.
    pub fn handle(&mut self, events: &[Event], out: &mut Vec<Command>) {
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                self.elapsed = self.elapsed.saturating_add(*dt);
            }
        }

        while let Some(Reverse(next)) = self.pending.peek() {
            if next.due > self.elapsed {
                break;
            }
            let Some(Reverse(due)) = self.pending.pop() else {
                break;
            };
            debug!(fire = due.fire.get(), due = ?due.due, "scheduled fire ignites");
            out.push(Command::IgniteFire {
                fire: due.fire,
                profile: due.profile,
            });
        }
    }
}

#[derive(Clone, Copy, Debug)]
struct PendingIgnition {
    due: Duration,
    sequence: u64,
    fire: FireId,
    profile: FireProfile,
}

impl PendingIgnition {
    fn key(&self) -> (Duration, u64) {
        (self.due, self.sequence)
    }
}

impl PartialEq for PendingIgnition {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for PendingIgnition {}

impl PartialOrd for PendingIgnition {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PendingIgnition {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(&other.key())
    }
}
