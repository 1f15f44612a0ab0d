//! Session-wide scoring and the pausable session timer.

use std::{collections::BTreeSet, time::Duration};

use fire_drill_core::{
    CompletionSnapshot, FireId, SessionReport, Timestamp, DEFAULT_EXIT_BONUS_TIME_LIMIT,
    DEFAULT_POINTS_PER_FIRE, EXIT_BONUS_PERCENT, FIRE_COMPLETION_PERCENT,
};
use tracing::{debug, warn};

/// Scoring rules applied to a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    exit_bonus_time_limit: Duration,
    points_per_fire: u32,
}

impl SessionConfig {
    /// Creates a configuration with the provided exit deadline and per-fire points.
    #[must_use]
    pub const fn new(exit_bonus_time_limit: Duration, points_per_fire: u32) -> Self {
        Self {
            exit_bonus_time_limit,
            points_per_fire,
        }
    }

    /// Longest session duration that still earns the exit bonus.
    #[must_use]
    pub const fn exit_bonus_time_limit(&self) -> Duration {
        self.exit_bonus_time_limit
    }

    /// Legacy points awarded per counted extinguished fire.
    #[must_use]
    pub const fn points_per_fire(&self) -> u32 {
        self.points_per_fire
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new(DEFAULT_EXIT_BONUS_TIME_LIMIT, DEFAULT_POINTS_PER_FIRE)
    }
}

/// Expected, activated and extinguished bookkeeping for the session.
#[derive(Debug)]
pub(crate) struct SessionAggregator {
    config: SessionConfig,
    expected: BTreeSet<FireId>,
    activated: BTreeSet<FireId>,
    extinguished: u32,
    score: u32,
    player_exited: bool,
    report: Option<SessionReport>,
}

impl SessionAggregator {
    pub(crate) fn new(config: SessionConfig) -> Self {
        Self {
            config,
            expected: BTreeSet::new(),
            activated: BTreeSet::new(),
            extinguished: 0,
            score: 0,
            player_exited: false,
            report: None,
        }
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Adds a fire to the expected set, returning whether it was inserted.
    pub(crate) fn register_expected(&mut self, fire: FireId) -> bool {
        if self.game_ended() {
            return false;
        }
        self.expected.insert(fire)
    }

    /// Marks an expected fire as ignited, returning the new completion on change.
    pub(crate) fn register_activated(&mut self, fire: FireId) -> Option<CompletionSnapshot> {
        if self.game_ended() {
            return None;
        }
        if !self.expected.contains(&fire) {
            debug!(fire = fire.get(), "ignoring activation of unexpected fire");
            return None;
        }
        if !self.activated.insert(fire) {
            return None;
        }

        debug!(
            fire = fire.get(),
            activated = self.activated.len(),
            "fire activated"
        );
        Some(self.completion())
    }

    /// Counts an extinguished expected fire, returning the new completion on change.
    ///
    /// The count never exceeds the number of activated fires; a notification
    /// that would break that bound is dropped.
    pub(crate) fn notify_extinguished(&mut self, fire: FireId) -> Option<CompletionSnapshot> {
        if self.game_ended() || !self.expected.contains(&fire) {
            return None;
        }
        if self.extinguished >= self.activated_count() {
            warn!(
                fire = fire.get(),
                extinguished = self.extinguished,
                activated = self.activated.len(),
                "dropping extinguish notification beyond activated fires"
            );
            return None;
        }

        self.extinguished += 1;
        self.score = self.score.saturating_add(self.config.points_per_fire);
        Some(self.completion())
    }

    /// Records the exit and computes the final report on the first call.
    pub(crate) fn player_exited(&mut self, time_taken: Duration) -> Option<SessionReport> {
        self.player_exited = true;
        if self.game_ended() {
            return None;
        }

        let (per_fire_percent, percent_from_fires) = self.percent_from_fires();
        let exit_bonus_percent = if time_taken <= self.config.exit_bonus_time_limit {
            EXIT_BONUS_PERCENT
        } else {
            0.0
        };
        let report = SessionReport {
            fires_extinguished: self.extinguished,
            fires_activated: self.activated_count(),
            per_fire_percent,
            percent_from_fires,
            exit_bonus_percent,
            total_percent: (percent_from_fires + exit_bonus_percent).clamp(0.0, 100.0),
            time_taken,
            score: self.score,
        };
        self.report = Some(report);
        Some(report)
    }

    pub(crate) fn completion(&self) -> CompletionSnapshot {
        let (_, percent_from_fires) = self.percent_from_fires();
        CompletionSnapshot {
            extinguished: self.extinguished,
            activated: self.activated_count(),
            completion_percent: percent_from_fires.clamp(0.0, 100.0),
        }
    }

    pub(crate) fn game_ended(&self) -> bool {
        self.report.is_some()
    }

    pub(crate) fn has_player_exited(&self) -> bool {
        self.player_exited
    }

    pub(crate) fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    pub(crate) fn expected_count(&self) -> u32 {
        count(self.expected.len())
    }

    pub(crate) fn activated_count(&self) -> u32 {
        count(self.activated.len())
    }

    pub(crate) fn extinguished_count(&self) -> u32 {
        self.extinguished
    }

    pub(crate) fn score(&self) -> u32 {
        self.score
    }

    fn percent_from_fires(&self) -> (f32, f32) {
        let denominator = self.activated_count().max(1);
        let per_fire_percent = FIRE_COMPLETION_PERCENT / denominator as f32;
        (per_fire_percent, self.extinguished as f32 * per_fire_percent)
    }
}

fn count(len: usize) -> u32 {
    u32::try_from(len).unwrap_or(u32::MAX)
}

/// Session timer fed by monotonic wall-clock readings.
#[derive(Debug, Default)]
pub(crate) struct SessionClock {
    started_at: Timestamp,
    paused_at: Option<Timestamp>,
}

impl SessionClock {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn begin(&mut self, at: Timestamp) {
        self.started_at = at;
        self.paused_at = None;
    }

    /// Freezes the timer, returning `false` if it was already frozen.
    pub(crate) fn pause(&mut self, at: Timestamp) -> bool {
        if self.paused_at.is_some() {
            return false;
        }
        self.paused_at = Some(at);
        true
    }

    /// Resumes the timer and shifts the start by the paused duration.
    pub(crate) fn resume(&mut self, at: Timestamp) -> bool {
        let Some(paused_at) = self.paused_at.take() else {
            return false;
        };
        self.started_at = self.started_at.saturating_add(at.saturating_since(paused_at));
        true
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.paused_at.is_some()
    }

    /// Session time at `now`, excluding paused spans.
    pub(crate) fn elapsed(&self, now: Timestamp) -> Duration {
        self.paused_at
            .unwrap_or(now)
            .saturating_since(self.started_at)
    }
}
