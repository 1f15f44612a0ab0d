#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Fire Drill engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems and
//! presentation layers to react to. Systems consume event streams, query
//! immutable snapshots such as [`FireView`], and respond exclusively with new
//! command batches.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to the Fire Drill.";

/// Minimum intensity change that is reported as [`Event::IntensityChanged`].
pub const INTENSITY_EPSILON: f32 = 0.01;

/// Intensity a fire burns at when its profile does not say otherwise.
pub const DEFAULT_INITIAL_INTENSITY: f32 = 1.0;

/// Intensity at or below which a fire counts as extinguished by default.
pub const DEFAULT_EXTINGUISH_THRESHOLD: f32 = 0.01;

/// Share of the maximum intensity below which a fire is critically low.
pub const CRITICALLY_LOW_RATIO: f32 = 0.25;

/// Completion share awarded for extinguishing every activated fire.
pub const FIRE_COMPLETION_PERCENT: f32 = 90.0;

/// Completion share awarded for reaching the exit inside the time limit.
pub const EXIT_BONUS_PERCENT: f32 = 10.0;

/// Exit deadline used when a session does not configure one.
pub const DEFAULT_EXIT_BONUS_TIME_LIMIT: Duration = Duration::from_secs(600);

/// Legacy points awarded per extinguished fire when not configured.
pub const DEFAULT_POINTS_PER_FIRE: u32 = 100;

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Declares that the fire is part of the exercise and counts toward scoring.
    ExpectFire {
        /// Identifier of the fire the spawn scheduler intends to bring into play.
        fire: FireId,
    },
    /// Brings a fire into play so that it starts burning.
    IgniteFire {
        /// Identifier of the fire that ignites.
        fire: FireId,
        /// Burn parameters applied to the fire.
        profile: FireProfile,
    },
    /// Overwrites the intensity of a burning fire.
    SetIntensity {
        /// Identifier of the targeted fire.
        fire: FireId,
        /// Requested intensity, clamped by the world.
        intensity: f32,
    },
    /// Lowers the intensity of a burning fire.
    ReduceIntensity {
        /// Identifier of the targeted fire.
        fire: FireId,
        /// Non-negative amount to subtract; other values are ignored.
        amount: f32,
    },
    /// Forces the intensity of a fire to zero.
    ExtinguishFire {
        /// Identifier of the targeted fire.
        fire: FireId,
    },
    /// Requests that a fire burns again at the provided intensity.
    RelightFire {
        /// Identifier of the targeted fire.
        fire: FireId,
        /// Intensity the fire restarts with, clamped to `[0, 1]`.
        intensity: f32,
    },
    /// Removes a fire from play once its extinguish effects completed.
    DespawnFire {
        /// Identifier of the fire to remove.
        fire: FireId,
    },
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Anchors the session timer at the provided wall-clock reading.
    BeginSession {
        /// Monotonic wall-clock reading at which the session starts.
        at: Timestamp,
    },
    /// Opens the help overlay, freezing the session timer.
    OpenHelp {
        /// Monotonic wall-clock reading at which the overlay opened.
        at: Timestamp,
    },
    /// Closes the help overlay, resuming the session timer.
    CloseHelp {
        /// Monotonic wall-clock reading at which the overlay closed.
        at: Timestamp,
    },
    /// Reports that the trainee reached the exit zone.
    PlayerExited {
        /// Monotonic wall-clock reading at which the exit was reached.
        at: Timestamp,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a fire was added to the set of expected fires.
    FireExpected {
        /// Identifier of the expected fire.
        fire: FireId,
    },
    /// Confirms that a fire started burning.
    FireIgnited {
        /// Identifier of the fire that ignited.
        fire: FireId,
        /// Intensity the fire ignited with.
        intensity: f32,
    },
    /// Reports a noticeable change of a fire's intensity.
    IntensityChanged {
        /// Identifier of the fire whose intensity changed.
        fire: FireId,
        /// Intensity after the change.
        intensity: f32,
    },
    /// Announces that a fire was put out.
    FireExtinguished {
        /// Identifier of the fire that was extinguished.
        fire: FireId,
    },
    /// Announces that every registered fire is extinguished.
    AllFiresExtinguished,
    /// Confirms that an extinguished fire burns again.
    FireRelit {
        /// Identifier of the relit fire.
        fire: FireId,
        /// Intensity the fire restarted with.
        intensity: f32,
    },
    /// Reports that a relight was refused because no new fires may start.
    RelightRefused {
        /// Identifier of the fire whose relight was refused.
        fire: FireId,
    },
    /// Confirms that a fire was removed from play.
    FireDespawned {
        /// Identifier of the removed fire.
        fire: FireId,
    },
    /// Publishes the recomputed completion shown on the HUD.
    CompletionChanged {
        /// Completion data after the change.
        completion: CompletionSnapshot,
    },
    /// Announces that the session timer was frozen.
    SessionPaused,
    /// Announces that the session timer resumed.
    SessionResumed,
    /// Announces the terminal win state together with the final percentages.
    SessionWon {
        /// Final scoring breakdown of the session.
        report: SessionReport,
    },
}

/// Unique identifier assigned to a fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FireId(u32);

impl FireId {
    /// Creates a new fire identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Reading of the monotonic wall clock, measured from an arbitrary origin.
///
/// The session timer is driven by these readings rather than by simulated
/// time, so pausing the simulation does not stop it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp(Duration);

impl Timestamp {
    /// Reading taken at the clock origin.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Creates a timestamp located `since_origin` after the clock origin.
    #[must_use]
    pub const fn from_duration(since_origin: Duration) -> Self {
        Self(since_origin)
    }

    /// Creates a timestamp from fractional seconds.
    ///
    /// Negative and NaN values saturate to zero, values too large for a
    /// [`Duration`] saturate to [`Duration::MAX`].
    #[must_use]
    pub fn from_secs_f32(secs: f32) -> Self {
        if secs.is_nan() || secs <= 0.0 {
            Self::ZERO
        } else {
            Self(Duration::try_from_secs_f32(secs).unwrap_or(Duration::MAX))
        }
    }

    /// Duration elapsed from `earlier` to `self`, saturating at zero.
    #[must_use]
    pub fn saturating_since(self, earlier: Timestamp) -> Duration {
        self.0.saturating_sub(earlier.0)
    }

    /// Returns the reading shifted later by `offset`.
    #[must_use]
    pub fn saturating_add(self, offset: Duration) -> Self {
        Self(self.0.saturating_add(offset))
    }
}

/// Burn parameters captured when a fire ignites.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FireProfile {
    initial_intensity: f32,
    extinguish_threshold: f32,
    suppression_multiplier: f32,
}

impl FireProfile {
    /// Creates a profile with the provided starting intensity and threshold.
    #[must_use]
    pub const fn new(initial_intensity: f32, extinguish_threshold: f32) -> Self {
        Self {
            initial_intensity,
            extinguish_threshold,
            suppression_multiplier: 1.0,
        }
    }

    /// Scales every suppressant reduction applied to the fire by `multiplier`.
    #[must_use]
    pub const fn with_suppression_multiplier(mut self, multiplier: f32) -> Self {
        self.suppression_multiplier = multiplier;
        self
    }

    /// Intensity the fire ignites with before clamping.
    #[must_use]
    pub const fn initial_intensity(&self) -> f32 {
        self.initial_intensity
    }

    /// Intensity at or below which the fire is extinguished.
    #[must_use]
    pub const fn extinguish_threshold(&self) -> f32 {
        self.extinguish_threshold
    }

    /// Factor applied to suppressant reductions.
    #[must_use]
    pub const fn suppression_multiplier(&self) -> f32 {
        self.suppression_multiplier
    }
}

impl Default for FireProfile {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL_INTENSITY, DEFAULT_EXTINGUISH_THRESHOLD)
    }
}

/// Clamps a value into the normalized `[0, 1]` range; NaN maps to zero.
#[must_use]
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Burn state of a single fire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FireState {
    /// The fire is alight and reacts to suppressant.
    Burning,
    /// The fire is out and ignores suppressant until relit.
    Extinguished,
}

/// Immutable representation of a single fire's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FireSnapshot {
    /// Unique identifier assigned to the fire.
    pub id: FireId,
    /// Current burn state.
    pub state: FireState,
    /// Current normalized intensity.
    pub intensity: f32,
    /// Intensity captured at ignition, used to normalize percentages.
    pub max_intensity: f32,
}

impl FireSnapshot {
    /// Reports whether the fire is extinguished.
    #[must_use]
    pub fn is_extinguished(&self) -> bool {
        self.state == FireState::Extinguished
    }

    /// Current intensity expressed as a percentage of the ignition intensity.
    #[must_use]
    pub fn percentage(&self) -> f32 {
        if self.max_intensity <= 0.0 {
            return 0.0;
        }
        self.intensity / self.max_intensity * 100.0
    }

    /// Reports whether the fire burns at a quarter of its ignition intensity or less.
    #[must_use]
    pub fn is_critically_low(&self) -> bool {
        self.intensity <= self.max_intensity * CRITICALLY_LOW_RATIO
    }
}

/// Read-only snapshot describing all fires currently in play.
#[derive(Clone, Debug, Default)]
pub struct FireView {
    snapshots: Vec<FireSnapshot>,
}

impl FireView {
    /// Creates a new fire view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<FireSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Looks up the snapshot of a fire that is still in play.
    #[must_use]
    pub fn get(&self, fire: FireId) -> Option<&FireSnapshot> {
        self.snapshots
            .binary_search_by_key(&fire, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Reports whether the fire is in play and still burning.
    #[must_use]
    pub fn is_burning(&self, fire: FireId) -> bool {
        self.get(fire)
            .is_some_and(|snapshot| snapshot.state == FireState::Burning)
    }

    /// Iterator over the captured fire snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &FireSnapshot> {
        self.snapshots.iter()
    }

    /// Number of fires captured by the view.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view captured no fires.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// Completion figures shown on the HUD while the session runs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompletionSnapshot {
    /// Number of counted extinguished fires.
    pub extinguished: u32,
    /// Number of expected fires that actually ignited.
    pub activated: u32,
    /// Completion earned from fires so far, in `[0, 100]`.
    pub completion_percent: f32,
}

/// Final scoring breakdown captured when the trainee exits.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Number of counted extinguished fires.
    pub fires_extinguished: u32,
    /// Number of expected fires that actually ignited.
    pub fires_activated: u32,
    /// Completion share each activated fire is worth.
    pub per_fire_percent: f32,
    /// Completion earned from extinguished fires.
    pub percent_from_fires: f32,
    /// Completion earned by exiting inside the time limit.
    pub exit_bonus_percent: f32,
    /// Overall completion in `[0, 100]`.
    pub total_percent: f32,
    /// Wall-clock time the session took, excluding paused time.
    #[serde(with = "duration_secs")]
    pub time_taken: Duration,
    /// Legacy points accumulated for extinguished fires.
    pub score: u32,
}

mod duration_secs {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub(crate) fn serialize<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub(crate) fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(intensity: f32, max_intensity: f32) -> FireSnapshot {
        FireSnapshot {
            id: FireId::new(1),
            state: FireState::Burning,
            intensity,
            max_intensity,
        }
    }

    #[test]
    fn clamp01_bounds_values_and_maps_nan_to_zero() {
        assert_eq!(clamp01(-0.5), 0.0);
        assert_eq!(clamp01(1.5), 1.0);
        assert_eq!(clamp01(0.25), 0.25);
        assert_eq!(clamp01(f32::NAN), 0.0);
    }

    #[test]
    fn percentage_normalizes_against_ignition_intensity() {
        assert!((snapshot(0.4, 0.8).percentage() - 50.0).abs() < 1e-4);
        assert_eq!(snapshot(0.0, 0.0).percentage(), 0.0);
    }

    #[test]
    fn critically_low_uses_quarter_of_max() {
        assert!(snapshot(0.2, 0.8).is_critically_low());
        assert!(!snapshot(0.21, 0.8).is_critically_low());
    }

    #[test]
    fn fire_view_lookup_is_order_independent() {
        let view = FireView::from_snapshots(vec![
            FireSnapshot {
                id: FireId::new(9),
                ..snapshot(1.0, 1.0)
            },
            FireSnapshot {
                id: FireId::new(2),
                state: FireState::Extinguished,
                ..snapshot(0.0, 1.0)
            },
        ]);

        assert_eq!(view.len(), 2);
        assert!(view.is_burning(FireId::new(9)));
        assert!(!view.is_burning(FireId::new(2)));
        assert!(view.get(FireId::new(5)).is_none());
        let ids: Vec<_> = view.iter().map(|snapshot| snapshot.id.get()).collect();
        assert_eq!(ids, vec![2, 9]);
    }

    #[test]
    fn timestamp_since_saturates() {
        let early = Timestamp::from_duration(Duration::from_secs(5));
        let late = Timestamp::from_secs_f32(8.0);
        assert_eq!(late.saturating_since(early), Duration::from_secs(3));
        assert_eq!(early.saturating_since(late), Duration::ZERO);
        assert_eq!(Timestamp::from_secs_f32(-1.0), Timestamp::ZERO);
    }

    #[test]
    fn timestamp_from_out_of_range_seconds_saturates() {
        let max = Timestamp::from_duration(Duration::MAX);
        assert_eq!(Timestamp::from_secs_f32(1e20), max);
        assert_eq!(Timestamp::from_secs_f32(f32::INFINITY), max);
        assert_eq!(Timestamp::from_secs_f32(f32::NAN), Timestamp::ZERO);
        assert_eq!(Timestamp::from_secs_f32(f32::NEG_INFINITY), Timestamp::ZERO);
    }

    #[test]
    fn session_report_serializes_time_as_seconds() {
        let report = SessionReport {
            fires_extinguished: 2,
            fires_activated: 2,
            per_fire_percent: 45.0,
            percent_from_fires: 90.0,
            exit_bonus_percent: 10.0,
            total_percent: 100.0,
            time_taken: Duration::from_millis(1500),
            score: 200,
        };
        let json = serde_json::to_value(report).expect("serialize");
        assert_eq!(json["time_taken"], serde_json::json!(1.5));
        let restored: SessionReport = serde_json::from_value(json).expect("deserialize");
        assert_eq!(restored, report);
    }
}
