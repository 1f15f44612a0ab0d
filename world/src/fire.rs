//! Intensity state machine for a single fire.

use fire_drill_core::{clamp01, FireId, FireProfile, FireSnapshot, FireState, INTENSITY_EPSILON};

/// Outcome of a single intensity mutation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct IntensityChange {
    /// The intensity moved by more than [`INTENSITY_EPSILON`].
    pub(crate) reported: bool,
    /// The mutation moved the fire from burning to extinguished.
    pub(crate) extinguished: bool,
}

/// Authoritative state of a fire that is in play.
#[derive(Clone, Debug)]
pub(crate) struct Fire {
    id: FireId,
    state: FireState,
    intensity: f32,
    max_intensity: f32,
    extinguish_threshold: f32,
    suppression_multiplier: f32,
}

impl Fire {
    /// Lights a new fire using the supplied profile.
    ///
    /// The clamped initial intensity becomes the fire's maximum. The fire
    /// starts burning even when that intensity is already at or below the
    /// threshold, so callers must [`Fire::settle`] after registering it.
    pub(crate) fn ignite(id: FireId, profile: FireProfile) -> Self {
        let intensity = clamp01(profile.initial_intensity());
        Self {
            id,
            state: FireState::Burning,
            intensity,
            max_intensity: intensity,
            extinguish_threshold: profile.extinguish_threshold().max(0.0),
            suppression_multiplier: profile.suppression_multiplier().max(0.0),
        }
    }

    pub(crate) fn is_extinguished(&self) -> bool {
        self.state == FireState::Extinguished
    }

    pub(crate) fn intensity(&self) -> f32 {
        self.intensity
    }

    /// Overwrites the intensity, clamped to `[0, max_intensity]`.
    ///
    /// Extinguished fires ignore the request until they are relit.
    pub(crate) fn set_intensity(&mut self, requested: f32) -> IntensityChange {
        if self.is_extinguished() {
            return IntensityChange::default();
        }

        let previous = self.intensity;
        self.intensity = if requested.is_nan() {
            0.0
        } else {
            requested.clamp(0.0, self.max_intensity)
        };
        let extinguished = self.settle();

        IntensityChange {
            reported: (previous - self.intensity).abs() > INTENSITY_EPSILON,
            extinguished,
        }
    }

    /// Lowers the intensity by `amount` scaled with the suppression multiplier.
    pub(crate) fn reduce_intensity(&mut self, amount: f32) -> IntensityChange {
        // Also rejects NaN.
        if !(amount > 0.0) {
            return IntensityChange::default();
        }
        self.set_intensity(self.intensity - amount * self.suppression_multiplier)
    }

    pub(crate) fn extinguish(&mut self) -> IntensityChange {
        self.set_intensity(0.0)
    }

    /// Restarts the fire at `intensity`; returns whether it went out again immediately.
    ///
    /// Permission is checked by the world against the fire registry.
    pub(crate) fn relight(&mut self, intensity: f32) -> bool {
        self.state = FireState::Burning;
        self.intensity = clamp01(intensity);
        self.max_intensity = self.max_intensity.max(self.intensity);
        self.settle()
    }

    /// Applies the threshold check, returning `true` on the burning to extinguished edge.
    pub(crate) fn settle(&mut self) -> bool {
        if self.state == FireState::Burning && self.intensity <= self.extinguish_threshold {
            self.state = FireState::Extinguished;
            self.intensity = 0.0;
            return true;
        }
        false
    }

    pub(crate) fn snapshot(&self) -> FireSnapshot {
        FireSnapshot {
            id: self.id,
            state: self.state,
            intensity: self.intensity,
            max_intensity: self.max_intensity,
        }
    }
}
