#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Suppression system that turns suppressant contacts into intensity reductions.
//!
//! One [`SuppressantContactDetector`] exists per spray emitter. The presentation
//! layer reports every physical contact between suppressant and a fire surface
//! as a [`Contact`]; while the emitter discharges, the detector answers with a
//! bounded `Command::ReduceIntensity` for the touched fire.
//!
//! The hit cap bounds a single report. Callers must aggregate the collisions
//! of one frame into at most one [`Contact`] per fire; every additional report
//! for the same fire in that frame removes another capped amount.

use std::{collections::BTreeMap, time::Duration};

use fire_drill_core::{Command, FireId, FireView};
use tracing::debug;

/// Contacts counted per report when the configuration does not say otherwise.
pub const DEFAULT_HIT_CAP_PER_TICK: u32 = 3;

/// Intensity removed per contact and second when not configured.
pub const DEFAULT_EXTINGUISH_RATE: f32 = 0.5;

/// Configuration parameters required to construct a detector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Config {
    extinguish_rate: f32,
    hit_cap_per_tick: u32,
    instant_extinguish: bool,
}

impl Config {
    /// Creates a configuration with the provided rate and per-report contact cap.
    #[must_use]
    pub const fn new(extinguish_rate: f32, hit_cap_per_tick: u32) -> Self {
        Self {
            extinguish_rate,
            hit_cap_per_tick,
            instant_extinguish: false,
        }
    }

    /// Makes the first contact put the fire out entirely.
    #[must_use]
    pub const fn with_instant_extinguish(mut self, instant_extinguish: bool) -> Self {
        self.instant_extinguish = instant_extinguish;
        self
    }

    /// Intensity removed per counted contact and second of frame time.
    #[must_use]
    pub const fn extinguish_rate(&self) -> f32 {
        self.extinguish_rate
    }

    /// Largest contact count honoured in a single report.
    #[must_use]
    pub const fn hit_cap_per_tick(&self) -> u32 {
        self.hit_cap_per_tick
    }

    /// Reports whether contacts extinguish fires outright.
    #[must_use]
    pub const fn instant_extinguish(&self) -> bool {
        self.instant_extinguish
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_EXTINGUISH_RATE, DEFAULT_HIT_CAP_PER_TICK)
    }
}

/// Physical contacts between suppressant and one fire during a frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Contact {
    /// Fire whose surface was touched.
    pub fire: FireId,
    /// Number of collision events reported for this fire.
    pub hit_count: u32,
    /// Frame time the contact represents.
    pub elapsed: Duration,
}

/// Per-emitter system tracking which fires are currently being suppressed.
#[derive(Debug)]
pub struct SuppressantContactDetector {
    config: Config,
    active: bool,
    fires_in_contact: BTreeMap<FireId, f32>,
}

impl SuppressantContactDetector {
    /// Creates an idle detector using the supplied configuration.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            config,
            active: false,
            fires_in_contact: BTreeMap::new(),
        }
    }

    /// Configuration the detector was created with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Reports whether the emitter is discharging.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Begins discharging; returns `false` if the emitter already was.
    pub fn start_discharge(&mut self) -> bool {
        self.set_active(true)
    }

    /// Stops discharging; returns `false` if the emitter already was idle.
    pub fn stop_discharge(&mut self) -> bool {
        self.set_active(false)
    }

    /// Converts a contact into a reduction command for the touched fire.
    ///
    /// Send at most one contact per fire per frame, since the hit cap applies
    /// to each call.
    ///
    /// Contacts are ignored while idle and for fires that are unknown to
    /// `fires` or already extinguished.
    pub fn on_contact(&mut self, contact: Contact, fires: &FireView, out: &mut Vec<Command>) {
        if !self.active {
            debug!(fire = contact.fire.get(), "contact ignored, emitter idle");
            return;
        }

        let Some(snapshot) = fires.get(contact.fire) else {
            debug!(fire = contact.fire.get(), "contact with unknown fire");
            return;
        };
        if snapshot.is_extinguished() {
            return;
        }

        let amount = if self.config.instant_extinguish() {
            out.push(Command::ExtinguishFire { fire: contact.fire });
            snapshot.intensity
        } else {
            let amount = self.extinguish_amount(contact.hit_count, contact.elapsed);
            out.push(Command::ReduceIntensity {
                fire: contact.fire,
                amount,
            });
            amount
        };

        debug!(
            fire = contact.fire.get(),
            hits = contact.hit_count,
            amount,
            intensity = snapshot.intensity,
            "suppressant applied"
        );
        *self.fires_in_contact.entry(contact.fire).or_insert(0.0) += amount;
    }

    /// Fires that received suppressant during the current discharge.
    ///
    /// Entries for fires that left play or went out are purged first.
    pub fn active_targets(&mut self, fires: &FireView) -> Vec<FireId> {
        self.purge_stale(fires);
        self.fires_in_contact
            .iter()
            .filter(|(_, applied)| **applied > 0.0)
            .map(|(fire, _)| *fire)
            .collect()
    }

    /// Reports whether any burning fire is receiving suppressant.
    pub fn is_suppressing(&mut self, fires: &FireView) -> bool {
        !self.active_targets(fires).is_empty()
    }

    /// Suppressant applied to `fire` during the current discharge.
    pub fn applied_to(&mut self, fire: FireId, fires: &FireView) -> Option<f32> {
        self.purge_stale(fires);
        self.fires_in_contact.get(&fire).copied()
    }

    /// Intensity reduction for `hit_count` contacts over `elapsed`.
    ///
    /// A report always counts as at least one contact and never as more
    /// than the configured cap.
    #[must_use]
    pub fn extinguish_amount(&self, hit_count: u32, elapsed: Duration) -> f32 {
        let hits = hit_count.clamp(1, self.config.hit_cap_per_tick().max(1));
        (self.config.extinguish_rate() * hits as f32 * elapsed.as_secs_f32()).max(0.0)
    }

    fn set_active(&mut self, active: bool) -> bool {
        if self.active == active {
            return false;
        }
        self.active = active;
        self.fires_in_contact.clear();
        debug!(active, "discharge toggled");
        true
    }

    fn purge_stale(&mut self, fires: &FireView) {
        self.fires_in_contact.retain(|fire, _| fires.is_burning(*fire));
    }
}

impl Default for SuppressantContactDetector {
    fn default() -> Self {
        Self::new(Config::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn amount_counts_zero_hits_as_one_contact() {
        let detector = SuppressantContactDetector::default();
        let amount = detector.extinguish_amount(0, Duration::from_secs(1));
        assert!((amount - 0.5).abs() < 1e-6);
    }

    #[test]
    fn amount_is_capped_per_report() {
        let detector = SuppressantContactDetector::default();
        let capped = detector.extinguish_amount(10, Duration::from_millis(100));
        assert!((capped - 0.15).abs() < 1e-6);
    }

    #[test]
    fn amount_never_exceeds_rate_times_cap() {
        let detector = SuppressantContactDetector::new(Config::new(0.8, 3));
        let elapsed = Duration::from_millis(16);
        let bound = 0.8 * 3.0 * elapsed.as_secs_f32();
        for hits in [0, 1, 2, 3, 4, 50, u32::MAX] {
            assert!(detector.extinguish_amount(hits, elapsed) <= bound + f32::EPSILON);
        }
    }

    #[test]
    fn negative_rates_do_not_heal_fires() {
        let detector = SuppressantContactDetector::new(Config::new(-1.0, 3));
        assert_eq!(detector.extinguish_amount(3, Duration::from_secs(1)), 0.0);
    }

    #[test]
    fn toggles_are_idempotent() {
        let mut detector = SuppressantContactDetector::default();
        assert!(!detector.stop_discharge());
        assert!(detector.start_discharge());
        assert!(!detector.start_discharge());
        assert!(detector.is_active());
        assert!(detector.stop_discharge());
        assert!(!detector.is_active());
    }
}
