#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for the Fire Drill.
//!
//! The world is the explicit session context: it owns every live fire, the
//! registry that decides whether fires may still start, the scoring
//! aggregator and the session timer. All mutation goes through [`apply`],
//! which returns every resulting notification in the caller's event buffer
//! before it returns.

mod fire;
mod registry;
mod session;

use std::{collections::BTreeMap, time::Duration};

use fire_drill_core::{Command, Event, FireId, FireProfile};
use tracing::{debug, info};

use crate::{
    fire::{Fire, IntensityChange},
    registry::FireRegistry,
    session::{SessionAggregator, SessionClock},
};

pub use session::SessionConfig;

/// Represents the authoritative Fire Drill world state.
#[derive(Debug)]
pub struct World {
    fires: BTreeMap<FireId, Fire>,
    registry: FireRegistry,
    session: SessionAggregator,
    clock: SessionClock,
    tick_index: u64,
    simulated: Duration,
}

impl World {
    /// Creates a new world using the default scoring rules.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(SessionConfig::default())
    }

    /// Creates a new world that scores the session with the provided rules.
    #[must_use]
    pub fn with_config(config: SessionConfig) -> Self {
        Self {
            fires: BTreeMap::new(),
            registry: FireRegistry::new(),
            session: SessionAggregator::new(config),
            clock: SessionClock::new(),
            tick_index: 0,
            simulated: Duration::ZERO,
        }
    }

    fn ignite(&mut self, fire: FireId, profile: FireProfile, out_events: &mut Vec<Event>) {
        if self.fires.contains_key(&fire) {
            debug!(fire = fire.get(), "fire is already in play");
            return;
        }

        let state = Fire::ignite(fire, profile);
        let intensity = state.intensity();
        let _ = self.fires.insert(fire, state);
        let _ = self.registry.register(fire);
        info!(fire = fire.get(), intensity, "fire ignited");
        out_events.push(Event::FireIgnited { fire, intensity });

        if let Some(completion) = self.session.register_activated(fire) {
            out_events.push(Event::CompletionChanged { completion });
        }

        let settled = self.fires.get_mut(&fire).is_some_and(Fire::settle);
        if settled {
            self.resolve_extinguish(fire, out_events);
        }
    }

    fn mutate_fire<F>(&mut self, fire: FireId, out_events: &mut Vec<Event>, mutate: F)
    where
        F: FnOnce(&mut Fire) -> IntensityChange,
    {
        let Some(state) = self.fires.get_mut(&fire) else {
            debug!(fire = fire.get(), "ignoring command for unknown fire");
            return;
        };

        let change = mutate(state);
        if change.reported {
            out_events.push(Event::IntensityChanged {
                fire,
                intensity: state.intensity(),
            });
        }
        if change.extinguished {
            self.resolve_extinguish(fire, out_events);
        }
    }

    fn relight(&mut self, fire: FireId, intensity: f32, out_events: &mut Vec<Event>) {
        if !self.fires.contains_key(&fire) {
            debug!(fire = fire.get(), "ignoring relight of unknown fire");
            return;
        }
        if !self.registry.can_start_new_fire() {
            debug!(fire = fire.get(), "relight refused, all fires are out");
            out_events.push(Event::RelightRefused { fire });
            return;
        }

        let Some(state) = self.fires.get_mut(&fire) else {
            return;
        };
        let extinguished = state.relight(intensity);
        let intensity = state.intensity();
        info!(fire = fire.get(), intensity, "fire relit");
        out_events.push(Event::FireRelit { fire, intensity });
        if extinguished {
            self.resolve_extinguish(fire, out_events);
        }
    }

    fn resolve_extinguish(&mut self, fire: FireId, out_events: &mut Vec<Event>) {
        info!(fire = fire.get(), "fire extinguished");
        out_events.push(Event::FireExtinguished { fire });

        let fires = &self.fires;
        if self
            .registry
            .on_extinguished(|id| fires.get(&id).map(Fire::is_extinguished))
        {
            info!("all fires extinguished, no new fire will start");
            out_events.push(Event::AllFiresExtinguished);
        }

        if let Some(completion) = self.session.notify_extinguished(fire) {
            out_events.push(Event::CompletionChanged { completion });
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::ExpectFire { fire } => {
            if world.session.register_expected(fire) {
                out_events.push(Event::FireExpected { fire });
                out_events.push(Event::CompletionChanged {
                    completion: world.session.completion(),
                });
            }
        }
        Command::IgniteFire { fire, profile } => world.ignite(fire, profile, out_events),
        Command::SetIntensity { fire, intensity } => {
            world.mutate_fire(fire, out_events, |state| state.set_intensity(intensity));
        }
        Command::ReduceIntensity { fire, amount } => {
            world.mutate_fire(fire, out_events, |state| state.reduce_intensity(amount));
        }
        Command::ExtinguishFire { fire } => {
            world.mutate_fire(fire, out_events, Fire::extinguish);
        }
        Command::RelightFire { fire, intensity } => world.relight(fire, intensity, out_events),
        Command::DespawnFire { fire } => {
            if world.fires.remove(&fire).is_some() {
                debug!(fire = fire.get(), "fire despawned");
                out_events.push(Event::FireDespawned { fire });
            }
        }
        Command::Tick { dt } => {
            world.tick_index = world.tick_index.saturating_add(1);
            world.simulated = world.simulated.saturating_add(dt);
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::BeginSession { at } => {
            if !world.session.game_ended() {
                world.clock.begin(at);
            }
        }
        Command::OpenHelp { at } => {
            if world.clock.pause(at) {
                out_events.push(Event::SessionPaused);
            }
        }
        Command::CloseHelp { at } => {
            if world.clock.resume(at) {
                out_events.push(Event::SessionResumed);
            }
        }
        Command::PlayerExited { at } => {
            let time_taken = world.clock.elapsed(at);
            if let Some(report) = world.session.player_exited(time_taken) {
                info!(
                    extinguished = report.fires_extinguished,
                    activated = report.fires_activated,
                    total_percent = report.total_percent,
                    "session won"
                );
                out_events.push(Event::SessionWon { report });
            }
        }
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use fire_drill_core::{
        CompletionSnapshot, FireId, FireSnapshot, FireView, SessionReport, Timestamp,
    };

    use super::World;

    /// Captures a read-only view of the fires currently in play.
    #[must_use]
    pub fn fire_view(world: &World) -> FireView {
        FireView::from_snapshots(world.fires.values().map(|fire| fire.snapshot()).collect())
    }

    /// Captures the state of a single fire if it is in play.
    #[must_use]
    pub fn fire(world: &World, fire: FireId) -> Option<FireSnapshot> {
        world.fires.get(&fire).map(|state| state.snapshot())
    }

    /// Reports whether fires may still start or be relit.
    #[must_use]
    pub fn can_start_new_fire(world: &World) -> bool {
        world.registry.can_start_new_fire()
    }

    /// Number of fires ever registered with the registry.
    #[must_use]
    pub fn registered_fire_count(world: &World) -> usize {
        world.registry.len()
    }

    /// Number of fires the session expects to see.
    #[must_use]
    pub fn expected_fire_count(world: &World) -> u32 {
        world.session.expected_count()
    }

    /// Number of expected fires that ignited.
    #[must_use]
    pub fn activated_fire_count(world: &World) -> u32 {
        world.session.activated_count()
    }

    /// Number of extinguished fires counted toward the score.
    #[must_use]
    pub fn extinguished_fire_count(world: &World) -> u32 {
        world.session.extinguished_count()
    }

    /// Completion figures for the HUD.
    #[must_use]
    pub fn completion(world: &World) -> CompletionSnapshot {
        world.session.completion()
    }

    /// Legacy points earned so far.
    #[must_use]
    pub fn score(world: &World) -> u32 {
        world.session.score()
    }

    /// Reports whether the trainee reached the exit.
    #[must_use]
    pub fn player_exited(world: &World) -> bool {
        world.session.has_player_exited()
    }

    /// Reports whether the session reached its terminal win state.
    #[must_use]
    pub fn game_ended(world: &World) -> bool {
        world.session.game_ended()
    }

    /// Final scoring breakdown, available once the session ended.
    #[must_use]
    pub fn session_report(world: &World) -> Option<SessionReport> {
        world.session.report().copied()
    }

    /// Reports whether the help overlay currently freezes the session timer.
    #[must_use]
    pub fn is_paused(world: &World) -> bool {
        world.clock.is_paused()
    }

    /// Session time elapsed at `now`, excluding paused spans.
    #[must_use]
    pub fn elapsed(world: &World, now: Timestamp) -> Duration {
        world.clock.elapsed(now)
    }

    /// Timer figures for the HUD at the wall-clock reading `now`.
    #[must_use]
    pub fn hud_timer(world: &World, now: Timestamp) -> HudTimer {
        let elapsed = world.clock.elapsed(now);
        let limit = world.session.config().exit_bonus_time_limit();
        HudTimer {
            elapsed,
            remaining: limit.saturating_sub(elapsed),
            bonus_available: elapsed <= limit,
        }
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_index(world: &World) -> u64 {
        world.tick_index
    }

    /// Total simulated time advanced by ticks.
    #[must_use]
    pub fn simulated_time(world: &World) -> Duration {
        world.simulated
    }

    /// Session timer figures presented on the HUD.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct HudTimer {
        /// Session time elapsed so far.
        pub elapsed: Duration,
        /// Time left before the exit bonus expires.
        pub remaining: Duration,
        /// Reports whether exiting now still earns the bonus.
        pub bonus_available: bool,
    }
}
