//! Headless drill runner.
//!
//! The runner stands in for the presentation layer: it owns a virtual
//! monotonic wall clock advancing by one frame per iteration, routes scripted
//! trainee actions to the emitters and the world, and schedules the removal of
//! extinguished fires once their extinguish effect would have finished.

use std::{collections::BTreeMap, time::Duration};

use fire_drill_core::{Command, Event, FireId, FireState, SessionReport, Timestamp};
use fire_drill_system_ignition::IgnitionSchedule;
use fire_drill_system_suppression::{Contact, SuppressantContactDetector};
use fire_drill_world::{self as world, query, World};
use serde::Serialize;
use tracing::{debug, info};

use crate::scenario::{Scenario, ScriptAction, ScriptEntry};

/// Result of playing a scenario to completion.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct DrillOutcome {
    /// Final report, absent when the trainee never reached the exit.
    pub(crate) report: Option<SessionReport>,
    /// Number of frames the runner executed.
    pub(crate) frames: u64,
    /// Wall-clock seconds covered by the drill, paused time included.
    pub(crate) wall_secs: f64,
    /// Simulated seconds advanced by ticks.
    pub(crate) simulated_secs: f64,
    /// Legacy points earned.
    pub(crate) score: u32,
    /// Final state of every declared fire.
    pub(crate) fires: Vec<FireOutcome>,
}

/// Final state of a single declared fire.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub(crate) struct FireOutcome {
    pub(crate) id: u32,
    pub(crate) name: String,
    pub(crate) ignited: bool,
    pub(crate) state: Option<FireState>,
    pub(crate) remaining_percent: Option<f32>,
}

/// Plays `scenario` until the trainee exits or the maximum duration elapses.
pub(crate) fn run(scenario: &Scenario) -> DrillOutcome {
    let mut drill = Drill::new(scenario);
    drill.play();
    drill.outcome()
}

struct Drill<'a> {
    scenario: &'a Scenario,
    world: World,
    ignition: IgnitionSchedule,
    emitters: BTreeMap<&'a str, SuppressantContactDetector>,
    script: Vec<&'a ScriptEntry>,
    next_entry: usize,
    despawns: BTreeMap<FireId, Duration>,
    ignited: Vec<FireId>,
    events: Vec<Event>,
    now: Duration,
    frames: u64,
    help_open: bool,
}

impl<'a> Drill<'a> {
    fn new(scenario: &'a Scenario) -> Self {
        let mut world = World::with_config(scenario.session_config());
        let mut events = Vec::new();
        world::apply(
            &mut world,
            Command::BeginSession { at: Timestamp::ZERO },
            &mut events,
        );

        let mut ignition = IgnitionSchedule::new();
        for fire in &scenario.fires {
            if fire.expected {
                world::apply(
                    &mut world,
                    Command::ExpectFire {
                        fire: fire.fire_id(),
                    },
                    &mut events,
                );
            }
            ignition.schedule(fire.fire_id(), fire.profile(), fire.activation_delay());
        }

        let emitters = scenario
            .emitters
            .iter()
            .map(|emitter| {
                (
                    emitter.name.as_str(),
                    SuppressantContactDetector::new(emitter.config()),
                )
            })
            .collect();

        let mut script: Vec<&ScriptEntry> = scenario.script.iter().collect();
        script.sort_by_key(|entry| entry.starts_at());

        Self {
            scenario,
            world,
            ignition,
            emitters,
            script,
            next_entry: 0,
            despawns: BTreeMap::new(),
            ignited: Vec::new(),
            events,
            now: Duration::ZERO,
            frames: 0,
            help_open: false,
        }
    }

    fn play(&mut self) {
        let frame = self.scenario.frame();
        let max_duration = self.scenario.max_duration();
        info!(
            fires = self.scenario.fires.len(),
            emitters = self.emitters.len(),
            "drill started"
        );

        while self.now <= max_duration && !query::game_ended(&self.world) {
            self.step(frame);
            self.frames += 1;
            self.now = self.now.saturating_add(frame);
        }

        if !query::game_ended(&self.world) {
            info!(wall = ?self.now, "drill timed out before the trainee exited");
        }
    }

    fn step(&mut self, frame: Duration) {
        let previous = std::mem::take(&mut self.events);

        let mut commands = Vec::new();
        self.ignition.handle(&previous, &mut commands);
        self.submit(commands);

        self.despawn_due();

        while let Some(entry) = self.script.get(self.next_entry).copied() {
            if entry.starts_at() > self.now {
                break;
            }
            self.next_entry += 1;
            if !entry.is_continuous() {
                self.perform(&entry.action);
            }
        }

        let sprays: Vec<&ScriptEntry> = self.script[..self.next_entry]
            .iter()
            .copied()
            .filter(|entry| entry.is_continuous() && entry.ends_at() >= self.now)
            .collect();
        for entry in sprays {
            if let ScriptAction::Spray {
                emitter,
                fire,
                hits,
            } = &entry.action
            {
                self.spray(emitter, FireId::new(*fire), *hits, frame);
            }
        }

        if !self.help_open && !query::game_ended(&self.world) {
            self.submit(vec![Command::Tick { dt: frame }]);
        }
    }

    fn perform(&mut self, action: &ScriptAction) {
        let at = Timestamp::from_duration(self.now);
        match action {
            ScriptAction::StartDischarge { emitter } => {
                if let Some(detector) = self.emitters.get_mut(emitter.as_str()) {
                    let _ = detector.start_discharge();
                }
            }
            ScriptAction::StopDischarge { emitter } => {
                if let Some(detector) = self.emitters.get_mut(emitter.as_str()) {
                    let _ = detector.stop_discharge();
                }
            }
            ScriptAction::Relight { fire, intensity } => self.submit(vec![Command::RelightFire {
                fire: FireId::new(*fire),
                intensity: *intensity,
            }]),
            ScriptAction::OpenHelp => {
                self.help_open = true;
                self.submit(vec![Command::OpenHelp { at }]);
            }
            ScriptAction::CloseHelp => {
                self.help_open = false;
                self.submit(vec![Command::CloseHelp { at }]);
            }
            ScriptAction::Exit => self.submit(vec![Command::PlayerExited { at }]),
            ScriptAction::Spray { .. } => {}
        }
    }

    /// Delivers one frame of contact and applies the reply before the next contact.
    fn spray(&mut self, emitter: &str, fire: FireId, hits: u32, frame: Duration) {
        let view = query::fire_view(&self.world);
        let Some(detector) = self.emitters.get_mut(emitter) else {
            return;
        };
        let mut commands = Vec::new();
        detector.on_contact(
            Contact {
                fire,
                hit_count: hits,
                elapsed: frame,
            },
            &view,
            &mut commands,
        );
        self.submit(commands);
    }

    fn despawn_due(&mut self) {
        let due: Vec<FireId> = self
            .despawns
            .iter()
            .filter(|(_, at)| **at <= self.now)
            .map(|(fire, _)| *fire)
            .collect();
        for fire in due {
            let _ = self.despawns.remove(&fire);
            self.submit(vec![Command::DespawnFire { fire }]);
        }
    }

    fn submit(&mut self, commands: Vec<Command>) {
        for command in commands {
            let first = self.events.len();
            world::apply(&mut self.world, command, &mut self.events);
            let fresh = self.events[first..].to_vec();
            for event in &fresh {
                self.observe(event);
            }
        }
    }

    fn observe(&mut self, event: &Event) {
        match *event {
            Event::FireIgnited { fire, .. } => {
                if !self.ignited.contains(&fire) {
                    self.ignited.push(fire);
                }
            }
            Event::FireExtinguished { fire } => {
                let due = self.now.saturating_add(self.scenario.despawn_delay());
                let _ = self.despawns.insert(fire, due);
            }
            Event::FireRelit { fire, .. } => {
                let _ = self.despawns.remove(&fire);
            }
            Event::CompletionChanged { completion } => {
                debug!(
                    extinguished = completion.extinguished,
                    activated = completion.activated,
                    percent = completion.completion_percent,
                    "hud completion"
                );
            }
            _ => {}
        }
    }

    fn outcome(&self) -> DrillOutcome {
        let fires = self
            .scenario
            .fires
            .iter()
            .map(|spec| {
                let snapshot = query::fire(&self.world, spec.fire_id());
                let ignited = self.ignited.contains(&spec.fire_id());
                FireOutcome {
                    id: spec.id,
                    name: spec.label(),
                    ignited,
                    state: snapshot
                        .map(|snapshot| snapshot.state)
                        .or(ignited.then_some(FireState::Extinguished)),
                    remaining_percent: snapshot.map(|snapshot| snapshot.percentage()),
                }
            })
            .collect();

        DrillOutcome {
            report: query::session_report(&self.world),
            frames: self.frames,
            wall_secs: self.now.as_secs_f64(),
            simulated_secs: query::simulated_time(&self.world).as_secs_f64(),
            score: query::score(&self.world),
            fires,
        }
    }
}
