//! Scenario files describing a scripted drill.
//!
//! A scenario lists the spray emitters, the fires together with their
//! activation delays and a timeline of trainee actions. Files are TOML and
//! are validated as a whole before a drill starts.

use std::{
    collections::BTreeSet,
    fs, io,
    path::{Path, PathBuf},
    time::Duration,
};

use fire_drill_core::{
    FireId, FireProfile, DEFAULT_EXTINGUISH_THRESHOLD, DEFAULT_INITIAL_INTENSITY,
    DEFAULT_POINTS_PER_FIRE,
};
use fire_drill_system_suppression::{Config, DEFAULT_EXTINGUISH_RATE, DEFAULT_HIT_CAP_PER_TICK};
use fire_drill_world::SessionConfig;
use serde::Deserialize;
use thiserror::Error;

/// Errors raised while loading or validating a scenario.
#[derive(Debug, Error)]
pub(crate) enum ScenarioError {
    /// The scenario file could not be read.
    #[error("failed to read scenario at {}", path.display())]
    Io {
        /// Location of the unreadable file.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },
    /// The scenario contents are not valid TOML for the scenario schema.
    #[error("failed to parse scenario toml: {0}")]
    Parse(#[from] toml::de::Error),
    /// The frame length is zero, negative or not a number.
    #[error("frame_secs must be positive, got {0}")]
    NonPositiveFrame(f64),
    /// A duration field is negative, not finite or too large to represent.
    #[error("{field} must be a representable non-negative number of seconds, got {value}")]
    InvalidDuration {
        /// Name of the offending field.
        field: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// Two fires share an identifier.
    #[error("fire id {0} is declared more than once")]
    DuplicateFire(u32),
    /// Two emitters share a name.
    #[error("emitter `{0}` is declared more than once")]
    DuplicateEmitter(String),
    /// A script entry names an emitter that is not declared.
    #[error("script entry {index} references unknown emitter `{name}`")]
    UnknownEmitter {
        /// Position of the entry within the script.
        index: usize,
        /// Emitter name that failed to resolve.
        name: String,
    },
    /// A script entry names a fire that is not declared.
    #[error("script entry {index} references unknown fire {fire}")]
    UnknownFire {
        /// Position of the entry within the script.
        index: usize,
        /// Fire identifier that failed to resolve.
        fire: u32,
    },
    /// A script entry carries a key its action does not accept.
    #[error("script entry {index} has unexpected key `{field}`")]
    UnknownScriptField {
        /// Position of the entry within the script.
        index: usize,
        /// Rejected key.
        field: String,
    },
    /// A script entry starts before zero or ends before it starts.
    #[error("script entry {index} has an invalid time window [{at_secs}, {until_secs}]")]
    InvalidWindow {
        /// Position of the entry within the script.
        index: usize,
        /// Start of the window.
        at_secs: f64,
        /// End of the window.
        until_secs: f64,
    },
}

/// Complete description of a scripted drill.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct Scenario {
    #[serde(default = "default_frame_secs")]
    pub(crate) frame_secs: f64,
    #[serde(default = "default_max_duration_secs")]
    pub(crate) max_duration_secs: f64,
    #[serde(default = "default_exit_bonus_time_limit_secs")]
    pub(crate) exit_bonus_time_limit_secs: f64,
    #[serde(default = "default_points_per_fire")]
    pub(crate) points_per_fire: u32,
    #[serde(default = "default_despawn_delay_secs")]
    pub(crate) despawn_delay_secs: f64,
    #[serde(default)]
    pub(crate) emitters: Vec<EmitterSpec>,
    #[serde(default)]
    pub(crate) fires: Vec<FireSpec>,
    #[serde(default)]
    pub(crate) script: Vec<ScriptEntry>,
}

/// Spray emitter declared by a scenario.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct EmitterSpec {
    pub(crate) name: String,
    #[serde(default = "default_extinguish_rate")]
    pub(crate) extinguish_rate: f32,
    #[serde(default = "default_hit_cap_per_tick")]
    pub(crate) hit_cap_per_tick: u32,
    #[serde(default)]
    pub(crate) instant_extinguish: bool,
}

impl EmitterSpec {
    /// Detector configuration for this emitter.
    pub(crate) fn config(&self) -> Config {
        Config::new(self.extinguish_rate, self.hit_cap_per_tick)
            .with_instant_extinguish(self.instant_extinguish)
    }
}

/// Fire declared by a scenario.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct FireSpec {
    pub(crate) id: u32,
    #[serde(default)]
    pub(crate) name: Option<String>,
    #[serde(default = "default_initial_intensity")]
    pub(crate) initial_intensity: f32,
    #[serde(default = "default_extinguish_threshold")]
    pub(crate) extinguish_threshold: f32,
    #[serde(default = "default_suppression_multiplier")]
    pub(crate) suppression_multiplier: f32,
    #[serde(default)]
    pub(crate) delay_secs: f64,
    #[serde(default)]
    pub(crate) start_active: bool,
    #[serde(default = "default_expected")]
    pub(crate) expected: bool,
}

impl FireSpec {
    pub(crate) fn fire_id(&self) -> FireId {
        FireId::new(self.id)
    }

    pub(crate) fn profile(&self) -> FireProfile {
        FireProfile::new(self.initial_intensity, self.extinguish_threshold)
            .with_suppression_multiplier(self.suppression_multiplier)
    }

    /// Simulated time after which the fire ignites; `start_active` fires burn from the start.
    pub(crate) fn activation_delay(&self) -> Duration {
        if self.start_active {
            Duration::ZERO
        } else {
            secs(self.delay_secs)
        }
    }

    /// Name shown in reports, falling back to the identifier.
    pub(crate) fn label(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| format!("fire {}", self.id))
    }
}

/// Timed trainee action.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct ScriptEntry {
    pub(crate) at_secs: f64,
    #[serde(default)]
    pub(crate) until_secs: Option<f64>,
    #[serde(flatten)]
    pub(crate) action: ScriptAction,
}

impl ScriptEntry {
    pub(crate) fn starts_at(&self) -> Duration {
        secs(self.at_secs)
    }

    /// End of the window; entries without `until_secs` last a single instant.
    pub(crate) fn ends_at(&self) -> Duration {
        secs(self.until_secs.unwrap_or(self.at_secs))
    }

    /// Reports whether the entry repeats every frame of its window.
    pub(crate) fn is_continuous(&self) -> bool {
        matches!(self.action, ScriptAction::Spray { .. })
    }
}

/// Action performed by a script entry.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub(crate) enum ScriptAction {
    StartDischarge {
        emitter: String,
    },
    StopDischarge {
        emitter: String,
    },
    Spray {
        emitter: String,
        fire: u32,
        #[serde(default = "default_hits")]
        hits: u32,
    },
    Relight {
        fire: u32,
        #[serde(default = "default_initial_intensity")]
        intensity: f32,
    },
    OpenHelp,
    CloseHelp,
    Exit,
}

impl ScriptAction {
    fn emitter(&self) -> Option<&str> {
        match self {
            Self::StartDischarge { emitter }
            | Self::StopDischarge { emitter }
            | Self::Spray { emitter, .. } => Some(emitter),
            _ => None,
        }
    }

    fn fire(&self) -> Option<u32> {
        match self {
            Self::Spray { fire, .. } | Self::Relight { fire, .. } => Some(*fire),
            _ => None,
        }
    }

    /// Keys the action reads in addition to the shared entry keys.
    fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::StartDischarge { .. } | Self::StopDischarge { .. } => &["emitter"],
            Self::Spray { .. } => &["emitter", "fire", "hits"],
            Self::Relight { .. } => &["fire", "intensity"],
            Self::OpenHelp | Self::CloseHelp | Self::Exit => &[],
        }
    }
}

/// Keys every script entry may carry.
const SCRIPT_ENTRY_KEYS: [&str; 3] = ["at_secs", "until_secs", "action"];

impl Scenario {
    /// Reads, parses and validates the scenario stored at `path`.
    pub(crate) fn load(path: &Path) -> Result<Self, ScenarioError> {
        let contents = fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates a scenario from TOML text.
    pub(crate) fn from_toml_str(contents: &str) -> Result<Self, ScenarioError> {
        let scenario: Self = toml::from_str(contents)?;
        let raw: toml::Table = toml::from_str(contents)?;
        scenario.check_script_keys(&raw)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Rejects script keys that the flattened action silently ignores.
    fn check_script_keys(&self, raw: &toml::Table) -> Result<(), ScenarioError> {
        let Some(entries) = raw.get("script").and_then(toml::Value::as_array) else {
            return Ok(());
        };
        for (index, (entry, raw_entry)) in self.script.iter().zip(entries).enumerate() {
            let Some(keys) = raw_entry.as_table() else {
                continue;
            };
            let accepted = entry.action.fields();
            let unexpected = keys.keys().find(|key| {
                !SCRIPT_ENTRY_KEYS.contains(&key.as_str()) && !accepted.contains(&key.as_str())
            });
            if let Some(field) = unexpected {
                return Err(ScenarioError::UnknownScriptField {
                    index,
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    /// Checks cross references and time values.
    pub(crate) fn validate(&self) -> Result<(), ScenarioError> {
        if !(self.frame_secs > 0.0) || !self.frame_secs.is_finite() {
            return Err(ScenarioError::NonPositiveFrame(self.frame_secs));
        }
        check_duration("max_duration_secs", self.max_duration_secs)?;
        check_duration(
            "exit_bonus_time_limit_secs",
            self.exit_bonus_time_limit_secs,
        )?;
        check_duration("despawn_delay_secs", self.despawn_delay_secs)?;

        let mut emitters = BTreeSet::new();
        for emitter in &self.emitters {
            if !emitters.insert(emitter.name.as_str()) {
                return Err(ScenarioError::DuplicateEmitter(emitter.name.clone()));
            }
        }

        let mut fires = BTreeSet::new();
        for fire in &self.fires {
            if !fires.insert(fire.id) {
                return Err(ScenarioError::DuplicateFire(fire.id));
            }
            check_duration("delay_secs", fire.delay_secs)?;
        }

        for (index, entry) in self.script.iter().enumerate() {
            let until_secs = entry.until_secs.unwrap_or(entry.at_secs);
            let window_valid = entry.at_secs.is_finite()
                && until_secs.is_finite()
                && entry.at_secs >= 0.0
                && until_secs >= entry.at_secs;
            if !window_valid {
                return Err(ScenarioError::InvalidWindow {
                    index,
                    at_secs: entry.at_secs,
                    until_secs,
                });
            }
            if let Some(name) = entry.action.emitter() {
                if !emitters.contains(name) {
                    return Err(ScenarioError::UnknownEmitter {
                        index,
                        name: name.to_owned(),
                    });
                }
            }
            if let Some(fire) = entry.action.fire() {
                if !fires.contains(&fire) {
                    return Err(ScenarioError::UnknownFire { index, fire });
                }
            }
        }

        Ok(())
    }

    pub(crate) fn frame(&self) -> Duration {
        secs(self.frame_secs)
    }

    pub(crate) fn max_duration(&self) -> Duration {
        secs(self.max_duration_secs)
    }

    pub(crate) fn despawn_delay(&self) -> Duration {
        secs(self.despawn_delay_secs)
    }

    pub(crate) fn session_config(&self) -> SessionConfig {
        SessionConfig::new(secs(self.exit_bonus_time_limit_secs), self.points_per_fire)
    }
}

fn check_duration(field: &'static str, value: f64) -> Result<(), ScenarioError> {
    if value >= 0.0 && Duration::try_from_secs_f64(value).is_ok() {
        Ok(())
    } else {
        Err(ScenarioError::InvalidDuration { field, value })
    }
}

/// Converts validated seconds into a duration, saturating out-of-range values.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(if value > 0.0 {
        Duration::MAX
    } else {
        Duration::ZERO
    })
}

fn default_frame_secs() -> f64 {
    0.1
}

fn default_max_duration_secs() -> f64 {
    900.0
}

fn default_exit_bonus_time_limit_secs() -> f64 {
    600.0
}

fn default_points_per_fire() -> u32 {
    DEFAULT_POINTS_PER_FIRE
}

fn default_despawn_delay_secs() -> f64 {
    1.5
}

fn default_extinguish_rate() -> f32 {
    DEFAULT_EXTINGUISH_RATE
}

fn default_hit_cap_per_tick() -> u32 {
    DEFAULT_HIT_CAP_PER_TICK
}

fn default_initial_intensity() -> f32 {
    DEFAULT_INITIAL_INTENSITY
}

fn default_extinguish_threshold() -> f32 {
    DEFAULT_EXTINGUISH_THRESHOLD
}

fn default_suppression_multiplier() -> f32 {
    1.0
}

fn default_expected() -> bool {
    true
}

fn default_hits() -> u32 {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [[emitters]]
        name = "extinguisher"

        [[fires]]
        id = 1
        start_active = true

        [[script]]
        at_secs = 1.0
        action = "start_discharge"
        emitter = "extinguisher"

        [[script]]
        at_secs = 1.0
        until_secs = 4.5
        action = "spray"
        emitter = "extinguisher"
        fire = 1
        hits = 5

        [[script]]
        at_secs = 5
        action = "exit"
    "#;

    #[test]
    fn minimal_scenario_uses_defaults() {
        let scenario = Scenario::from_toml_str(MINIMAL).expect("scenario is valid");
        assert_eq!(scenario.frame(), Duration::from_millis(100));
        assert_eq!(scenario.max_duration(), Duration::from_secs(900));
        assert_eq!(scenario.despawn_delay(), Duration::from_millis(1500));
        assert_eq!(scenario.points_per_fire, 100);
        assert_eq!(
            scenario.session_config().exit_bonus_time_limit(),
            Duration::from_secs(600)
        );

        let emitter = &scenario.emitters[0];
        assert_eq!(emitter.config(), Config::default());

        let fire = &scenario.fires[0];
        assert_eq!(fire.profile(), FireProfile::default());
        assert_eq!(fire.activation_delay(), Duration::ZERO);
        assert!(fire.expected);
        assert_eq!(fire.label(), "fire 1");

        assert_eq!(scenario.script.len(), 3);
        assert_eq!(
            scenario.script[1].action,
            ScriptAction::Spray {
                emitter: "extinguisher".to_owned(),
                fire: 1,
                hits: 5
            }
        );
        assert!(scenario.script[1].is_continuous());
        assert_eq!(scenario.script[1].ends_at(), Duration::from_millis(4500));
        assert_eq!(scenario.script[2].action, ScriptAction::Exit);
        assert_eq!(scenario.script[2].starts_at(), Duration::from_secs(5));
        assert_eq!(scenario.script[2].ends_at(), Duration::from_secs(5));
    }

    #[test]
    fn delay_applies_unless_fire_starts_active() {
        let scenario = Scenario::from_toml_str(
            r#"
            [[fires]]
            id = 1
            delay_secs = 12.5

            [[fires]]
            id = 2
            delay_secs = 12.5
            start_active = true
            "#,
        )
        .expect("scenario is valid");
        assert_eq!(
            scenario.fires[0].activation_delay(),
            Duration::from_millis(12_500)
        );
        assert_eq!(scenario.fires[1].activation_delay(), Duration::ZERO);
    }

    #[test]
    fn duplicate_fire_ids_are_rejected() {
        let error = Scenario::from_toml_str(
            r#"
            [[fires]]
            id = 3
            [[fires]]
            id = 3
            "#,
        )
        .expect_err("duplicate ids");
        assert!(matches!(error, ScenarioError::DuplicateFire(3)));
    }

    #[test]
    fn script_references_must_resolve() {
        let error = Scenario::from_toml_str(
            r#"
            [[fires]]
            id = 1

            [[script]]
            at_secs = 0.0
            action = "start_discharge"
            emitter = "hose"
            "#,
        )
        .expect_err("unknown emitter");
        assert!(matches!(
            error,
            ScenarioError::UnknownEmitter { index: 0, ref name } if name == "hose"
        ));

        let error = Scenario::from_toml_str(
            r#"
            [[fires]]
            id = 1

            [[script]]
            at_secs = 0.0
            action = "relight"
            fire = 2
            "#,
        )
        .expect_err("unknown fire");
        assert!(matches!(
            error,
            ScenarioError::UnknownFire { index: 0, fire: 2 }
        ));
    }

    #[test]
    fn inverted_windows_and_bad_frames_are_rejected() {
        let error = Scenario::from_toml_str(
            r#"
            [[script]]
            at_secs = 3.0
            until_secs = 2.0
            action = "open_help"
            "#,
        )
        .expect_err("inverted window");
        assert!(matches!(error, ScenarioError::InvalidWindow { index: 0, .. }));

        let error = Scenario::from_toml_str("frame_secs = 0.0").expect_err("zero frame");
        assert!(matches!(error, ScenarioError::NonPositiveFrame(_)));

        let error =
            Scenario::from_toml_str("despawn_delay_secs = -1.0").expect_err("negative delay");
        assert!(matches!(
            error,
            ScenarioError::InvalidDuration {
                field: "despawn_delay_secs",
                ..
            }
        ));
    }

    #[test]
    fn durations_beyond_the_representable_range_are_rejected() {
        let error = Scenario::from_toml_str(
            r#"
            max_duration_secs = 1e30

            [[fires]]
            id = 1
            start_active = true
            "#,
        )
        .expect_err("unrepresentable limit");
        assert!(matches!(
            error,
            ScenarioError::InvalidDuration {
                field: "max_duration_secs",
                ..
            }
        ));

        let error = Scenario::from_toml_str(
            r#"
            [[fires]]
            id = 1
            delay_secs = inf
            "#,
        )
        .expect_err("infinite delay");
        assert!(matches!(
            error,
            ScenarioError::InvalidDuration {
                field: "delay_secs",
                ..
            }
        ));
    }

    #[test]
    fn misspelled_script_keys_are_rejected() {
        let error = Scenario::from_toml_str(
            r#"
            [[emitters]]
            name = "extinguisher"

            [[fires]]
            id = 1

            [[script]]
            at_secs = 1.0
            untill_secs = 4.0
            action = "spray"
            emitter = "extinguisher"
            fire = 1
            "#,
        )
        .expect_err("typo in window end");
        assert!(matches!(
            error,
            ScenarioError::UnknownScriptField { index: 0, ref field } if field == "untill_secs"
        ));
    }

    #[test]
    fn keys_of_other_actions_are_rejected() {
        let error = Scenario::from_toml_str(
            r#"
            [[fires]]
            id = 1

            [[script]]
            at_secs = 0.0
            action = "exit"

            [[script]]
            at_secs = 1.0
            action = "relight"
            fire = 1
            hits = 3
            "#,
        )
        .expect_err("hits belongs to spray");
        assert!(matches!(
            error,
            ScenarioError::UnknownScriptField { index: 1, ref field } if field == "hits"
        ));
    }

    #[test]
    fn unknown_actions_fail_to_parse() {
        let error = Scenario::from_toml_str(
            r#"
            [[script]]
            at_secs = 1.0
            action = "teleport"
            "#,
        )
        .expect_err("unknown action");
        assert!(matches!(error, ScenarioError::Parse(_)));
    }

    #[test]
    fn missing_file_reports_its_path() {
        let path = Path::new("/definitely/not/here.toml");
        let error = Scenario::load(path).expect_err("missing file");
        assert!(error.to_string().contains("/definitely/not/here.toml"));
    }
}
