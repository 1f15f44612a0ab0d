use std::{path::PathBuf, process::Command};

use serde_json::Value;

fn scenario(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../scenarios")
        .join(name)
}

fn run_json(name: &str) -> Value {
    let output = Command::new(env!("CARGO_BIN_EXE_fire-drill"))
        .args(["--log-level", "error", "run", "--json"])
        .arg(scenario(name))
        .output()
        .expect("failed to invoke the fire-drill binary");
    assert!(
        output.status.success(),
        "fire-drill run failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).expect("run --json prints a JSON outcome")
}

#[test]
fn two_fire_scenario_earns_full_marks() {
    let outcome = run_json("two_fires.toml");
    let report = &outcome["report"];

    assert_eq!(report["fires_activated"], 2);
    assert_eq!(report["fires_extinguished"], 2);
    assert_eq!(report["total_percent"].as_f64(), Some(100.0));
    assert_eq!(report["time_taken"].as_f64(), Some(15.0), "help time is excluded");
    assert_eq!(report["score"], 200);
    assert_eq!(outcome["fires"].as_array().map(Vec::len), Some(2));
}

#[test]
fn late_exit_scenario_scores_nothing() {
    let outcome = run_json("late_exit.toml");
    let report = &outcome["report"];

    assert_eq!(report["fires_activated"], 1);
    assert_eq!(report["fires_extinguished"], 0);
    assert_eq!(report["exit_bonus_percent"].as_f64(), Some(0.0));
    assert_eq!(report["total_percent"].as_f64(), Some(0.0));
    assert_eq!(outcome["fires"][0]["state"], "Burning");
}

#[test]
fn check_rejects_a_missing_scenario() {
    let output = Command::new(env!("CARGO_BIN_EXE_fire-drill"))
        .args(["check"])
        .arg(scenario("does_not_exist.toml"))
        .output()
        .expect("failed to invoke the fire-drill binary");
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("invalid scenario"), "unexpected stderr: {stderr}");
}

#[test]
fn check_accepts_the_bundled_scenarios() {
    for name in ["two_fires.toml", "late_exit.toml"] {
        let status = Command::new(env!("CARGO_BIN_EXE_fire-drill"))
            .arg("check")
            .arg(scenario(name))
            .status()
            .expect("failed to invoke the fire-drill binary");
        assert!(status.success(), "{name} should validate");
    }
}
