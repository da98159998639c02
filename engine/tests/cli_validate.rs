//! CLI tests for `engine validate` and `engine deliberate`.
//!
//! Spawns the engine binary and verifies exit codes for valid, invalid and
//! idle scenarios.

use std::fs;
use std::process::Command;

use engine::exit_codes;
use engine::test_support::{ScenarioFile, action, decl, goal, plan, scenario, two_action_scenario};

#[test]
fn validate_accepts_well_formed_scenario() {
    let file = ScenarioFile::new(&two_action_scenario()).expect("scenario file");
    let output = Command::new(env!("CARGO_BIN_EXE_engine"))
        .arg("validate")
        .arg("--scenario")
        .arg(&file.path)
        .output()
        .expect("engine validate");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    assert!(String::from_utf8_lossy(&output.stdout).contains("1 goals"));
}

/// Duplicate node names pass the schema but fail the invariants.
#[test]
fn validate_rejects_duplicate_names() {
    let dup = scenario(
        vec![decl("p", false)],
        vec![
            goal("g", vec![plan("p0", &[], vec![action("a", &[], &["p+"])])]),
            goal("h", vec![plan("p1", &[], vec![action("a", &[], &[])])]),
        ],
    );
    let file = ScenarioFile::new(&dup).expect("scenario file");
    let output = Command::new(env!("CARGO_BIN_EXE_engine"))
        .args(["validate", "--scenario"])
        .arg(&file.path)
        .output()
        .expect("engine validate");
    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("duplicate node name 'a'"));
}

#[test]
fn validate_rejects_malformed_json() {
    let temp = tempfile::tempdir().expect("tempdir");
    let path = temp.path().join("broken.json");
    fs::write(&path, "{\"literals\": [").expect("write");
    let status = Command::new(env!("CARGO_BIN_EXE_engine"))
        .args(["validate", "--scenario"])
        .arg(&path)
        .status()
        .expect("engine validate");
    assert_eq!(status.code(), Some(exit_codes::INVALID));
}

#[test]
fn deliberate_prints_first_choices() {
    let file = ScenarioFile::new(&two_action_scenario()).expect("scenario file");
    let output = Command::new(env!("CARGO_BIN_EXE_engine"))
        .current_dir(file.dir())
        .args(["deliberate", "--seed", "1", "--scenario"])
        .arg(&file.path)
        .output()
        .expect("engine deliberate");
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("plan(0:0) act(0)"), "{stdout}");
    assert!(stdout.contains("next action: a1"), "{stdout}");
}

/// A plan whose context never holds leaves nothing to execute.
#[test]
fn deliberate_reports_idle() {
    let blocked = scenario(
        vec![decl("door", false)],
        vec![goal("g", vec![plan("p", &["door+"], vec![action("walk", &[], &[])])])],
    );
    let file = ScenarioFile::new(&blocked).expect("scenario file");
    let status = Command::new(env!("CARGO_BIN_EXE_engine"))
        .current_dir(file.dir())
        .args(["deliberate", "--seed", "1", "--scenario"])
        .arg(&file.path)
        .status()
        .expect("engine deliberate");
    assert_eq!(status.code(), Some(exit_codes::IDLE));
}

#[test]
fn invalid_config_fails() {
    let file = ScenarioFile::new(&two_action_scenario()).expect("scenario file");
    let config = file.dir().join("engine.toml");
    fs::write(&config, "[search]\niterations = 0\n").expect("write config");
    let output = Command::new(env!("CARGO_BIN_EXE_engine"))
        .args(["run", "--scenario"])
        .arg(&file.path)
        .arg("--config")
        .arg(&config)
        .output()
        .expect("engine run");
    assert_eq!(output.status.code(), Some(exit_codes::FAILURE));
    assert!(String::from_utf8_lossy(&output.stderr).contains("iterations"));
}
