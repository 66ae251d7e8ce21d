use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde_json::Value;

fn ac_bin() -> String {
    env!("CARGO_BIN_EXE_ac").to_string()
}

fn run(args: &[&str]) -> Output {
    Command::new(ac_bin()).args(args).output().unwrap()
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).to_string()
}

fn write_stats(dir: &Path) -> PathBuf {
    let path = dir.join("norm_stats.json");
    let json = r#"{
  "norm_stats": {
    "actions": {
      "mean": [0.027, 0.089, -0.100, 0.006, 0.004, -0.005, -0.083],
      "std":  [0.331, 0.372, 0.452, 0.039, 0.063, 0.077, 0.996],
      "q01":  [-0.747, -0.796, -0.938, -0.112, -0.160, -0.209, -1.0],
      "q99":  [0.937, 0.859, 0.937, 0.138, 0.177, 0.196, 1.0]
    },
    "state": {
      "mean": [0.0, 0.0],
      "std":  [1.0, 1.0],
      "q01":  [-2.0, -2.0],
      "q99":  [2.0, 2.0]
    }
  }
}"#;
    fs::write(&path, json).unwrap();
    path
}

fn write_fixture(dir: &Path, name: &str, action: [f64; 7], pre: [f64; 3], post: [f64; 3]) -> PathBuf {
    let path = dir.join(name);
    let v = serde_json::json!({
        "action": action,
        "pre": { "eef_pos": pre },
        "post": { "eef_pos": post },
    });
    fs::write(&path, serde_json::to_vec_pretty(&v).unwrap()).unwrap();
    path
}

fn absolute_fixture(dir: &Path) -> PathBuf {
    write_fixture(
        dir,
        "absolute.json",
        [0.151, 0.409, -0.503, 0.1, 0.2, 0.3, -1.0],
        [0.40, 0.00, 0.95],
        [0.405, 0.003, 0.949],
    )
}

#[test]
fn version_and_help() {
    let out = run(&["--version"]);
    assert!(out.status.success());
    assert_eq!(stdout(&out).trim(), format!("ac {}", env!("CARGO_PKG_VERSION")));

    let out = run(&["--help"]);
    assert!(out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("classify"));
}

#[test]
fn no_command_and_unknown_command_fail() {
    assert_eq!(run(&[]).status.code(), Some(1));
    assert_eq!(run(&["frobnicate"]).status.code(), Some(1));
}

#[test]
fn controllers_lists_every_preset() {
    let out = run(&["controllers"]);
    assert!(out.status.success());
    let s = stdout(&out);
    for name in ["OSC_POSE", "OSC_POSITION", "JOINT_POSITION"] {
        assert!(s.contains(name), "{s}");
    }
    assert!(s.contains("d=8"));
}

#[test]
fn denorm_matches_the_reference_values() {
    let dir = tempfile::tempdir().unwrap();
    let stats = write_stats(dir.path());
    let out = run(&[
        "denorm",
        "--stats",
        stats.to_str().unwrap(),
        "--action",
        "0.5,1.0,-1.5,0.1,0.2,-0.3,0.8",
        "--json",
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let raw: Vec<f64> = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(raw.len(), 7);
    assert!((raw[0] - 0.1925005).abs() < 1e-6);
    assert!((raw[2] - (-0.7780015)).abs() < 1e-6);
}

#[test]
fn denorm_report_splits_the_action() {
    let dir = tempfile::tempdir().unwrap();
    let stats = write_stats(dir.path());
    let out = run(&[
        "denorm",
        "--stats",
        stats.to_str().unwrap(),
        "--action",
        "0,0,0,0,0,0,0",
    ]);
    assert!(out.status.success());
    let s = stdout(&out);
    assert!(s.contains("position: [0.027000, 0.089000, -0.100000]"), "{s}");
    assert!(s.contains("gripper:  -0.083000"), "{s}");
    assert!(s.contains("Range hint: controller_input"), "{s}");
}

#[test]
fn norm_inverts_denorm() {
    let dir = tempfile::tempdir().unwrap();
    let stats = write_stats(dir.path());
    let out = run(&[
        "norm",
        "--stats",
        stats.to_str().unwrap(),
        "--action",
        "0.027,0.089,-0.100,0.006,0.004,-0.005,-0.083",
        "--json",
    ]);
    assert!(out.status.success());
    let y: Vec<f64> = serde_json::from_slice(&out.stdout).unwrap();
    assert!(y.iter().all(|v| v.abs() < 1e-9), "{y:?}");
}

#[test]
fn wrong_action_length_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let stats = write_stats(dir.path());
    let out = run(&[
        "denorm",
        "--stats",
        stats.to_str().unwrap(),
        "--action",
        "0.1,0.2",
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("got 2, expected 7"));
}

#[test]
fn stats_prints_signal_and_range_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let stats = write_stats(dir.path());
    let out = run(&["stats", "--stats", stats.to_str().unwrap()]);
    assert!(out.status.success());
    let s = stdout(&out);
    assert!(s.contains("Signal: actions (7 dims)"), "{s}");
    assert!(s.contains("position hint: controller_input"), "{s}");

    // A signal that does not fit the controller still prints, without the analysis.
    let out = run(&["stats", "--stats", stats.to_str().unwrap(), "--key", "state"]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("Range analysis skipped"));
}

#[test]
fn stats_requires_a_known_signal() {
    let dir = tempfile::tempdir().unwrap();
    let stats = write_stats(dir.path());
    let out = run(&["stats", "--stats", stats.to_str().unwrap(), "--key", "missing"]);
    assert_eq!(out.status.code(), Some(1));
    let err = String::from_utf8_lossy(&out.stderr);
    assert!(err.contains("missing"));
    assert!(err.contains("actions, state"), "{err}");
}

#[test]
fn malformed_stats_are_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.json");
    fs::write(
        &path,
        r#"{"actions": {"mean": [0.0, 0.0], "std": [1.0, -0.5], "q01": [-1.0, -1.0], "q99": [1.0, 1.0]}}"#,
    )
    .unwrap();
    let out = run(&["stats", "--stats", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("actions"));
}

#[test]
fn classify_reports_delta_pose() {
    let dir = tempfile::tempdir().unwrap();
    let fx = write_fixture(
        dir.path(),
        "delta.json",
        [0.01, 0.02, 0.03, 0.1, 0.2, 0.3, -1.0],
        [0.40, 0.00, 0.95],
        [0.409, 0.022, 0.978],
    );
    let out = run(&["classify", "--fixture", fx.to_str().unwrap()]);
    assert!(out.status.success());
    assert!(stdout(&out).contains("DELTA_POSE"));
}

#[test]
fn classify_flags_absolute_targets_on_a_delta_controller() {
    let dir = tempfile::tempdir().unwrap();
    let fx = absolute_fixture(dir.path());
    let out = run(&["classify", "--fixture", fx.to_str().unwrap(), "--json"]);
    assert!(out.status.success());
    let v: Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v["verdict"], "INCONSISTENT");
    assert_eq!(v["detected"], "ABSOLUTE_POSE");
}

#[test]
fn classify_respects_an_absolute_controller_config() {
    let dir = tempfile::tempdir().unwrap();
    let fx = absolute_fixture(dir.path());
    let cfg = dir.path().join("absolute.yaml");
    fs::write(&cfg, "controller:\n  mode: OSC_POSE\n  control_delta: false\n").unwrap();
    let out = run(&[
        "classify",
        "--fixture",
        fx.to_str().unwrap(),
        "--config",
        cfg.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    let s = stdout(&out);
    assert!(s.contains("OSC_POSE, absolute, d=7"), "{s}");
    assert!(s.contains("Verdict:    ABSOLUTE_POSE"), "{s}");
}

#[test]
fn classify_writes_events_and_manifest() {
    let dir = tempfile::tempdir().unwrap();
    let fx = absolute_fixture(dir.path());
    let log = dir.path().join("events.ndjson");
    let manifest = dir.path().join("run.json");

    for _ in 0..2 {
        let out = run(&[
            "classify",
            "--fixture",
            fx.to_str().unwrap(),
            "--log",
            log.to_str().unwrap(),
            "--manifest",
            manifest.to_str().unwrap(),
        ]);
        assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    }

    let lines: Vec<Value> = fs::read_to_string(&log)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0]["event"], "probe");
    assert_eq!(lines[0]["run_id"], "absolute");
    assert_eq!(lines[1]["event"], "verdict");
    assert_eq!(lines[1]["verdict"], "INCONSISTENT");
    assert_eq!(lines[1]["controller_mode"], "OSC_POSE");

    let m: Value = serde_json::from_slice(&fs::read(&manifest).unwrap()).unwrap();
    assert_eq!(m["checks_completed"], 2);
    assert_eq!(m["inconsistent"], 2);
    assert_eq!(m["last_verdict"], "INCONSISTENT");
    assert!(!manifest.with_extension("json.tmp").exists());
}

#[test]
fn classify_with_stats_records_the_signal() {
    let dir = tempfile::tempdir().unwrap();
    let stats = write_stats(dir.path());
    let fx = write_fixture(
        dir.path(),
        "with_stats.json",
        [0.027, 0.089, -0.100, 0.006, 0.004, -0.005, -0.083],
        [0.40, 0.00, 0.95],
        [0.427, 0.089, 0.85],
    );
    let log = dir.path().join("events.ndjson");
    let manifest = dir.path().join("run.json");
    let out = run(&[
        "classify",
        "--fixture",
        fx.to_str().unwrap(),
        "--stats",
        stats.to_str().unwrap(),
        "--log",
        log.to_str().unwrap(),
        "--manifest",
        manifest.to_str().unwrap(),
    ]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let first = fs::read_to_string(&log).unwrap();
    let ev: Value = serde_json::from_str(first.lines().next().unwrap()).unwrap();
    let normalized = ev["normalized_action"].as_array().unwrap();
    assert_eq!(normalized.len(), 7);
    // The fixture action is the statistics mean.
    assert!(normalized.iter().all(|v| v.as_f64().unwrap().abs() < 1e-9), "{ev}");

    let m: Value = serde_json::from_slice(&fs::read(&manifest).unwrap()).unwrap();
    assert_eq!(m["signal"], "actions");
    assert_eq!(m["stats_path"], stats.to_str().unwrap());
    assert_eq!(m["stats_hash"].as_str().map(|h| h.len()), Some(64));

    // Without --stats the fields stay empty.
    let plain = dir.path().join("plain.json");
    let out = run(&[
        "classify",
        "--fixture",
        fx.to_str().unwrap(),
        "--manifest",
        plain.to_str().unwrap(),
    ]);
    assert!(out.status.success());
    let m: Value = serde_json::from_slice(&fs::read(&plain).unwrap()).unwrap();
    assert!(m["signal"].is_null());
    assert!(m["stats_hash"].is_null());
}

#[test]
fn classify_rejects_stats_of_the_wrong_dimension() {
    let dir = tempfile::tempdir().unwrap();
    let stats = write_stats(dir.path());
    let fx = absolute_fixture(dir.path());
    let out = run(&[
        "classify",
        "--fixture",
        fx.to_str().unwrap(),
        "--stats",
        stats.to_str().unwrap(),
        "--key",
        "state",
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("got 7, expected 2"));
}

#[test]
fn classify_rejects_bad_fixtures() {
    let dir = tempfile::tempdir().unwrap();
    let fx = write_fixture(
        dir.path(),
        "short.json",
        [0.0; 7],
        [0.40, 0.00, 0.95],
        [0.40, 0.00, 0.95],
    );
    let cfg = dir.path().join("position.yaml");
    fs::write(&cfg, "controller:\n  mode: OSC_POSITION\n").unwrap();
    let out = run(&[
        "classify",
        "--fixture",
        fx.to_str().unwrap(),
        "--config",
        cfg.to_str().unwrap(),
    ]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("got 7, expected 4"));

    let missing = run(&["classify"]);
    assert_eq!(missing.status.code(), Some(1));
}
