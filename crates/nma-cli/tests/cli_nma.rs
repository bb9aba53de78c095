use std::path::PathBuf;
use std::process::{Command, Output};
use std::time::{SystemTime, UNIX_EPOCH};

fn bin_path() -> PathBuf {
    PathBuf::from(env!("CARGO_BIN_EXE_nma"))
}

fn tmp_path(filename: &str) -> PathBuf {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let mut p = std::env::temp_dir();
    p.push(format!("nma_cli_{}_{}_{}", std::process::id(), nanos, filename));
    p
}

fn run(args: &[&str]) -> Output {
    Command::new(bin_path())
        .args(args)
        .output()
        .unwrap_or_else(|e| panic!("failed to run {:?} {:?}: {}", bin_path(), args, e))
}

fn write_config(filename: &str, contents: &str) -> PathBuf {
    let path = tmp_path(filename);
    std::fs::write(&path, contents).unwrap();
    path
}

const SMOKING_YAML: &str = r#"
measure: odds_ratio
reference: C
arms:
  - { study: 1, treatment: A, positive: 9, total: 140 }
  - { study: 1, treatment: C, positive: 23, total: 140 }
  - { study: 2, treatment: B, positive: 10, total: 138 }
  - { study: 2, treatment: C, positive: 11, total: 78 }
  - { study: 2, treatment: D, positive: 12, total: 85 }
"#;

#[test]
fn run_reports_full_network() {
    let cfg = write_config("smoking.yaml", SMOKING_YAML);
    let out = run(&["run", "-c", cfg.to_string_lossy().as_ref()]);
    assert!(out.status.success(), "run failed, stderr={}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value =
        serde_json::from_slice(&out.stdout).expect("stdout should be valid JSON");
    assert_eq!(v.get("measure").and_then(|x| x.as_str()), Some("odds_ratio"));
    assert_eq!(v.get("null_value").and_then(|x| x.as_f64()), Some(1.0));
    assert_eq!(v.get("random_effects").and_then(|x| x.as_bool()), Some(false));
    assert_eq!(v.get("treatments").and_then(|x| x.as_array()).map(|a| a.len()), Some(4));
    assert_eq!(v.get("df").and_then(|x| x.as_f64()), Some(0.0));

    let league = v.get("league_table").and_then(|x| x.as_array()).expect("league_table array");
    assert_eq!(league.len(), 12);
    for e in league {
        let effect = e.get("effect").and_then(|x| x.as_f64()).expect("numeric effect");
        let lower = e.get("lower").and_then(|x| x.as_f64()).expect("numeric lower");
        let upper = e.get("upper").and_then(|x| x.as_f64()).expect("numeric upper");
        assert!(lower < effect && effect < upper);
    }

    let scores = v.get("p_scores").and_then(|x| x.as_array()).expect("p_scores array");
    assert_eq!(scores.len(), 4);

    // df = 0: no I² at all.
    let i2 = v.get("i_squared").expect("i_squared");
    assert!(i2.get("i2").map(|x| x.is_null()).unwrap_or(false));

    let reference = v.get("reference").expect("reference section");
    assert_eq!(reference.get("treatment").and_then(|x| x.as_str()), Some("C"));
    let study_level =
        reference.get("study_level_effects").and_then(|x| x.as_array()).expect("study effects");
    assert_eq!(study_level.len(), 3);
    let funnel = reference.get("funnel").expect("funnel");
    assert_eq!(funnel.get("upper").and_then(|x| x.as_array()).map(|a| a.len()), Some(500));
    assert!(funnel.get("egger").map(|x| x.is_null()).unwrap_or(false));
}

#[test]
fn run_flags_override_config_and_write_file() {
    let json = r#"{
        "measure": "mean_difference",
        "width": 0.9,
        "arms": [
            {"study": "s1", "treatment": "A", "mean": -1.0, "sd": 0.5, "n": 50},
            {"study": "s1", "treatment": "B", "mean": 0.0, "sd": 0.5, "n": 50},
            {"study": "s2", "treatment": "A", "mean": 0.0, "sd": 0.5, "n": 50},
            {"study": "s2", "treatment": "B", "mean": 0.0, "sd": 0.5, "n": 50},
            {"study": "s3", "treatment": "A", "mean": 1.0, "sd": 0.5, "n": 50},
            {"study": "s3", "treatment": "B", "mean": 0.0, "sd": 0.5, "n": 50},
            {"study": "s4", "treatment": "A", "mean": 2.0, "sd": 0.5, "n": 50},
            {"study": "s4", "treatment": "B", "mean": 0.0, "sd": 0.5, "n": 50}
        ]
    }"#;
    let cfg = write_config("md.json", json);
    let out_path = tmp_path("report.json");
    let out = run(&[
        "run",
        "--config",
        cfg.to_string_lossy().as_ref(),
        "--random-effects",
        "--width",
        "0.99",
        "-o",
        out_path.to_string_lossy().as_ref(),
    ]);
    assert!(out.status.success(), "run failed, stderr={}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value =
        serde_json::from_slice(&std::fs::read(&out_path).unwrap()).expect("valid JSON report");
    assert_eq!(v.get("random_effects").and_then(|x| x.as_bool()), Some(true));
    assert_eq!(v.get("width").and_then(|x| x.as_f64()), Some(0.99));
    let tau = v.get("tau").and_then(|x| x.as_array()).expect("tau array");
    assert_eq!(tau.len(), 1);
    assert!(tau[0].as_f64().unwrap() > 1.0);
    assert!(v.get("reference").map(|x| x.is_null()).unwrap_or(false));
}

#[test]
fn components_splits_disconnected_network() {
    let yaml = r#"
measure: mean_difference
arms:
  - { study: 1, treatment: A, mean: 1.0, sd: 1.0, n: 20 }
  - { study: 1, treatment: B, mean: 0.0, sd: 1.0, n: 20 }
  - { study: 2, treatment: C, mean: 1.0, sd: 1.0, n: 20 }
  - { study: 2, treatment: D, mean: 0.0, sd: 1.0, n: 20 }
"#;
    let cfg = write_config("split.yaml", yaml);
    let out = run(&["components", "-c", cfg.to_string_lossy().as_ref()]);
    assert!(out.status.success(), "components failed, stderr={}", String::from_utf8_lossy(&out.stderr));

    let v: serde_json::Value = serde_json::from_slice(&out.stdout).unwrap();
    assert_eq!(v.get("n_components").and_then(|x| x.as_u64()), Some(2));
    assert_eq!(v["components"][0], serde_json::json!(["A", "B"]));
    assert_eq!(v["components"][1], serde_json::json!(["C", "D"]));
}

#[test]
fn run_rejects_bad_inputs() {
    let missing = write_config(
        "missing.yaml",
        "measure: odds_ratio\narms:\n  - { study: 1, treatment: A, mean: 1.0, sd: 1.0, n: 5 }\n",
    );
    let out = run(&["run", "-c", missing.to_string_lossy().as_ref()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("positive"));

    let cfg = write_config("smoking_width.yaml", SMOKING_YAML);
    let out = run(&["run", "-c", cfg.to_string_lossy().as_ref(), "--width", "1.5"]);
    assert!(!out.status.success());

    let dup = write_config(
        "dup.yaml",
        "measure: odds_ratio\narms:\n  - { study: 1, treatment: A, positive: 1, total: 5 }\n  - { study: 1, treatment: A, positive: 2, total: 5 }\n",
    );
    let out = run(&["run", "-c", dup.to_string_lossy().as_ref()]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("twice"));
}

#[test]
fn version_prints_crate_version() {
    let out = run(&["version"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    assert!(text.starts_with("nma "), "{text}");
}
