use std::fs;
use std::path::Path;
use std::process::Command;

use tempfile::tempdir;

const CONFIG: &str = r#"
[columns]
study_id = "StudyID"
sex = "sex"
hospital = "hospital"
age = "age"
features = ["bmi", "smoker"]

[columns.predictions]
classification_prediction = "predicted"

[columns.labels]
classification_label = "actual"

[model_config.model_type]
binary_classification = true

[tests]
data_quality_tests = [{ name = "number_of_rows", params = { gte = 1 } }]
classification_tests = [{ name = "accuracy_score" }]
"#;

const CURRENT: &str = "StudyID,sex,hospital,age,bmi,smoker,predicted,actual
001,M,hospital1,9,20.5,no,1,1
002,F,hospital2,11,21.0,no,0,0
003,M,hospital1,34,25.2,yes,1,0
004,F,hospital2,65,27.9,no,0,0
005,M,hospital1,78,23.3,yes,1,1
006,F,hospital2,50,30.0,no,1,1
";

fn write_inputs(dir: &Path) {
    fs::write(dir.join("config.toml"), CONFIG).expect("write config");
    fs::write(dir.join("current.csv"), CURRENT).expect("write current data");
}

fn stratawatch() -> Command {
    Command::new(env!("CARGO_BIN_EXE_stratawatch"))
}

#[test]
fn run_writes_snapshots_reference_and_profile() {
    let tmp = tempdir().expect("temporary directory");
    write_inputs(tmp.path());

    let output = stratawatch()
        .current_dir(tmp.path())
        .args([
            "run",
            "--config",
            "config.toml",
            "--current",
            "current.csv",
            "--reference",
            "data/reference.csv",
            "--profile",
            "profile/details.toml",
            "--workspace",
            "ws",
            "--timestamp",
            "run1",
        ])
        .output()
        .expect("run stratawatch cli");
    assert!(
        output.status.success(),
        "CLI exited with status {:?}: {}",
        output.status,
        String::from_utf8_lossy(&output.stderr)
    );

    let root = tmp.path();
    assert!(root.join("data/reference.csv").exists(), "reference not seeded");
    let profile = fs::read_to_string(root.join("profile/details.toml")).expect("profile written");
    assert!(profile.contains("hospital1"));

    let run = root.join("ws/snapshots/run1");
    assert!(run.join("reports/main_report/data_report.toml").exists());
    assert!(run.join("reports/main_report/classification_report.toml").exists());
    assert!(run.join("reports/[18-65]_female_report/current.csv").exists());
    assert!(run.join("tests/main_test/data_test_suite.toml").exists());
    assert!(run.join("tests/male_test/classification_test_suite.toml").exists());
    assert!(!run.join("tests/female_male_test").exists());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("report:"), "summary missing: {stdout}");
    assert!(stdout.contains("0 failures"), "unexpected failures: {stdout}");
}

#[test]
fn split_lists_keys_in_natural_order() {
    let tmp = tempdir().expect("temporary directory");
    write_inputs(tmp.path());

    let output = stratawatch()
        .current_dir(tmp.path())
        .args([
            "split",
            "--config",
            "config.toml",
            "--data",
            "current.csv",
            "--profile",
            "details.toml",
            "--operation",
            "test",
        ])
        .output()
        .expect("run stratawatch cli");
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let lines: Vec<&str> = stdout.lines().collect();
    assert!(lines.contains(&"main_test\t6"));
    assert!(lines.iter().all(|line| line.contains("_test\t")));
}

#[test]
fn profile_then_split_uses_known_values() {
    let tmp = tempdir().expect("temporary directory");
    write_inputs(tmp.path());

    let status = stratawatch()
        .current_dir(tmp.path())
        .args([
            "profile",
            "--config",
            "config.toml",
            "--data",
            "current.csv",
            "--profile",
            "details.toml",
        ])
        .status()
        .expect("run stratawatch cli");
    assert!(status.success());

    let output = stratawatch()
        .current_dir(tmp.path())
        .args([
            "split",
            "--config",
            "config.toml",
            "--data",
            "current.csv",
            "--profile",
            "details.toml",
        ])
        .output()
        .expect("run stratawatch cli");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|line| line == "male_report\t3"));
    assert!(stdout.lines().any(|line| line == "[18-65]_female_report\t2"));
}

#[test]
fn missing_config_fails() {
    let tmp = tempdir().expect("temporary directory");
    let status = stratawatch()
        .current_dir(tmp.path())
        .args(["split", "--data", "absent.csv", "--profile", "details.toml"])
        .status()
        .expect("run stratawatch cli");
    assert!(!status.success());
}

#[test]
fn invalid_reference_leaves_profile_untouched() {
    let tmp = tempdir().expect("temporary directory");
    write_inputs(tmp.path());
    fs::write(
        tmp.path().join("reference.csv"),
        "StudyID,sex,age,bmi,smoker,predicted,actual\n001,M,9,20.5,no,1,1\n",
    )
    .expect("write reference data");

    let status = stratawatch()
        .current_dir(tmp.path())
        .args([
            "run",
            "--config",
            "config.toml",
            "--current",
            "current.csv",
            "--reference",
            "reference.csv",
            "--profile",
            "details.toml",
            "--workspace",
            "ws",
        ])
        .status()
        .expect("run stratawatch cli");
    assert!(!status.success());
    assert!(!tmp.path().join("details.toml").exists());
}

#[test]
fn split_without_profile_writes_nothing() {
    let tmp = tempdir().expect("temporary directory");
    write_inputs(tmp.path());

    let output = stratawatch()
        .current_dir(tmp.path())
        .env("RUST_LOG", "warn")
        .args([
            "split",
            "--config",
            "config.toml",
            "--data",
            "current.csv",
            "--profile",
            "details.toml",
        ])
        .output()
        .expect("run stratawatch cli");
    assert!(output.status.success());
    assert!(!tmp.path().join("details.toml").exists());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no known hospital values"), "missing warning: {stderr}");
    assert!(stderr.contains("no known sex values"), "missing warning: {stderr}");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(!stdout.contains("male_report"));
}
