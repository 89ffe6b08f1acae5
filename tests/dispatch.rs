use polars::prelude::*;
use std::path::PathBuf;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use stratawatch::dispatch::{
    DispatchObserver, EngineError, EngineJob, JobContent, NoopDispatchProgress, SnapshotManifest,
    SuiteKind,
};
use stratawatch::{
    DataProfile, DataSplitter, Dispatcher, MonitorConfig, Operation, ReportEngine, SnapshotEngine,
    SnapshotWorkspace,
};

const CONFIG: &str = r#"
[columns]
study_id = "StudyID"
sex = "sex"
hospital = "hospital"
age = "age"
features = ["bmi"]

[columns.predictions]
regression_prediction = "prediction"

[columns.labels]
regression_label = "label"

[model_config.model_type]
regression = true

[tests]
data_quality_tests = [{ name = "number_of_rows" }, { name = "not_a_test" }]
regression_tests = [{ name = "value_rmse", params = { lte = 3.0 } }]

[dispatch]
max_workers = 2
"#;

fn data() -> DataFrame {
    df!(
        "StudyID" => ["1", "2", "3", "4"],
        "sex" => ["M", "F", "M", "F"],
        "hospital" => ["h1", "h1", "h2", "h2"],
        "age" => [10i64, 30, 50, 70],
        "bmi" => [20.0, 21.5, 30.1, 25.0],
        "prediction" => [1.0, 2.0, 3.0, 4.0],
        "label" => [1.5, 2.0, 2.5, 4.0],
    )
    .expect("frame")
}

fn setup() -> (DataFrame, MonitorConfig, DataProfile) {
    let data = data();
    let config = MonitorConfig::from_toml_str(CONFIG).expect("config");
    let mut profile = DataProfile::default();
    profile.update(&data, &config).expect("profile");
    (data, config, profile)
}

/// Records every job and rejects regression jobs for one key.
struct RecordingEngine {
    failing_key: &'static str,
    jobs: Mutex<Vec<(String, SuiteKind, Vec<String>, usize, usize)>>,
}

impl ReportEngine for RecordingEngine {
    fn generate(&self, job: &EngineJob<'_>) -> Result<PathBuf, EngineError> {
        if job.key == self.failing_key && job.suite == SuiteKind::Regression {
            return Err(EngineError::Rejected("synthetic failure".to_string()));
        }
        if let JobContent::Tests(tests) = job.content {
            assert!(tests.iter().all(|t| t.kind.group().config_key().ends_with("_tests")));
        }
        self.jobs.lock().unwrap().push((
            job.key.to_string(),
            job.suite,
            job.tags.to_vec(),
            job.current.height(),
            job.reference.height(),
        ));
        Ok(PathBuf::from(job.key).join(job.artifact_name()))
    }
}

#[derive(Default)]
struct CountingObserver {
    started: AtomicUsize,
    finished_keys: AtomicUsize,
}

impl DispatchObserver for CountingObserver {
    fn on_start(&self, operation: Operation, total_keys: usize) {
        assert_eq!(operation, Operation::Report);
        self.started.fetch_add(total_keys, Ordering::SeqCst);
    }

    fn on_key_finished(&self, operation: Operation, key: &str, failures: usize) {
        assert_eq!(operation, Operation::Report);
        assert!(!key.is_empty());
        assert!(failures <= 1);
        self.finished_keys.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn failures_are_isolated_per_key_and_suite() {
    let (data, config, profile) = setup();
    let reports = DataSplitter::new()
        .split(&data, &config, &profile, Operation::Report)
        .unwrap();

    let engine = RecordingEngine {
        failing_key: "male_report",
        jobs: Mutex::new(Vec::new()),
    };
    let dispatcher = Dispatcher::new(&engine, &config, &profile, "run1");
    assert_eq!(dispatcher.suites(), [SuiteKind::Data, SuiteKind::Regression]);
    assert_eq!(dispatcher.timestamp(), "run1");

    let observer = CountingObserver::default();
    let summary = dispatcher.dispatch(&reports, &data, &data, &observer).unwrap();

    assert_eq!(summary.keys, reports.len());
    assert_eq!(summary.failures.len(), 1);
    assert_eq!(summary.failures[0].key, "male_report");
    assert_eq!(summary.failures[0].suite, Some(SuiteKind::Regression));
    assert!(!summary.is_clean());
    assert_eq!(summary.generated.len(), reports.len() * 2 - 1);
    assert_eq!(observer.started.load(Ordering::SeqCst), reports.len());
    assert_eq!(observer.finished_keys.load(Ordering::SeqCst), reports.len());

    let jobs = engine.jobs.lock().unwrap();
    let male_data = jobs
        .iter()
        .find(|(key, suite, ..)| key == "male_report" && *suite == SuiteKind::Data)
        .expect("data suite still ran for the failing key");
    assert_eq!(male_data.2, ["male", "single", "data"]);
    assert_eq!(male_data.3, 2);
    assert_eq!(male_data.4, 4);

    let main = jobs
        .iter()
        .find(|(key, suite, ..)| key == "main_report" && *suite == SuiteKind::Regression)
        .expect("main regression job");
    assert_eq!(main.2, ["main", "single", "regression"]);
    assert_eq!(main.3, 4);
}

#[test]
fn snapshot_engine_persists_every_job() {
    let (data, config, profile) = setup();
    let tests = DataSplitter::new()
        .split(&data, &config, &profile, Operation::Test)
        .unwrap();

    let dir = tempfile::tempdir().unwrap();
    let mut workspace = SnapshotWorkspace::open(dir.path()).unwrap();
    let engine = SnapshotEngine::new(&workspace);
    let dispatcher = Dispatcher::new(&engine, &config, &profile, "run7");
    let summary = dispatcher
        .dispatch(&tests, &data, &data, &NoopDispatchProgress)
        .unwrap();
    assert!(summary.is_clean());
    assert_eq!(summary.generated.len(), tests.len() * 2);

    workspace.reload().unwrap();
    assert_eq!(workspace.runs(), ["run7"]);

    let key_dir = dir.path().join("snapshots/run7/tests/[0-18]_male_test");
    let data_manifest: SnapshotManifest = toml::from_str(
        &std::fs::read_to_string(key_dir.join("data_test_suite.toml")).unwrap(),
    )
    .unwrap();
    assert_eq!(data_manifest.current_rows, 1);
    assert_eq!(data_manifest.tags, ["[0-18]", "male", "data"]);
    let names: Vec<&str> = data_manifest.tests.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, ["number_of_rows"]);

    let regression: SnapshotManifest = toml::from_str(
        &std::fs::read_to_string(key_dir.join("regression_test_suite.toml")).unwrap(),
    )
    .unwrap();
    assert_eq!(regression.tests[0].engine_name, "TestValueRMSE");
    assert_eq!(regression.column_mapping.target.as_deref(), Some("label"));
    assert!(key_dir.join("current.csv").exists());
}

#[test]
fn keys_differing_only_in_separators_keep_their_own_artifacts() {
    let data = df!(
        "StudyID" => ["1", "2", "3", "4"],
        "sex" => ["M", "F", "M", "F"],
        "hospital" => ["St/Mary", "St-Mary", "St/Mary", "St-Mary"],
        "age" => [10i64, 30, 50, 70],
        "bmi" => [20.0, 21.5, 30.1, 25.0],
        "prediction" => [1.0, 2.0, 3.0, 4.0],
        "label" => [1.5, 2.0, 2.5, 4.0],
    )
    .unwrap();
    let config = MonitorConfig::from_toml_str(CONFIG).unwrap();
    let mut profile = DataProfile::default();
    profile.update(&data, &config).unwrap();
    let tests = DataSplitter::new()
        .split(&data, &config, &profile, Operation::Test)
        .unwrap();
    assert!(tests.contains_key("St/Mary_test"));
    assert!(tests.contains_key("St-Mary_test"));

    let dir = tempfile::tempdir().unwrap();
    let workspace = SnapshotWorkspace::open(dir.path()).unwrap();
    let engine = SnapshotEngine::new(&workspace);
    let summary = Dispatcher::new(&engine, &config, &profile, "run3")
        .dispatch(&tests, &data, &data, &NoopDispatchProgress)
        .unwrap();
    assert!(summary.is_clean());

    for (key, ids) in [("St/Mary_test", ["1", "3"]), ("St-Mary_test", ["2", "4"])] {
        let key_dir = workspace.snapshot_dir("run3", Operation::Test, key);
        let manifest: SnapshotManifest = toml::from_str(
            &std::fs::read_to_string(key_dir.join("data_test_suite.toml")).unwrap(),
        )
        .unwrap();
        assert_eq!(manifest.key, key);
        assert_eq!(manifest.current_rows, 2);

        let subset = stratawatch::data::read_table(&key_dir.join("current.csv")).unwrap();
        let written = stratawatch::frame::string_values(&subset, "StudyID").unwrap();
        let expected: Vec<Option<String>> = ids.iter().map(|id| Some(id.to_string())).collect();
        assert_eq!(written, expected);
    }
}
