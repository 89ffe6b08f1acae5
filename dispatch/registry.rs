//! Static registry of report metrics and tests.
//!
//! Tests are requested by name in the `[tests]` section of the config. Names
//! are resolved once, when the dispatcher is built, against the table below.
//! Unknown names and names listed under the wrong group are logged and
//! skipped; they never abort a run.

use super::mapping::{ColumnMapping, SuiteKind};
use crate::config::{TestConfig, TestEntry};
use serde::{Deserialize, Serialize};

/// Config sections that list tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestGroup {
    DataQuality,
    DataDrift,
    Regression,
    Classification,
}

impl TestGroup {
    pub fn config_key(self) -> &'static str {
        match self {
            Self::DataQuality => "data_quality_tests",
            Self::DataDrift => "data_drift_tests",
            Self::Regression => "regression_tests",
            Self::Classification => "classification_tests",
        }
    }

    /// Groups whose tests make up the test suite of `suite`.
    pub fn for_suite(suite: SuiteKind) -> &'static [TestGroup] {
        match suite {
            SuiteKind::Data => &[Self::DataQuality, Self::DataDrift],
            SuiteKind::Regression => &[Self::Regression],
            SuiteKind::Classification => &[Self::Classification],
        }
    }

    fn entries(self, tests: &TestConfig) -> &[TestEntry] {
        match self {
            Self::DataQuality => &tests.data_quality_tests,
            Self::DataDrift => &tests.data_drift_tests,
            Self::Regression => &tests.regression_tests,
            Self::Classification => &tests.classification_tests,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TestKind {
    NumberOfRows,
    NumberOfColumns,
    ColumnsType,
    NumberOfMissingValues,
    ShareOfMissingValues,
    NumberOfDuplicatedRows,
    NumberOfDuplicatedColumns,
    NumberOfConstantColumns,
    NumberOfEmptyRows,
    NumberOfEmptyColumns,
    NumberOfDriftedColumns,
    ShareOfDriftedColumns,
    ColumnDrift,
    ValueMae,
    ValueRmse,
    ValueMeanError,
    ValueMape,
    ValueAbsMaxError,
    ValueR2Score,
    Accuracy,
    Precision,
    Recall,
    F1,
    RocAuc,
    LogLoss,
    Tpr,
    Tnr,
    Fpr,
    Fnr,
}

impl TestKind {
    pub const ALL: [TestKind; 29] = [
        Self::NumberOfRows,
        Self::NumberOfColumns,
        Self::ColumnsType,
        Self::NumberOfMissingValues,
        Self::ShareOfMissingValues,
        Self::NumberOfDuplicatedRows,
        Self::NumberOfDuplicatedColumns,
        Self::NumberOfConstantColumns,
        Self::NumberOfEmptyRows,
        Self::NumberOfEmptyColumns,
        Self::NumberOfDriftedColumns,
        Self::ShareOfDriftedColumns,
        Self::ColumnDrift,
        Self::ValueMae,
        Self::ValueRmse,
        Self::ValueMeanError,
        Self::ValueMape,
        Self::ValueAbsMaxError,
        Self::ValueR2Score,
        Self::Accuracy,
        Self::Precision,
        Self::Recall,
        Self::F1,
        Self::RocAuc,
        Self::LogLoss,
        Self::Tpr,
        Self::Tnr,
        Self::Fpr,
        Self::Fnr,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// Config name, engine class name and group of each test.
    const fn registration(self) -> (&'static str, &'static str, TestGroup) {
        match self {
            Self::NumberOfRows => ("number_of_rows", "TestNumberOfRows", TestGroup::DataQuality),
            Self::NumberOfColumns => ("number_of_columns", "TestNumberOfColumns", TestGroup::DataQuality),
            Self::ColumnsType => ("columns_type", "TestColumnsType", TestGroup::DataQuality),
            Self::NumberOfMissingValues => ("number_of_missing_values", "TestNumberOfMissingValues", TestGroup::DataQuality),
            Self::ShareOfMissingValues => ("share_of_missing_values", "TestShareOfMissingValues", TestGroup::DataQuality),
            Self::NumberOfDuplicatedRows => ("number_of_duplicated_rows", "TestNumberOfDuplicatedRows", TestGroup::DataQuality),
            Self::NumberOfDuplicatedColumns => ("number_of_duplicated_columns", "TestNumberOfDuplicatedColumns", TestGroup::DataQuality),
            Self::NumberOfConstantColumns => ("number_of_constant_columns", "TestNumberOfConstantColumns", TestGroup::DataQuality),
            Self::NumberOfEmptyRows => ("number_of_empty_rows", "TestNumberOfEmptyRows", TestGroup::DataQuality),
            Self::NumberOfEmptyColumns => ("number_of_empty_columns", "TestNumberOfEmptyColumns", TestGroup::DataQuality),
            Self::NumberOfDriftedColumns => ("number_of_drifted_columns", "TestNumberOfDriftedColumns", TestGroup::DataDrift),
            Self::ShareOfDriftedColumns => ("share_of_drifted_columns", "TestShareOfDriftedColumns", TestGroup::DataDrift),
            Self::ColumnDrift => ("column_drift", "TestColumnDrift", TestGroup::DataDrift),
            Self::ValueMae => ("value_mae", "TestValueMAE", TestGroup::Regression),
            Self::ValueRmse => ("value_rmse", "TestValueRMSE", TestGroup::Regression),
            Self::ValueMeanError => ("value_mean_error", "TestValueMeanError", TestGroup::Regression),
            Self::ValueMape => ("value_mape", "TestValueMAPE", TestGroup::Regression),
            Self::ValueAbsMaxError => ("value_abs_max_error", "TestValueAbsMaxError", TestGroup::Regression),
            Self::ValueR2Score => ("value_r2_score", "TestValueR2Score", TestGroup::Regression),
            Self::Accuracy => ("accuracy_score", "TestAccuracyScore", TestGroup::Classification),
            Self::Precision => ("precision_score", "TestPrecisionScore", TestGroup::Classification),
            Self::Recall => ("recall_score", "TestRecallScore", TestGroup::Classification),
            Self::F1 => ("f1_score", "TestF1Score", TestGroup::Classification),
            Self::RocAuc => ("roc_auc", "TestRocAuc", TestGroup::Classification),
            Self::LogLoss => ("log_loss", "TestLogLoss", TestGroup::Classification),
            Self::Tpr => ("tpr", "TestTPR", TestGroup::Classification),
            Self::Tnr => ("tnr", "TestTNR", TestGroup::Classification),
            Self::Fpr => ("fpr", "TestFPR", TestGroup::Classification),
            Self::Fnr => ("fnr", "TestFNR", TestGroup::Classification),
        }
    }

    /// The name used in the config file.
    pub fn name(self) -> &'static str {
        self.registration().0
    }

    /// The test class the reporting engine instantiates.
    pub fn engine_name(self) -> &'static str {
        self.registration().1
    }

    pub fn group(self) -> TestGroup {
        self.registration().2
    }
}

/// A configured test, resolved against the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedTest {
    pub kind: TestKind,
    pub params: toml::Table,
}

/// Resolves the tests configured for `suite`, in config order.
pub fn resolve_tests(tests: &TestConfig, suite: SuiteKind) -> Vec<ResolvedTest> {
    let mut resolved = Vec::new();
    for &group in TestGroup::for_suite(suite) {
        for entry in group.entries(tests) {
            match TestKind::from_name(&entry.name) {
                None => log::error!(
                    "Unknown test '{}' in {}; skipping it",
                    entry.name,
                    group.config_key()
                ),
                Some(kind) if kind.group() != group => log::error!(
                    "Test '{}' belongs in {}, not {}; skipping it",
                    entry.name,
                    kind.group().config_key(),
                    group.config_key()
                ),
                Some(kind) => resolved.push(ResolvedTest {
                    kind,
                    params: entry.params.clone(),
                }),
            }
        }
    }
    resolved
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    DatasetSummary,
    DatasetDrift,
    DataDriftTable,
    ColumnDrift,
    RegressionQuality,
    RegressionPredictedVsActualScatter,
    ClassificationQuality,
    ClassificationConfusionMatrix,
}

/// One metric of a report, optionally bound to a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetric {
    pub metric: MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl ReportMetric {
    fn of(metric: MetricKind) -> Self {
        Self {
            metric,
            column: None,
        }
    }
}

/// The fixed metric plan of a suite's report. The data report adds a drift
/// metric for the prediction and target columns when the mapping has them.
pub fn report_plan(suite: SuiteKind, mapping: &ColumnMapping) -> Vec<ReportMetric> {
    match suite {
        SuiteKind::Data => {
            let mut plan = vec![
                ReportMetric::of(MetricKind::DatasetSummary),
                ReportMetric::of(MetricKind::DatasetDrift),
                ReportMetric::of(MetricKind::DataDriftTable),
            ];
            plan.extend(
                [&mapping.prediction, &mapping.target]
                    .into_iter()
                    .flatten()
                    .map(|column| ReportMetric {
                        metric: MetricKind::ColumnDrift,
                        column: Some(column.clone()),
                    }),
            );
            plan
        }
        SuiteKind::Regression => vec![
            ReportMetric::of(MetricKind::RegressionQuality),
            ReportMetric::of(MetricKind::RegressionPredictedVsActualScatter),
        ],
        SuiteKind::Classification => vec![
            ReportMetric::of(MetricKind::ClassificationQuality),
            ReportMetric::of(MetricKind::ClassificationConfusionMatrix),
        ],
    }
}
