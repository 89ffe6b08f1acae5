//! The seam between the dispatcher and the reporting engine.
//!
//! Metric computation is not done here. An engine receives one job per
//! combination and suite, holding the current subset, the reference data, the
//! column mapping, the tags and either the metric plan or the resolved tests.
//! [`SnapshotEngine`] is the engine shipped with the crate: it persists each
//! job into a [`SnapshotWorkspace`] so an external engine can pick it up.

use super::mapping::{ColumnMapping, SuiteKind};
use super::registry::{ReportMetric, ResolvedTest};
use crate::data::{self, DataError};
use crate::stratify::Operation;
use crate::workspace::SnapshotWorkspace;
use polars::prelude::{DataFrame, PolarsError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Failed to write subset data: {0}")]
    DataError(#[from] DataError),
    #[error("Failed to serialize manifest to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("The reporting engine rejected the job: {0}")]
    Rejected(String),
}

/// What the engine is asked to produce.
#[derive(Debug, Clone, Copy)]
pub enum JobContent<'a> {
    Metrics(&'a [ReportMetric]),
    Tests(&'a [ResolvedTest]),
}

/// One unit of work: a combination and a suite.
#[derive(Debug, Clone, Copy)]
pub struct EngineJob<'a> {
    pub key: &'a str,
    pub operation: Operation,
    pub suite: SuiteKind,
    pub timestamp: &'a str,
    pub tags: &'a [String],
    pub current: &'a DataFrame,
    pub reference: &'a DataFrame,
    pub mapping: &'a ColumnMapping,
    pub content: JobContent<'a>,
}

impl EngineJob<'_> {
    /// File name of the artifact, e.g. `data_report.toml` or
    /// `regression_test_suite.toml`.
    pub fn artifact_name(&self) -> String {
        match self.operation {
            Operation::Report => format!("{}_report.toml", self.suite),
            Operation::Test => format!("{}_test_suite.toml", self.suite),
        }
    }
}

/// Generates one report or test suite. Called concurrently from the
/// dispatcher's worker pool.
pub trait ReportEngine: Sync {
    fn generate(&self, job: &EngineJob<'_>) -> Result<PathBuf, EngineError>;
}

/// A configured test as written to a manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestTest {
    pub name: String,
    pub engine_name: String,
    #[serde(default)]
    pub params: toml::Table,
}

/// The TOML document written for every job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotManifest {
    pub key: String,
    pub operation: Operation,
    pub suite: SuiteKind,
    pub timestamp: String,
    pub current_rows: usize,
    pub reference_rows: usize,
    pub tags: Vec<String>,
    pub column_mapping: ColumnMapping,
    #[serde(default)]
    pub metrics: Vec<ReportMetric>,
    #[serde(default)]
    pub tests: Vec<ManifestTest>,
}

impl SnapshotManifest {
    pub fn from_job(job: &EngineJob<'_>) -> Self {
        let (metrics, tests) = match job.content {
            JobContent::Metrics(metrics) => (metrics.to_vec(), Vec::new()),
            JobContent::Tests(tests) => (
                Vec::new(),
                tests
                    .iter()
                    .map(|test| ManifestTest {
                        name: test.kind.name().to_string(),
                        engine_name: test.kind.engine_name().to_string(),
                        params: test.params.clone(),
                    })
                    .collect(),
            ),
        };
        Self {
            key: job.key.to_string(),
            operation: job.operation,
            suite: job.suite,
            timestamp: job.timestamp.to_string(),
            current_rows: job.current.height(),
            reference_rows: job.reference.height(),
            tags: job.tags.to_vec(),
            column_mapping: job.mapping.clone(),
            metrics,
            tests,
        }
    }
}

/// Name of the subset file written next to the manifests.
pub const CURRENT_DATA_FILE: &str = "current.csv";

/// Persists jobs under `snapshots/{timestamp}/{reports|tests}/{key}/`.
pub struct SnapshotEngine<'w> {
    workspace: &'w SnapshotWorkspace,
}

impl<'w> SnapshotEngine<'w> {
    pub fn new(workspace: &'w SnapshotWorkspace) -> Self {
        Self { workspace }
    }
}

impl ReportEngine for SnapshotEngine<'_> {
    fn generate(&self, job: &EngineJob<'_>) -> Result<PathBuf, EngineError> {
        let dir = self
            .workspace
            .snapshot_dir(job.timestamp, job.operation, job.key);
        fs::create_dir_all(&dir)?;

        // Every suite of a key shares the same subset; write it once.
        let subset_path = dir.join(CURRENT_DATA_FILE);
        if !subset_path.exists() {
            data::write_table(&subset_path, job.current)?;
        }

        let manifest = SnapshotManifest::from_job(job);
        let path = dir.join(job.artifact_name());
        let toml_string = toml::to_string_pretty(&manifest)?;
        let mut file = BufWriter::new(fs::File::create(&path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        log::debug!("Wrote {} for {}", path.display(), job.key);
        Ok(path)
    }
}
