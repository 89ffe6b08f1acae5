//! # Dispatcher
//!
//! Fans the combinations of one split out to the reporting engine. Each key is
//! processed on a worker of a dedicated rayon pool; within a key the enabled
//! suites run in order. A failing suite or key is logged and recorded in the
//! [`DispatchSummary`] without stopping its siblings.

use super::DispatchError;
use super::engine::{EngineJob, JobContent, ReportEngine};
use super::mapping::{ColumnMapping, MappingError, SuiteKind};
use super::progress::DispatchObserver;
use super::registry::{self, ReportMetric, ResolvedTest};
use crate::config::MonitorConfig;
use crate::profile::DataProfile;
use crate::stratify::{Operation, Stratifications, Subset};
use polars::prelude::DataFrame;
use rayon::prelude::*;
use std::path::PathBuf;

/// Everything needed to generate one suite, resolved up front.
struct SuitePlan {
    suite: SuiteKind,
    mapping: Result<ColumnMapping, String>,
    metrics: Vec<ReportMetric>,
    tests: Vec<ResolvedTest>,
}

impl SuitePlan {
    fn resolve(config: &MonitorConfig, profile: &DataProfile, suite: SuiteKind) -> Self {
        let mapping = ColumnMapping::for_suite(config, profile, suite).map_err(|e: MappingError| {
            log::error!("Error setting up column mapping for the {suite} suite: {e}");
            e.to_string()
        });
        let metrics = mapping
            .as_ref()
            .map(|m| registry::report_plan(suite, m))
            .unwrap_or_default();
        let tests = registry::resolve_tests(&config.tests, suite);
        Self {
            suite,
            mapping,
            metrics,
            tests,
        }
    }
}

/// An artifact the engine produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub key: String,
    pub suite: SuiteKind,
    pub path: PathBuf,
}

/// A job that did not produce an artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobFailure {
    pub key: String,
    pub suite: Option<SuiteKind>,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchSummary {
    pub operation: Operation,
    pub keys: usize,
    pub generated: Vec<GeneratedArtifact>,
    pub failures: Vec<JobFailure>,
}

impl DispatchSummary {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Default)]
struct KeyOutcome {
    generated: Vec<GeneratedArtifact>,
    failures: Vec<JobFailure>,
}

/// Tags attached to every artifact of a combination: its member strata,
/// `single` when there is only one, then the suite name.
pub fn tags_for(members: &[String], suite: SuiteKind) -> Vec<String> {
    let mut tags = members.to_vec();
    if tags.len() == 1 {
        tags.push("single".to_string());
    }
    tags.push(suite.name().to_string());
    tags
}

pub struct Dispatcher<'a, E: ReportEngine + ?Sized> {
    engine: &'a E,
    suites: Vec<SuitePlan>,
    timestamp: String,
    workers: usize,
}

impl<'a, E: ReportEngine + ?Sized> Dispatcher<'a, E> {
    /// Resolves column mappings, metric plans and tests for every enabled
    /// suite.
    pub fn new(
        engine: &'a E,
        config: &MonitorConfig,
        profile: &DataProfile,
        timestamp: impl Into<String>,
    ) -> Self {
        let suites = SuiteKind::enabled(config.model_config.model_type)
            .into_iter()
            .map(|suite| SuitePlan::resolve(config, profile, suite))
            .collect();
        let workers = config
            .dispatch
            .max_workers
            .unwrap_or_else(num_cpus::get)
            .max(1);
        Self {
            engine,
            suites,
            timestamp: timestamp.into(),
            workers,
        }
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn suites(&self) -> Vec<SuiteKind> {
        self.suites.iter().map(|plan| plan.suite).collect()
    }

    /// Generates every suite for every combination. `current` must be the
    /// frame `stratifications` was split from; `reference` is passed whole.
    pub fn dispatch(
        &self,
        stratifications: &Stratifications,
        current: &DataFrame,
        reference: &DataFrame,
        observer: &dyn DispatchObserver,
    ) -> Result<DispatchSummary, DispatchError> {
        let operation = stratifications.operation();
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()?;
        log::info!(
            "Dispatching {} {operation} combinations on {} workers",
            stratifications.len(),
            self.workers
        );
        observer.on_start(operation, stratifications.len());

        let outcomes: Vec<KeyOutcome> = pool.install(|| {
            stratifications
                .subsets()
                .par_iter()
                .map(|subset| {
                    let outcome = self.run_key(operation, subset, current, reference);
                    observer.on_key_finished(operation, subset.key(), outcome.failures.len());
                    outcome
                })
                .collect()
        });
        observer.on_finish(operation);

        let mut summary = DispatchSummary {
            operation,
            keys: stratifications.len(),
            generated: Vec::new(),
            failures: Vec::new(),
        };
        for outcome in outcomes {
            summary.generated.extend(outcome.generated);
            summary.failures.extend(outcome.failures);
        }
        log::info!(
            "Finished {operation} dispatch: {} artifacts, {} failures",
            summary.generated.len(),
            summary.failures.len()
        );
        Ok(summary)
    }

    fn run_key(
        &self,
        operation: Operation,
        subset: &Subset,
        current: &DataFrame,
        reference: &DataFrame,
    ) -> KeyOutcome {
        let key = subset.key();
        log::info!("Generating {operation}s for {key}");
        let mut outcome = KeyOutcome::default();

        let frame = match subset.rows().materialize(current) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("Failed to materialise {key}: {e}");
                outcome.failures.push(JobFailure {
                    key: key.to_string(),
                    suite: None,
                    message: e.to_string(),
                });
                return outcome;
            }
        };

        for plan in &self.suites {
            let suite = plan.suite;
            let mapping = match &plan.mapping {
                Ok(mapping) => mapping,
                Err(message) => {
                    outcome.failures.push(JobFailure {
                        key: key.to_string(),
                        suite: Some(suite),
                        message: message.clone(),
                    });
                    continue;
                }
            };
            let tags = tags_for(subset.members(), suite);
            let job = EngineJob {
                key,
                operation,
                suite,
                timestamp: &self.timestamp,
                tags: &tags,
                current: &frame,
                reference,
                mapping,
                content: match operation {
                    Operation::Report => JobContent::Metrics(&plan.metrics),
                    Operation::Test => JobContent::Tests(&plan.tests),
                },
            };
            match self.engine.generate(&job) {
                Ok(path) => outcome.generated.push(GeneratedArtifact {
                    key: key.to_string(),
                    suite,
                    path,
                }),
                Err(e) => {
                    log::error!("Error generating {suite} {operation} for {key}: {e}");
                    outcome.failures.push(JobFailure {
                        key: key.to_string(),
                        suite: Some(suite),
                        message: e.to_string(),
                    });
                }
            }
        }
        outcome
    }
}
