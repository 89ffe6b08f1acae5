//! Report and test-suite dispatch.
//!
//! For every combination produced by the splitter, the dispatcher builds one
//! job per enabled suite and hands it to a [`ReportEngine`].

use thiserror::Error;

pub mod engine;
pub mod mapping;
pub mod progress;
pub mod registry;
pub mod runner;

pub use engine::{EngineError, EngineJob, JobContent, ReportEngine, SnapshotEngine, SnapshotManifest};
pub use mapping::{ColumnMapping, MappingError, SuiteKind};
pub use progress::{DispatchObserver, NoopDispatchProgress};
pub use registry::{MetricKind, ReportMetric, ResolvedTest, TestGroup, TestKind};
pub use runner::{DispatchSummary, Dispatcher, GeneratedArtifact, JobFailure, tags_for};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("Failed to build the dispatch worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}
