#![deny(unused_variables)]
#![deny(dead_code)]
#![deny(unused_imports)]
#![deny(clippy::no_effect_underscore_binding)]
pub mod config;
pub mod data;
pub mod frame;
pub mod profile;
pub mod workspace;

#[path = "../stratify/mod.rs"]
pub mod stratify;

#[path = "../dispatch/mod.rs"]
pub mod dispatch;

pub use config::{ColumnConfig, ConfigError, MonitorConfig};
pub use dispatch::{DispatchSummary, Dispatcher, ReportEngine, SnapshotEngine};
pub use profile::DataProfile;
pub use stratify::{DataSplitter, Operation, StratifyError, Stratifications};
pub use workspace::SnapshotWorkspace;
