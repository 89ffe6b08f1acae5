//! # Data Stratification Engine
//!
//! Splits one dataset into named strata along sex, age band, hospital,
//! instrument type and patient class, then forms every pairwise combination of
//! those strata. Each combination becomes one unit of work for the reporting
//! engine.
//!
//! Strata never copy data. A stratum is a sorted set of row positions into the
//! dataset it was built from, and combinations are intersections of those
//! sets. Frames are only materialised when a combination is handed to the
//! reporting engine.

use polars::prelude::PolarsError;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub mod age;
pub mod categorical;
pub mod combine;
pub mod sex;
pub mod splitter;
pub mod strata;

pub use combine::{Stratifications, Subset, combine_strata};
pub use splitter::DataSplitter;
pub use strata::{MAIN_KEY, RowSet, StrataCollection, Stratum, StratumKind};

/// Errors that abort construction of a strata collection.
#[derive(Error, Debug)]
pub enum StratifyError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error(
        "The {role} column '{column}' was not found in the dataset. Please check the column mapping."
    )]
    ColumnNotFound { role: &'static str, column: String },
}

/// What the combinations are generated for. Only used for naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operation {
    Report,
    Test,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Report => "report",
            Self::Test => "test",
        }
    }

    /// Snapshot sub-directory for artifacts of this operation.
    pub fn folder(self) -> &'static str {
        match self {
            Self::Report => "reports",
            Self::Test => "tests",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
