//! # Dataset Loading and Validation
//!
//! Current and reference datasets arrive as delimited text files (CSV, or TSV
//! when the extension says so). This module reads them with the `polars`
//! CSV reader and checks them against the column mapping in the monitoring
//! config before any stratification happens.
//!
//! - An empty current dataset is not an error: it means there is nothing new
//!   to monitor and the run ends quietly.
//! - A missing reference file is seeded from the current data, so the first
//!   run compares the data against itself.

use crate::config::MonitorConfig;
use crate::frame;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::Path;
use thiserror::Error;

/// Reference datasets smaller than this produce a warning.
pub const MIN_REFERENCE_ROWS: usize = 50;

#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "Missing required columns in the {dataset} dataset: {missing:?}. Please check spelling and case."
    )]
    MissingColumns {
        dataset: &'static str,
        missing: Vec<String>,
    },
}

fn separator_for(path: &Path) -> u8 {
    match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("tsv") || ext.eq_ignore_ascii_case("tab") => b'\t',
        _ => b',',
    }
}

/// Reads a delimited file into a `DataFrame`.
pub fn read_table(path: &Path) -> Result<DataFrame, DataError> {
    log::info!("Loading data from '{}'", path.display());
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(
                    CsvParseOptions::default().with_separator(separator_for(path)),
                ),
        )
        .finish()?;
    log::info!("Loaded {} rows and {} columns", df.height(), df.width());
    Ok(df)
}

/// Writes a `DataFrame` as CSV (TSV for `.tsv` paths).
pub fn write_table(path: &Path, data: &DataFrame) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    let mut owned = data.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(separator_for(path))
        .finish(&mut owned)?;
    Ok(())
}

/// Checks that every column the config requires is present.
pub fn validate_columns(
    data: &DataFrame,
    config: &MonitorConfig,
    dataset: &'static str,
) -> Result<(), DataError> {
    let missing: Vec<String> = config
        .required_columns()
        .into_iter()
        .filter(|column| !frame::has_column(data, column))
        .map(str::to_string)
        .collect();
    if missing.is_empty() {
        Ok(())
    } else {
        log::error!("Missing required columns in {dataset} data: {missing:?}");
        Err(DataError::MissingColumns { dataset, missing })
    }
}

/// Loads and validates the current dataset. Returns `None` when it has no rows.
pub fn load_current(path: &Path, config: &MonitorConfig) -> Result<Option<DataFrame>, DataError> {
    let data = read_table(path)?;
    if data.height() == 0 {
        log::info!("No new data available. Pipeline will exit normally.");
        return Ok(None);
    }
    validate_columns(&data, config, "current")?;
    Ok(Some(data))
}

/// Loads and validates the reference dataset, seeding it from `current` when
/// the file does not exist yet.
pub fn load_reference(
    path: &Path,
    current: &DataFrame,
    config: &MonitorConfig,
) -> Result<DataFrame, DataError> {
    let reference = if path.exists() {
        let reference = read_table(path)?;
        if reference.height() < MIN_REFERENCE_ROWS {
            log::warn!(
                "Reference data has {} rows (fewer than {MIN_REFERENCE_ROWS}), consider updating the reference data.",
                reference.height()
            );
        }
        reference
    } else {
        log::info!(
            "Reference data not found at {}, copying the current data.",
            path.display()
        );
        write_table(path, current)?;
        current.clone()
    };
    validate_columns(&reference, config, "reference")?;
    Ok(reference)
}
