//! # Monitoring Configuration
//!
//! The monitoring run is driven by a single TOML document. It names the dataset
//! columns that carry identifiers, stratification attributes and model outputs,
//! selects the age stratification policy, lists the test suites to request from
//! the reporting engine and tunes the dispatcher.
//!
//! Column names are user-supplied and validated once at load time, so every
//! downstream component can treat the mapping as trusted.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Locations searched, in order, when no config path is given explicitly.
pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["config/config.toml", "/app/config/config.toml"];

/// Errors raised while reading or validating the monitoring configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML config file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Config file not found. Searched: {0}")]
    NotFound(String),
    #[error(
        "The '{0}' column mapping is empty. Every required column must name a column of the dataset."
    )]
    EmptyColumn(&'static str),
    #[error("{model} monitoring is enabled but the '{role}' column is not configured.")]
    MissingModelColumn {
        model: &'static str,
        role: &'static str,
    },
}

/// The complete monitoring configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub columns: ColumnConfig,
    #[serde(default)]
    pub model_config: ModelConfig,
    #[serde(default)]
    pub age_filtering: AgeFiltering,
    #[serde(default)]
    pub tests: TestConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
}

/// Mapping from logical roles to dataset column names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnConfig {
    pub study_id: String,
    pub sex: String,
    pub hospital: String,
    pub age: String,
    #[serde(default)]
    pub instrument_type: Option<String>,
    #[serde(default)]
    pub patient_class: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub predictions: PredictionColumns,
    #[serde(default)]
    pub labels: LabelColumns,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PredictionColumns {
    #[serde(default)]
    pub regression_prediction: Option<String>,
    #[serde(default)]
    pub classification_prediction: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelColumns {
    #[serde(default)]
    pub regression_label: Option<String>,
    #[serde(default)]
    pub classification_label: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub model_type: ModelType,
}

/// Which model heads are monitored. The data suite always runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelType {
    #[serde(default)]
    pub regression: bool,
    #[serde(default)]
    pub binary_classification: bool,
}

/// Age stratification settings.
///
/// `filter_type` is kept as free text: any value other than `statistical` or
/// `custom` selects the default bands.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgeFiltering {
    #[serde(default = "default_filter_type")]
    pub filter_type: String,
    #[serde(default)]
    pub custom_ranges: Option<Vec<AgeRange>>,
}

fn default_filter_type() -> String {
    "default".to_string()
}

impl Default for AgeFiltering {
    fn default() -> Self {
        Self {
            filter_type: default_filter_type(),
            custom_ranges: None,
        }
    }
}

/// An inclusive age range, `min <= age <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AgeRange {
    pub min: f64,
    pub max: f64,
}

/// Test names requested per group. Names are resolved against the static
/// registry in [`crate::dispatch::registry`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestConfig {
    #[serde(default)]
    pub data_quality_tests: Vec<TestEntry>,
    #[serde(default)]
    pub data_drift_tests: Vec<TestEntry>,
    #[serde(default)]
    pub regression_tests: Vec<TestEntry>,
    #[serde(default)]
    pub classification_tests: Vec<TestEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestEntry {
    pub name: String,
    #[serde(default)]
    pub params: toml::Table,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Worker threads used for per-combination generation. Defaults to the CPU count.
    #[serde(default)]
    pub max_workers: Option<usize>,
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl ColumnConfig {
    pub fn instrument_type(&self) -> Option<&str> {
        non_empty(&self.instrument_type)
    }

    pub fn patient_class(&self) -> Option<&str> {
        non_empty(&self.patient_class)
    }

    pub fn timestamp(&self) -> Option<&str> {
        non_empty(&self.timestamp)
    }

    pub fn regression_prediction(&self) -> Option<&str> {
        non_empty(&self.predictions.regression_prediction)
    }

    pub fn classification_prediction(&self) -> Option<&str> {
        non_empty(&self.predictions.classification_prediction)
    }

    pub fn regression_label(&self) -> Option<&str> {
        non_empty(&self.labels.regression_label)
    }

    pub fn classification_label(&self) -> Option<&str> {
        non_empty(&self.labels.classification_label)
    }
}

impl MonitorConfig {
    /// Loads and validates a config from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let toml_string = fs::read_to_string(path)?;
        Self::from_toml_str(&toml_string)
    }

    /// Parses and validates a config held in memory.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads the first config found among `candidates`.
    pub fn discover<P: AsRef<Path>>(candidates: &[P]) -> Result<Self, ConfigError> {
        for candidate in candidates {
            let path = candidate.as_ref();
            if path.is_file() {
                log::info!("Loading config from {}", path.display());
                return Self::load(path);
            }
        }
        let searched: Vec<String> = candidates
            .iter()
            .map(|c| c.as_ref().display().to_string())
            .collect();
        Err(ConfigError::NotFound(searched.join(", ")))
    }

    /// The default search list as owned paths.
    pub fn default_paths() -> Vec<PathBuf> {
        DEFAULT_CONFIG_PATHS.iter().map(PathBuf::from).collect()
    }

    /// Rejects column mappings that would make stratification or report
    /// generation impossible.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let columns = &self.columns;
        for (role, value) in [
            ("study_id", &columns.study_id),
            ("sex", &columns.sex),
            ("hospital", &columns.hospital),
            ("age", &columns.age),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::EmptyColumn(role));
            }
        }

        let model_type = self.model_config.model_type;
        if model_type.regression {
            if columns.regression_prediction().is_none() {
                return Err(ConfigError::MissingModelColumn {
                    model: "Regression",
                    role: "regression_prediction",
                });
            }
            if columns.regression_label().is_none() {
                return Err(ConfigError::MissingModelColumn {
                    model: "Regression",
                    role: "regression_label",
                });
            }
        }
        if model_type.binary_classification {
            if columns.classification_prediction().is_none() {
                return Err(ConfigError::MissingModelColumn {
                    model: "Binary classification",
                    role: "classification_prediction",
                });
            }
            if columns.classification_label().is_none() {
                return Err(ConfigError::MissingModelColumn {
                    model: "Binary classification",
                    role: "classification_label",
                });
            }
        }
        Ok(())
    }

    /// Every column a dataset must carry under this config. Prediction and
    /// label columns are only required for enabled model types.
    pub fn required_columns(&self) -> Vec<&str> {
        let columns = &self.columns;
        let model_type = self.model_config.model_type;
        let mut required: Vec<&str> = vec![
            columns.study_id.as_str(),
            columns.sex.as_str(),
            columns.hospital.as_str(),
            columns.age.as_str(),
        ];
        required.extend(columns.instrument_type());
        required.extend(columns.patient_class());
        required.extend(columns.timestamp());
        required.extend(columns.features.iter().map(String::as_str));
        if model_type.regression {
            required.extend(columns.regression_prediction());
            required.extend(columns.regression_label());
        }
        if model_type.binary_classification {
            required.extend(columns.classification_prediction());
            required.extend(columns.classification_label());
        }

        let mut seen = ahash::AHashSet::with_capacity(required.len());
        required.retain(|c| seen.insert(*c));
        required
    }
}
