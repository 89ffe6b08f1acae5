//! Column mapping handed to the reporting engine.
//!
//! The engine needs to know which columns are identifiers, features, targets
//! and predictions. Features are split into numerical and categorical using
//! the data profile: a feature the profile recorded as categorical stays
//! categorical, anything else is numerical. Age is always numerical.

use crate::config::{ModelType, MonitorConfig};
use crate::profile::DataProfile;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The report and test suites generated per combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuiteKind {
    Data,
    Regression,
    Classification,
}

impl SuiteKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Data => "data",
            Self::Regression => "regression",
            Self::Classification => "classification",
        }
    }

    /// The data suite always runs; model suites follow the model type.
    pub fn enabled(model_type: ModelType) -> Vec<SuiteKind> {
        let mut suites = vec![Self::Data];
        if model_type.regression {
            suites.push(Self::Regression);
        }
        if model_type.binary_classification {
            suites.push(Self::Classification);
        }
        suites
    }
}

impl fmt::Display for SuiteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("The {suite} suite needs the '{role}' column, which is not configured.")]
    MissingColumn {
        suite: SuiteKind,
        role: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub datetime: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    pub numerical_features: Vec<String>,
    pub categorical_features: Vec<String>,
}

/// Splits the configured features into `(numerical, categorical)`.
pub fn split_features(config: &MonitorConfig, profile: &DataProfile) -> (Vec<String>, Vec<String>) {
    let columns = &config.columns;
    let mut categorical: Vec<String> = [Some(columns.sex.as_str()), Some(columns.hospital.as_str())]
        .into_iter()
        .chain([columns.instrument_type(), columns.patient_class()])
        .flatten()
        .map(str::to_string)
        .collect();
    let mut numerical: Vec<String> = Vec::new();

    for feature in &columns.features {
        let bucket = if profile.categorical_columns.contains(feature) {
            &mut categorical
        } else {
            &mut numerical
        };
        if !bucket.contains(feature) {
            bucket.push(feature.clone());
        }
    }
    if !numerical.contains(&columns.age) {
        numerical.push(columns.age.clone());
    }
    (numerical, categorical)
}

impl ColumnMapping {
    /// Mapping for one suite. Model suites require their prediction and
    /// label columns.
    pub fn for_suite(
        config: &MonitorConfig,
        profile: &DataProfile,
        suite: SuiteKind,
    ) -> Result<Self, MappingError> {
        let columns = &config.columns;
        let (numerical_features, mut categorical_features) = split_features(config, profile);
        let require = |value: Option<&str>, role: &'static str| {
            value
                .map(str::to_string)
                .ok_or(MappingError::MissingColumn { suite, role })
        };

        let (target, prediction) = match suite {
            SuiteKind::Data => {
                if config.model_config.model_type.binary_classification {
                    for column in [
                        columns.classification_prediction(),
                        columns.classification_label(),
                    ]
                    .into_iter()
                    .flatten()
                    {
                        if !categorical_features.iter().any(|c| c == column) {
                            categorical_features.push(column.to_string());
                        }
                    }
                }
                (
                    columns.regression_label().map(str::to_string),
                    columns.regression_prediction().map(str::to_string),
                )
            }
            SuiteKind::Regression => (
                Some(require(columns.regression_label(), "regression_label")?),
                Some(require(columns.regression_prediction(), "regression_prediction")?),
            ),
            SuiteKind::Classification => (
                Some(require(columns.classification_label(), "classification_label")?),
                Some(require(
                    columns.classification_prediction(),
                    "classification_prediction",
                )?),
            ),
        };

        Ok(Self {
            id: columns.study_id.clone(),
            datetime: columns.timestamp().map(str::to_string),
            target,
            prediction,
            numerical_features,
            categorical_features,
        })
    }
}
