//! # Data Profile
//!
//! The profile remembers every categorical value observed across monitoring
//! runs. Stratification builds one stratum per known value, so a hospital that
//! sent data last month still gets a (possibly empty) stratum this month.
//!
//! The profile is stored as TOML next to the monitoring config and is grown,
//! never shrunk, by [`DataProfile::update`].

use crate::config::MonitorConfig;
use crate::frame;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{BufWriter, Write};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProfileError {
    #[error("Failed to read or write profile file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML profile file: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Failed to serialize profile to TOML format: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
}

/// A categorical stratification dimension tracked by the profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Sex,
    Hospital,
    InstrumentType,
    PatientClass,
}

impl Dimension {
    pub const ALL: [Dimension; 4] = [
        Dimension::Hospital,
        Dimension::Sex,
        Dimension::InstrumentType,
        Dimension::PatientClass,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Sex => "sex",
            Self::Hospital => "hospital",
            Self::InstrumentType => "instrument_type",
            Self::PatientClass => "patient_class",
        }
    }

    /// The dataset column for this dimension, if configured.
    pub fn column(self, config: &MonitorConfig) -> Option<&str> {
        let columns = &config.columns;
        match self {
            Self::Sex => Some(columns.sex.as_str()),
            Self::Hospital => Some(columns.hospital.as_str()),
            Self::InstrumentType => columns.instrument_type(),
            Self::PatientClass => columns.patient_class(),
        }
    }
}

/// Previously observed values and row counts for the monitored dataset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataProfile {
    #[serde(default)]
    pub num_rows: usize,
    #[serde(default)]
    pub hospital_unique_values: Vec<String>,
    #[serde(default)]
    pub sex_unique_values: Vec<String>,
    #[serde(default)]
    pub instrument_type_unique_values: Vec<String>,
    #[serde(default)]
    pub patient_class_unique_values: Vec<String>,
    #[serde(default)]
    pub categorical_columns: Vec<String>,
}

impl DataProfile {
    /// Known values for one dimension.
    pub fn known_values(&self, dimension: Dimension) -> &[String] {
        match dimension {
            Dimension::Sex => &self.sex_unique_values,
            Dimension::Hospital => &self.hospital_unique_values,
            Dimension::InstrumentType => &self.instrument_type_unique_values,
            Dimension::PatientClass => &self.patient_class_unique_values,
        }
    }

    fn known_values_mut(&mut self, dimension: Dimension) -> &mut Vec<String> {
        match dimension {
            Dimension::Sex => &mut self.sex_unique_values,
            Dimension::Hospital => &mut self.hospital_unique_values,
            Dimension::InstrumentType => &mut self.instrument_type_unique_values,
            Dimension::PatientClass => &mut self.patient_class_unique_values,
        }
    }

    /// Reads an existing profile without touching the disk when it is missing.
    pub fn read(path: &Path) -> Result<Option<Self>, ProfileError> {
        if !path.exists() {
            return Ok(None);
        }
        let toml_string = fs::read_to_string(path)?;
        Ok(Some(toml::from_str(&toml_string)?))
    }

    /// Loads a profile, creating a default one on disk when the file is missing.
    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        if let Some(profile) = Self::read(path)? {
            return Ok(profile);
        }
        let profile = Self::default();
        profile.save(path)?;
        log::info!("Created new profile file at {}", path.display());
        Ok(profile)
    }

    /// Configured dimensions for which no value has been recorded yet. These
    /// produce no strata.
    pub fn missing_dimensions(&self, config: &MonitorConfig) -> Vec<Dimension> {
        Dimension::ALL
            .into_iter()
            .filter(|d| d.column(config).is_some() && self.known_values(*d).is_empty())
            .collect()
    }

    /// Saves the profile in a human-readable TOML format.
    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let toml_string = toml::to_string_pretty(self)?;
        let mut file = BufWriter::new(fs::File::create(path)?);
        file.write_all(toml_string.as_bytes())?;
        file.flush()?;
        log::info!("Profile saved to {}", path.display());
        Ok(())
    }

    /// Folds a freshly loaded dataset into the profile.
    ///
    /// The row count is only recorded the first time. Unique values of each
    /// configured dimension are unioned with the known values and kept in
    /// natural order. Non-numeric columns other than the timestamp are recorded
    /// as categorical.
    pub fn update(&mut self, data: &DataFrame, config: &MonitorConfig) -> Result<(), ProfileError> {
        log::info!("Updating data profile...");
        if self.num_rows == 0 {
            self.num_rows = data.height();
        }

        for dimension in Dimension::ALL {
            let Some(column) = dimension.column(config) else {
                continue;
            };
            let observed = frame::string_values(data, column)?;
            let known = self.known_values_mut(dimension);
            let mut merged: ahash::AHashSet<String> = known.drain(..).collect();
            merged.extend(observed.into_iter().flatten());
            let mut values: Vec<String> = merged.into_iter().collect();
            values.sort_by(|a, b| natord::compare(a, b));
            *known = values;
        }

        let timestamp = config.columns.timestamp();
        for column in data.get_columns() {
            let name = column.name().as_str();
            if frame::is_numeric_dtype(column.dtype())
                || Some(name) == timestamp
                || name == "timestamp"
            {
                continue;
            }
            if !self.categorical_columns.iter().any(|c| c == name) {
                self.categorical_columns.push(name.to_string());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::SAMPLE_CONFIG;

    fn frame() -> DataFrame {
        df!(
            "StudyID" => ["001", "002", "003"],
            "sex" => ["M", "F", "M"],
            "hospital" => ["hospital10", "hospital2", "hospital10"],
            "age" => [9i64, 11, 34],
            "instrument_type" => ["type1", "type2", "type1"],
            "bmi" => [20.1, 25.3, 30.0],
            "smoker" => ["yes", "no", "no"],
        )
        .unwrap()
    }

    #[test]
    fn update_unions_values_in_natural_order() {
        let config = MonitorConfig::from_toml_str(SAMPLE_CONFIG).unwrap();
        let mut profile = DataProfile {
            hospital_unique_values: vec!["hospital1".to_string()],
            ..DataProfile::default()
        };
        profile.update(&frame(), &config).unwrap();

        assert_eq!(profile.num_rows, 3);
        assert_eq!(
            profile.hospital_unique_values,
            vec!["hospital1", "hospital2", "hospital10"]
        );
        assert_eq!(profile.sex_unique_values, vec!["F", "M"]);
        assert_eq!(profile.instrument_type_unique_values, vec!["type1", "type2"]);
        assert!(profile.patient_class_unique_values.is_empty());
        assert_eq!(
            profile.categorical_columns,
            vec!["StudyID", "sex", "hospital", "instrument_type", "smoker"]
        );
    }

    #[test]
    fn num_rows_is_recorded_once() {
        let config = MonitorConfig::from_toml_str(SAMPLE_CONFIG).unwrap();
        let mut profile = DataProfile {
            num_rows: 500,
            ..DataProfile::default()
        };
        profile.update(&frame(), &config).unwrap();
        assert_eq!(profile.num_rows, 500);
    }

    #[test]
    fn load_creates_missing_profile_and_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile").join("details.toml");
        let created = DataProfile::load(&path).unwrap();
        assert_eq!(created, DataProfile::default());
        assert!(path.exists());

        let config = MonitorConfig::from_toml_str(SAMPLE_CONFIG).unwrap();
        let mut profile = created;
        profile.update(&frame(), &config).unwrap();
        profile.save(&path).unwrap();
        assert_eq!(DataProfile::load(&path).unwrap(), profile);
    }

    #[test]
    fn read_leaves_missing_profile_absent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("details.toml");
        assert_eq!(DataProfile::read(&path).unwrap(), None);
        assert!(!path.exists());
    }

    #[test]
    fn missing_dimensions_lists_configured_dimensions_without_values() {
        let config = MonitorConfig::from_toml_str(SAMPLE_CONFIG).unwrap();
        let fresh = DataProfile::default();
        assert_eq!(
            fresh.missing_dimensions(&config),
            [Dimension::Hospital, Dimension::Sex, Dimension::InstrumentType]
        );

        let mut profile = fresh;
        profile.update(&frame(), &config).unwrap();
        assert!(profile.missing_dimensions(&config).is_empty());
    }
}
