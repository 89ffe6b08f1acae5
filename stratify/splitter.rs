use super::combine::{Stratifications, combine_strata};
use super::strata::StrataCollection;
use super::{Operation, StratifyError, age, categorical, sex};
use crate::config::MonitorConfig;
use crate::profile::{DataProfile, Dimension};
use polars::prelude::DataFrame;

/// Builds strata once and serves combinations for any operation from them.
///
/// The cache lives as long as the splitter. Call [`DataSplitter::reset`] before
/// splitting a different dataset.
#[derive(Debug, Default)]
pub struct DataSplitter {
    strata: Option<StrataCollection>,
}

impl DataSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns every non-empty pairwise combination of the strata of `data`,
    /// plus `main_{operation}`.
    pub fn split(
        &mut self,
        data: &DataFrame,
        config: &MonitorConfig,
        profile: &DataProfile,
        operation: Operation,
    ) -> Result<Stratifications, StratifyError> {
        if let Some(strata) = &self.strata {
            if strata.height() != data.height() {
                log::warn!(
                    "Cached strata were built from {} rows but the data has {} rows; call reset() before splitting new data",
                    strata.height(),
                    data.height()
                );
            }
            return Ok(combine_strata(strata, data.height(), operation));
        }

        let strata = Self::build_strata(data, config, profile).inspect_err(|e| {
            log::error!("Error splitting data: {e}");
        })?;
        let combined = combine_strata(&strata, data.height(), operation);
        self.strata = Some(strata);
        Ok(combined)
    }

    /// Builds the leaf strata: sex, age, hospital, then instrument type and
    /// patient class when those columns are configured.
    pub fn build_strata(
        data: &DataFrame,
        config: &MonitorConfig,
        profile: &DataProfile,
    ) -> Result<StrataCollection, StratifyError> {
        let columns = &config.columns;
        let mut collection = StrataCollection::new(data.height());

        collection.extend(sex::stratify_sex(
            data,
            &columns.sex,
            profile.known_values(Dimension::Sex),
        )?);
        collection.extend(age::stratify_age(data, &columns.age, &config.age_filtering)?);
        for dimension in [
            Dimension::Hospital,
            Dimension::InstrumentType,
            Dimension::PatientClass,
        ] {
            if let Some(column) = dimension.column(config) {
                collection.extend(categorical::stratify_list(
                    data,
                    column,
                    dimension,
                    profile.known_values(dimension),
                )?);
            }
        }

        log::info!(
            "Built {} strata over {} rows",
            collection.len(),
            collection.height()
        );
        Ok(collection)
    }

    /// Discards the cached strata.
    pub fn reset(&mut self) {
        self.strata = None;
    }

    pub fn cached_strata(&self) -> Option<&StrataCollection> {
        self.strata.as_ref()
    }
}
