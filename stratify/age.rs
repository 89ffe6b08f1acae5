//! Age band stratification.
//!
//! Three policies are supported. `default` uses fixed clinical bands,
//! `statistical` cuts the observed ages into tertiles and `custom` uses ranges
//! from the config. If the selected policy cannot produce bands the default
//! bands are used instead.

use super::StratifyError;
use super::strata::{RowSet, Stratum, StratumKind};
use crate::config::{AgeFiltering, AgeRange};
use crate::frame;
use polars::prelude::DataFrame;
use thiserror::Error;

/// Selected by `age_filtering.filter_type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgePolicy {
    Default,
    Statistical,
    Custom,
}

impl AgePolicy {
    /// Unknown names select the default bands.
    pub fn from_name(name: &str) -> Self {
        match name {
            "statistical" => Self::Statistical,
            "custom" => Self::Custom,
            _ => Self::Default,
        }
    }
}

/// Reasons a non-default policy cannot produce bands.
#[derive(Error, Debug, PartialEq)]
pub enum AgeBandError {
    #[error("statistical bands need at least 3 non-null ages, found {0}")]
    TooFewAges(usize),
    #[error("custom age filtering selected but no custom_ranges are configured")]
    MissingCustomRanges,
}

/// Builds the age strata of `data` under the configured policy.
pub fn stratify_age(
    data: &DataFrame,
    column: &str,
    filtering: &AgeFiltering,
) -> Result<Vec<Stratum>, StratifyError> {
    if !frame::has_column(data, column) {
        return Err(StratifyError::ColumnNotFound {
            role: "age",
            column: column.to_string(),
        });
    }
    let ages = frame::numeric_values(data, column)?;

    let bands = match AgePolicy::from_name(&filtering.filter_type) {
        AgePolicy::Default => Ok(default_bands(&ages)),
        AgePolicy::Statistical => statistical_bands(&ages),
        AgePolicy::Custom => custom_bands(&ages, filtering.custom_ranges.as_deref()),
    };
    Ok(bands.unwrap_or_else(|e| {
        log::debug!("Falling back to default age bands: {e}");
        default_bands(&ages)
    }))
}

/// `[0-18]` below 18, `[18-65]` from 18 to 65 inclusive, `[65+]` above 65.
pub fn default_bands(ages: &[Option<f64>]) -> Vec<Stratum> {
    vec![
        band("[0-18]", ages, |age| age < 18.0),
        band("[18-65]", ages, |age| (18.0..=65.0).contains(&age)),
        band("[65+]", ages, |age| age > 65.0),
    ]
}

/// Tertile bands over the sorted non-null ages. With `t = n / 3` the first
/// cutoff is the `t`-th smallest age and the second the `2t`-th smallest.
pub fn statistical_bands(ages: &[Option<f64>]) -> Result<Vec<Stratum>, AgeBandError> {
    let mut sorted: Vec<f64> = ages.iter().flatten().copied().collect();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    let t = n / 3;
    if t == 0 {
        return Err(AgeBandError::TooFewAges(n));
    }
    let (min, max) = (sorted[0], sorted[n - 1]);
    let (low, high) = (sorted[t - 1], sorted[2 * t - 1]);

    Ok(vec![
        band(
            &format!("[{}-{}]", format_bound(min), format_bound(low)),
            ages,
            |age| age <= low,
        ),
        band(
            &format!("({}-{}]", format_bound(low), format_bound(high)),
            ages,
            |age| age > low && age <= high,
        ),
        band(
            &format!("({}-{}]", format_bound(high), format_bound(max)),
            ages,
            |age| age > high,
        ),
    ])
}

/// One inclusive band per configured range. Overlaps and gaps are reported,
/// never corrected.
pub fn custom_bands(
    ages: &[Option<f64>],
    ranges: Option<&[AgeRange]>,
) -> Result<Vec<Stratum>, AgeBandError> {
    let ranges = ranges.ok_or(AgeBandError::MissingCustomRanges)?;
    let strata: Vec<Stratum> = ranges
        .iter()
        .map(|range| {
            let (lo, hi) = (range.min, range.max);
            band(
                &format!("[{}-{}]", format_bound(lo), format_bound(hi)),
                ages,
                |age| age >= lo && age <= hi,
            )
        })
        .collect();
    range_coverage(ages, ranges, &strata).warn();
    Ok(strata)
}

/// How custom bands fit the ages they were cut from.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCoverage {
    /// Smallest and largest non-null age.
    pub observed: Option<(f64, f64)>,
    /// Bands whose configured bounds reach past the observed ages.
    pub beyond_observed: Vec<String>,
    /// Band memberships summed over all bands.
    pub covered: usize,
    pub rows: usize,
}

impl RangeCoverage {
    /// Overlaps and gaps can cancel out; only the totals are compared.
    pub fn matches_rows(&self) -> bool {
        self.covered == self.rows
    }

    fn warn(&self) {
        if let Some((lo, hi)) = self.observed {
            for name in &self.beyond_observed {
                log::warn!(
                    "Age range {name} extends beyond the observed ages [{}-{}]",
                    format_bound(lo),
                    format_bound(hi)
                );
            }
        }
        if !self.matches_rows() {
            log::warn!(
                "Custom age ranges cover {} rows but the dataset has {} rows; ranges overlap or leave gaps",
                self.covered,
                self.rows
            );
        }
    }
}

/// Checks `strata`, built one per entry of `ranges`, against `ages`.
pub fn range_coverage(ages: &[Option<f64>], ranges: &[AgeRange], strata: &[Stratum]) -> RangeCoverage {
    let observed = ages.iter().flatten().copied().fold(None, |acc, age| match acc {
        None => Some((age, age)),
        Some((lo, hi)) => Some((f64::min(lo, age), f64::max(hi, age))),
    });
    let beyond_observed = ranges
        .iter()
        .zip(strata)
        .filter(|(range, _)| observed.is_some_and(|(lo, hi)| range.min < lo || range.max > hi))
        .map(|(_, stratum)| stratum.name.clone())
        .collect();
    RangeCoverage {
        observed,
        beyond_observed,
        covered: strata.iter().map(|s| s.rows.len()).sum(),
        rows: ages.len(),
    }
}

/// Renders a band bound, dropping the fractional part of integral values.
pub fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{value}")
    }
}

fn band(name: &str, ages: &[Option<f64>], keep: impl Fn(f64) -> bool) -> Stratum {
    let rows = RowSet::from_predicate(ages, |age| age.is_some_and(&keep));
    Stratum::new(name, StratumKind::Age, rows)
}
