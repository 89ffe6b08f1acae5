//! One stratum per known value of a categorical column.

use super::StratifyError;
use super::strata::{RowSet, Stratum, StratumKind};
use crate::frame;
use crate::profile::Dimension;
use polars::prelude::DataFrame;

/// Strata for `dimension`, one per entry of `known_values`, named by the raw
/// value. Known values absent from the data yield empty strata.
pub fn stratify_list(
    data: &DataFrame,
    column: &str,
    dimension: Dimension,
    known_values: &[String],
) -> Result<Vec<Stratum>, StratifyError> {
    stratify_values(data, column, dimension, known_values, str::to_string)
}

pub(crate) fn stratify_values(
    data: &DataFrame,
    column: &str,
    dimension: Dimension,
    known_values: &[String],
    name_for: impl Fn(&str) -> String,
) -> Result<Vec<Stratum>, StratifyError> {
    if !frame::has_column(data, column) {
        return Err(StratifyError::ColumnNotFound {
            role: dimension.name(),
            column: column.to_string(),
        });
    }
    let values = frame::string_values(data, column)?;

    let strata: Vec<Stratum> = known_values
        .iter()
        .map(|known| {
            let rows = RowSet::from_predicate(&values, |v| v.as_deref() == Some(known.as_str()));
            Stratum::new(name_for(known), StratumKind::from(dimension), rows)
        })
        .collect();

    let coverage = list_coverage(&values, known_values, &strata);
    for name in &coverage.empty {
        log::warn!(
            "No rows with {} '{name}' in column '{column}'; its stratum is empty",
            dimension.name()
        );
    }
    if coverage.unprofiled > 0 {
        log::debug!(
            "{} rows carry {} values missing from the data profile",
            coverage.unprofiled,
            dimension.name()
        );
    }
    Ok(strata)
}

/// Known values without rows, and rows whose value the profile does not know.
#[derive(Debug, Default, PartialEq)]
pub struct ListCoverage {
    pub empty: Vec<String>,
    pub unprofiled: usize,
}

pub(crate) fn list_coverage(
    values: &[Option<String>],
    known_values: &[String],
    strata: &[Stratum],
) -> ListCoverage {
    ListCoverage {
        empty: strata
            .iter()
            .filter(|s| s.rows.is_empty())
            .map(|s| s.name.clone())
            .collect(),
        unprofiled: values
            .iter()
            .flatten()
            .filter(|v| !known_values.iter().any(|k| k == *v))
            .count(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;
    use crate::profile::Dimension;

    fn known(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn one_stratum_per_known_value() {
        let data = df!("hospital" => ["h1", "h2", "h1", "h3"]).unwrap();
        let strata =
            stratify_list(&data, "hospital", Dimension::Hospital, &known(&["h1", "h2", "h9"]))
                .unwrap();
        assert_eq!(strata.len(), 3);
        assert_eq!(strata[0].name, "h1");
        assert_eq!(strata[0].kind, StratumKind::Hospital);
        assert_eq!(strata[0].rows.as_slice(), &[0, 2]);
        assert_eq!(strata[1].rows.as_slice(), &[1]);
        assert!(strata[2].rows.is_empty());
    }

    #[test]
    fn coverage_reports_empty_and_unprofiled_values() {
        let data = df!("hospital" => [Some("h1"), Some("h3"), None, Some("h3")]).unwrap();
        let known = known(&["h1", "h2"]);
        let strata = stratify_list(&data, "hospital", Dimension::Hospital, &known).unwrap();
        let values = frame::string_values(&data, "hospital").unwrap();

        let coverage = list_coverage(&values, &known, &strata);
        assert_eq!(coverage.empty, ["h2"]);
        assert_eq!(coverage.unprofiled, 2);
    }

    #[test]
    fn numeric_codes_match_their_text() {
        let data = df!("site" => [3i64, 4, 3]).unwrap();
        let strata =
            stratify_list(&data, "site", Dimension::Hospital, &known(&["3"])).unwrap();
        assert_eq!(strata[0].rows.as_slice(), &[0, 2]);
    }

    #[test]
    fn missing_column_names_its_role() {
        let data = df!("hospital" => ["h1"]).unwrap();
        let err = stratify_list(&data, "class", Dimension::PatientClass, &known(&["in"]))
            .unwrap_err();
        match err {
            StratifyError::ColumnNotFound { role, column } => {
                assert_eq!(role, "patient_class");
                assert_eq!(column, "class");
            }
            other => panic!("Expected ColumnNotFound, got {other:?}"),
        }
    }
}
