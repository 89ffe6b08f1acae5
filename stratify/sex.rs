use super::StratifyError;
use super::categorical::stratify_values;
use super::strata::Stratum;
use crate::profile::Dimension;
use polars::prelude::DataFrame;

/// Stratum name for a raw sex value: `f`/`m` (any case) become
/// `female`/`male`, anything else is kept verbatim.
pub fn sex_stratum_name(raw: &str) -> String {
    if raw.eq_ignore_ascii_case("f") {
        "female".to_string()
    } else if raw.eq_ignore_ascii_case("m") {
        "male".to_string()
    } else {
        raw.to_string()
    }
}

/// One stratum per profiled sex value. Rows match on the raw value.
pub fn stratify_sex(
    data: &DataFrame,
    column: &str,
    known_values: &[String],
) -> Result<Vec<Stratum>, StratifyError> {
    stratify_values(data, column, Dimension::Sex, known_values, sex_stratum_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::prelude::*;

    #[test]
    fn names_are_normalised() {
        assert_eq!(sex_stratum_name("F"), "female");
        assert_eq!(sex_stratum_name("m"), "male");
        assert_eq!(sex_stratum_name("U"), "U");
    }

    #[test]
    fn filters_on_raw_value() {
        let data = df!("sex" => ["M", "F", "M", "U"]).unwrap();
        let known = vec!["F".to_string(), "M".to_string(), "X".to_string()];
        let strata = stratify_sex(&data, "sex", &known).unwrap();
        let names: Vec<&str> = strata.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["female", "male", "X"]);
        assert_eq!(strata[0].rows.as_slice(), &[1]);
        assert_eq!(strata[1].rows.as_slice(), &[0, 2]);
        assert!(strata[2].rows.is_empty());
    }
}
