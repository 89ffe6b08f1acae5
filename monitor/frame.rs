//! Thin helpers over `polars` used by the stratification engine.
//!
//! Strata are row-position sets into one shared `DataFrame`; these helpers read
//! a column into plain Rust values and materialise a row set back into a frame.

use polars::prelude::*;

/// Returns true when `frame` has a column named `name`.
pub fn has_column(frame: &DataFrame, name: &str) -> bool {
    frame
        .get_column_names()
        .iter()
        .any(|column| column.as_str() == name)
}

/// Reads a column as optional strings. Non-string columns are cast, so a
/// numeric hospital code `3` reads as `"3"`.
pub fn string_values(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<String>>> {
    let column = frame.column(name)?;
    let casted = column.cast(&DataType::String)?;
    let chunked = casted.as_materialized_series().str()?;
    Ok(chunked
        .into_iter()
        .map(|value| value.map(str::to_string))
        .collect())
}

/// Reads a column as optional `f64`. Values that cannot be represented are null.
pub fn numeric_values(frame: &DataFrame, name: &str) -> PolarsResult<Vec<Option<f64>>> {
    let column = frame.column(name)?;
    let casted = column.cast(&DataType::Float64)?;
    let chunked = casted.as_materialized_series().f64()?;
    Ok(chunked
        .into_iter()
        .map(|value| value.filter(|v| v.is_finite()))
        .collect())
}

/// Whether a dtype counts as numeric for feature classification.
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Materialises the given row positions of `frame`, preserving their order.
pub fn take_rows(frame: &DataFrame, rows: &[IdxSize]) -> PolarsResult<DataFrame> {
    let indices = IdxCa::from_vec("rows".into(), rows.to_vec());
    frame.take(&indices)
}
