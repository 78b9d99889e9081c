//! # Categorical Covariate Encoding
//!
//! The engine accepts numeric covariates only. This module turns
//! categorical columns into either 0-based integer codes or one-hot
//! indicator columns with an explicit reference level dropped, so the
//! design matrix never carries a perfectly collinear set of indicators.
//!
//! Level order is the column's ascending distinct-value order (type-aware
//! sort), which makes both code assignment and indicator layout
//! deterministic regardless of row order. The default reference level is
//! the *last* distinct level in that order.

use itertools::Itertools;
use polars::prelude::*;
use thiserror::Error;

/// Errors raised during covariate encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("column '{0}' was not found in the covariate table")]
    ColumnNotFound(String),
    #[error(
        "reference level '{level}' is not a value of column '{column}' (levels: [{available}])"
    )]
    InvalidReferenceLevel {
        column: String,
        level: String,
        available: String,
    },
    #[error("missing or null values were found in column '{0}'")]
    MissingValues(String),
    #[error("error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
}

/// A request to treat one column as categorical for a single encoding
/// call. Built, passed to [`encode_categorical`], and discarded.
#[derive(Debug, Clone)]
pub struct CategoricalSpec {
    column: String,
    reference: Option<String>,
}

impl CategoricalSpec {
    pub fn new(column: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            reference: None,
        }
    }

    /// Pin the reference level whose indicator column is dropped. The
    /// level is matched against the text form of the column's values.
    pub fn with_reference(mut self, level: impl Into<String>) -> Self {
        self.reference = Some(level.into());
        self
    }

    pub fn column(&self) -> &str {
        &self.column
    }
}

/// Names of all columns the engine would reject as covariates, in table
/// order. Integer, float, and boolean columns count as numeric.
pub fn non_numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|column| !is_numeric_dtype(column.dtype()))
        .map(|column| column.name().to_string())
        .collect()
}

fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Boolean
    )
}

/// Replace each named column with 0-based integer category codes.
///
/// Codes follow the ascending distinct-value order of the column, so two
/// tables with the same value set encode identically whatever their row
/// order. The input table is not modified.
pub fn to_categorical(df: &DataFrame, columns: &[&str]) -> Result<DataFrame, EncodeError> {
    let mut out = df.clone();
    for &name in columns {
        let (levels, row_labels) = column_levels(df, name)?;
        let codes: Vec<i32> = row_labels
            .iter()
            .map(|label| {
                levels
                    .iter()
                    .position(|level| level == label)
                    .expect("every row label is a level") as i32
            })
            .collect();
        out.with_column(Series::new(name.into(), codes))?;
    }
    log::debug!("encoded {} columns as integer categories", columns.len());
    Ok(out)
}

/// Expand each requested column into one-hot indicator columns.
///
/// For a column with distinct levels `l_1 < .. < l_k`, every level except
/// the reference contributes an indicator column named `"<column>_<level>"`.
/// Indicators are inserted contiguously at the original column's position,
/// in ascending level order; untouched columns keep their positions. The
/// default reference level is the last distinct level in ascending order.
///
/// Encoding disjoint column sets in separate calls commutes: the final
/// column set is the same whichever call runs first.
pub fn encode_categorical(
    df: &DataFrame,
    specs: &[CategoricalSpec],
) -> Result<DataFrame, EncodeError> {
    for spec in specs {
        if df.column(&spec.column).is_err() {
            return Err(EncodeError::ColumnNotFound(spec.column.clone()));
        }
    }

    let mut out_columns: Vec<Column> = Vec::with_capacity(df.width());
    for column in df.get_columns() {
        let name = column.name().as_str();
        let Some(spec) = specs.iter().find(|spec| spec.column == name) else {
            out_columns.push(column.clone());
            continue;
        };

        let (levels, row_labels) = column_levels(df, name)?;
        let reference = match &spec.reference {
            Some(level) => {
                if !levels.contains(level) {
                    return Err(EncodeError::InvalidReferenceLevel {
                        column: name.to_string(),
                        level: level.clone(),
                        available: levels.iter().join(", "),
                    });
                }
                level.clone()
            }
            None => match levels.last() {
                Some(level) => level.clone(),
                // A zero-row column has no levels and expands to nothing.
                None => continue,
            },
        };

        for level in levels.iter().filter(|level| **level != reference) {
            let values: Vec<i32> = row_labels
                .iter()
                .map(|label| i32::from(label == level))
                .collect();
            let indicator = Series::new(format!("{name}_{level}").into(), values);
            out_columns.push(indicator.into());
        }
    }
    Ok(DataFrame::new(out_columns)?)
}

/// Distinct levels of a column in ascending order, plus the per-row level
/// labels. Levels are ordered in the column's own dtype (numerically for
/// numeric and boolean columns, lexicographically for text) and carried
/// as text.
fn column_levels(df: &DataFrame, name: &str) -> Result<(Vec<String>, Vec<String>), EncodeError> {
    let column = df
        .column(name)
        .map_err(|_| EncodeError::ColumnNotFound(name.to_string()))?;
    if column.null_count() > 0 {
        return Err(EncodeError::MissingValues(name.to_string()));
    }
    let row_labels = text_values(column)?;

    let levels = if is_numeric_dtype(column.dtype()) {
        let casted = column.cast(&DataType::Float64)?;
        let keys = casted.f64().expect("casted to f64");
        let mut seen: Vec<(f64, String)> = Vec::new();
        for (key, label) in keys.into_no_null_iter().zip(row_labels.iter()) {
            if !seen.iter().any(|(_, existing)| existing == label) {
                seen.push((key, label.clone()));
            }
        }
        seen.sort_by(|a, b| a.0.total_cmp(&b.0));
        seen.into_iter().map(|(_, label)| label).collect()
    } else {
        let mut labels = row_labels.clone();
        labels.sort();
        labels.dedup();
        labels
    };
    Ok((levels, row_labels))
}

fn text_values(column: &Column) -> Result<Vec<String>, EncodeError> {
    let casted = column.cast(&DataType::String)?;
    let values = casted.str().expect("casted to string");
    Ok(values
        .into_iter()
        .flatten()
        .map(str::to_string)
        .collect())
}
