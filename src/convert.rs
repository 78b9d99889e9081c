//! # Type-Dispatching Conversion Boundary
//!
//! The single place where host data becomes engine data and back. Vector
//! conversion dispatches once on the [`HostArray`] tag; tabular conversion
//! dispatches per column on the Polars dtype. Each conversion is
//! all-or-nothing: one offending column fails the whole table call with the
//! column named, and nothing partial ever reaches the engine.
//!
//! Every failure here is a deterministic function of the input. There is
//! nothing to retry.

use crate::data::HostArray;
use crate::native::{NativeError, NativeMatrix, NativeTable, NativeVector};
use ndarray::{Array2, ArrayD};
use polars::prelude::*;
use rayon::prelude::*;
use thiserror::Error;

/// Errors raised while crossing the host/engine boundary.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("input array has rank {found} and must have rank {expected}")]
    Dimension { expected: usize, found: usize },
    #[error("cannot convert elements of type '{0}' to any engine vector kind")]
    UnsupportedDtype(String),
    #[error(
        "integer value {value} at position {index} does not fit the engine's 32-bit integer storage"
    )]
    IntegerOverflow { index: usize, value: i64 },
    #[error("column '{column}' has unsupported dtype '{dtype}' for engine conversion")]
    UnsupportedColumn { column: String, dtype: String },
    #[error("missing or null values were found in column '{0}'; the engine requires complete data")]
    MissingValues(String),
    #[error("table assembly failed: {0}")]
    Table(#[from] NativeError),
    #[error("error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
}

/// Convert a 1-D host array into the matching engine vector.
///
/// Dispatch order: integer, float, boolean, string. The mixed-element text
/// probe runs last — it is O(n) over the elements and only worth paying
/// once every primitive tag has been ruled out.
pub fn vector_to_native(array: &HostArray) -> Result<NativeVector, ConvertError> {
    if array.ndim() != 1 {
        return Err(ConvertError::Dimension {
            expected: 1,
            found: array.ndim(),
        });
    }
    match array {
        HostArray::Int(values) => {
            let mut out = Vec::with_capacity(values.len());
            for (index, &value) in values.iter().enumerate() {
                let narrowed = i32::try_from(value)
                    .map_err(|_| ConvertError::IntegerOverflow { index, value })?;
                out.push(narrowed);
            }
            Ok(NativeVector::Int(out))
        }
        HostArray::Float(values) => Ok(NativeVector::Real(values.iter().copied().collect())),
        HostArray::Bool(values) => Ok(NativeVector::Logical(values.iter().copied().collect())),
        HostArray::Str(values) => Ok(NativeVector::Character(values.iter().cloned().collect())),
        HostArray::Mixed(values) => {
            let mut out = Vec::with_capacity(values.len());
            for datum in values.iter() {
                match datum.text() {
                    Some(text) => out.push(text),
                    None => {
                        return Err(ConvertError::UnsupportedDtype(
                            datum.type_label().to_string(),
                        ));
                    }
                }
            }
            Ok(NativeVector::Character(out))
        }
    }
}

/// Convert an engine vector back into a 1-D host array.
pub fn native_to_vector(vector: &NativeVector) -> HostArray {
    match vector {
        NativeVector::Int(values) => {
            HostArray::from(values.iter().map(|&v| i64::from(v)).collect::<Vec<_>>())
        }
        NativeVector::Real(values) => HostArray::from(values.clone()),
        NativeVector::Logical(values) => HostArray::from(values.clone()),
        NativeVector::Character(values) => HostArray::from(values.clone()),
    }
}

/// Convert a 2-D numeric array into an engine matrix. When no column names
/// are supplied, `x_1..x_n` are generated.
pub fn matrix_to_native(
    values: &ArrayD<f64>,
    col_names: Option<Vec<String>>,
) -> Result<NativeMatrix, ConvertError> {
    if values.ndim() != 2 {
        return Err(ConvertError::Dimension {
            expected: 2,
            found: values.ndim(),
        });
    }
    let matrix: Array2<f64> = values
        .clone()
        .into_dimensionality()
        .expect("rank checked above");
    let names = col_names
        .unwrap_or_else(|| (1..=matrix.ncols()).map(|i| format!("x_{i}")).collect());
    Ok(NativeMatrix::new(matrix).with_col_names(names))
}

/// Convert a mixed-type host table into an engine table.
///
/// Columns convert independently and in parallel; the output preserves the
/// input column order and names exactly.
pub fn table_to_native(df: &DataFrame) -> Result<NativeTable, ConvertError> {
    let converted: Vec<(String, NativeVector)> = df
        .get_columns()
        .par_iter()
        .map(|column| {
            let name = column.name().to_string();
            let vector = column_to_native(column)?;
            Ok((name, vector))
        })
        .collect::<Result<_, ConvertError>>()?;
    log::debug!(
        "converted table with {} columns x {} rows for the engine",
        df.width(),
        df.height()
    );
    Ok(NativeTable::from_columns(converted)?)
}

/// Convert an engine table back into a host table.
pub fn native_to_table(table: &NativeTable) -> Result<DataFrame, ConvertError> {
    let mut columns: Vec<Column> = Vec::with_capacity(table.ncols());
    for (name, vector) in table.columns() {
        let series = match vector {
            NativeVector::Int(values) => Series::new(name.as_str().into(), values.clone()),
            NativeVector::Real(values) => Series::new(name.as_str().into(), values.clone()),
            NativeVector::Logical(values) => Series::new(name.as_str().into(), values.clone()),
            NativeVector::Character(values) => Series::new(name.as_str().into(), values.clone()),
        };
        columns.push(series.into());
    }
    Ok(DataFrame::new(columns)?)
}

fn column_to_native(column: &Column) -> Result<NativeVector, ConvertError> {
    let name = column.name().as_str();
    if column.null_count() > 0 {
        return Err(ConvertError::MissingValues(name.to_string()));
    }
    match column.dtype() {
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => {
            let casted =
                column
                    .cast(&DataType::Int64)
                    .map_err(|_| ConvertError::UnsupportedColumn {
                        column: name.to_string(),
                        dtype: column.dtype().to_string(),
                    })?;
            let values = casted.i64().expect("casted to i64");
            let mut out = Vec::with_capacity(values.len());
            for (index, value) in values.into_no_null_iter().enumerate() {
                let narrowed = i32::try_from(value)
                    .map_err(|_| ConvertError::IntegerOverflow { index, value })?;
                out.push(narrowed);
            }
            Ok(NativeVector::Int(out))
        }
        DataType::Float32 | DataType::Float64 => {
            let casted = column.cast(&DataType::Float64)?;
            let values = casted.f64().expect("casted to f64");
            Ok(NativeVector::Real(values.into_no_null_iter().collect()))
        }
        DataType::Boolean => {
            let values = column.bool()?;
            Ok(NativeVector::Logical(values.into_no_null_iter().collect()))
        }
        DataType::String => {
            let values = column.str()?;
            Ok(NativeVector::Character(
                values.into_iter().flatten().map(str::to_string).collect(),
            ))
        }
        other => Err(ConvertError::UnsupportedColumn {
            column: name.to_string(),
            dtype: other.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Datum;
    use ndarray::array;

    #[test]
    fn int_float_bool_vectors_round_trip() {
        for array in [
            HostArray::from(vec![1i64, 2, 3]),
            HostArray::from(vec![1.1, 2.1, 3.1]),
            HostArray::from(vec![true, false, false]),
        ] {
            let native = vector_to_native(&array).unwrap();
            assert_eq!(native_to_vector(&native), array);
        }
    }

    #[test]
    fn string_vectors_round_trip() {
        let array = HostArray::from(vec!["1", "2", "3"]);
        let native = vector_to_native(&array).unwrap();
        assert_eq!(native.kind(), "character");
        assert_eq!(native_to_vector(&native), array);
    }

    #[test]
    fn mixed_text_coercible_array_becomes_character() {
        let array = HostArray::from(vec![
            Datum::Int(1),
            Datum::Str("a".to_string()),
            Datum::Float(2.4),
        ]);
        let native = vector_to_native(&array).unwrap();
        match native {
            NativeVector::Character(values) => {
                assert_eq!(values, vec!["1", "a", "2.4"]);
            }
            other => panic!("expected character vector, got {other:?}"),
        }
    }

    #[test]
    fn mixed_array_with_opaque_element_is_rejected() {
        let array = HostArray::from(vec![
            Datum::Int(1),
            Datum::Str("a".to_string()),
            Datum::Opaque("MyInt".to_string()),
        ]);
        let err = vector_to_native(&array).unwrap_err();
        match err {
            ConvertError::UnsupportedDtype(label) => assert_eq!(label, "MyInt"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn two_dimensional_input_is_rejected_regardless_of_dtype() {
        for array in [
            HostArray::from(array![[1i64, 2], [3, 4]]),
            HostArray::from(array![[1.0, 2.0], [3.0, 4.0]]),
        ] {
            let err = vector_to_native(&array).unwrap_err();
            match err {
                ConvertError::Dimension { expected, found } => {
                    assert_eq!(expected, 1);
                    assert_eq!(found, 2);
                }
                other => panic!("unexpected error: {other:?}"),
            }
        }
    }

    #[test]
    fn integer_overflow_is_reported_with_position() {
        let array = HostArray::from(vec![1i64, i64::from(i32::MAX) + 1]);
        let err = vector_to_native(&array).unwrap_err();
        match err {
            ConvertError::IntegerOverflow { index, value } => {
                assert_eq!(index, 1);
                assert_eq!(value, i64::from(i32::MAX) + 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn matrix_conversion_generates_default_column_names() {
        let values = array![[1.0, 2.0], [3.0, 4.0]].into_dyn();
        let matrix = matrix_to_native(&values, None).unwrap();
        assert_eq!(
            matrix.col_names.as_deref(),
            Some(["x_1".to_string(), "x_2".to_string()].as_slice())
        );

        let vector = array![1.0, 2.0].into_dyn();
        let err = matrix_to_native(&vector, None).unwrap_err();
        assert!(matches!(
            err,
            ConvertError::Dimension {
                expected: 2,
                found: 1
            }
        ));
    }

    fn sample_dataframe() -> DataFrame {
        DataFrame::new(vec![
            Series::new("a".into(), vec![1i64, 2, 3]).into(),
            Series::new("b".into(), vec![1.1, 2.2, 3.3]).into(),
            Series::new("c".into(), vec!["r", "s", "t"]).into(),
            Series::new("d".into(), vec![true, false, true]).into(),
        ])
        .expect("construct sample dataframe")
    }

    #[test]
    fn table_conversion_preserves_order_and_types() {
        let df = sample_dataframe();
        let table = table_to_native(&df).unwrap();
        assert_eq!(
            table.names().collect::<Vec<_>>(),
            vec!["a", "b", "c", "d"]
        );
        assert_eq!(table.column("a").unwrap().kind(), "integer");
        assert_eq!(table.column("b").unwrap().kind(), "real");
        assert_eq!(table.column("c").unwrap().kind(), "character");
        assert_eq!(table.column("d").unwrap().kind(), "logical");
        assert_eq!(table.nrows(), 3);
    }

    #[test]
    fn table_round_trips_through_the_engine_representation() {
        let df = sample_dataframe();
        let back = native_to_table(&table_to_native(&df).unwrap()).unwrap();
        assert_eq!(
            back.get_column_names()
                .iter()
                .map(|name| name.as_str())
                .collect::<Vec<_>>(),
            vec!["a", "b", "c", "d"]
        );
        assert_eq!(back.height(), 3);
        let b = back.column("b").unwrap().f64().unwrap();
        assert_eq!(b.into_no_null_iter().collect::<Vec<_>>(), vec![1.1, 2.2, 3.3]);
    }

    #[test]
    fn unsupported_column_dtype_names_the_column() {
        let nested = Series::new(
            "nested".into(),
            [
                Series::new("".into(), vec![1i64, 2]),
                Series::new("".into(), vec![3i64]),
            ],
        );
        let df = DataFrame::new(vec![
            Series::new("ok".into(), vec![1.0, 2.0]).into(),
            nested.into(),
        ])
        .unwrap();
        let err = table_to_native(&df).unwrap_err();
        match err {
            ConvertError::UnsupportedColumn { column, .. } => assert_eq!(column, "nested"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
