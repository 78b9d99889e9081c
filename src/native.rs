//! # Engine-Side Value Model
//!
//! The external statistical engine speaks in strictly-typed vectors, dense
//! numeric matrices, named tables, and ordered name-keyed heterogeneous
//! lists. This module defines owned Rust representations of those values.
//! Conversion from host data lives in [`crate::convert`]; interpretation of
//! engine results lives in [`crate::parse`] and [`crate::summary`].
//!
//! `NativeList` deliberately keeps its `names` and `values` as parallel
//! sequences rather than a map: the engine's name attribute is data, its
//! cardinality is not guaranteed, and validating it is the parser's job.

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while assembling native values.
#[derive(Debug, Error)]
pub enum NativeError {
    #[error("table already contains a column named '{0}'")]
    DuplicateColumn(String),
    #[error("column '{column}' has {found} rows but {expected} were expected")]
    ColumnLengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// A strictly-typed engine vector. Integer storage is 32-bit, matching the
/// engine's own integer vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeVector {
    Int(Vec<i32>),
    Real(Vec<f64>),
    Logical(Vec<bool>),
    Character(Vec<String>),
}

impl NativeVector {
    pub fn len(&self) -> usize {
        match self {
            NativeVector::Int(v) => v.len(),
            NativeVector::Real(v) => v.len(),
            NativeVector::Logical(v) => v.len(),
            NativeVector::Character(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The engine-side kind name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            NativeVector::Int(_) => "integer",
            NativeVector::Real(_) => "real",
            NativeVector::Logical(_) => "logical",
            NativeVector::Character(_) => "character",
        }
    }
}

/// A dense numeric engine matrix with optional dimension names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeMatrix {
    pub values: Array2<f64>,
    pub row_names: Option<Vec<String>>,
    pub col_names: Option<Vec<String>>,
}

impl NativeMatrix {
    pub fn new(values: Array2<f64>) -> Self {
        Self {
            values,
            row_names: None,
            col_names: None,
        }
    }

    pub fn with_col_names(mut self, names: Vec<String>) -> Self {
        self.col_names = Some(names);
        self
    }

    pub fn with_row_names(mut self, names: Vec<String>) -> Self {
        self.row_names = Some(names);
        self
    }

    pub fn nrows(&self) -> usize {
        self.values.nrows()
    }

    pub fn ncols(&self) -> usize {
        self.values.ncols()
    }
}

/// An ordered engine table: uniquely named columns of equal length.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeTable {
    columns: Vec<(String, NativeVector)>,
}

impl NativeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from named columns, enforcing unique names and equal
    /// lengths.
    pub fn from_columns(columns: Vec<(String, NativeVector)>) -> Result<Self, NativeError> {
        let mut table = Self::new();
        for (name, vector) in columns {
            table.push_column(name, vector)?;
        }
        Ok(table)
    }

    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        vector: NativeVector,
    ) -> Result<(), NativeError> {
        let name = name.into();
        if self.columns.iter().any(|(existing, _)| *existing == name) {
            return Err(NativeError::DuplicateColumn(name));
        }
        if let Some((_, first)) = self.columns.first()
            && first.len() != vector.len()
        {
            return Err(NativeError::ColumnLengthMismatch {
                column: name,
                expected: first.len(),
                found: vector.len(),
            });
        }
        self.columns.push((name, vector));
        Ok(())
    }

    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    pub fn nrows(&self) -> usize {
        self.columns.first().map_or(0, |(_, v)| v.len())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|(name, _)| name.as_str())
    }

    pub fn columns(&self) -> &[(String, NativeVector)] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&NativeVector> {
        self.columns
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, vector)| vector)
    }
}

/// One element of a heterogeneous engine list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NativeValue {
    Vector(NativeVector),
    Matrix(NativeMatrix),
    List(NativeList),
    Null,
}

/// An ordered, name-keyed heterogeneous collection — the shape of every
/// result the engine returns.
///
/// Names are not guaranteed unique, and `from_parts` does not require the
/// two sequences to pair up; [`crate::parse::parse`] validates cardinality
/// before any interpretation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NativeList {
    names: Vec<String>,
    values: Vec<NativeValue>,
}

impl NativeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assemble a list from already-separated names and values. No pairing
    /// invariant is enforced here; a malformed engine result must be
    /// representable so the parser can reject it.
    pub fn from_parts(names: Vec<String>, values: Vec<NativeValue>) -> Self {
        Self { names, values }
    }

    pub fn push(&mut self, name: impl Into<String>, value: NativeValue) {
        self.names.push(name.into());
        self.values.push(value);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn values(&self) -> &[NativeValue] {
        &self.values
    }

    /// First entry with the given name, if any.
    pub fn get(&self, name: &str) -> Option<&NativeValue> {
        self.names
            .iter()
            .position(|existing| existing == name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Paired iteration over entries. Only meaningful once the parser has
    /// confirmed the name/value cardinality.
    pub fn entries(&self) -> impl Iterator<Item = (&str, &NativeValue)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }
}
