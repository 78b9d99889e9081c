//! # Host-Side Dynamic Arrays
//!
//! Callers hand this crate loosely-typed numeric or textual arrays. All of
//! that dynamism is captured once, here, as a closed tagged union over
//! `ndarray` storage: every downstream component dispatches on the
//! [`HostArray`] tag and never re-inspects element types ad hoc.
//!
//! The `Mixed` variant models arrays whose elements do not share a
//! primitive type (the host analogue of an object array). Its elements are
//! [`Datum`] values; a `Datum::Opaque` element is one with no canonical
//! text form, which makes the whole array unconvertible.

use ndarray::{Array1, Array2, ArrayD};
use serde::{Deserialize, Serialize};

/// A dynamically-typed scalar inside a [`HostArray::Mixed`] array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Datum {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    /// A host value with no canonical text form. The payload labels its
    /// type for error reporting.
    Opaque(String),
}

impl Datum {
    /// Canonical text form of the value, if one exists.
    pub fn text(&self) -> Option<String> {
        match self {
            Datum::Int(v) => Some(v.to_string()),
            Datum::Float(v) => Some(v.to_string()),
            Datum::Bool(v) => Some(v.to_string()),
            Datum::Str(v) => Some(v.clone()),
            Datum::Opaque(_) => None,
        }
    }

    pub fn type_label(&self) -> &str {
        match self {
            Datum::Int(_) => "integer",
            Datum::Float(_) => "float",
            Datum::Bool(_) => "boolean",
            Datum::Str(_) => "string",
            Datum::Opaque(label) => label.as_str(),
        }
    }
}

/// A host array tagged with its element type. Rank is dynamic; the
/// conversion boundary enforces the rank its contract demands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HostArray {
    Int(ArrayD<i64>),
    Float(ArrayD<f64>),
    Bool(ArrayD<bool>),
    Str(ArrayD<String>),
    Mixed(ArrayD<Datum>),
}

impl HostArray {
    pub fn ndim(&self) -> usize {
        match self {
            HostArray::Int(a) => a.ndim(),
            HostArray::Float(a) => a.ndim(),
            HostArray::Bool(a) => a.ndim(),
            HostArray::Str(a) => a.ndim(),
            HostArray::Mixed(a) => a.ndim(),
        }
    }

    /// Total number of elements, regardless of rank.
    pub fn len(&self) -> usize {
        match self {
            HostArray::Int(a) => a.len(),
            HostArray::Float(a) => a.len(),
            HostArray::Bool(a) => a.len(),
            HostArray::Str(a) => a.len(),
            HostArray::Mixed(a) => a.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tag name, used in diagnostics.
    pub fn dtype(&self) -> &'static str {
        match self {
            HostArray::Int(_) => "integer",
            HostArray::Float(_) => "float",
            HostArray::Bool(_) => "boolean",
            HostArray::Str(_) => "string",
            HostArray::Mixed(_) => "mixed",
        }
    }
}

impl From<Array1<i64>> for HostArray {
    fn from(array: Array1<i64>) -> Self {
        HostArray::Int(array.into_dyn())
    }
}

impl From<Array1<f64>> for HostArray {
    fn from(array: Array1<f64>) -> Self {
        HostArray::Float(array.into_dyn())
    }
}

impl From<Array1<bool>> for HostArray {
    fn from(array: Array1<bool>) -> Self {
        HostArray::Bool(array.into_dyn())
    }
}

impl From<Array1<String>> for HostArray {
    fn from(array: Array1<String>) -> Self {
        HostArray::Str(array.into_dyn())
    }
}

impl From<Array2<i64>> for HostArray {
    fn from(array: Array2<i64>) -> Self {
        HostArray::Int(array.into_dyn())
    }
}

impl From<Array2<f64>> for HostArray {
    fn from(array: Array2<f64>) -> Self {
        HostArray::Float(array.into_dyn())
    }
}

impl From<Vec<i64>> for HostArray {
    fn from(values: Vec<i64>) -> Self {
        Array1::from_vec(values).into()
    }
}

impl From<Vec<f64>> for HostArray {
    fn from(values: Vec<f64>) -> Self {
        Array1::from_vec(values).into()
    }
}

impl From<Vec<bool>> for HostArray {
    fn from(values: Vec<bool>) -> Self {
        Array1::from_vec(values).into()
    }
}

impl From<Vec<String>> for HostArray {
    fn from(values: Vec<String>) -> Self {
        Array1::from_vec(values).into()
    }
}

impl From<Vec<&str>> for HostArray {
    fn from(values: Vec<&str>) -> Self {
        Array1::from_vec(values.into_iter().map(str::to_string).collect()).into()
    }
}

impl From<Vec<Datum>> for HostArray {
    fn from(values: Vec<Datum>) -> Self {
        HostArray::Mixed(Array1::from_vec(values).into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn rank_and_length_follow_storage() {
        let vector = HostArray::from(vec![1.0, 2.0, 3.0]);
        assert_eq!(vector.ndim(), 1);
        assert_eq!(vector.len(), 3);

        let matrix = HostArray::from(array![[1.0, 2.0], [3.0, 4.0]]);
        assert_eq!(matrix.ndim(), 2);
        assert_eq!(matrix.len(), 4);
        assert_eq!(matrix.dtype(), "float");
    }

    #[test]
    fn opaque_datum_has_no_text_form() {
        assert_eq!(Datum::Int(1).text().as_deref(), Some("1"));
        assert_eq!(Datum::Float(2.4).text().as_deref(), Some("2.4"));
        assert_eq!(Datum::Bool(true).text().as_deref(), Some("true"));
        assert!(Datum::Opaque("MyInt".to_string()).text().is_none());
    }
}
