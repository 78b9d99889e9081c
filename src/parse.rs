//! # Result-Structure Flattening
//!
//! The engine returns an ordered, name-keyed heterogeneous list whose
//! nesting depth depends on which options were supplied. This module
//! flattens such a list into [`ParsedFields`]: an ordered mapping from
//! field name to a numeric array. Consumers then name-match fields rather
//! than position-match, which keeps them immune to optional entries
//! shifting positions.
//!
//! Flattening rules:
//! - vectors become 1-D arrays (a scalar is a length-1 vector),
//! - matrices become 2-D arrays,
//! - logical values coerce to 0/1, character values are parsed as numbers,
//! - a null entry becomes an empty array — nothing is silently dropped,
//! - nested lists are parsed recursively and merged *unprefixed*; a name
//!   collision across nesting levels is last-write-wins (the later value
//!   replaces the earlier one in place), mirroring the positional
//!   semantics of the engine's own output ordering.

use crate::native::{NativeList, NativeValue, NativeVector};
use ndarray::{Array1, ArrayD, IxDyn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while flattening an engine result.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error(
        "engine result carries {names} names for {values} values; the name attribute must match the element count"
    )]
    NameCardinalityMismatch { names: usize, values: usize },
    #[error("field '{field}' contains the non-numeric value '{value}'")]
    NonNumericField { field: String, value: String },
}

/// An ordered mapping from field name to numeric array, derived once from
/// an engine result and immutable afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParsedFields {
    entries: Vec<(String, ArrayD<f64>)>,
}

impl ParsedFields {
    fn insert(&mut self, name: &str, value: ArrayD<f64>) {
        match self.entries.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((name.to_string(), value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&ArrayD<f64>> {
        self.entries
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f64>)> {
        self.entries
            .iter()
            .map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flatten an engine result list into named numeric arrays.
pub fn parse(list: &NativeList) -> Result<ParsedFields, ParseError> {
    let mut fields = ParsedFields::default();
    flatten_into(list, &mut fields)?;
    Ok(fields)
}

fn flatten_into(list: &NativeList, fields: &mut ParsedFields) -> Result<(), ParseError> {
    if list.names().len() != list.values().len() {
        return Err(ParseError::NameCardinalityMismatch {
            names: list.names().len(),
            values: list.values().len(),
        });
    }
    for (name, value) in list.entries() {
        match value {
            NativeValue::Vector(vector) => {
                fields.insert(name, numeric_values(name, vector)?.into_dyn());
            }
            NativeValue::Matrix(matrix) => {
                fields.insert(name, matrix.values.clone().into_dyn());
            }
            NativeValue::List(inner) => flatten_into(inner, fields)?,
            NativeValue::Null => fields.insert(name, ArrayD::zeros(IxDyn(&[0]))),
        }
    }
    Ok(())
}

fn numeric_values(field: &str, vector: &NativeVector) -> Result<Array1<f64>, ParseError> {
    let values: Vec<f64> = match vector {
        NativeVector::Int(values) => values.iter().map(|&v| f64::from(v)).collect(),
        NativeVector::Real(values) => values.clone(),
        NativeVector::Logical(values) => values.iter().map(|&v| f64::from(u8::from(v))).collect(),
        NativeVector::Character(values) => {
            let mut out = Vec::with_capacity(values.len());
            for value in values {
                let parsed: f64 = value
                    .trim()
                    .parse()
                    .map_err(|_| ParseError::NonNumericField {
                        field: field.to_string(),
                        value: value.clone(),
                    })?;
                out.push(parsed);
            }
            out
        }
    };
    Ok(Array1::from_vec(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::native::NativeMatrix;
    use ndarray::array;

    #[test]
    fn vectors_matrices_and_nulls_flatten_by_name() {
        let mut list = NativeList::new();
        list.push(
            "coef",
            NativeValue::Vector(NativeVector::Real(vec![0.5, -0.2])),
        );
        list.push(
            "var",
            NativeValue::Matrix(NativeMatrix::new(array![[4.0, 0.0], [0.0, 9.0]])),
        );
        list.push("converged", NativeValue::Vector(NativeVector::Logical(vec![true])));
        list.push("call", NativeValue::Null);

        let fields = parse(&list).unwrap();
        assert_eq!(fields.len(), 4);
        assert_eq!(fields.get("coef").unwrap().ndim(), 1);
        assert_eq!(fields.get("var").unwrap().ndim(), 2);
        assert_eq!(fields.get("converged").unwrap()[[0]], 1.0);
        assert!(fields.get("call").unwrap().is_empty());
    }

    #[test]
    fn nested_lists_merge_unprefixed() {
        let mut inner = NativeList::new();
        inner.push("time", NativeValue::Vector(NativeVector::Real(vec![1.0, 2.0])));
        inner.push("est", NativeValue::Vector(NativeVector::Real(vec![0.1, 0.2])));

        let mut list = NativeList::new();
        list.push("group", NativeValue::List(inner));
        list.push("rho", NativeValue::Vector(NativeVector::Int(vec![0])));

        let fields = parse(&list).unwrap();
        assert!(fields.contains("time"));
        assert!(fields.contains("est"));
        assert!(!fields.contains("group"));
        assert_eq!(fields.get("rho").unwrap()[[0]], 0.0);
    }

    #[test]
    fn name_collisions_are_last_write_wins() {
        let mut inner = NativeList::new();
        inner.push("est", NativeValue::Vector(NativeVector::Real(vec![9.0])));

        let mut list = NativeList::new();
        list.push("est", NativeValue::Vector(NativeVector::Real(vec![1.0])));
        list.push("deep", NativeValue::List(inner));

        let fields = parse(&list).unwrap();
        assert_eq!(fields.get("est").unwrap()[[0]], 9.0);
        // The replaced entry keeps its original position.
        assert_eq!(fields.names().collect::<Vec<_>>(), vec!["est"]);
    }

    #[test]
    fn name_cardinality_mismatch_is_rejected() {
        let list = NativeList::from_parts(
            vec!["coef".to_string()],
            vec![
                NativeValue::Vector(NativeVector::Real(vec![1.0])),
                NativeValue::Null,
            ],
        );
        let err = parse(&list).unwrap_err();
        match err {
            ParseError::NameCardinalityMismatch { names, values } => {
                assert_eq!(names, 1);
                assert_eq!(values, 2);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn numeric_text_parses_and_other_text_is_refused() {
        let mut list = NativeList::new();
        list.push(
            "codes",
            NativeValue::Vector(NativeVector::Character(vec![
                "1".to_string(),
                "2.5".to_string(),
            ])),
        );
        let fields = parse(&list).unwrap();
        assert_eq!(fields.get("codes").unwrap()[[1]], 2.5);

        let mut bad = NativeList::new();
        bad.push(
            "codes",
            NativeValue::Vector(NativeVector::Character(vec!["abc".to_string()])),
        );
        let err = parse(&bad).unwrap_err();
        match err {
            ParseError::NonNumericField { field, value } => {
                assert_eq!(field, "codes");
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
