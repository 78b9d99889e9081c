//! # Typed Result Summaries
//!
//! Interpretation of parsed engine output. Two result types share one
//! derivation pattern: every derived statistic is computed eagerly at
//! construction from the parsed fields, the object is immutable
//! afterwards, and nothing is ever recomputed lazily.
//!
//! [`CrrResult`] covers the regression fit: coefficients, covariance,
//! standard errors, two-sided Wald p-values, and hazard ratios with
//! confidence intervals. [`CumincResult`] covers cumulative incidence:
//! one [`IncidenceGroup`] curve per composite group label, plus the
//! cross-group test table when a comparison was requested.
//!
//! Field extraction is schema-aware and name-matched. A missing or
//! ill-shaped field is a loud, typed error; this layer never copes with
//! an unexpected result shape, because coping here would corrupt every
//! statistic downstream.

use crate::native::{NativeList, NativeValue};
use crate::parse::{ParseError, ParsedFields, parse};
use crate::stats;
use ndarray::{Array1, Array2, Ix1, Ix2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Confidence level used for the eagerly-derived hazard-ratio bounds.
pub const DEFAULT_CONFIDENCE_LEVEL: f64 = 0.95;

/// Name of the engine's cross-group statistics entry, which is never a
/// curve group.
const TESTS_ENTRY: &str = "Tests";

/// Errors raised while interpreting a parsed engine result.
#[derive(Debug, Error)]
pub enum SummaryError {
    #[error("the engine result is missing the required field '{0}'")]
    MissingField(String),
    #[error("field '{field}' has rank {found} but rank {expected} was expected")]
    FieldRank {
        field: String,
        expected: usize,
        found: usize,
    },
    #[error("covariance matrix is {rows}x{cols} but {coefficients} coefficients were estimated")]
    CovarianceShape {
        rows: usize,
        cols: usize,
        coefficients: usize,
    },
    #[error("{names} covariate names were supplied for {coefficients} coefficients")]
    NameCardinality { names: usize, coefficients: usize },
    #[error(
        "standard error of '{covariate}' (index {index}) is zero; the two-sided Wald p-value is undefined"
    )]
    DegenerateStandardError { covariate: String, index: usize },
    #[error("negative variance {value} at index {index} of '{label}'")]
    NegativeVariance {
        label: String,
        index: usize,
        value: f64,
    },
    #[error("group '{0}': fields time/est/var have mismatched lengths")]
    GroupLengthMismatch(String),
    #[error("group entry '{0}' is not a nested result list")]
    GroupShape(String),
    #[error("the cross-group statistics block is malformed: {0}")]
    MalformedTests(String),
    #[error(transparent)]
    InvalidConfidenceLevel(#[from] stats::InvalidConfidenceLevel),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("error from the underlying Polars library: {0}")]
    Polars(#[from] PolarsError),
}

/// Hazard ratios with their confidence bounds at one confidence level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardRatios {
    pub ratio: Array1<f64>,
    pub lower: Array1<f64>,
    pub upper: Array1<f64>,
    pub level: f64,
}

/// The fitted competing-risks regression, fully derived.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrrResult {
    raw: NativeList,
    fields: ParsedFields,
    names: Vec<String>,
    coefficients: Array1<f64>,
    covariance: Array2<f64>,
    std_errors: Array1<f64>,
    p_values: Array1<f64>,
    hazard_ratios: HazardRatios,
    converged: Option<bool>,
    log_likelihood: Option<f64>,
    unique_failure_times: Option<Array1<f64>>,
}

impl CrrResult {
    /// Interpret a raw engine fit result. `covariate_names` is the column
    /// order of the submitted covariate table; the engine reports
    /// coefficients in that order and this layer preserves it end-to-end.
    pub fn from_engine(raw: NativeList, covariate_names: Vec<String>) -> Result<Self, SummaryError> {
        let fields = parse(&raw)?;

        let coefficients = required_1d(&fields, "coef")?;
        let covariance = required_2d(&fields, "var")?;
        let n = coefficients.len();
        if covariance.nrows() != n || covariance.ncols() != n {
            return Err(SummaryError::CovarianceShape {
                rows: covariance.nrows(),
                cols: covariance.ncols(),
                coefficients: n,
            });
        }
        if covariate_names.len() != n {
            return Err(SummaryError::NameCardinality {
                names: covariate_names.len(),
                coefficients: n,
            });
        }

        let mut std_errors = Array1::zeros(n);
        for (index, &variance) in covariance.diag().iter().enumerate() {
            if variance < 0.0 {
                return Err(SummaryError::NegativeVariance {
                    label: covariate_names[index].clone(),
                    index,
                    value: variance,
                });
            }
            std_errors[index] = variance.sqrt();
        }

        let mut p_values = Array1::zeros(n);
        for index in 0..n {
            if std_errors[index] == 0.0 {
                return Err(SummaryError::DegenerateStandardError {
                    covariate: covariate_names[index].clone(),
                    index,
                });
            }
            p_values[index] = stats::two_sided_p(coefficients[index] / std_errors[index]);
        }

        let hazard_ratios =
            derive_hazard_ratios(&coefficients, &std_errors, DEFAULT_CONFIDENCE_LEVEL)?;

        let converged = scalar_field(&fields, "converged").map(|value| value != 0.0);
        let log_likelihood = scalar_field(&fields, "loglik");
        let unique_failure_times = match fields.get("uftime") {
            Some(_) => Some(required_1d(&fields, "uftime")?),
            None => None,
        };
        log::debug!(
            "interpreted regression fit: {n} coefficients, converged = {converged:?}"
        );

        Ok(Self {
            raw,
            fields,
            names: covariate_names,
            coefficients,
            covariance,
            std_errors,
            p_values,
            hazard_ratios,
            converged,
            log_likelihood,
            unique_failure_times,
        })
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn coefficients(&self) -> &Array1<f64> {
        &self.coefficients
    }

    pub fn covariance(&self) -> &Array2<f64> {
        &self.covariance
    }

    pub fn std_errors(&self) -> &Array1<f64> {
        &self.std_errors
    }

    pub fn p_values(&self) -> &Array1<f64> {
        &self.p_values
    }

    /// Hazard ratios with bounds at [`DEFAULT_CONFIDENCE_LEVEL`].
    pub fn hazard_ratios(&self) -> &HazardRatios {
        &self.hazard_ratios
    }

    /// Hazard ratios with bounds at an arbitrary confidence level in
    /// (0, 1).
    pub fn hazard_ratios_at(&self, level: f64) -> Result<HazardRatios, SummaryError> {
        derive_hazard_ratios(&self.coefficients, &self.std_errors, level)
    }

    pub fn converged(&self) -> Option<bool> {
        self.converged
    }

    pub fn log_likelihood(&self) -> Option<f64> {
        self.log_likelihood
    }

    pub fn unique_failure_times(&self) -> Option<&Array1<f64>> {
        self.unique_failure_times.as_ref()
    }

    /// Every parsed field, for callers that need more than the summary.
    pub fn fields(&self) -> &ParsedFields {
        &self.fields
    }

    /// The untouched engine result.
    pub fn raw(&self) -> &NativeList {
        &self.raw
    }

    /// Tabular summary indexed by covariate name, in the engine's
    /// coefficient order. The order is significant and never re-sorted.
    pub fn summary(&self) -> Result<DataFrame, SummaryError> {
        let df = DataFrame::new(vec![
            Series::new("covariate".into(), self.names.clone()).into(),
            Series::new("coefficient".into(), self.coefficients.to_vec()).into(),
            Series::new("std_error".into(), self.std_errors.to_vec()).into(),
            Series::new("hazard_ratio".into(), self.hazard_ratios.ratio.to_vec()).into(),
            Series::new("hr_lower".into(), self.hazard_ratios.lower.to_vec()).into(),
            Series::new("hr_upper".into(), self.hazard_ratios.upper.to_vec()).into(),
            Series::new("p_value".into(), self.p_values.to_vec()).into(),
        ])?;
        Ok(df)
    }
}

fn derive_hazard_ratios(
    coefficients: &Array1<f64>,
    std_errors: &Array1<f64>,
    level: f64,
) -> Result<HazardRatios, SummaryError> {
    let (z_lo, z_hi) = stats::confidence_z_bounds(level)?;
    let ratio = coefficients.mapv(f64::exp);
    let lower = (coefficients + &(std_errors * z_lo)).mapv(f64::exp);
    let upper = (coefficients + &(std_errors * z_hi)).mapv(f64::exp);
    Ok(HazardRatios {
        ratio,
        lower,
        upper,
        level,
    })
}

/// One estimated cumulative-incidence curve. The confidence band is the
/// estimator's conventional fixed ±2-standard-deviation envelope — not the
/// configurable regression interval.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidenceGroup {
    pub time: Array1<f64>,
    pub estimate: Array1<f64>,
    pub variance: Array1<f64>,
    pub low_ci: Array1<f64>,
    pub high_ci: Array1<f64>,
}

impl IncidenceGroup {
    fn from_fields(label: &str, fields: &ParsedFields) -> Result<Self, SummaryError> {
        let time = required_1d(fields, "time")?;
        let estimate = required_1d(fields, "est")?;
        let variance = required_1d(fields, "var")?;
        if time.len() != estimate.len() || time.len() != variance.len() {
            return Err(SummaryError::GroupLengthMismatch(label.to_string()));
        }
        for (index, &value) in variance.iter().enumerate() {
            if value < 0.0 {
                return Err(SummaryError::NegativeVariance {
                    label: label.to_string(),
                    index,
                    value,
                });
            }
        }
        let spread = variance.mapv(|v| 2.0 * v.sqrt());
        let low_ci = &estimate - &spread;
        let high_ci = &estimate + &spread;
        Ok(Self {
            time,
            estimate,
            variance,
            low_ci,
            high_ci,
        })
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// The cross-group test table: one row per compared curve set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupTests {
    pub labels: Vec<String>,
    pub statistic: Array1<f64>,
    pub p_value: Array1<f64>,
    pub degrees_of_freedom: Option<Array1<f64>>,
}

impl GroupTests {
    fn from_value(value: &NativeValue) -> Result<Self, SummaryError> {
        let NativeValue::Matrix(matrix) = value else {
            return Err(SummaryError::MalformedTests(
                "expected a matrix entry".to_string(),
            ));
        };
        let col_names = matrix.col_names.as_ref().ok_or_else(|| {
            SummaryError::MalformedTests("matrix carries no column names".to_string())
        })?;
        let column = |wanted: &str| -> Result<Array1<f64>, SummaryError> {
            let idx = col_names
                .iter()
                .position(|name| name == wanted)
                .ok_or_else(|| {
                    SummaryError::MalformedTests(format!("missing column '{wanted}'"))
                })?;
            Ok(matrix.values.column(idx).to_owned())
        };
        let statistic = column("stat")?;
        let p_value = column("pv")?;
        let degrees_of_freedom = match col_names.iter().any(|name| name == "df") {
            true => Some(column("df")?),
            false => None,
        };
        let labels = match &matrix.row_names {
            Some(names) => names.clone(),
            None => (1..=matrix.nrows()).map(|i| i.to_string()).collect(),
        };
        Ok(Self {
            labels,
            statistic,
            p_value,
            degrees_of_freedom,
        })
    }
}

/// Cumulative-incidence curves keyed by the engine's composite group
/// label (for example `"1 2"` for group 1, cause 2). Labels are carried
/// verbatim; this layer never reparses them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CumincResult {
    raw: NativeList,
    groups: Vec<(String, IncidenceGroup)>,
    tests: Option<GroupTests>,
}

impl CumincResult {
    /// Interpret a raw cumulative-incidence result. The trailing `Tests`
    /// entry is never a curve group; it is parsed into [`GroupTests`]
    /// only when `comparison_requested` is set, and required then.
    pub fn from_engine(raw: NativeList, comparison_requested: bool) -> Result<Self, SummaryError> {
        if raw.names().len() != raw.values().len() {
            return Err(SummaryError::Parse(ParseError::NameCardinalityMismatch {
                names: raw.names().len(),
                values: raw.values().len(),
            }));
        }

        let mut groups = Vec::new();
        let mut tests = None;
        for (name, value) in raw.entries() {
            if name == TESTS_ENTRY {
                if comparison_requested {
                    tests = Some(GroupTests::from_value(value)?);
                }
                continue;
            }
            let NativeValue::List(inner) = value else {
                return Err(SummaryError::GroupShape(name.to_string()));
            };
            let fields = parse(inner)?;
            groups.push((name.to_string(), IncidenceGroup::from_fields(name, &fields)?));
        }
        if comparison_requested && tests.is_none() {
            return Err(SummaryError::MissingField(TESTS_ENTRY.to_string()));
        }
        log::debug!(
            "interpreted cumulative incidence: {} groups, tests = {}",
            groups.len(),
            tests.is_some()
        );

        Ok(Self { raw, groups, tests })
    }

    pub fn n_groups(&self) -> usize {
        self.groups.len()
    }

    pub fn groups(&self) -> impl Iterator<Item = (&str, &IncidenceGroup)> {
        self.groups
            .iter()
            .map(|(label, group)| (label.as_str(), group))
    }

    pub fn group(&self, label: &str) -> Option<&IncidenceGroup> {
        self.groups
            .iter()
            .find(|(existing, _)| existing == label)
            .map(|(_, group)| group)
    }

    pub fn tests(&self) -> Option<&GroupTests> {
        self.tests.as_ref()
    }

    /// The untouched engine result.
    pub fn raw(&self) -> &NativeList {
        &self.raw
    }

    /// Long-format table of every curve: one row per (group, time point).
    pub fn summary(&self) -> Result<DataFrame, SummaryError> {
        let total: usize = self.groups.iter().map(|(_, group)| group.len()).sum();
        let mut label = Vec::with_capacity(total);
        let mut time = Vec::with_capacity(total);
        let mut estimate = Vec::with_capacity(total);
        let mut variance = Vec::with_capacity(total);
        let mut low_ci = Vec::with_capacity(total);
        let mut high_ci = Vec::with_capacity(total);
        for (group_label, group) in &self.groups {
            for idx in 0..group.len() {
                label.push(group_label.clone());
                time.push(group.time[idx]);
                estimate.push(group.estimate[idx]);
                variance.push(group.variance[idx]);
                low_ci.push(group.low_ci[idx]);
                high_ci.push(group.high_ci[idx]);
            }
        }
        let df = DataFrame::new(vec![
            Series::new("group".into(), label).into(),
            Series::new("time".into(), time).into(),
            Series::new("estimate".into(), estimate).into(),
            Series::new("variance".into(), variance).into(),
            Series::new("low_ci".into(), low_ci).into(),
            Series::new("high_ci".into(), high_ci).into(),
        ])?;
        Ok(df)
    }
}

fn required_1d(fields: &ParsedFields, field: &str) -> Result<Array1<f64>, SummaryError> {
    let value = fields
        .get(field)
        .ok_or_else(|| SummaryError::MissingField(field.to_string()))?;
    if value.ndim() != 1 {
        return Err(SummaryError::FieldRank {
            field: field.to_string(),
            expected: 1,
            found: value.ndim(),
        });
    }
    Ok(value
        .clone()
        .into_dimensionality::<Ix1>()
        .expect("rank checked above"))
}

fn required_2d(fields: &ParsedFields, field: &str) -> Result<Array2<f64>, SummaryError> {
    let value = fields
        .get(field)
        .ok_or_else(|| SummaryError::MissingField(field.to_string()))?;
    if value.ndim() != 2 {
        return Err(SummaryError::FieldRank {
            field: field.to_string(),
            expected: 2,
            found: value.ndim(),
        });
    }
    Ok(value
        .clone()
        .into_dimensionality::<Ix2>()
        .expect("rank checked above"))
}

fn scalar_field(fields: &ParsedFields, field: &str) -> Option<f64> {
    fields.get(field).and_then(|value| value.iter().next().copied())
}
