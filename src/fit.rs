//! # High-Level Model Calls
//!
//! The caller-facing entry points. `crr` fits a competing-risks
//! regression; `cuminc` estimates cumulative incidence. Each call
//! validates its inputs, converts them at the [`crate::convert`] boundary,
//! invokes the engine passed in for the call, and interprets the result.
//!
//! Validation is fail-fast: a covariate table still carrying non-numeric
//! columns is rejected with *every* offending column named before any
//! conversion or engine work happens, so nothing partial is ever
//! submitted.

use crate::convert::{ConvertError, table_to_native, vector_to_native};
use crate::data::HostArray;
use crate::encode::non_numeric_columns;
use crate::engine::{CompetingRisksEngine, CrrCall, CumincCall, EngineError};
use crate::native::NativeVector;
use crate::summary::{CrrResult, CumincResult, SummaryError};
use itertools::Itertools;
use polars::prelude::DataFrame;
use std::collections::BTreeSet;
use thiserror::Error;

/// Options for a competing-risks regression call. Scalars are forwarded
/// to the engine untouched; vectors are converted like any other input.
#[derive(Debug, Clone)]
pub struct CrrOptions {
    /// Status code of the failure cause being modelled.
    pub failcode: i32,
    /// Status code of censored observations.
    pub cencode: i32,
    /// Censoring-group vector for clustered censoring.
    pub cengroup: Option<HostArray>,
    /// Boolean mask selecting the observations to fit on.
    pub subset: Option<HostArray>,
}

impl Default for CrrOptions {
    fn default() -> Self {
        Self {
            failcode: 1,
            cencode: 0,
            cengroup: None,
            subset: None,
        }
    }
}

/// Options for a cumulative-incidence call.
#[derive(Debug, Clone)]
pub struct CumincOptions {
    /// Grouping vector; one curve set per distinct value.
    pub group: Option<HostArray>,
    /// Stratification vector for the cross-group tests.
    pub strata: Option<HostArray>,
    /// Power of the weighting function used by the cross-group tests.
    pub rho: f64,
    /// Status code of censored observations.
    pub cencode: i32,
    /// Boolean mask selecting the observations to estimate on.
    pub subset: Option<HostArray>,
}

impl Default for CumincOptions {
    fn default() -> Self {
        Self {
            group: None,
            strata: None,
            rho: 0.0,
            cencode: 0,
            subset: None,
        }
    }
}

/// Errors surfaced by the high-level model calls.
#[derive(Debug, Error)]
pub enum CrrError {
    #[error(
        "covariate table contains non-numeric columns: [{}]; convert them with `to_categorical` or `encode_categorical` first",
        .columns.iter().join(", ")
    )]
    NonNumericCovariates { columns: Vec<String> },
    #[error("'{left}' has length {left_len} but '{right}' has length {right_len}")]
    LengthMismatch {
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },
    #[error(transparent)]
    Convert(#[from] ConvertError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Summary(#[from] SummaryError),
}

/// Fit a competing-risks regression over the supplied failure times,
/// failure statuses, and numeric covariate table.
pub fn crr<E: CompetingRisksEngine + ?Sized>(
    engine: &E,
    ftime: &HostArray,
    fstatus: &HostArray,
    covariates: &DataFrame,
    options: &CrrOptions,
) -> Result<CrrResult, CrrError> {
    let offending = non_numeric_columns(covariates);
    if !offending.is_empty() {
        return Err(CrrError::NonNumericCovariates { columns: offending });
    }

    let ftime = vector_to_native(ftime)?;
    let fstatus = vector_to_native(fstatus)?;
    check_length("ftime", ftime.len(), "fstatus", fstatus.len())?;
    check_length("ftime", ftime.len(), "covariates", covariates.height())?;

    let cengroup = convert_optional(&options.cengroup)?;
    if let Some(vector) = &cengroup {
        check_length("ftime", ftime.len(), "cengroup", vector.len())?;
    }
    let subset = convert_optional(&options.subset)?;
    if let Some(mask) = &subset {
        check_length("ftime", ftime.len(), "subset", mask.len())?;
    }

    let covariate_names: Vec<String> = covariates
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();
    log::info!(
        "fitting competing-risks regression: {} observations, {} covariates, failcode = {}, cencode = {}",
        ftime.len(),
        covariate_names.len(),
        options.failcode,
        options.cencode
    );

    let call = CrrCall {
        ftime,
        fstatus,
        covariates: table_to_native(covariates)?,
        cengroup,
        subset,
        failcode: options.failcode,
        cencode: options.cencode,
    };
    let raw = engine.fit_competing_risks(&call)?;
    log::debug!("engine returned {} result fields", raw.len());
    Ok(CrrResult::from_engine(raw, covariate_names)?)
}

/// Estimate cumulative-incidence curves over the supplied failure times
/// and statuses, optionally split by a grouping vector.
pub fn cuminc<E: CompetingRisksEngine + ?Sized>(
    engine: &E,
    ftime: &HostArray,
    fstatus: &HostArray,
    options: &CumincOptions,
) -> Result<CumincResult, CrrError> {
    let native_ftime = vector_to_native(ftime)?;
    let native_fstatus = vector_to_native(fstatus)?;
    check_length("ftime", native_ftime.len(), "fstatus", native_fstatus.len())?;

    // A comparison is requested exactly when the grouping vector can
    // distinguish at least two groups.
    let comparison_requested = options
        .group
        .as_ref()
        .is_some_and(|group| distinct_count(group) >= 2);

    let group = convert_optional(&options.group)?;
    if let Some(vector) = &group {
        check_length("ftime", native_ftime.len(), "group", vector.len())?;
    }
    let strata = convert_optional(&options.strata)?;
    if let Some(vector) = &strata {
        check_length("ftime", native_ftime.len(), "strata", vector.len())?;
    }
    let subset = convert_optional(&options.subset)?;
    if let Some(mask) = &subset {
        check_length("ftime", native_ftime.len(), "subset", mask.len())?;
    }
    log::info!(
        "estimating cumulative incidence: {} observations, comparison requested = {comparison_requested}",
        native_ftime.len()
    );

    let call = CumincCall {
        ftime: native_ftime,
        fstatus: native_fstatus,
        group,
        strata,
        subset,
        rho: options.rho,
        cencode: options.cencode,
    };
    let raw = engine.cumulative_incidence(&call)?;
    log::debug!("engine returned {} result entries", raw.len());
    Ok(CumincResult::from_engine(raw, comparison_requested)?)
}

fn convert_optional(array: &Option<HostArray>) -> Result<Option<NativeVector>, ConvertError> {
    array.as_ref().map(vector_to_native).transpose()
}

fn check_length(
    left: &'static str,
    left_len: usize,
    right: &'static str,
    right_len: usize,
) -> Result<(), CrrError> {
    if left_len != right_len {
        return Err(CrrError::LengthMismatch {
            left,
            left_len,
            right,
            right_len,
        });
    }
    Ok(())
}

/// Number of distinct values in a 1-D host array, compared in the
/// element's own representation.
fn distinct_count(array: &HostArray) -> usize {
    match array {
        HostArray::Int(values) => values.iter().collect::<BTreeSet<_>>().len(),
        HostArray::Float(values) => values
            .iter()
            .map(|value| value.to_bits())
            .collect::<BTreeSet<_>>()
            .len(),
        HostArray::Bool(values) => values.iter().collect::<BTreeSet<_>>().len(),
        HostArray::Str(values) => values.iter().collect::<BTreeSet<_>>().len(),
        HostArray::Mixed(values) => values
            .iter()
            .map(|datum| datum.text().unwrap_or_else(|| datum.type_label().to_string()))
            .collect::<BTreeSet<_>>()
            .len(),
    }
}
