//! # The Engine Seam
//!
//! The competing-risks regression and cumulative-incidence estimators are
//! external collaborators. This module defines the trait they are reached
//! through and the fully-converted call payloads they receive. An engine
//! is passed explicitly into every high-level call in [`crate::fit`] — it
//! is acquired for the call and released with it, and no bridging state
//! outlives the invocation or leaks into process-wide globals.

use crate::native::{NativeList, NativeTable, NativeVector};
use thiserror::Error;

/// A failure inside the external engine, surfaced verbatim. Engine
/// failures are deterministic for a given input; they are never retried
/// here.
#[derive(Debug, Error)]
#[error("statistical engine call failed: {0}")]
pub struct EngineError(pub String);

/// A fully-converted competing-risks regression request. Scalar options
/// are forwarded untouched; vector options arrive already converted.
#[derive(Debug, Clone)]
pub struct CrrCall {
    pub ftime: NativeVector,
    pub fstatus: NativeVector,
    pub covariates: NativeTable,
    /// Optional censoring-group vector for clustered censoring.
    pub cengroup: Option<NativeVector>,
    /// Optional observation mask; `true` keeps the row.
    pub subset: Option<NativeVector>,
    /// Status code identifying the failure cause of interest.
    pub failcode: i32,
    /// Status code identifying censored observations.
    pub cencode: i32,
}

/// A fully-converted cumulative-incidence request.
#[derive(Debug, Clone)]
pub struct CumincCall {
    pub ftime: NativeVector,
    pub fstatus: NativeVector,
    /// Optional grouping vector; one curve set per group value.
    pub group: Option<NativeVector>,
    /// Optional stratification vector for the cross-group tests.
    pub strata: Option<NativeVector>,
    /// Optional observation mask; `true` keeps the row.
    pub subset: Option<NativeVector>,
    /// Power of the weighting function used by the cross-group tests.
    pub rho: f64,
    /// Status code identifying censored observations.
    pub cencode: i32,
}

/// The two entry points every engine implementation must expose. Both are
/// synchronous and blocking; the returned list is owned by the caller and
/// read-only to this crate.
pub trait CompetingRisksEngine {
    fn fit_competing_risks(&self, call: &CrrCall) -> Result<NativeList, EngineError>;

    fn cumulative_incidence(&self, call: &CumincCall) -> Result<NativeList, EngineError>;
}
