//! Standard-normal helpers shared by the result summaries.

use statrs::distribution::{ContinuousCDF, Normal};
use thiserror::Error;

/// A caller-supplied confidence level outside the open interval (0, 1).
#[derive(Debug, Error)]
#[error("confidence level {0} is outside the open interval (0, 1)")]
pub struct InvalidConfidenceLevel(pub f64);

fn standard_normal() -> Normal {
    Normal::new(0.0, 1.0).expect("standard normal parameters are valid")
}

/// Φ(x), the standard normal cumulative distribution function.
pub fn normal_cdf(x: f64) -> f64 {
    standard_normal().cdf(x)
}

/// Φ⁻¹(p) for p in (0, 1).
pub fn normal_quantile(p: f64) -> f64 {
    standard_normal().inverse_cdf(p)
}

/// Two-sided p-value for a standard-normal test statistic.
pub fn two_sided_p(z: f64) -> f64 {
    2.0 * (1.0 - normal_cdf(z.abs()))
}

/// The pair of two-sided normal quantiles `(z_lo, z_hi)` bounding the
/// requested confidence level, e.g. `(-1.96, 1.96)` for 95%.
pub fn confidence_z_bounds(level: f64) -> Result<(f64, f64), InvalidConfidenceLevel> {
    if !(level > 0.0 && level < 1.0) {
        return Err(InvalidConfidenceLevel(level));
    }
    let tail = (1.0 - level) / 2.0;
    Ok((normal_quantile(tail), normal_quantile(1.0 - tail)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn two_sided_p_matches_the_wald_reference_value() {
        assert_abs_diff_eq!(two_sided_p(0.5), 0.617075, epsilon = 1e-6);
        assert_abs_diff_eq!(two_sided_p(-0.5), 0.617075, epsilon = 1e-6);
        assert_abs_diff_eq!(two_sided_p(0.0), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn confidence_bounds_are_symmetric_normal_quantiles() {
        let (lo, hi) = confidence_z_bounds(0.95).unwrap();
        assert_abs_diff_eq!(lo, -1.959964, epsilon = 1e-5);
        assert_abs_diff_eq!(hi, 1.959964, epsilon = 1e-5);
        assert_abs_diff_eq!(lo, -hi, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_confidence_levels_are_rejected() {
        for level in [0.0, 1.0, -0.1, 1.5, f64::NAN] {
            assert!(confidence_z_bounds(level).is_err());
        }
    }
}
