use serde::{Deserialize, Serialize};
use statrs::distribution::{Continuous, ContinuousCDF, Normal};

use crate::error::RiskEngineError;
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Location / scale estimate of a return series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalFit {
    pub mean: f64,
    pub std_dev: f64,
    pub observations: usize,
}

// ---------------------------------------------------------------------------
// Validation helpers
// ---------------------------------------------------------------------------

pub(crate) fn ensure_finite(sample: &[f64], field: &str) -> RiskEngineResult<()> {
    if let Some(i) = sample.iter().position(|v| !v.is_finite()) {
        return Err(RiskEngineError::invalid(
            format!("{field}[{i}]"),
            "value must be finite",
        ));
    }
    Ok(())
}

fn ensure_probability(q: f64, field: &str) -> RiskEngineResult<()> {
    if !(0.0..=1.0).contains(&q) {
        return Err(RiskEngineError::invalid(
            field,
            format!("must lie in [0, 1], got {q}"),
        ));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn mean(sample: &[f64]) -> RiskEngineResult<f64> {
    if sample.is_empty() {
        return Err(RiskEngineError::insufficient("mean", 1, 0));
    }
    ensure_finite(sample, "sample")?;
    Ok(sample.iter().sum::<f64>() / sample.len() as f64)
}

/// Sample standard deviation (n − 1 denominator).
pub fn sample_std_dev(sample: &[f64]) -> RiskEngineResult<f64> {
    if sample.len() < 2 {
        return Err(RiskEngineError::insufficient(
            "sample standard deviation",
            2,
            sample.len(),
        ));
    }
    let m = mean(sample)?;
    let ss = sample.iter().map(|v| (v - m).powi(2)).sum::<f64>();
    Ok((ss / (sample.len() - 1) as f64).sqrt())
}

/// Quantile with linear interpolation between order statistics.
///
/// The sample need not be sorted; a sorted copy is taken. Rank is
/// `q * (n - 1)`, the same convention as the default numpy percentile.
pub fn quantile(sample: &[f64], q: f64) -> RiskEngineResult<f64> {
    if sample.len() < 2 {
        return Err(RiskEngineError::insufficient("quantile", 2, sample.len()));
    }
    ensure_probability(q, "q")?;
    ensure_finite(sample, "sample")?;

    let mut sorted = sample.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Ok(quantile_sorted(&sorted, q))
}

/// Quantile of an already sorted, finite sample with at least one element.
pub(crate) fn quantile_sorted(sorted: &[f64], q: f64) -> f64 {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = q * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        sorted[lower]
    } else {
        let frac = rank - lower as f64;
        sorted[lower] * (1.0 - frac) + sorted[upper] * frac
    }
}

/// Fit a normal distribution by sample mean and sample standard deviation.
pub fn fit_normal(sample: &[f64]) -> RiskEngineResult<NormalFit> {
    let std_dev = sample_std_dev(sample)?;
    Ok(NormalFit {
        mean: mean(sample)?,
        std_dev,
        observations: sample.len(),
    })
}

fn standard_normal() -> RiskEngineResult<Normal> {
    Normal::new(0.0, 1.0)
        .map_err(|e| RiskEngineError::Configuration(format!("standard normal unavailable: {e}")))
}

/// Inverse standard normal CDF; `p` must lie strictly inside (0, 1).
pub fn normal_inverse_cdf(p: f64) -> RiskEngineResult<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(RiskEngineError::invalid(
            "p",
            format!("must lie in (0, 1), got {p}"),
        ));
    }
    Ok(standard_normal()?.inverse_cdf(p))
}

pub fn normal_pdf(x: f64) -> RiskEngineResult<f64> {
    Ok(standard_normal()?.pdf(x))
}

pub fn normal_cdf(x: f64) -> RiskEngineResult<f64> {
    Ok(standard_normal()?.cdf(x))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantile_interpolates() {
        let s = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(&s, 0.0).unwrap(), 1.0);
        assert_eq!(quantile(&s, 1.0).unwrap(), 5.0);
        assert_eq!(quantile(&s, 0.5).unwrap(), 3.0);
        // rank = 0.1 * 4 = 0.4 -> 1 + 0.4
        assert!((quantile(&s, 0.1).unwrap() - 1.4).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_unsorted_input() {
        let s = [5.0, 1.0, 4.0, 2.0, 3.0];
        assert!((quantile(&s, 0.25).unwrap() - 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_quantile_requires_two_points() {
        let err = quantile(&[1.0], 0.5).unwrap_err();
        assert!(matches!(err, RiskEngineError::InsufficientData { .. }));
    }

    #[test]
    fn test_quantile_rejects_out_of_range_q() {
        assert!(quantile(&[1.0, 2.0], 1.5).is_err());
        assert!(quantile(&[1.0, 2.0], -0.1).is_err());
    }

    #[test]
    fn test_quantile_rejects_nan() {
        let err = quantile(&[1.0, f64::NAN, 2.0], 0.5).unwrap_err();
        assert!(matches!(err, RiskEngineError::InvalidInput { .. }));
    }

    #[test]
    fn test_sample_std_dev() {
        // variance (n-1) of 2,4,4,4,5,5,7,9 = 32/7
        let s = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        let sd = sample_std_dev(&s).unwrap();
        assert!((sd - (32.0_f64 / 7.0).sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_normal_inverse_cdf_known_points() {
        assert!((normal_inverse_cdf(0.95).unwrap() - 1.644_853_626_951).abs() < 1e-6);
        assert!((normal_inverse_cdf(0.99).unwrap() - 2.326_347_874_041).abs() < 1e-6);
        assert!(normal_inverse_cdf(0.5).unwrap().abs() < 1e-9);
    }

    #[test]
    fn test_normal_inverse_cdf_bounds() {
        assert!(normal_inverse_cdf(0.0).is_err());
        assert!(normal_inverse_cdf(1.0).is_err());
    }
}
