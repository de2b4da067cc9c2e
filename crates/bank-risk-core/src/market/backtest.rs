use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ChiSquared, ContinuousCDF};

use crate::error::RiskEngineError;
use crate::types::Money;
use crate::RiskEngineResult;

/// Probability clamp for the Kupiec log-likelihoods.
const PROB_EPSILON: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestInput {
    pub confidence_level: f64,
    pub dates: Vec<NaiveDate>,
    /// Predicted VaR per day, as positive loss magnitudes
    pub var_series: Vec<Money>,
    /// Realised P&L per day (losses negative)
    pub pnl_series: Vec<Money>,
}

/// Exception statistics only; zone classification is left to the caller's
/// policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub observations: usize,
    pub exceptions: usize,
    pub breach_dates: Vec<NaiveDate>,
    pub expected_exceptions: f64,
    pub exception_rate: f64,
    /// Kupiec proportion-of-failures likelihood ratio (chi-square, 1 df)
    pub kupiec_lr: f64,
    pub kupiec_p_value: f64,
}

fn kupiec(observations: usize, exceptions: usize, confidence: f64) -> RiskEngineResult<(f64, f64)> {
    let n = observations as f64;
    let x = exceptions as f64;
    let p = (1.0 - confidence).clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);
    let pi = (x / n).clamp(PROB_EPSILON, 1.0 - PROB_EPSILON);

    let ln_l0 = (n - x) * (1.0 - p).ln() + x * p.ln();
    let ln_l1 = (n - x) * (1.0 - pi).ln() + x * pi.ln();
    let lr = (2.0 * (ln_l1 - ln_l0)).max(0.0);

    let chi = ChiSquared::new(1.0)
        .map_err(|e| RiskEngineError::Configuration(format!("chi-square unavailable: {e}")))?;
    Ok((lr, 1.0 - chi.cdf(lr)))
}

/// Count days where the realised loss (`-pnl`) strictly exceeds the VaR
/// predicted for that day.
pub fn backtest(input: &BacktestInput) -> RiskEngineResult<BacktestResult> {
    let c = input.confidence_level;
    if !(c > 0.0 && c < 1.0) {
        return Err(RiskEngineError::invalid(
            "confidence_level",
            format!("must lie in (0, 1), got {c}"),
        ));
    }
    let n = input.var_series.len();
    if n == 0 {
        return Err(RiskEngineError::invalid("var_series", "must not be empty"));
    }
    if input.pnl_series.len() != n || input.dates.len() != n {
        return Err(RiskEngineError::invalid(
            "pnl_series",
            format!(
                "series lengths differ: dates={}, var={}, pnl={}",
                input.dates.len(),
                n,
                input.pnl_series.len()
            ),
        ));
    }
    if let Some(i) = input.var_series.iter().position(|v| *v < Decimal::ZERO) {
        return Err(RiskEngineError::invalid(
            format!("var_series[{i}]"),
            "VaR must be a non-negative loss magnitude",
        ));
    }

    let breach_dates: Vec<NaiveDate> = input
        .dates
        .iter()
        .zip(input.var_series.iter().zip(&input.pnl_series))
        .filter(|(_, (var, pnl))| -**pnl > **var)
        .map(|(d, _)| *d)
        .collect();

    let exceptions = breach_dates.len();
    let (kupiec_lr, kupiec_p_value) = kupiec(n, exceptions, c)?;
    Ok(BacktestResult {
        observations: n,
        exceptions,
        breach_dates,
        expected_exceptions: n as f64 * (1.0 - c),
        exception_rate: exceptions as f64 / n as f64,
        kupiec_lr,
        kupiec_p_value,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn days(n: usize) -> Vec<NaiveDate> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        (0..n)
            .map(|i| start + chrono::Duration::days(i as i64))
            .collect()
    }

    #[test]
    fn test_counts_strict_exceedances() {
        let input = BacktestInput {
            confidence_level: 0.99,
            dates: days(5),
            var_series: vec![dec!(100); 5],
            pnl_series: vec![dec!(-50), dec!(-100), dec!(-101), dec!(20), dec!(-250)],
        };
        let r = backtest(&input).unwrap();
        assert_eq!(r.exceptions, 2);
        assert_eq!(r.breach_dates, vec![input.dates[2], input.dates[4]]);
        assert!((r.expected_exceptions - 0.05).abs() < 1e-12);
        assert!((r.exception_rate - 0.4).abs() < 1e-12);
    }

    #[test]
    fn test_kupiec_zero_when_rate_matches() {
        let n = 100;
        let mut pnl = vec![dec!(0); n];
        pnl[10] = dec!(-500);
        let input = BacktestInput {
            confidence_level: 0.99,
            dates: days(n),
            var_series: vec![dec!(100); n],
            pnl_series: pnl,
        };
        let r = backtest(&input).unwrap();
        assert_eq!(r.exceptions, 1);
        assert!(r.kupiec_lr.abs() < 1e-9);
        assert!(r.kupiec_p_value > 0.99);
    }

    #[test]
    fn test_kupiec_large_when_many_breaches() {
        let n = 250;
        let input = BacktestInput {
            confidence_level: 0.99,
            dates: days(n),
            var_series: vec![dec!(10); n],
            pnl_series: (0..n)
                .map(|i| if i % 10 == 0 { dec!(-50) } else { dec!(5) })
                .collect(),
        };
        let r = backtest(&input).unwrap();
        assert_eq!(r.exceptions, 25);
        assert!(r.kupiec_lr > 3.84);
        assert!(r.kupiec_p_value < 0.05);
    }

    #[test]
    fn test_mismatched_series_rejected() {
        let input = BacktestInput {
            confidence_level: 0.99,
            dates: days(3),
            var_series: vec![dec!(1); 3],
            pnl_series: vec![dec!(0); 2],
        };
        assert!(backtest(&input).is_err());
    }

    #[test]
    fn test_empty_series_rejected() {
        let input = BacktestInput {
            confidence_level: 0.99,
            dates: vec![],
            var_series: vec![],
            pnl_series: vec![],
        };
        assert!(backtest(&input).is_err());
    }
}
