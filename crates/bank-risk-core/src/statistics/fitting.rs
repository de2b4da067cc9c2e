use serde::{Deserialize, Serialize};

use super::descriptive::{ensure_finite, mean};
use super::sampling::DistributionSpec;
use crate::error::RiskEngineError;
use crate::RiskEngineResult;

/// Default minimum number of observations for a severity fit.
pub const DEFAULT_MIN_SEVERITY_OBSERVATIONS: usize = 10;

/// Estimator used for the lognormal severity fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeverityFitMethod {
    #[default]
    MaximumLikelihood,
    MethodOfMoments,
}

/// Lognormal severity parameters (of the underlying normal).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityFit {
    pub mu: f64,
    pub sigma: f64,
    pub method: SeverityFitMethod,
    pub observations: usize,
}

impl SeverityFit {
    pub fn distribution(&self) -> DistributionSpec {
        DistributionSpec::LogNormal {
            mu: self.mu,
            sigma: self.sigma,
        }
    }

    /// E[X] = exp(mu + sigma^2 / 2)
    pub fn mean(&self) -> f64 {
        (self.mu + self.sigma * self.sigma / 2.0).exp()
    }
}

/// Poisson frequency parameter: expected events per period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrequencyFit {
    pub lambda: f64,
    pub periods: usize,
    pub total_events: u64,
}

impl FrequencyFit {
    pub fn distribution(&self) -> DistributionSpec {
        DistributionSpec::Poisson {
            lambda: self.lambda,
        }
    }
}

/// Fit a lognormal severity distribution to positive loss amounts.
pub fn fit_severity(
    losses: &[f64],
    min_count: usize,
    method: SeverityFitMethod,
) -> RiskEngineResult<SeverityFit> {
    let required = min_count.max(2);
    if losses.len() < required {
        return Err(RiskEngineError::insufficient(
            "severity fit",
            required,
            losses.len(),
        ));
    }
    ensure_finite(losses, "losses")?;
    if let Some(i) = losses.iter().position(|v| *v <= 0.0) {
        return Err(RiskEngineError::invalid(
            format!("losses[{i}]"),
            "severity observations must be strictly positive",
        ));
    }

    let n = losses.len() as f64;
    let (mu, sigma) = match method {
        SeverityFitMethod::MaximumLikelihood => {
            let logs: Vec<f64> = losses.iter().map(|v| v.ln()).collect();
            let mu = logs.iter().sum::<f64>() / n;
            let var = logs.iter().map(|l| (l - mu).powi(2)).sum::<f64>() / n;
            (mu, var.sqrt())
        }
        SeverityFitMethod::MethodOfMoments => {
            let m = mean(losses)?;
            let var = losses.iter().map(|v| (v - m).powi(2)).sum::<f64>() / n;
            let sigma2 = (1.0 + var / (m * m)).ln();
            (m.ln() - sigma2 / 2.0, sigma2.sqrt())
        }
    };

    if !(sigma.is_finite() && sigma > 0.0) || !mu.is_finite() {
        return Err(RiskEngineError::invalid(
            "losses",
            "severity sample has no dispersion; lognormal fit is degenerate",
        ));
    }

    Ok(SeverityFit {
        mu,
        sigma,
        method,
        observations: losses.len(),
    })
}

/// Estimate a Poisson rate from event counts per period.
pub fn fit_frequency(event_counts: &[u64]) -> RiskEngineResult<FrequencyFit> {
    if event_counts.is_empty() {
        return Err(RiskEngineError::insufficient("frequency fit", 1, 0));
    }
    let total: u64 = event_counts.iter().sum();
    if total == 0 {
        return Err(RiskEngineError::invalid(
            "event_counts",
            "no events observed; Poisson rate would be zero",
        ));
    }
    Ok(FrequencyFit {
        lambda: total as f64 / event_counts.len() as f64,
        periods: event_counts.len(),
        total_events: total,
    })
}
