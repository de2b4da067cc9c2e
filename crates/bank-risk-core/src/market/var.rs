//! Value-at-Risk and Conditional VaR for a single position.
//!
//! Losses are positive (`loss = -market_value * return`) and every estimator
//! returns a non-negative loss magnitude. Historical and Monte Carlo methods
//! share one empirical machinery: build a loss sample, take the quantile at
//! the confidence level, average the tail at or beyond it. The parametric
//! method uses the closed-form normal quantile and expected shortfall.

use serde::{Deserialize, Serialize};

use super::position::Position;
use crate::config::EngineConfig;
use crate::error::RiskEngineError;
use crate::statistics::descriptive::quantile_sorted;
use crate::statistics::{
    fit_normal, normal_inverse_cdf, normal_pdf, sample_monte_carlo, DistributionSpec,
};
use crate::types::{to_decimal, to_f64, Money};
use crate::RiskEngineResult;

/// Tolerance when collecting tail losses against the VaR threshold.
const TAIL_EPSILON: f64 = 1e-12;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// VaR estimation method, selected per call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum VarMethod {
    Historical,
    Parametric,
    MonteCarlo {
        simulations: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
}

impl VarMethod {
    pub fn name(&self) -> &'static str {
        match self {
            VarMethod::Historical => "historical",
            VarMethod::Parametric => "parametric",
            VarMethod::MonteCarlo { .. } => "monte_carlo",
        }
    }

    /// Same method with a replacement seed; non-simulation methods are
    /// returned unchanged.
    pub fn with_seed(self, seed: Option<u64>) -> Self {
        match self {
            VarMethod::MonteCarlo { simulations, .. } => VarMethod::MonteCarlo { simulations, seed },
            other => other,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarEstimate {
    pub confidence_level: f64,
    pub var: Money,
    pub cvar: Money,
}

/// Loss distribution a method evaluates quantiles against.
enum LossModel {
    /// Sorted ascending
    Empirical(Vec<f64>),
    Normal { exposure: f64, sigma: f64 },
}

impl LossModel {
    fn var(&self, confidence: f64) -> RiskEngineResult<f64> {
        let v = match self {
            LossModel::Empirical(sorted) => quantile_sorted(sorted, confidence),
            LossModel::Normal { exposure, sigma } => {
                exposure * normal_inverse_cdf(confidence)? * sigma
            }
        };
        Ok(v.max(0.0))
    }

    fn cvar(&self, confidence: f64) -> RiskEngineResult<f64> {
        let var = self.var(confidence)?;
        let es = match self {
            LossModel::Empirical(sorted) => {
                let tail: Vec<f64> = sorted
                    .iter()
                    .copied()
                    .filter(|l| *l >= var - TAIL_EPSILON)
                    .collect();
                if tail.is_empty() {
                    var
                } else {
                    tail.iter().sum::<f64>() / tail.len() as f64
                }
            }
            LossModel::Normal { exposure, sigma } => {
                let z = normal_inverse_cdf(confidence)?;
                exposure * sigma * normal_pdf(z)? / (1.0 - confidence)
            }
        };
        Ok(es.max(var))
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_confidence(confidence: f64) -> RiskEngineResult<()> {
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(RiskEngineError::invalid(
            "confidence_level",
            format!("must lie in (0, 1), got {confidence}"),
        ));
    }
    Ok(())
}

fn build_loss_model(
    market_value: f64,
    returns: &[f64],
    method: VarMethod,
    config: &EngineConfig,
) -> RiskEngineResult<LossModel> {
    match method {
        VarMethod::Historical => {
            let required = config.market.min_history_length.max(2);
            if returns.len() < required {
                return Err(RiskEngineError::insufficient(
                    "historical VaR return history",
                    required,
                    returns.len(),
                ));
            }
            Ok(LossModel::Empirical(sorted_losses(market_value, returns)))
        }
        VarMethod::Parametric => {
            let fit = fit_normal(returns)?;
            Ok(LossModel::Normal {
                exposure: market_value.abs(),
                sigma: fit.std_dev,
            })
        }
        VarMethod::MonteCarlo { simulations, seed } => {
            if simulations < 2 {
                return Err(RiskEngineError::invalid(
                    "simulations",
                    "at least 2 simulations are required",
                ));
            }
            if simulations > config.market.max_simulations {
                return Err(RiskEngineError::invalid(
                    "simulations",
                    format!(
                        "{simulations} exceeds the configured maximum of {}",
                        config.market.max_simulations
                    ),
                ));
            }
            let fit = fit_normal(returns)?;
            let simulated = if fit.std_dev > 0.0 {
                sample_monte_carlo(
                    &DistributionSpec::Normal {
                        mean: fit.mean,
                        std_dev: fit.std_dev,
                    },
                    simulations,
                    seed,
                )?
            } else {
                vec![fit.mean; simulations]
            };
            Ok(LossModel::Empirical(sorted_losses(market_value, &simulated)))
        }
    }
}

fn sorted_losses(market_value: f64, returns: &[f64]) -> Vec<f64> {
    let mut losses: Vec<f64> = returns.iter().map(|r| -market_value * r).collect();
    losses.sort_by(|a, b| a.total_cmp(b));
    losses
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// VaR and CVaR of a return series scaled by `market_value`, one estimate per
/// confidence level. All levels are evaluated against the same loss sample,
/// so a Monte Carlo run is drawn once.
pub fn estimate_series(
    market_value: Money,
    returns: &[f64],
    confidence_levels: &[f64],
    method: VarMethod,
    config: &EngineConfig,
) -> RiskEngineResult<Vec<VarEstimate>> {
    if confidence_levels.is_empty() {
        return Err(RiskEngineError::invalid(
            "confidence_levels",
            "at least one confidence level is required",
        ));
    }
    for c in confidence_levels {
        validate_confidence(*c)?;
    }
    let value = to_f64(market_value, "market_value")?;
    let model = build_loss_model(value, returns, method, config)?;

    confidence_levels
        .iter()
        .map(|&c| {
            Ok(VarEstimate {
                confidence_level: c,
                var: to_decimal(model.var(c)?, "var")?,
                cvar: to_decimal(model.cvar(c)?, "cvar")?,
            })
        })
        .collect()
}

pub fn compute_var(
    position: &Position,
    confidence: f64,
    method: VarMethod,
    config: &EngineConfig,
) -> RiskEngineResult<Money> {
    position.validate()?;
    let est = estimate_series(
        position.market_value,
        &position.returns,
        &[confidence],
        method,
        config,
    )?;
    Ok(est[0].var)
}

pub fn compute_cvar(
    position: &Position,
    confidence: f64,
    method: VarMethod,
    config: &EngineConfig,
) -> RiskEngineResult<Money> {
    position.validate()?;
    let est = estimate_series(
        position.market_value,
        &position.returns,
        &[confidence],
        method,
        config,
    )?;
    Ok(est[0].cvar)
}
