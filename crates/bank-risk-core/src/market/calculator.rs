use serde::{Deserialize, Serialize};
use tracing::debug;

use super::greeks::{compute_greeks, Greeks};
use super::position::Position;
use super::shock::{apply_shock, RiskScenario};
use super::var::{estimate_series, VarEstimate, VarMethod};
use crate::batch::{run_batch, BatchOutcome};
use crate::config::EngineConfig;
use crate::statistics::derive_seed;
use crate::types::{with_metadata_f64, ComputationOutput, Money};
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Input / Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRiskRequest {
    pub confidence_levels: Vec<f64>,
    pub method: VarMethod,
    /// Optional scenario whose stressed value is reported alongside VaR
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<RiskScenario>,
}

/// Stand-alone return series request, without a position record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarInput {
    pub market_value: Money,
    pub returns: Vec<f64>,
    pub confidence_levels: Vec<f64>,
    pub method: VarMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressedValue {
    pub scenario: String,
    pub value: Money,
    pub loss: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRiskResult {
    pub position_id: String,
    pub market_value: Money,
    pub method: VarMethod,
    pub estimates: Vec<VarEstimate>,
    /// Absent for non-derivative instruments
    pub greeks: Option<Greeks>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stressed: Option<StressedValue>,
}

impl MarketRiskResult {
    /// Estimate at exactly `confidence`, if it was requested.
    pub fn estimate_at(&self, confidence: f64) -> Option<&VarEstimate> {
        self.estimates
            .iter()
            .find(|e| (e.confidence_level - confidence).abs() < 1e-12)
    }
}

impl MarketRiskRequest {
    /// The request as seen by the record at `index`: a seeded Monte Carlo
    /// method gets a seed derived from the base seed and the index.
    pub(crate) fn for_record(&self, index: usize) -> MarketRiskRequest {
        let method = match self.method {
            VarMethod::MonteCarlo {
                seed: Some(base), ..
            } => self.method.with_seed(Some(derive_seed(base, index as u64))),
            m => m,
        };
        MarketRiskRequest {
            method,
            ..self.clone()
        }
    }
}

fn methodology(method: &VarMethod) -> String {
    format!(
        "{} VaR/CVaR on loss = -value x return; finite-difference Greeks; linear shock model",
        method.name()
    )
}

// ---------------------------------------------------------------------------
// Record pipeline
// ---------------------------------------------------------------------------

pub fn assess_position(
    position: &Position,
    request: &MarketRiskRequest,
    config: &EngineConfig,
) -> RiskEngineResult<MarketRiskResult> {
    position.validate()?;
    let estimates = estimate_series(
        position.market_value,
        &position.returns,
        &request.confidence_levels,
        request.method,
        config,
    )?;
    let greeks = compute_greeks(position, &config.market.greeks)?;
    let stressed = match &request.scenario {
        Some(s) => {
            let shocked = apply_shock(position, s)?;
            Some(StressedValue {
                scenario: s.name.clone(),
                value: shocked.post_shock_value,
                loss: shocked.loss,
            })
        }
        None => None,
    };

    debug!(
        position_id = %position.id,
        method = request.method.name(),
        levels = estimates.len(),
        derivative = greeks.is_some(),
        "market position assessed"
    );
    Ok(MarketRiskResult {
        position_id: position.id.clone(),
        market_value: position.market_value,
        method: request.method,
        estimates,
        greeks,
        stressed,
    })
}

pub(crate) fn assess_positions(
    positions: &[Position],
    request: &MarketRiskRequest,
    config: &EngineConfig,
) -> RiskEngineResult<BatchOutcome<MarketRiskResult>> {
    run_batch(
        "market",
        positions,
        |p| p.id.clone(),
        |i, p| assess_position(p, &request.for_record(i), config),
    )
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn calculate_market_risk(
    position: &Position,
    request: &MarketRiskRequest,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<MarketRiskResult>> {
    config.validate()?;
    let result = assess_position(position, request, config)?;

    let mut warnings = Vec::new();
    if position.instrument_type.is_derivative() {
        warnings.push(
            "VaR for derivatives uses the position's own return history (no full revaluation)"
                .into(),
        );
    }

    Ok(with_metadata_f64(
        &methodology(&request.method),
        request,
        warnings,
        &config.version,
        result,
    ))
}

/// Market risk for many positions in parallel. With a seeded Monte Carlo
/// method each position gets its own seed derived from the base seed and the
/// position's index, so results do not depend on scheduling.
pub fn calculate_market_risk_batch(
    positions: &[Position],
    request: &MarketRiskRequest,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<BatchOutcome<MarketRiskResult>>> {
    config.validate()?;
    let outcome = assess_positions(positions, request, config)?;

    let mut warnings = Vec::new();
    if !outcome.failures.is_empty() {
        warnings.push(format!(
            "{} of {} positions skipped",
            outcome.failures.len(),
            positions.len()
        ));
    }
    Ok(with_metadata_f64(
        &methodology(&request.method),
        request,
        warnings,
        &config.version,
        outcome,
    ))
}

/// VaR / CVaR for a bare return series.
pub fn calculate_var(
    input: &VarInput,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<Vec<VarEstimate>>> {
    config.validate()?;
    let estimates = estimate_series(
        input.market_value,
        &input.returns,
        &input.confidence_levels,
        input.method,
        config,
    )?;
    Ok(with_metadata_f64(
        &methodology(&input.method),
        &serde_json::json!({
            "method": input.method,
            "observations": input.returns.len(),
        }),
        Vec::new(),
        &config.version,
        estimates,
    ))
}
