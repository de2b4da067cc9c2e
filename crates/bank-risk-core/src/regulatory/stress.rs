use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::capital::{aggregate_rwa, CapitalComponents, CapitalRatios};
use crate::batch::{run_batch, RecordFailure};
use crate::config::EngineConfig;
use crate::credit::{assess_exposure, CreditRiskResult, Exposure};
use crate::market::{
    apply_shock, assess_position, MarketRiskRequest, MarketRiskResult, Position, RiskScenario,
    ShockedPosition, VarMethod,
};
use crate::operational::{estimate_capital_record, CapitalParams, LossEvent, OperationalCapital};
use crate::types::{checked, checked_sum, with_metadata, ComputationOutput, Money, Rate};
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

fn default_var_method() -> VarMethod {
    VarMethod::Historical
}

/// Portfolio, capital and scenario for one stress run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestInput {
    #[serde(default)]
    pub exposures: Vec<Exposure>,
    #[serde(default)]
    pub positions: Vec<Position>,
    /// Loss history for operational capital; unchanged by the scenario
    #[serde(default)]
    pub loss_events: Vec<LossEvent>,
    #[serde(default)]
    pub operational_params: CapitalParams,
    pub capital: CapitalComponents,
    pub scenario: RiskScenario,
    /// VaR method for market RWA, evaluated before and after the shock
    #[serde(default = "default_var_method")]
    pub var_method: VarMethod,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StressTestResult {
    pub scenario: RiskScenario,
    pub pre_stress_value: Money,
    pub post_stress_value: Money,
    pub market_loss: Money,
    pub pre_expected_credit_loss: Money,
    pub post_expected_credit_loss: Money,
    pub credit_loss_increase: Money,
    /// Market loss plus the increase in expected credit loss
    pub loss_amount: Money,
    /// Market loss over |pre-stress value|; absent for an empty trading book
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_pct: Option<Rate>,
    pub pre_stress_ratios: CapitalRatios,
    pub post_stress_ratios: CapitalRatios,
    pub post_stress_cet1_ratio: Rate,
    pub post_stress_tier1_ratio: Rate,
    pub position_impacts: Vec<ShockedPosition>,
    /// Records left out of both the pre- and post-stress figures
    pub failures: Vec<RecordFailure>,
}

struct PositionStress {
    impact: ShockedPosition,
    pre: MarketRiskResult,
    post: MarketRiskResult,
}

struct ExposureStress {
    pre: CreditRiskResult,
    post: CreditRiskResult,
}

// ---------------------------------------------------------------------------
// Stress pipeline
// ---------------------------------------------------------------------------

fn stress_positions(
    positions: &[Position],
    scenario: &RiskScenario,
    request: &MarketRiskRequest,
    config: &EngineConfig,
) -> RiskEngineResult<(Vec<PositionStress>, Vec<RecordFailure>)> {
    let outcome = run_batch(
        "stress.market",
        positions,
        |p| p.id.clone(),
        |i, p| {
            let impact = apply_shock(p, scenario)?;
            let record_request = request.for_record(i);
            let pre = assess_position(p, &record_request, config)?;
            let shocked = Position {
                market_value: impact.post_shock_value,
                ..p.clone()
            };
            let post = assess_position(&shocked, &record_request, config)?;
            Ok(PositionStress { impact, pre, post })
        },
    )?;
    Ok((outcome.results, outcome.failures))
}

fn stress_exposures(
    exposures: &[Exposure],
    scenario: &RiskScenario,
    config: &EngineConfig,
) -> RiskEngineResult<(Vec<ExposureStress>, Vec<RecordFailure>)> {
    let overlay = config.stress_overlay(scenario.scenario_type);
    let outcome = run_batch(
        "stress.credit",
        exposures,
        |e| e.id.clone(),
        |_, e| {
            Ok(ExposureStress {
                pre: assess_exposure(e, config, None)?,
                post: assess_exposure(e, config, overlay)?,
            })
        },
    )?;
    Ok((outcome.results, outcome.failures))
}

fn operational_capital(
    input: &StressTestInput,
    config: &EngineConfig,
    failures: &mut Vec<RecordFailure>,
) -> RiskEngineResult<Vec<OperationalCapital>> {
    if input.loss_events.is_empty() {
        return Ok(Vec::new());
    }
    match estimate_capital_record(&input.loss_events, None, &input.operational_params, config) {
        Ok(capital) => Ok(vec![capital]),
        Err(e) if e.is_record_level() => {
            warn!(error = %e, "operational capital left out of stress test");
            failures.push(RecordFailure {
                record_id: "operational".into(),
                kind: e.kind(),
                message: e.to_string(),
            });
            Ok(Vec::new())
        }
        Err(e) => Err(e),
    }
}

/// Shock the portfolio and recompute capital adequacy.
///
/// Credit results are recomputed under the scenario type's PD multiplier and
/// LGD add-on, if configured. Market VaR is re-estimated on shocked market
/// values with the same per-record seeds as the baseline. Operational capital
/// is computed once and used on both sides. The stress loss reduces CET1
/// through deductions; gains are not credited.
pub fn stress_portfolio(
    input: &StressTestInput,
    config: &EngineConfig,
) -> RiskEngineResult<StressTestResult> {
    let request = MarketRiskRequest {
        confidence_levels: vec![config.market.regulatory_confidence],
        method: input.var_method,
        scenario: None,
    };

    let (position_stress, mut failures) =
        stress_positions(&input.positions, &input.scenario, &request, config)?;
    let (exposure_stress, credit_failures) =
        stress_exposures(&input.exposures, &input.scenario, config)?;
    failures.extend(credit_failures);
    let operational = operational_capital(input, config, &mut failures)?;

    let mut pre_market = Vec::with_capacity(position_stress.len());
    let mut post_market = Vec::with_capacity(position_stress.len());
    let mut position_impacts = Vec::with_capacity(position_stress.len());
    for s in position_stress {
        pre_market.push(s.pre);
        post_market.push(s.post);
        position_impacts.push(s.impact);
    }
    let (pre_credit, post_credit): (Vec<_>, Vec<_>) =
        exposure_stress.into_iter().map(|s| (s.pre, s.post)).unzip();

    let pre_stress_value =
        checked_sum(position_impacts.iter().map(|p| p.pre_shock_value), "pre_stress_value")?;
    let post_stress_value =
        checked_sum(position_impacts.iter().map(|p| p.post_shock_value), "post_stress_value")?;
    let market_loss = checked_sum(position_impacts.iter().map(|p| p.loss), "market_loss")?;
    let pre_el = checked_sum(pre_credit.iter().map(|c| c.expected_loss), "pre_expected_credit_loss")?;
    let post_el =
        checked_sum(post_credit.iter().map(|c| c.expected_loss), "post_expected_credit_loss")?;
    let credit_loss_increase = checked(post_el.checked_sub(pre_el), "credit_loss_increase")?;
    let loss_amount = checked(market_loss.checked_add(credit_loss_increase), "loss_amount")?;

    let pre_stress_ratios =
        aggregate_rwa(&pre_credit, &pre_market, &operational, &input.capital, config)?;
    let stressed_capital = CapitalComponents {
        deductions: checked(
            input.capital.deductions.checked_add(loss_amount.max(Decimal::ZERO)),
            "capital.deductions",
        )?,
        ..input.capital.clone()
    };
    let post_stress_ratios =
        aggregate_rwa(&post_credit, &post_market, &operational, &stressed_capital, config)?;

    let loss_pct = if pre_stress_value.is_zero() {
        None
    } else {
        Some(checked(market_loss.checked_div(pre_stress_value.abs()), "loss_pct")?)
    };

    info!(
        scenario = %input.scenario.name,
        loss = %loss_amount,
        pre_cet1 = %pre_stress_ratios.cet1_ratio,
        post_cet1 = %post_stress_ratios.cet1_ratio,
        "stress test complete"
    );

    Ok(StressTestResult {
        scenario: input.scenario.clone(),
        pre_stress_value,
        post_stress_value,
        market_loss,
        pre_expected_credit_loss: pre_el,
        post_expected_credit_loss: post_el,
        credit_loss_increase,
        loss_amount,
        loss_pct,
        post_stress_cet1_ratio: post_stress_ratios.cet1_ratio,
        post_stress_tier1_ratio: post_stress_ratios.tier1_ratio,
        pre_stress_ratios,
        post_stress_ratios,
        position_impacts,
        failures,
    })
}

pub fn run_stress_test(
    input: &StressTestInput,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<StressTestResult>> {
    config.validate()?;
    let result = stress_portfolio(input, config)?;

    let mut warnings = Vec::new();
    if !result.failures.is_empty() {
        warnings.push(format!(
            "{} record(s) excluded from the stress test",
            result.failures.len()
        ));
    }
    if config.stress_overlay(input.scenario.scenario_type).is_none() && !input.exposures.is_empty()
    {
        warnings.push(format!(
            "No credit overlay configured for {:?} scenarios; credit figures unstressed",
            input.scenario.scenario_type
        ));
    }
    if matches!(input.var_method, VarMethod::MonteCarlo { seed: None, .. }) {
        warnings.push("Unseeded Monte Carlo VaR; stress figures are not reproducible".into());
    }
    if result.loss_amount < Decimal::ZERO {
        warnings.push("Scenario produces a net gain; capital left unchanged".into());
    }

    let assumptions = serde_json::json!({
        "scenario": input.scenario,
        "var_method": input.var_method,
        "regulatory_confidence": config.market.regulatory_confidence,
        "credit_overlay": config.stress_overlay(input.scenario.scenario_type),
        "loss_absorption": "cet1",
    });
    Ok(with_metadata(
        "Linear scenario shocks, stressed PD/LGD overlay, re-aggregated Basel III ratios",
        &assumptions,
        warnings,
        &config.version,
        result,
    ))
}
