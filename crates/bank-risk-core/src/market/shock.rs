use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::position::{AssetClass, Position};
use crate::error::RiskEngineError;
use crate::batch::{run_batch, BatchOutcome};
use crate::config::EngineConfig;
use crate::types::{checked, with_metadata, ComputationOutput, Money, Rate, ScenarioType};
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Signed fractional shocks; absent fields mean no shock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ShockVector {
    #[serde(default)]
    pub equity_shock: Rate,
    /// Parallel rate move (0.01 = +100bp)
    #[serde(default)]
    pub interest_rate_shock: Rate,
    /// Spread widening (0.01 = +100bp)
    #[serde(default)]
    pub credit_spread_shock: Rate,
    #[serde(default)]
    pub fx_shock: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScenario {
    pub name: String,
    pub scenario_type: ScenarioType,
    #[serde(default)]
    pub shocks: ShockVector,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShockedPosition {
    pub position_id: String,
    pub asset_class: AssetClass,
    pub pre_shock_value: Money,
    pub post_shock_value: Money,
    /// Positive when the position loses value
    pub loss: Money,
    /// Loss over |pre-shock value|; absent for zero-valued positions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loss_pct: Option<Rate>,
}

// ---------------------------------------------------------------------------
// Shock model
// ---------------------------------------------------------------------------

fn duration_of(position: &Position) -> RiskEngineResult<Decimal> {
    position.duration.ok_or_else(|| {
        RiskEngineError::invalid(
            "duration",
            format!(
                "{:?} position {} needs a duration for rate shocks",
                position.asset_class, position.id
            ),
        )
    })
}

/// Multiplicative value factor for the position's asset class.
///
/// Credit instruments take the rate shock and then the spread shock, both
/// through the position's duration (spread duration assumed equal to
/// modified duration). Commodities are outside the shock vector.
pub fn shock_factor(position: &Position, shocks: &ShockVector) -> RiskEngineResult<Decimal> {
    let one = Decimal::ONE;
    let through_duration = |d: Decimal, shock: Decimal| -> RiskEngineResult<Decimal> {
        let shift = checked(d.checked_mul(shock), "shock_factor")?;
        checked(one.checked_sub(shift), "shock_factor")
    };
    let factor = match position.asset_class {
        AssetClass::Equity => checked(one.checked_add(shocks.equity_shock), "equity_shock")?,
        AssetClass::FixedIncome => {
            through_duration(duration_of(position)?, shocks.interest_rate_shock)?
        }
        AssetClass::Credit => {
            let d = duration_of(position)?;
            let rate = through_duration(d, shocks.interest_rate_shock)?;
            let spread = through_duration(d, shocks.credit_spread_shock)?;
            checked(rate.checked_mul(spread), "shock_factor")?
        }
        AssetClass::Fx => checked(one.checked_add(shocks.fx_shock), "fx_shock")?,
        AssetClass::Commodity => one,
    };
    Ok(factor)
}

/// Stressed value of one position under `scenario`.
pub fn apply_shock(position: &Position, scenario: &RiskScenario) -> RiskEngineResult<ShockedPosition> {
    position.validate()?;
    let factor = shock_factor(position, &scenario.shocks)?;
    let pre = position.market_value;
    let post = checked(pre.checked_mul(factor), "post_shock_value")?;
    let loss = checked(pre.checked_sub(post), "loss")?;
    let loss_pct = if pre.is_zero() {
        None
    } else {
        Some(checked(loss.checked_div(pre.abs()), "loss_pct")?)
    };
    Ok(ShockedPosition {
        position_id: position.id.clone(),
        asset_class: position.asset_class,
        pre_shock_value: pre,
        post_shock_value: post,
        loss,
        loss_pct,
    })
}

/// Shock many positions in parallel. Positions that cannot be shocked
/// (missing duration, overflow) are reported in `failures`.
pub fn apply_shock_batch(
    positions: &[Position],
    scenario: &RiskScenario,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<BatchOutcome<ShockedPosition>>> {
    config.validate()?;
    let outcome = run_batch(
        "shock",
        positions,
        |p| p.id.clone(),
        |_, p| apply_shock(p, scenario),
    )?;

    let mut warnings = Vec::new();
    if !outcome.failures.is_empty() {
        warnings.push(format!(
            "{} of {} positions skipped",
            outcome.failures.len(),
            positions.len()
        ));
    }
    Ok(with_metadata(
        "Instantaneous factor shocks; duration approximation for rates and spreads",
        &serde_json::json!({
            "scenario": scenario.name,
            "scenario_type": scenario.scenario_type,
            "spread_duration": "modified duration",
        }),
        warnings,
        &config.version,
        outcome,
    ))
}
