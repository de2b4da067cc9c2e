use rust_decimal::Decimal;

use super::exposure::Exposure;
use crate::config::EngineConfig;
use crate::error::RiskEngineError;
use crate::types::{checked, Money, Rate};
use crate::RiskEngineResult;

/// `balance + CCF × max(0, limit − balance)`.
///
/// The undrawn amount is floored at zero, so an over-limit exposure keeps
/// its full drawn balance and EAD never falls below the current balance.
pub fn estimate_ead(exposure: &Exposure, ccf: Rate) -> RiskEngineResult<Money> {
    let undrawn = (exposure.credit_limit - exposure.current_balance).max(Decimal::ZERO);
    let drawdown = checked(ccf.checked_mul(undrawn), "exposure_at_default")?;
    checked(
        exposure.current_balance.checked_add(drawdown),
        "exposure_at_default",
    )
}

/// Collateral after the configured haircut for its type.
pub fn effective_collateral(exposure: &Exposure, config: &EngineConfig) -> RiskEngineResult<Money> {
    let haircut = match exposure.collateral_type {
        Some(ct) => config.collateral_haircut(ct)?,
        None => Decimal::ZERO,
    };
    checked(
        exposure.collateral_value.checked_mul(Decimal::ONE - haircut),
        "collateral_value",
    )
}

/// `max(0, 1 − effective_collateral / EAD)`, floored at `lgd_floor` and
/// capped at 1.
pub fn estimate_lgd(exposure: &Exposure, ead: Money, config: &EngineConfig) -> RiskEngineResult<Rate> {
    if ead <= Decimal::ZERO {
        return Err(RiskEngineError::invalid(
            "exposure_at_default",
            "EAD is zero; LGD is undefined",
        ));
    }
    let collateral = effective_collateral(exposure, config)?;
    // Coverage beyond 1 only matters as "fully secured"
    let coverage = collateral.checked_div(ead).unwrap_or(Decimal::MAX);
    let unsecured = (Decimal::ONE - coverage.min(Decimal::ONE)).max(Decimal::ZERO);
    Ok(unsecured.max(config.lgd_floor).min(Decimal::ONE))
}

/// `PD × LGD × EAD`; both rates lie in [0, 1], so EL never exceeds EAD.
pub fn expected_loss(pd: Rate, lgd: Rate, ead: Money) -> RiskEngineResult<Money> {
    let rate = checked(pd.checked_mul(lgd), "expected_loss")?;
    checked(rate.checked_mul(ead), "expected_loss")
}
