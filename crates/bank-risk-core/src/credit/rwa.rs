use crate::config::EngineConfig;
use crate::types::{checked, LoanType, Money, Rate};
use crate::RiskEngineResult;

/// Standardised risk weight for the loan type; a missing table entry is a
/// configuration error, never a default.
pub fn risk_weight(loan_type: LoanType, config: &EngineConfig) -> RiskEngineResult<Rate> {
    config.risk_weight(loan_type)
}

pub fn risk_weighted_assets(ead: Money, weight: Rate) -> RiskEngineResult<Money> {
    checked(ead.checked_mul(weight), "rwa")
}

/// Simplified IRB figure: `EAD × PD × LGD × multiplier`, i.e. expected loss
/// grossed up to an RWA equivalent.
pub fn irb_risk_weighted_assets(expected_loss: Money, multiplier: Rate) -> RiskEngineResult<Money> {
    checked(expected_loss.checked_mul(multiplier), "rwa_irb")
}
