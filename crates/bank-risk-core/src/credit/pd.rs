use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::exposure::Exposure;
use crate::config::{PdCoefficientSet, RatingBand};
use crate::types::{checked, checked_sum, CreditRating, Rate};
use crate::RiskEngineResult;

/// Logit is clipped here before exponentiation; beyond it the logistic is
/// already outside any sensible floor/cap.
const LOGIT_CLIP: Decimal = dec!(40);

// ---------------------------------------------------------------------------
// Decimal math helpers
// ---------------------------------------------------------------------------

/// Taylor series exp(x) with range reduction for |x| > 2.
fn decimal_exp(x: Decimal) -> Decimal {
    let two = dec!(2);
    if x > two || x < -two {
        let half = decimal_exp(x / two);
        return half * half;
    }
    let mut sum = Decimal::ONE;
    let mut term = Decimal::ONE;
    for n in 1u32..=25 {
        term = term * x / Decimal::from(n);
        sum += term;
    }
    sum
}

fn logistic(logit: Decimal) -> Decimal {
    let z = logit.clamp(-LOGIT_CLIP, LOGIT_CLIP);
    Decimal::ONE / (Decimal::ONE + decimal_exp(-z))
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Linear predictor of the PD scorecard. Overflow on extreme inputs is a
/// validation error for the exposure.
pub fn pd_logit(exposure: &Exposure, coefficients: &PdCoefficientSet) -> RiskEngineResult<Decimal> {
    let unemployed = if exposure.is_unemployed() {
        Decimal::ONE
    } else {
        Decimal::ZERO
    };
    let terms = [
        coefficients.intercept,
        checked(coefficients.credit_score.checked_mul(exposure.credit_score), "credit_score")?,
        checked(coefficients.debt_ratio.checked_mul(exposure.debt_ratio), "debt_ratio")?,
        checked(
            coefficients
                .delinquency_count
                .checked_mul(Decimal::from(exposure.delinquency_count)),
            "delinquency_count",
        )?,
        coefficients.unemployed * unemployed,
    ];
    checked_sum(terms, "pd_logit")
}

/// Logistic probability of default, clamped to the coefficient set's
/// `[pd_floor, pd_cap]`, which lies strictly inside (0, 1).
pub fn score_pd(exposure: &Exposure, coefficients: &PdCoefficientSet) -> RiskEngineResult<Rate> {
    let logit = pd_logit(exposure, coefficients)?;
    Ok(logistic(logit).clamp(coefficients.pd_floor, coefficients.pd_cap))
}

/// Map a PD onto the configured rating scale. Bands are ascending by edge;
/// the first band whose edge is not below `pd` wins, anything past the last
/// edge is CCC.
pub fn assign_rating(pd: Rate, bands: &[RatingBand]) -> CreditRating {
    bands
        .iter()
        .find(|band| pd <= band.max_pd)
        .map(|band| band.rating)
        .unwrap_or(CreditRating::CCC)
}
