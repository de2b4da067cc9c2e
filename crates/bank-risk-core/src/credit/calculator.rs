use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::exposure::Exposure;
use super::lgd_ead::{estimate_ead, estimate_lgd, expected_loss};
use super::pd::{assign_rating, score_pd};
use super::rwa::{irb_risk_weighted_assets, risk_weight, risk_weighted_assets};
use crate::batch::{run_batch, BatchOutcome, RecordFailure};
use crate::config::{CreditRwaApproach, CreditStressOverlay, EngineConfig};
use crate::types::{
    checked, checked_sum, with_metadata, ComputationOutput, CreditRating, LoanType, Money, Rate,
};
use crate::RiskEngineResult;

const METHODOLOGY: &str = "Logistic PD scorecard, collateral-based LGD, CCF-based EAD, \
                           standardised risk weights";

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditRiskResult {
    pub exposure_id: String,
    pub loan_type: LoanType,
    pub pd: Rate,
    pub lgd: Rate,
    pub ead: Money,
    pub expected_loss: Money,
    pub risk_weight: Rate,
    /// Standardised: `EAD × risk_weight`
    pub rwa: Money,
    /// Simplified IRB: `EAD × PD × LGD × rwa_multiplier`
    pub rwa_irb: Money,
    pub rating: CreditRating,
    pub days_past_due: u32,
    /// `name@version` of the PD coefficient set used
    pub pd_model: String,
}

impl CreditRiskResult {
    /// The RWA figure the configured approach reports to capital.
    pub fn regulatory_rwa(&self, approach: CreditRwaApproach) -> Money {
        match approach {
            CreditRwaApproach::Standardised => self.rwa,
            CreditRwaApproach::Irb => self.rwa_irb,
        }
    }
}

/// Portfolio-level RWA totals over the computed exposures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditPortfolioSummary {
    pub exposure_count: usize,
    /// Sum of EAD
    pub total_exposure: Money,
    pub total_expected_loss: Money,
    pub total_rwa: Money,
    pub total_rwa_irb: Money,
    /// `total_rwa / total_exposure`; absent for a zero-exposure portfolio
    pub average_risk_weight: Option<Rate>,
}

/// Batch credit output: per-exposure results, skipped records and the
/// portfolio summary of the results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreditPortfolioRisk {
    pub results: Vec<CreditRiskResult>,
    pub failures: Vec<RecordFailure>,
    pub summary: CreditPortfolioSummary,
}

impl CreditPortfolioRisk {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Record pipeline
// ---------------------------------------------------------------------------

/// PD → EAD → LGD → EL → RWA → rating for one exposure, optionally under a
/// stress overlay (PD multiplied then re-clamped, LGD add-on capped at 1).
/// Arithmetic overflow on extreme inputs fails the record, not the batch.
pub fn assess_exposure(
    exposure: &Exposure,
    config: &EngineConfig,
    overlay: Option<&CreditStressOverlay>,
) -> RiskEngineResult<CreditRiskResult> {
    let loan_type = exposure.validate()?;
    let coeffs = &config.pd_model;

    let mut pd = score_pd(exposure, coeffs)?;
    let ccf = config.credit_conversion_factor(loan_type)?;
    let ead = estimate_ead(exposure, ccf)?;
    let mut lgd = estimate_lgd(exposure, ead, config)?;
    if let Some(o) = overlay {
        pd = checked(pd.checked_mul(o.pd_multiplier), "pd")?.clamp(coeffs.pd_floor, coeffs.pd_cap);
        lgd = (lgd + o.lgd_add_on).min(Decimal::ONE);
    }

    let weight = risk_weight(loan_type, config)?;
    let el = expected_loss(pd, lgd, ead)?;
    let result = CreditRiskResult {
        exposure_id: exposure.id.clone(),
        loan_type,
        pd,
        lgd,
        ead,
        expected_loss: el,
        risk_weight: weight,
        rwa: risk_weighted_assets(ead, weight)?,
        rwa_irb: irb_risk_weighted_assets(el, config.capital.rwa_multiplier)?,
        rating: assign_rating(pd, &config.rating_bands),
        days_past_due: exposure.days_past_due,
        pd_model: format!("{}@{}", coeffs.name, coeffs.version),
    };
    debug!(
        exposure_id = %result.exposure_id,
        pd = %result.pd,
        el = %result.expected_loss,
        rwa = %result.rwa,
        "credit exposure assessed"
    );
    Ok(result)
}

/// Totals and average risk weight over `results`.
pub fn summarize_credit_portfolio(
    results: &[CreditRiskResult],
) -> RiskEngineResult<CreditPortfolioSummary> {
    let total_exposure = checked_sum(results.iter().map(|r| r.ead), "summary.total_exposure")?;
    let total_rwa = checked_sum(results.iter().map(|r| r.rwa), "summary.total_rwa")?;
    let average_risk_weight = if total_exposure.is_zero() {
        None
    } else {
        total_rwa.checked_div(total_exposure)
    };
    Ok(CreditPortfolioSummary {
        exposure_count: results.len(),
        total_exposure,
        total_expected_loss: checked_sum(
            results.iter().map(|r| r.expected_loss),
            "summary.total_expected_loss",
        )?,
        total_rwa,
        total_rwa_irb: checked_sum(results.iter().map(|r| r.rwa_irb), "summary.total_rwa_irb")?,
        average_risk_weight,
    })
}

fn assumptions(config: &EngineConfig) -> serde_json::Value {
    serde_json::json!({
        "pd_model": format!("{}@{}", config.pd_model.name, config.pd_model.version),
        "pd_floor": config.pd_model.pd_floor.to_string(),
        "pd_cap": config.pd_model.pd_cap.to_string(),
        "lgd_floor": config.lgd_floor.to_string(),
        "rwa_multiplier": config.capital.rwa_multiplier.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Credit risk figures for a single exposure.
pub fn calculate_credit_risk(
    exposure: &Exposure,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<CreditRiskResult>> {
    config.validate()?;
    let result = assess_exposure(exposure, config, None)?;

    let mut warnings = Vec::new();
    if result.pd == config.pd_model.pd_cap {
        warnings.push(format!("PD clamped at cap {}", config.pd_model.pd_cap));
    }
    if result.days_past_due >= 90 {
        warnings.push(format!(
            "Exposure is {} days past due; consider treating as defaulted",
            result.days_past_due
        ));
    }

    Ok(with_metadata(
        METHODOLOGY,
        &assumptions(config),
        warnings,
        &config.version,
        result,
    ))
}

/// Credit risk for many exposures in parallel, with the portfolio RWA
/// summary. Malformed records are skipped and reported in `failures`;
/// configuration errors abort.
pub fn calculate_credit_risk_batch(
    exposures: &[Exposure],
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<CreditPortfolioRisk>> {
    config.validate()?;
    let outcome = assess_exposures(exposures, config, None)?;
    let summary = summarize_credit_portfolio(&outcome.results)?;

    let mut warnings = Vec::new();
    if !outcome.failures.is_empty() {
        warnings.push(format!(
            "{} of {} exposures skipped",
            outcome.failures.len(),
            exposures.len()
        ));
    }

    Ok(with_metadata(
        METHODOLOGY,
        &assumptions(config),
        warnings,
        &config.version,
        CreditPortfolioRisk {
            results: outcome.results,
            failures: outcome.failures,
            summary,
        },
    ))
}

pub(crate) fn assess_exposures(
    exposures: &[Exposure],
    config: &EngineConfig,
    overlay: Option<&CreditStressOverlay>,
) -> RiskEngineResult<BatchOutcome<CreditRiskResult>> {
    run_batch(
        "credit",
        exposures,
        |e| e.id.clone(),
        |_, e| assess_exposure(e, config, overlay),
    )
}
