use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::{CapitalMinima, EngineConfig};
use crate::credit::CreditRiskResult;
use crate::error::RiskEngineError;
use crate::market::MarketRiskResult;
use crate::operational::OperationalCapital;
use crate::types::{checked, checked_sum, with_metadata, ComputationOutput, Money, Rate};
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Capital resources of the institution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalComponents {
    /// Common Equity Tier 1, before deductions
    pub cet1: Money,
    /// Additional Tier 1 (CoCos, preferred shares)
    #[serde(default)]
    pub additional_tier1: Money,
    /// Tier 2 (subordinated debt, general provisions)
    #[serde(default)]
    pub tier2: Money,
    /// Regulatory deductions from CET1 (goodwill, deferred tax assets, etc.)
    #[serde(default)]
    pub deductions: Money,
    /// Leverage exposure measure; derived from the portfolio when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverage_exposure: Option<Money>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalRatiosInput {
    pub capital: CapitalComponents,
    #[serde(default)]
    pub credit_results: Vec<CreditRiskResult>,
    #[serde(default)]
    pub market_results: Vec<MarketRiskResult>,
    #[serde(default)]
    pub operational_capital: Vec<OperationalCapital>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CapitalRatios {
    /// CET1 net of deductions
    pub cet1: Money,
    pub tier1: Money,
    pub tier2: Money,
    pub total_capital: Money,
    pub credit_rwa: Money,
    pub market_rwa: Money,
    pub operational_rwa: Money,
    pub total_rwa: Money,
    pub leverage_exposure: Money,
    pub cet1_ratio: Rate,
    pub tier1_ratio: Rate,
    pub total_capital_ratio: Rate,
    pub leverage_ratio: Rate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapitalRatioKind {
    Cet1,
    Tier1,
    TotalCapital,
    Leverage,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioCheck {
    pub ratio: CapitalRatioKind,
    pub actual: Rate,
    pub required: Rate,
    /// `actual − required`; negative when violated
    pub surplus: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceReport {
    pub violations: BTreeSet<CapitalRatioKind>,
    pub checks: Vec<RatioCheck>,
}

impl ComplianceReport {
    pub fn is_compliant(&self) -> bool {
        self.violations.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_components(capital: &CapitalComponents) -> RiskEngineResult<()> {
    for (name, v) in [
        ("capital.cet1", capital.cet1),
        ("capital.additional_tier1", capital.additional_tier1),
        ("capital.tier2", capital.tier2),
        ("capital.deductions", capital.deductions),
    ] {
        if v < Decimal::ZERO {
            return Err(RiskEngineError::invalid(name, "cannot be negative"));
        }
    }
    if let Some(le) = capital.leverage_exposure {
        if le <= Decimal::ZERO {
            return Err(RiskEngineError::invalid(
                "capital.leverage_exposure",
                "must be positive",
            ));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Combine credit, market and operational results into RWA and the four
/// capital ratios.
///
/// Credit RWA follows `capital.credit_rwa_approach`. Market RWA is the sum
/// of each position's VaR at the configured regulatory confidence times
/// `rwa_multiplier`; operational RWA is the sum of LDA capital times the
/// same multiplier. Overflow anywhere is a validation error.
pub fn aggregate_rwa(
    credit: &[CreditRiskResult],
    market: &[MarketRiskResult],
    operational: &[OperationalCapital],
    capital: &CapitalComponents,
    config: &EngineConfig,
) -> RiskEngineResult<CapitalRatios> {
    validate_components(capital)?;
    let multiplier = config.capital.rwa_multiplier;
    let confidence = config.market.regulatory_confidence;
    let approach = config.capital.credit_rwa_approach;

    let credit_rwa = checked_sum(credit.iter().map(|c| c.regulatory_rwa(approach)), "credit_rwa")?;

    let market_var = market
        .iter()
        .map(|m| {
            m.estimate_at(confidence).map(|est| est.var).ok_or_else(|| {
                RiskEngineError::invalid(
                    format!("market_results[{}]", m.position_id),
                    format!("no VaR estimate at the regulatory confidence {confidence}"),
                )
            })
        })
        .collect::<RiskEngineResult<Vec<Money>>>()?;
    let market_rwa = checked(
        checked_sum(market_var, "market_rwa")?.checked_mul(multiplier),
        "market_rwa",
    )?;

    let operational_rwa = checked(
        checked_sum(operational.iter().map(|o| o.capital_requirement), "operational_rwa")?
            .checked_mul(multiplier),
        "operational_rwa",
    )?;

    let total_rwa = checked_sum([credit_rwa, market_rwa, operational_rwa], "total_rwa")?;
    if total_rwa.is_zero() {
        return Err(RiskEngineError::invalid(
            "total_rwa",
            "total RWA is zero; capital ratios are undefined",
        ));
    }

    let leverage_exposure = match capital.leverage_exposure {
        Some(le) => le,
        None => checked_sum(
            credit
                .iter()
                .map(|c| c.ead)
                .chain(market.iter().map(|m| m.market_value.abs())),
            "leverage_exposure",
        )?,
    };
    if leverage_exposure.is_zero() {
        return Err(RiskEngineError::invalid(
            "leverage_exposure",
            "leverage exposure is zero; leverage ratio is undefined",
        ));
    }

    let cet1 = checked(capital.cet1.checked_sub(capital.deductions), "cet1")?;
    let tier1 = checked(cet1.checked_add(capital.additional_tier1), "tier1")?;
    let total_capital = checked(tier1.checked_add(capital.tier2), "total_capital")?;

    Ok(CapitalRatios {
        cet1,
        tier1,
        tier2: capital.tier2,
        total_capital,
        credit_rwa,
        market_rwa,
        operational_rwa,
        total_rwa,
        leverage_exposure,
        cet1_ratio: checked(cet1.checked_div(total_rwa), "cet1_ratio")?,
        tier1_ratio: checked(tier1.checked_div(total_rwa), "tier1_ratio")?,
        total_capital_ratio: checked(total_capital.checked_div(total_rwa), "total_capital_ratio")?,
        leverage_ratio: checked(tier1.checked_div(leverage_exposure), "leverage_ratio")?,
    })
}

/// Compare ratios against supplied minima. The CET1 requirement includes
/// the configured buffers.
pub fn check_compliance(ratios: &CapitalRatios, minima: &CapitalMinima) -> ComplianceReport {
    let checks: Vec<RatioCheck> = [
        (
            CapitalRatioKind::Cet1,
            ratios.cet1_ratio,
            minima.cet1 + minima.buffers.total(),
        ),
        (CapitalRatioKind::Tier1, ratios.tier1_ratio, minima.tier1),
        (
            CapitalRatioKind::TotalCapital,
            ratios.total_capital_ratio,
            minima.total_capital,
        ),
        (CapitalRatioKind::Leverage, ratios.leverage_ratio, minima.leverage),
    ]
    .into_iter()
    .map(|(ratio, actual, required)| RatioCheck {
        ratio,
        actual,
        required,
        surplus: actual - required,
    })
    .collect();

    let violations = checks
        .iter()
        .filter(|c| c.actual < c.required)
        .map(|c| c.ratio)
        .collect();
    ComplianceReport { violations, checks }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

pub fn calculate_capital_ratios(
    input: &CapitalRatiosInput,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<CapitalRatios>> {
    config.validate()?;
    let ratios = aggregate_rwa(
        &input.credit_results,
        &input.market_results,
        &input.operational_capital,
        &input.capital,
        config,
    )?;

    let mut warnings = Vec::new();
    if ratios.cet1 < Decimal::ZERO {
        warnings.push("Deductions exceed CET1; CET1 is negative".into());
    }
    if input.capital.leverage_exposure.is_none() {
        warnings.push(
            "Leverage exposure derived as sum of EAD plus absolute market values".into(),
        );
    }
    info!(
        total_rwa = %ratios.total_rwa,
        cet1_ratio = %ratios.cet1_ratio,
        "capital ratios aggregated"
    );

    let assumptions = serde_json::json!({
        "rwa_multiplier": config.capital.rwa_multiplier.to_string(),
        "credit_rwa_approach": config.capital.credit_rwa_approach,
        "regulatory_confidence": config.market.regulatory_confidence,
        "credit_records": input.credit_results.len(),
        "market_records": input.market_results.len(),
        "operational_records": input.operational_capital.len(),
    });
    Ok(with_metadata(
        "Basel III capital ratios: credit RWA, VaR-based market RWA, LDA operational RWA",
        &assumptions,
        warnings,
        &config.version,
        ratios,
    ))
}

/// Compliance against the configured minima and buffers.
pub fn capital_compliance(
    ratios: &CapitalRatios,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<ComplianceReport>> {
    config.validate()?;
    let report = check_compliance(ratios, &config.capital.minima);
    let warnings = report
        .violations
        .iter()
        .map(|v| format!("{v:?} ratio below requirement"))
        .collect();
    Ok(with_metadata(
        "Ratio comparison against supplied minima; CET1 requirement includes buffers",
        &config.capital.minima,
        warnings,
        &config.version,
        report,
    ))
}
