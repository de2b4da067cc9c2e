use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskEngineError;
use crate::RiskEngineResult;

/// All monetary values. Wraps Decimal to prevent accidental f64 usage.
pub type Money = Decimal;

/// Rates, probabilities and ratios expressed as decimals (0.05 = 5%).
pub type Rate = Decimal;

/// Regulatory loan / counterparty classes used for CCF and risk-weight lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    Sovereign,
    Bank,
    Corporate,
    Retail,
    ResidentialMortgage,
    CommercialRealEstate,
}

/// Collateral types for credit risk mitigation haircuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollateralType {
    Cash,
    GovernmentBond,
    CorporateBond,
    Equity,
    RealEstate,
}

/// Ordinal rating scale, best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CreditRating {
    AAA,
    AA,
    A,
    BBB,
    BB,
    B,
    CCC,
}

/// Severity class of a stress scenario.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioType {
    Baseline,
    Adverse,
    Severe,
}

/// Standard computation output envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

/// Metadata for every computation. Carries no timestamps; identical inputs
/// serialise identically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub precision: String,
    /// Version tag of the `EngineConfig` the figures were produced with.
    pub config_version: String,
}

/// Helper to wrap computation results with metadata
pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    config_version: &str,
    result: T,
) -> ComputationOutput<T> {
    envelope(
        methodology,
        assumptions,
        warnings,
        config_version,
        "rust_decimal_128bit",
        result,
    )
}

/// Same as [`with_metadata`] for results whose figures come out of `f64`
/// sampling or quantile estimation.
pub fn with_metadata_f64<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    config_version: &str,
    result: T,
) -> ComputationOutput<T> {
    envelope(
        methodology,
        assumptions,
        warnings,
        config_version,
        "ieee754_f64",
        result,
    )
}

fn envelope<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    config_version: &str,
    precision: &str,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            precision: precision.to_string(),
            config_version: config_version.to_string(),
        },
    }
}

/// Convert a simulated / estimated `f64` into `Decimal`, rejecting NaN and
/// infinities instead of letting them leak into results.
pub fn to_decimal(value: f64, field: &str) -> RiskEngineResult<Decimal> {
    if !value.is_finite() {
        return Err(RiskEngineError::invalid(
            field,
            format!("non-finite value {value}"),
        ));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| RiskEngineError::invalid(field, format!("{value} is outside Decimal range")))
}

pub fn to_f64(value: Decimal, field: &str) -> RiskEngineResult<f64> {
    value
        .to_f64()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RiskEngineError::invalid(field, format!("{value} cannot be represented as f64")))
}

/// Unwrap a `checked_*` Decimal operation; overflow is a validation failure
/// of the record that produced it.
pub fn checked(value: Option<Decimal>, field: &str) -> RiskEngineResult<Decimal> {
    value.ok_or_else(|| RiskEngineError::invalid(field, "arithmetic overflow"))
}

/// Overflow-checked sum.
pub fn checked_sum<I>(values: I, field: &str) -> RiskEngineResult<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, v| checked(acc.checked_add(v), field))
}
