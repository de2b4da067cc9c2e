use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskEngineError;
use crate::statistics::descriptive::ensure_finite;
use crate::types::Money;
use crate::RiskEngineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetClass {
    Equity,
    FixedIncome,
    Credit,
    Fx,
    Commodity,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstrumentType {
    Spot,
    Bond,
    Option,
    Future,
    Forward,
    Swap,
}

impl InstrumentType {
    pub fn is_derivative(&self) -> bool {
        matches!(
            self,
            InstrumentType::Option
                | InstrumentType::Future
                | InstrumentType::Forward
                | InstrumentType::Swap
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptionKind {
    Call,
    Put,
}

/// Contract terms needed to reprice a derivative for sensitivities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DerivativeTerms {
    /// Required for options
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_kind: Option<OptionKind>,
    pub underlying_price: f64,
    pub strike: f64,
    /// Annualised; required for options
    #[serde(default)]
    pub volatility: f64,
    #[serde(default)]
    pub risk_free_rate: f64,
    /// Years
    pub time_to_expiry: f64,
    /// Contracts × multiplier
    #[serde(default = "default_quantity")]
    pub quantity: f64,
}

fn default_quantity() -> f64 {
    1.0
}

/// A trading-book position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub asset_class: AssetClass,
    pub instrument_type: InstrumentType,
    /// Signed; shorts are negative
    pub market_value: Money,
    #[serde(default)]
    pub notional_value: Money,
    /// Modified duration in years
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Decimal>,
    pub as_of_date: NaiveDate,
    /// Chronological periodic returns
    #[serde(default)]
    pub returns: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derivative: Option<DerivativeTerms>,
}

impl Position {
    pub fn validate(&self) -> RiskEngineResult<()> {
        if self.id.trim().is_empty() {
            return Err(RiskEngineError::invalid("id", "position id must not be empty"));
        }
        ensure_finite(&self.returns, "returns")?;
        if let Some(d) = self.duration {
            if d < Decimal::ZERO {
                return Err(RiskEngineError::invalid("duration", "cannot be negative"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_derivative_classification() {
        assert!(InstrumentType::Option.is_derivative());
        assert!(InstrumentType::Swap.is_derivative());
        assert!(!InstrumentType::Spot.is_derivative());
        assert!(!InstrumentType::Bond.is_derivative());
    }

    #[test]
    fn test_position_json_defaults() {
        let json = r#"{
            "id": "EQ-1",
            "asset_class": "equity",
            "instrument_type": "spot",
            "market_value": "1000000",
            "as_of_date": "2024-06-28"
        }"#;
        let p: Position = serde_json::from_str(json).unwrap();
        assert!(p.returns.is_empty());
        assert_eq!(p.notional_value, Decimal::ZERO);
        assert!(p.derivative.is_none());
        p.validate().unwrap();
    }

    #[test]
    fn test_non_finite_return_rejected() {
        let p = Position {
            id: "P".into(),
            asset_class: AssetClass::Equity,
            instrument_type: InstrumentType::Spot,
            market_value: dec!(100),
            notional_value: dec!(100),
            duration: None,
            as_of_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            returns: vec![0.01, f64::NAN],
            derivative: None,
        };
        assert!(p.validate().is_err());
    }
}
