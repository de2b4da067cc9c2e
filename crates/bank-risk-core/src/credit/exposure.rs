use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RiskEngineError;
use crate::types::{CollateralType, LoanType, Money};
use crate::RiskEngineResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    Employed,
    SelfEmployed,
    Unemployed,
    Retired,
    Student,
}

/// A single credit exposure as delivered by the warehouse staging layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exposure {
    pub id: String,
    /// Required; kept optional so a missing value is reported per record
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub loan_type: Option<LoanType>,
    pub current_balance: Money,
    pub credit_limit: Money,
    #[serde(default)]
    pub collateral_value: Money,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub collateral_type: Option<CollateralType>,
    pub credit_score: Decimal,
    /// Debt-to-income ratio
    pub debt_ratio: Decimal,
    #[serde(default)]
    pub delinquency_count: u32,
    pub employment_status: EmploymentStatus,
    #[serde(default)]
    pub days_past_due: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origination_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maturity_date: Option<NaiveDate>,
}

impl Exposure {
    /// Reject malformed records; returns the loan type on success.
    pub fn validate(&self) -> RiskEngineResult<LoanType> {
        if self.id.trim().is_empty() {
            return Err(RiskEngineError::invalid("id", "exposure id must not be empty"));
        }
        if self.current_balance < Decimal::ZERO {
            return Err(RiskEngineError::invalid(
                "current_balance",
                "cannot be negative",
            ));
        }
        if self.credit_limit < Decimal::ZERO {
            return Err(RiskEngineError::invalid("credit_limit", "cannot be negative"));
        }
        if self.collateral_value < Decimal::ZERO {
            return Err(RiskEngineError::invalid(
                "collateral_value",
                "cannot be negative",
            ));
        }
        if self.debt_ratio < Decimal::ZERO {
            return Err(RiskEngineError::invalid("debt_ratio", "cannot be negative"));
        }
        if let (Some(orig), Some(mat)) = (self.origination_date, self.maturity_date) {
            if mat < orig {
                return Err(RiskEngineError::invalid(
                    "maturity_date",
                    "precedes origination_date",
                ));
            }
        }
        self.loan_type
            .ok_or_else(|| RiskEngineError::invalid("loan_type", "missing loan type"))
    }

    pub fn is_unemployed(&self) -> bool {
        self.employment_status == EmploymentStatus::Unemployed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn exposure() -> Exposure {
        Exposure {
            id: "EXP-1".into(),
            loan_type: Some(LoanType::Retail),
            current_balance: dec!(50000),
            credit_limit: dec!(100000),
            collateral_value: dec!(0),
            collateral_type: None,
            credit_score: dec!(700),
            debt_ratio: dec!(0.3),
            delinquency_count: 0,
            employment_status: EmploymentStatus::Employed,
            days_past_due: 0,
            origination_date: None,
            maturity_date: None,
        }
    }

    #[test]
    fn test_valid_exposure_returns_loan_type() {
        assert_eq!(exposure().validate().unwrap(), LoanType::Retail);
    }

    #[test]
    fn test_negative_balance_rejected() {
        let mut e = exposure();
        e.current_balance = dec!(-1);
        let err = e.validate().unwrap_err();
        assert!(err.to_string().contains("current_balance"));
    }

    #[test]
    fn test_missing_loan_type_rejected() {
        let mut e = exposure();
        e.loan_type = None;
        assert!(matches!(
            e.validate(),
            Err(RiskEngineError::InvalidInput { ref field, .. }) if field == "loan_type"
        ));
    }

    #[test]
    fn test_inverted_dates_rejected() {
        let mut e = exposure();
        e.origination_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        e.maturity_date = NaiveDate::from_ymd_opt(2023, 1, 1);
        assert!(e.validate().is_err());
    }

    #[test]
    fn test_deserialize_defaults() {
        let json = r#"{
            "id": "X",
            "loan_type": "corporate",
            "current_balance": "1000",
            "credit_limit": "2000",
            "credit_score": "680",
            "debt_ratio": "0.2",
            "employment_status": "self_employed"
        }"#;
        let e: Exposure = serde_json::from_str(json).unwrap();
        assert_eq!(e.collateral_value, Decimal::ZERO);
        assert_eq!(e.days_past_due, 0);
        assert_eq!(e.employment_status, EmploymentStatus::SelfEmployed);
    }
}
