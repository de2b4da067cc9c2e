use clap::Args;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use bank_risk_core::credit::{
    calculate_credit_risk, calculate_credit_risk_batch, EmploymentStatus, Exposure,
};
use bank_risk_core::{EngineConfig, LoanType};

use crate::input;

/// Arguments for credit risk calculation
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct CreditArgs {
    /// Path to JSON input: one exposure object or an array of exposures
    #[arg(long)]
    pub input: Option<String>,

    /// Exposure identifier
    #[arg(long, default_value = "CLI-1")]
    pub id: String,

    /// Loan type (sovereign, bank, corporate, retail, residential_mortgage, commercial_real_estate)
    #[arg(long)]
    pub loan_type: Option<String>,

    /// Drawn balance
    #[arg(long, alias = "balance")]
    pub current_balance: Option<Decimal>,

    /// Committed limit
    #[arg(long, alias = "limit")]
    pub credit_limit: Option<Decimal>,

    /// Collateral market value
    #[arg(long, default_value = "0")]
    pub collateral_value: Decimal,

    /// Bureau credit score
    #[arg(long, alias = "score")]
    pub credit_score: Option<Decimal>,

    /// Debt-to-income ratio
    #[arg(long)]
    pub debt_ratio: Option<Decimal>,

    /// Number of past delinquencies
    #[arg(long, default_value_t = 0)]
    pub delinquency_count: u32,

    /// Borrower is unemployed
    #[arg(long)]
    pub unemployed: bool,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CreditPayload {
    Batch(Vec<Exposure>),
    Single(Box<Exposure>),
}

fn exposure_from_flags(args: &CreditArgs) -> Result<Exposure, Box<dyn std::error::Error>> {
    let loan_type: LoanType = serde_json::from_value(Value::String(
        args.loan_type
            .clone()
            .ok_or("--loan-type is required (or provide --input)")?,
    ))?;
    Ok(Exposure {
        id: args.id.clone(),
        loan_type: Some(loan_type),
        current_balance: args
            .current_balance
            .ok_or("--current-balance is required (or provide --input)")?,
        credit_limit: args
            .credit_limit
            .ok_or("--credit-limit is required (or provide --input)")?,
        collateral_value: args.collateral_value,
        collateral_type: None,
        credit_score: args
            .credit_score
            .ok_or("--credit-score is required (or provide --input)")?,
        debt_ratio: args
            .debt_ratio
            .ok_or("--debt-ratio is required (or provide --input)")?,
        delinquency_count: args.delinquency_count,
        employment_status: if args.unemployed {
            EmploymentStatus::Unemployed
        } else {
            EmploymentStatus::Employed
        },
        days_past_due: 0,
        origination_date: None,
        maturity_date: None,
    })
}

pub fn run_credit(args: CreditArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let payload = if args.input.is_some() || args.loan_type.is_none() {
        input::read_payload::<CreditPayload>(args.input.as_deref(), "exposure input")?
    } else {
        CreditPayload::Single(Box::new(exposure_from_flags(&args)?))
    };

    match payload {
        CreditPayload::Single(exposure) => {
            let result = calculate_credit_risk(&exposure, config)?;
            Ok(serde_json::to_value(result)?)
        }
        CreditPayload::Batch(exposures) => {
            let result = calculate_credit_risk_batch(&exposures, config)?;
            Ok(serde_json::to_value(result)?)
        }
    }
}
