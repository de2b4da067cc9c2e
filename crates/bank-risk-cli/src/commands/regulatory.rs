use clap::Args;
use serde_json::Value;

use bank_risk_core::regulatory::{
    calculate_capital_ratios, capital_compliance, run_stress_test as stress_test, CapitalRatios,
    CapitalRatiosInput, StressTestInput,
};
use bank_risk_core::EngineConfig;

use crate::input;

/// Arguments for capital ratio aggregation
#[derive(Args)]
pub struct CapitalRatiosArgs {
    /// Path to JSON input: `{capital, credit_results, market_results, operational_capital}`
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for compliance checking
#[derive(Args)]
pub struct ComplianceArgs {
    /// Path to JSON input: capital ratios, bare or in a `result` envelope
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for stress testing
#[derive(Args)]
pub struct StressTestArgs {
    /// Path to JSON input: `{exposures, positions, loss_events, capital, scenario, var_method}`
    #[arg(long)]
    pub input: Option<String>,
}

pub fn run_capital_ratios(
    args: CapitalRatiosArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let ratios_input: CapitalRatiosInput =
        input::read_payload(args.input.as_deref(), "capital ratios input")?;
    Ok(serde_json::to_value(calculate_capital_ratios(&ratios_input, config)?)?)
}

pub fn run_compliance(
    args: ComplianceArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let mut raw: Value = input::read_payload(args.input.as_deref(), "capital ratios")?;
    // Accept the output of `capital-ratios` piped straight in
    if let Some(inner) = raw.get_mut("result").map(Value::take) {
        raw = inner;
    }
    let ratios: CapitalRatios = serde_json::from_value(raw)?;
    Ok(serde_json::to_value(capital_compliance(&ratios, config)?)?)
}

pub fn run_stress_test(
    args: StressTestArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let stress_input: StressTestInput =
        input::read_payload(args.input.as_deref(), "stress test input")?;
    Ok(serde_json::to_value(stress_test(&stress_input, config)?)?)
}
