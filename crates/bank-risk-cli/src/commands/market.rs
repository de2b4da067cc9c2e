use clap::{Args, ValueEnum};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use bank_risk_core::market::{
    apply_shock_batch, backtest, calculate_greeks_batch, calculate_market_risk_batch,
    calculate_var, BacktestInput, MarketRiskRequest, Position, PricerRegistry, RiskScenario,
    VarInput, VarMethod,
};
use bank_risk_core::EngineConfig;

use crate::input;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum MethodArg {
    Historical,
    Parametric,
    MonteCarlo,
}

/// Arguments for VaR / CVaR
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct VarArgs {
    /// Path to JSON input: a bare series request, or `{positions, request}`
    #[arg(long)]
    pub input: Option<String>,

    /// Comma-separated periodic returns
    #[arg(long, value_delimiter = ',')]
    pub returns: Option<Vec<f64>>,

    /// Position market value
    #[arg(long, default_value = "1000000")]
    pub market_value: Decimal,

    /// Confidence levels (repeatable or comma-separated)
    #[arg(long, value_delimiter = ',', default_values_t = vec![0.95, 0.99])]
    pub confidence: Vec<f64>,

    /// Estimation method
    #[arg(long, value_enum, default_value = "historical")]
    pub method: MethodArg,

    /// Monte Carlo simulations
    #[arg(long, default_value_t = 10_000)]
    pub simulations: usize,

    /// Monte Carlo seed
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for Greeks
#[derive(Args)]
pub struct GreeksArgs {
    /// Path to JSON input: an array of positions
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for scenario shocks
#[derive(Args)]
pub struct ShockArgs {
    /// Path to JSON input: `{positions, scenario}`
    #[arg(long)]
    pub input: Option<String>,
}

/// Arguments for VaR backtesting
#[derive(Args)]
pub struct BacktestArgs {
    /// Path to JSON input: `{confidence_level, dates, var_series, pnl_series}`
    #[arg(long)]
    pub input: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum VarPayload {
    Positions {
        positions: Vec<Position>,
        request: MarketRiskRequest,
    },
    Series(VarInput),
}

#[derive(Deserialize)]
struct ShockPayload {
    positions: Vec<Position>,
    scenario: RiskScenario,
}

fn method_from_args(args: &VarArgs) -> VarMethod {
    match args.method {
        MethodArg::Historical => VarMethod::Historical,
        MethodArg::Parametric => VarMethod::Parametric,
        MethodArg::MonteCarlo => VarMethod::MonteCarlo {
            simulations: args.simulations,
            seed: args.seed,
        },
    }
}

pub fn run_var(args: VarArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let payload = match (&args.input, &args.returns) {
        (None, Some(returns)) => VarPayload::Series(VarInput {
            market_value: args.market_value,
            returns: returns.clone(),
            confidence_levels: args.confidence.clone(),
            method: method_from_args(&args),
        }),
        _ => input::read_payload(args.input.as_deref(), "VaR input")?,
    };

    match payload {
        VarPayload::Series(var_input) => Ok(serde_json::to_value(calculate_var(&var_input, config)?)?),
        VarPayload::Positions { positions, request } => Ok(serde_json::to_value(
            calculate_market_risk_batch(&positions, &request, config)?,
        )?),
    }
}

pub fn run_greeks(args: GreeksArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let positions: Vec<Position> = input::read_payload(args.input.as_deref(), "positions")?;
    let result = calculate_greeks_batch(&positions, &PricerRegistry::default(), config)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_shock(args: ShockArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let payload: ShockPayload = input::read_payload(args.input.as_deref(), "shock input")?;
    let result = apply_shock_batch(&payload.positions, &payload.scenario, config)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_backtest(args: BacktestArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let bt: BacktestInput = input::read_payload(args.input.as_deref(), "backtest input")?;
    Ok(serde_json::to_value(backtest(&bt)?)?)
}
