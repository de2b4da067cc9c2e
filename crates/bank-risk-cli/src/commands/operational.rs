use clap::Args;
use serde::Deserialize;
use serde_json::Value;

use bank_risk_core::operational::{
    estimate_capital, estimate_capital_by_business_line, CapitalParams, LossEvent,
};
use bank_risk_core::EngineConfig;

use crate::input;

/// Arguments for operational risk capital
#[derive(Args)]
pub struct OpCapitalArgs {
    /// Path to JSON input: `{events, params}` or a bare array of events
    #[arg(long)]
    pub input: Option<String>,

    /// Restrict to one business line
    #[arg(long, conflicts_with = "by_business_line")]
    pub business_line: Option<String>,

    /// One capital figure per business line
    #[arg(long)]
    pub by_business_line: bool,

    /// Target percentile (default from configuration)
    #[arg(long)]
    pub percentile: Option<f64>,

    /// Simulated years (default from configuration)
    #[arg(long)]
    pub simulations: Option<usize>,

    /// Simulation seed
    #[arg(long)]
    pub seed: Option<u64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OpPayload {
    Events(Vec<LossEvent>),
    WithParams {
        events: Vec<LossEvent>,
        #[serde(default)]
        params: CapitalParams,
    },
}

pub fn run_op_capital(
    args: OpCapitalArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let payload: OpPayload = input::read_payload(args.input.as_deref(), "loss events")?;
    let (events, file_params) = match payload {
        OpPayload::Events(events) => (events, CapitalParams::default()),
        OpPayload::WithParams { events, params } => (events, params),
    };
    // Flags override the file
    let params = CapitalParams {
        percentile: args.percentile.or(file_params.percentile),
        simulations: args.simulations.or(file_params.simulations),
        seed: args.seed.or(file_params.seed),
    };

    if args.by_business_line {
        let result = estimate_capital_by_business_line(&events, &params, config)?;
        Ok(serde_json::to_value(result)?)
    } else {
        let result = estimate_capital(&events, args.business_line.as_deref(), &params, config)?;
        Ok(serde_json::to_value(result)?)
    }
}
