use clap::{Args, ValueEnum};
use serde_json::Value;

use bank_risk_core::EngineConfig;

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ConfigFormat {
    Json,
    Yaml,
}

/// Arguments for printing the active configuration
#[derive(Args)]
pub struct ConfigArgs {
    /// Print as YAML to stdout instead of through the output formatter
    #[arg(long, value_enum, default_value = "json")]
    pub format: ConfigFormat,
}

pub fn run_config(args: ConfigArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    config.validate()?;
    match args.format {
        ConfigFormat::Json => Ok(serde_json::to_value(config)?),
        ConfigFormat::Yaml => {
            print!("{}", serde_yaml::to_string(config)?);
            Ok(Value::Null)
        }
    }
}
