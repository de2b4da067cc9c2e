mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use commands::config::ConfigArgs;
use commands::credit::CreditArgs;
use commands::market::{BacktestArgs, GreeksArgs, ShockArgs, VarArgs};
use commands::operational::OpCapitalArgs;
use commands::regulatory::{CapitalRatiosArgs, ComplianceArgs, StressTestArgs};

/// Bank risk-metrics engine
#[derive(Parser)]
#[command(
    name = "brisk",
    version,
    about = "Bank risk-metrics engine",
    long_about = "Credit, market and operational risk figures, Basel III capital ratios \
                  and scenario stress tests. Inputs are JSON files or piped JSON; \
                  results are written to stdout, logs to stderr."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Engine configuration (YAML or JSON); the reference preset when absent
    #[arg(long, global = true)]
    config: Option<String>,

    /// Debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// PD, LGD, EAD, expected loss and RWA for one exposure or a batch
    Credit(CreditArgs),
    /// VaR and CVaR for a return series or a batch of positions
    Var(VarArgs),
    /// Finite-difference Greeks for derivative positions
    Greeks(GreeksArgs),
    /// Apply a scenario shock to positions
    Shock(ShockArgs),
    /// Count VaR exceptions against realised P&L
    Backtest(BacktestArgs),
    /// Operational risk capital (Loss Distribution Approach)
    OpCapital(OpCapitalArgs),
    /// Aggregate RWA into Basel III capital ratios
    CapitalRatios(CapitalRatiosArgs),
    /// Check capital ratios against configured minima
    Compliance(ComplianceArgs),
    /// Shock a portfolio and recompute capital ratios
    StressTest(StressTestArgs),
    /// Print the active engine configuration
    Config(ConfigArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("bank_risk_core=debug,brisk=debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    // stdout carries results only
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::Version = cli.command {
        println!("brisk {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let config = match input::config::load_config(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(2);
        }
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Credit(args) => commands::credit::run_credit(args, &config),
        Commands::Var(args) => commands::market::run_var(args, &config),
        Commands::Greeks(args) => commands::market::run_greeks(args, &config),
        Commands::Shock(args) => commands::market::run_shock(args, &config),
        Commands::Backtest(args) => commands::market::run_backtest(args),
        Commands::OpCapital(args) => commands::operational::run_op_capital(args, &config),
        Commands::CapitalRatios(args) => commands::regulatory::run_capital_ratios(args, &config),
        Commands::Compliance(args) => commands::regulatory::run_compliance(args, &config),
        Commands::StressTest(args) => commands::regulatory::run_stress_test(args, &config),
        Commands::Config(args) => commands::config::run_config(args, &config),
        Commands::Version => return,
    };

    match result {
        // Command wrote its own output
        Ok(serde_json::Value::Null) => process::exit(0),
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
