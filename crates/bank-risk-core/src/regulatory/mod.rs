//! Regulatory capital: RWA aggregation across risk types, Basel III ratios,
//! compliance against configured minima and scenario stress tests.

pub mod capital;
pub mod stress;

pub use capital::{
    aggregate_rwa, calculate_capital_ratios, capital_compliance, check_compliance,
    CapitalComponents, CapitalRatioKind, CapitalRatios, CapitalRatiosInput, ComplianceReport,
    RatioCheck,
};
pub use stress::{run_stress_test, stress_portfolio, StressTestInput, StressTestResult};
