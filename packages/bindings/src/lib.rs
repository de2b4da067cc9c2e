use bank_risk_core::EngineConfig;
use napi::Result as NapiResult;
use napi_derive::napi;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

fn parse<T: DeserializeOwned>(json: &str) -> NapiResult<T> {
    serde_json::from_str(json).map_err(to_napi_error)
}

/// Caller-supplied configuration, or the reference preset.
fn engine_config(config_json: Option<String>) -> NapiResult<EngineConfig> {
    let config = match config_json {
        Some(json) => parse::<EngineConfig>(&json)?,
        None => EngineConfig::reference(),
    };
    config.validate().map_err(to_napi_error)?;
    Ok(config)
}

// ---------------------------------------------------------------------------
// Credit
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
#[serde(untagged)]
enum CreditPayload {
    Batch(Vec<bank_risk_core::credit::Exposure>),
    Single(Box<bank_risk_core::credit::Exposure>),
}

/// One exposure object, or an array of exposures for a batch run.
#[napi]
pub fn credit_risk(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    match parse::<CreditPayload>(&input_json)? {
        CreditPayload::Single(exposure) => {
            let output = bank_risk_core::credit::calculate_credit_risk(&exposure, &config)
                .map_err(to_napi_error)?;
            serde_json::to_string(&output).map_err(to_napi_error)
        }
        CreditPayload::Batch(exposures) => {
            let output = bank_risk_core::credit::calculate_credit_risk_batch(&exposures, &config)
                .map_err(to_napi_error)?;
            serde_json::to_string(&output).map_err(to_napi_error)
        }
    }
}

// ---------------------------------------------------------------------------
// Market
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct MarketRiskPayload {
    positions: Vec<bank_risk_core::market::Position>,
    request: bank_risk_core::market::MarketRiskRequest,
}

#[napi]
pub fn market_risk(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: MarketRiskPayload = parse(&input_json)?;
    let output = bank_risk_core::market::calculate_market_risk_batch(
        &input.positions,
        &input.request,
        &config,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Array of positions; positions without usable derivative terms are
/// reported in `failures`.
#[napi]
pub fn greeks(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let positions: Vec<bank_risk_core::market::Position> = parse(&input_json)?;
    let output = bank_risk_core::market::calculate_greeks_batch(
        &positions,
        &bank_risk_core::market::PricerRegistry::default(),
        &config,
    )
    .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(Deserialize)]
struct ShockPayload {
    positions: Vec<bank_risk_core::market::Position>,
    scenario: bank_risk_core::market::RiskScenario,
}

#[napi]
pub fn scenario_shock(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: ShockPayload = parse(&input_json)?;
    let output =
        bank_risk_core::market::apply_shock_batch(&input.positions, &input.scenario, &config)
            .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn value_at_risk(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: bank_risk_core::market::VarInput = parse(&input_json)?;
    let output = bank_risk_core::market::calculate_var(&input, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn backtest_var(input_json: String) -> NapiResult<String> {
    let input: bank_risk_core::market::BacktestInput = parse(&input_json)?;
    let output = bank_risk_core::market::backtest(&input).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Operational
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct OperationalPayload {
    events: Vec<bank_risk_core::operational::LossEvent>,
    #[serde(default)]
    params: bank_risk_core::operational::CapitalParams,
    #[serde(default)]
    business_line: Option<String>,
    #[serde(default)]
    by_business_line: bool,
}

#[napi]
pub fn operational_capital(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: OperationalPayload = parse(&input_json)?;
    if input.by_business_line {
        let output = bank_risk_core::operational::estimate_capital_by_business_line(
            &input.events,
            &input.params,
            &config,
        )
        .map_err(to_napi_error)?;
        serde_json::to_string(&output).map_err(to_napi_error)
    } else {
        let output = bank_risk_core::operational::estimate_capital(
            &input.events,
            input.business_line.as_deref(),
            &input.params,
            &config,
        )
        .map_err(to_napi_error)?;
        serde_json::to_string(&output).map_err(to_napi_error)
    }
}

// ---------------------------------------------------------------------------
// Regulatory
// ---------------------------------------------------------------------------

#[napi]
pub fn capital_ratios(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: bank_risk_core::regulatory::CapitalRatiosInput = parse(&input_json)?;
    let output = bank_risk_core::regulatory::calculate_capital_ratios(&input, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn capital_compliance(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let ratios: bank_risk_core::regulatory::CapitalRatios = parse(&input_json)?;
    let output = bank_risk_core::regulatory::capital_compliance(&ratios, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn stress_test(input_json: String, config_json: Option<String>) -> NapiResult<String> {
    let config = engine_config(config_json)?;
    let input: bank_risk_core::regulatory::StressTestInput = parse(&input_json)?;
    let output = bank_risk_core::regulatory::run_stress_test(&input, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// The reference configuration, as a starting point for callers' own.
#[napi]
pub fn reference_config() -> NapiResult<String> {
    serde_json::to_string(&EngineConfig::reference()).map_err(to_napi_error)
}
