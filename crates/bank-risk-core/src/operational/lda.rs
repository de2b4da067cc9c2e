use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::batch::{run_batch, BatchOutcome};
use crate::config::EngineConfig;
use crate::error::RiskEngineError;
use crate::statistics::{
    convolve_aggregate_loss, derive_seed, fit_frequency, fit_severity, mean, quantile,
    FrequencyFit, SeverityFit,
};
use crate::types::{to_decimal, to_f64, with_metadata_f64, ComputationOutput, Money};
use crate::RiskEngineResult;

const METHODOLOGY: &str =
    "Loss Distribution Approach: Poisson frequency x lognormal severity, Monte Carlo convolution";

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// A historical operational loss. Event type and business line are opaque
/// labels from the loss database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossEvent {
    pub id: String,
    pub event_date: NaiveDate,
    pub loss_amount: Money,
    pub event_type: String,
    pub business_line: String,
    #[serde(default)]
    pub recovery_amount: Money,
}

impl LossEvent {
    pub fn net_loss(&self) -> Money {
        self.loss_amount - self.recovery_amount
    }

    pub fn validate(&self) -> RiskEngineResult<()> {
        if self.loss_amount < Decimal::ZERO {
            return Err(RiskEngineError::invalid(
                format!("loss_events[{}].loss_amount", self.id),
                "cannot be negative",
            ));
        }
        if self.recovery_amount < Decimal::ZERO || self.recovery_amount > self.loss_amount {
            return Err(RiskEngineError::invalid(
                format!("loss_events[{}].recovery_amount", self.id),
                "must lie between zero and the loss amount",
            ));
        }
        Ok(())
    }
}

/// Simulation parameters; unset fields fall back to the operational config.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapitalParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub percentile: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub simulations: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// Observed net-loss summary of the fitted events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossStatistics {
    pub mean: Money,
    pub std_dev: Money,
    pub max: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationalCapital {
    /// `None` for the portfolio-wide figure
    pub business_line: Option<String>,
    pub percentile: f64,
    pub capital_requirement: Money,
    /// Mean of the simulated annual aggregate loss
    pub expected_loss: Money,
    pub unexpected_loss: Money,
    pub frequency: FrequencyFit,
    pub severity: SeverityFit,
    pub event_count: usize,
    pub observation_years: usize,
    pub simulations: usize,
    pub seed: Option<u64>,
    pub loss_statistics: LossStatistics,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Events per calendar year from the first to the last observed year,
/// including years with no events.
fn annual_counts(events: &[&LossEvent]) -> Vec<u64> {
    let mut per_year: BTreeMap<i32, u64> = BTreeMap::new();
    for e in events {
        *per_year.entry(e.event_date.year()).or_insert(0) += 1;
    }
    match (per_year.keys().next(), per_year.keys().next_back()) {
        (Some(&first), Some(&last)) => (first..=last)
            .map(|y| per_year.get(&y).copied().unwrap_or(0))
            .collect(),
        _ => Vec::new(),
    }
}

fn loss_statistics(net: &[f64]) -> RiskEngineResult<LossStatistics> {
    let m = mean(net)?;
    let var = net.iter().map(|v| (v - m).powi(2)).sum::<f64>() / net.len() as f64;
    let max = net.iter().copied().fold(f64::MIN, f64::max);
    Ok(LossStatistics {
        mean: to_decimal(m, "loss_statistics.mean")?,
        std_dev: to_decimal(var.sqrt(), "loss_statistics.std_dev")?,
        max: to_decimal(max, "loss_statistics.max")?,
        total: to_decimal(net.iter().sum::<f64>(), "loss_statistics.total")?,
    })
}

fn resolve_params(params: &CapitalParams, config: &EngineConfig) -> RiskEngineResult<(f64, usize)> {
    let percentile = params
        .percentile
        .unwrap_or(config.operational.default_percentile);
    if !(percentile > 0.0 && percentile < 1.0) {
        return Err(RiskEngineError::invalid(
            "percentile",
            format!("must lie in (0, 1), got {percentile}"),
        ));
    }
    let simulations = params
        .simulations
        .unwrap_or(config.operational.default_simulations);
    if simulations < 2 || simulations > config.market.max_simulations {
        return Err(RiskEngineError::invalid(
            "simulations",
            format!(
                "must lie in [2, {}], got {simulations}",
                config.market.max_simulations
            ),
        ));
    }
    Ok((percentile, simulations))
}

// ---------------------------------------------------------------------------
// Capital estimation
// ---------------------------------------------------------------------------

/// Events of `business_line` (all events when `None`) that enter the fit.
/// Only the selected events are validated, so a malformed event on another
/// line never affects this one.
fn select_events<'a>(
    events: &'a [LossEvent],
    business_line: Option<&str>,
) -> RiskEngineResult<Vec<&'a LossEvent>> {
    let mut selected = Vec::new();
    for e in events
        .iter()
        .filter(|e| business_line.map_or(true, |bl| e.business_line == bl))
    {
        e.validate()?;
        if e.net_loss() > Decimal::ZERO {
            selected.push(e);
        }
    }
    Ok(selected)
}

/// LDA capital for `events`, optionally restricted to one business line.
///
/// Only events with a positive net loss enter the fit, for both frequency
/// and severity. Too few of them is an insufficient-data error; no fallback
/// distribution is ever substituted.
pub fn estimate_capital_record(
    events: &[LossEvent],
    business_line: Option<&str>,
    params: &CapitalParams,
    config: &EngineConfig,
) -> RiskEngineResult<OperationalCapital> {
    let (percentile, simulations) = resolve_params(params, config)?;
    let selected = select_events(events, business_line)?;

    let net: Vec<f64> = selected
        .iter()
        .map(|e| to_f64(e.net_loss(), "net_loss"))
        .collect::<RiskEngineResult<_>>()?;
    let severity = fit_severity(
        &net,
        config.operational.min_event_count,
        config.operational.severity_method,
    )?;
    let counts = annual_counts(&selected);
    let frequency = fit_frequency(&counts)?;

    let aggregate = convolve_aggregate_loss(&frequency, &severity, simulations, params.seed)?;
    let capital = quantile(&aggregate, percentile)?;
    let el = mean(&aggregate)?;

    debug!(
        business_line = business_line.unwrap_or("all"),
        events = net.len(),
        lambda = frequency.lambda,
        mu = severity.mu,
        sigma = severity.sigma,
        capital,
        "operational capital estimated"
    );

    let capital_requirement = to_decimal(capital, "capital_requirement")?;
    let expected_loss = to_decimal(el, "expected_loss")?;
    Ok(OperationalCapital {
        business_line: business_line.map(str::to_string),
        percentile,
        capital_requirement,
        expected_loss,
        unexpected_loss: (capital_requirement - expected_loss).max(Decimal::ZERO),
        frequency,
        severity,
        event_count: net.len(),
        observation_years: counts.len(),
        simulations,
        seed: params.seed,
        loss_statistics: loss_statistics(&net)?,
    })
}

pub fn estimate_capital(
    events: &[LossEvent],
    business_line: Option<&str>,
    params: &CapitalParams,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<OperationalCapital>> {
    config.validate()?;
    let result = estimate_capital_record(events, business_line, params, config)?;

    let mut warnings = Vec::new();
    if result.observation_years < 5 {
        warnings.push(format!(
            "Only {} year(s) of loss history; frequency estimate is unstable",
            result.observation_years
        ));
    }
    if params.seed.is_none() {
        warnings.push("Unseeded simulation; figures are not reproducible".into());
    }

    Ok(with_metadata_f64(
        METHODOLOGY,
        &serde_json::json!({
            "business_line": business_line,
            "percentile": result.percentile,
            "simulations": result.simulations,
            "severity_method": config.operational.severity_method,
            "min_event_count": config.operational.min_event_count,
        }),
        warnings,
        &config.version,
        result,
    ))
}

/// One capital figure per distinct business line, estimated in parallel.
///
/// Malformed events are screened out first and reported under their own
/// ids; each line is then estimated from its valid events only. With a base
/// seed each line gets a seed derived from its position in the sorted list
/// of lines. Lines with too little data are reported as failures.
pub fn estimate_capital_by_business_line(
    events: &[LossEvent],
    params: &CapitalParams,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<BatchOutcome<OperationalCapital>>> {
    config.validate()?;
    let screened = run_batch(
        "operational.events",
        events,
        |e| e.id.clone(),
        |_, e| e.validate().map(|()| e.clone()),
    )?;
    let valid = screened.results;

    let lines: Vec<String> = valid
        .iter()
        .map(|e| e.business_line.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let outcome = run_batch(
        "operational",
        &lines,
        |line| line.clone(),
        |i, line| {
            let line_params = CapitalParams {
                seed: params.seed.map(|s| derive_seed(s, i as u64)),
                ..*params
            };
            estimate_capital_record(&valid, Some(line.as_str()), &line_params, config)
        },
    )?;

    let mut warnings = Vec::new();
    if !screened.failures.is_empty() {
        warnings.push(format!(
            "{} of {} loss events excluded as malformed",
            screened.failures.len(),
            events.len()
        ));
    }
    if !outcome.failures.is_empty() {
        warnings.push(format!(
            "{} of {} business lines lack sufficient loss data",
            outcome.failures.len(),
            lines.len()
        ));
    }

    let mut failures = screened.failures;
    failures.extend(outcome.failures);
    Ok(with_metadata_f64(
        METHODOLOGY,
        &serde_json::json!({ "business_lines": lines, "params": params }),
        warnings,
        &config.version,
        BatchOutcome {
            results: outcome.results,
            failures,
        },
    ))
}
