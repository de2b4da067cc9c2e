use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};

use super::position::{DerivativeTerms, InstrumentType, OptionKind, Position};
use crate::batch::{run_batch, BatchOutcome};
use crate::config::{EngineConfig, GreeksConfig};
use crate::error::RiskEngineError;
use crate::types::{with_metadata_f64, ComputationOutput};
use crate::RiskEngineResult;

/// First and second order sensitivities, per unit of underlying price and
/// per unit (not per point) of volatility, scaled by position quantity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Greeks {
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
}

/// Prices a derivative at a given underlying level and volatility.
pub trait PricingFunction: Send + Sync {
    fn name(&self) -> &'static str;

    /// Check the terms this pricer needs before any repricing.
    fn validate(&self, terms: &DerivativeTerms) -> RiskEngineResult<()>;

    /// Unit price (quantity excluded).
    fn price(&self, terms: &DerivativeTerms, underlying: f64, volatility: f64) -> f64;

    /// Whether the price depends on volatility at all.
    fn vol_sensitive(&self) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// Pricers
// ---------------------------------------------------------------------------

/// Black–Scholes European option value.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackScholesPricer;

impl PricingFunction for BlackScholesPricer {
    fn name(&self) -> &'static str {
        "black_scholes"
    }

    fn validate(&self, terms: &DerivativeTerms) -> RiskEngineResult<()> {
        if terms.option_kind.is_none() {
            return Err(RiskEngineError::invalid(
                "derivative.option_kind",
                "option positions need a call/put kind",
            ));
        }
        if !(terms.volatility.is_finite() && terms.volatility > 0.0) {
            return Err(RiskEngineError::invalid(
                "derivative.volatility",
                "must be positive for option pricing",
            ));
        }
        if !(terms.time_to_expiry.is_finite() && terms.time_to_expiry > 0.0) {
            return Err(RiskEngineError::invalid(
                "derivative.time_to_expiry",
                "must be positive for option pricing",
            ));
        }
        if !(terms.strike.is_finite() && terms.strike > 0.0) {
            return Err(RiskEngineError::invalid("derivative.strike", "must be positive"));
        }
        Ok(())
    }

    fn price(&self, terms: &DerivativeTerms, underlying: f64, volatility: f64) -> f64 {
        let std_normal = match Normal::new(0.0, 1.0) {
            Ok(n) => n,
            Err(_) => return f64::NAN,
        };
        let t = terms.time_to_expiry;
        let k = terms.strike;
        let r = terms.risk_free_rate;
        let sqrt_t = t.sqrt();
        let d1 = ((underlying / k).ln() + (r + 0.5 * volatility * volatility) * t)
            / (volatility * sqrt_t);
        let d2 = d1 - volatility * sqrt_t;
        let discount = (-r * t).exp();
        match terms.option_kind {
            Some(OptionKind::Put) => {
                k * discount * std_normal.cdf(-d2) - underlying * std_normal.cdf(-d1)
            }
            _ => underlying * std_normal.cdf(d1) - k * discount * std_normal.cdf(d2),
        }
    }
}

/// Linear forward-style payoff `S − K·e^{−rT}` for futures, forwards and
/// swaps (swap terms expressed as the fixed leg's forward level).
#[derive(Debug, Clone, Copy, Default)]
pub struct ForwardPricer;

impl PricingFunction for ForwardPricer {
    fn name(&self) -> &'static str {
        "discounted_forward"
    }

    fn validate(&self, terms: &DerivativeTerms) -> RiskEngineResult<()> {
        if !(terms.time_to_expiry.is_finite() && terms.time_to_expiry >= 0.0) {
            return Err(RiskEngineError::invalid(
                "derivative.time_to_expiry",
                "cannot be negative",
            ));
        }
        Ok(())
    }

    fn price(&self, terms: &DerivativeTerms, underlying: f64, _volatility: f64) -> f64 {
        underlying - terms.strike * (-terms.risk_free_rate * terms.time_to_expiry).exp()
    }

    fn vol_sensitive(&self) -> bool {
        false
    }
}

/// Default pricer for an instrument type, `None` for non-derivatives.
pub fn pricer_for(instrument_type: InstrumentType) -> Option<&'static dyn PricingFunction> {
    match instrument_type {
        InstrumentType::Option => Some(&BlackScholesPricer),
        InstrumentType::Future | InstrumentType::Forward | InstrumentType::Swap => {
            Some(&ForwardPricer)
        }
        InstrumentType::Spot | InstrumentType::Bond => None,
    }
}

// ---------------------------------------------------------------------------
// Finite differences
// ---------------------------------------------------------------------------

/// Central-difference delta, gamma and vega of `pricer` at the contract's
/// current underlying and volatility.
pub fn greeks_with(
    pricer: &dyn PricingFunction,
    terms: &DerivativeTerms,
    bumps: &GreeksConfig,
) -> RiskEngineResult<Greeks> {
    if !(terms.underlying_price.is_finite() && terms.underlying_price > 0.0) {
        return Err(RiskEngineError::invalid(
            "derivative.underlying_price",
            "must be positive",
        ));
    }
    if !terms.quantity.is_finite() {
        return Err(RiskEngineError::invalid("derivative.quantity", "must be finite"));
    }
    pricer.validate(terms)?;

    let s = terms.underlying_price;
    let vol = terms.volatility;
    let h = s * bumps.spot_bump;

    let up = pricer.price(terms, s + h, vol);
    let mid = pricer.price(terms, s, vol);
    let down = pricer.price(terms, s - h, vol);
    let delta = (up - down) / (2.0 * h);
    let gamma = (up - 2.0 * mid + down) / (h * h);

    let vega = if pricer.vol_sensitive() {
        let dv = bumps.vol_bump.min(vol / 2.0);
        (pricer.price(terms, s, vol + dv) - pricer.price(terms, s, vol - dv)) / (2.0 * dv)
    } else {
        0.0
    };

    let greeks = Greeks {
        delta: delta * terms.quantity,
        gamma: gamma * terms.quantity,
        vega: vega * terms.quantity,
    };
    if !(greeks.delta.is_finite() && greeks.gamma.is_finite() && greeks.vega.is_finite()) {
        return Err(RiskEngineError::invalid(
            "derivative",
            format!("{} produced non-finite sensitivities", pricer.name()),
        ));
    }
    Ok(greeks)
}

// ---------------------------------------------------------------------------
// Pricer selection
// ---------------------------------------------------------------------------

/// Pricing functions by instrument type. Types without an entry fall back to
/// [`pricer_for`]; registering a pricer for a spot or bond type gives those
/// positions Greeks too.
#[derive(Clone, Default)]
pub struct PricerRegistry {
    overrides: HashMap<InstrumentType, Arc<dyn PricingFunction>>,
}

impl PricerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_pricer(
        mut self,
        instrument_type: InstrumentType,
        pricer: impl PricingFunction + 'static,
    ) -> Self {
        self.overrides.insert(instrument_type, Arc::new(pricer));
        self
    }

    pub fn pricer(&self, instrument_type: InstrumentType) -> Option<&dyn PricingFunction> {
        match self.overrides.get(&instrument_type) {
            Some(p) => Some(p.as_ref()),
            None => pricer_for(instrument_type),
        }
    }
}

impl PricerRegistry {
    /// `instrument_type=pricer` for each override, sorted.
    pub fn overrides(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .overrides
            .iter()
            .map(|(k, p)| format!("{k:?}={}", p.name()))
            .collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for PricerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PricerRegistry")
            .field("overrides", &self.overrides())
            .finish()
    }
}

/// Greeks through the pricer `pricers` selects for the position's
/// instrument type; `Ok(None)` when no pricer applies.
pub fn compute_greeks_with(
    position: &Position,
    bumps: &GreeksConfig,
    pricers: &PricerRegistry,
) -> RiskEngineResult<Option<Greeks>> {
    let Some(pricer) = pricers.pricer(position.instrument_type) else {
        return Ok(None);
    };
    let terms = position.derivative.as_ref().ok_or_else(|| {
        RiskEngineError::invalid(
            "derivative",
            format!(
                "{:?} position {} has no derivative terms",
                position.instrument_type, position.id
            ),
        )
    })?;
    greeks_with(pricer, terms, bumps).map(Some)
}

/// Greeks for derivative positions with the default pricers; `Ok(None)` for
/// spot and bond positions.
pub fn compute_greeks(position: &Position, bumps: &GreeksConfig) -> RiskEngineResult<Option<Greeks>> {
    compute_greeks_with(position, bumps, &PricerRegistry::default())
}

// ---------------------------------------------------------------------------
// Batch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionGreeks {
    pub position_id: String,
    /// `None` for positions no pricer applies to
    pub greeks: Option<Greeks>,
}

/// Greeks for many positions in parallel; positions with missing or invalid
/// derivative terms are reported in `failures`.
pub fn calculate_greeks_batch(
    positions: &[Position],
    pricers: &PricerRegistry,
    config: &EngineConfig,
) -> RiskEngineResult<ComputationOutput<BatchOutcome<PositionGreeks>>> {
    config.validate()?;
    let bumps = &config.market.greeks;
    let outcome = run_batch(
        "greeks",
        positions,
        |p| p.id.clone(),
        |_, p| {
            Ok(PositionGreeks {
                position_id: p.id.clone(),
                greeks: compute_greeks_with(p, bumps, pricers)?,
            })
        },
    )?;

    let mut warnings = Vec::new();
    if !outcome.failures.is_empty() {
        warnings.push(format!(
            "{} of {} positions skipped",
            outcome.failures.len(),
            positions.len()
        ));
    }
    Ok(with_metadata_f64(
        "Central finite differences of the instrument pricer (delta, gamma, vega)",
        &serde_json::json!({
            "spot_bump": bumps.spot_bump,
            "vol_bump": bumps.vol_bump,
            "pricer_overrides": pricers.overrides(),
        }),
        warnings,
        &config.version,
        outcome,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::position::AssetClass;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn bumps() -> GreeksConfig {
        GreeksConfig {
            spot_bump: 0.01,
            vol_bump: 0.01,
        }
    }

    fn atm(kind: OptionKind) -> DerivativeTerms {
        DerivativeTerms {
            option_kind: Some(kind),
            underlying_price: 100.0,
            strike: 100.0,
            volatility: 0.2,
            risk_free_rate: 0.05,
            time_to_expiry: 1.0,
            quantity: 1.0,
        }
    }

    fn position(instrument_type: InstrumentType, terms: Option<DerivativeTerms>) -> Position {
        Position {
            id: "D".into(),
            asset_class: AssetClass::Equity,
            instrument_type,
            market_value: dec!(1000),
            notional_value: dec!(10000),
            duration: None,
            as_of_date: NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            returns: vec![],
            derivative: terms,
        }
    }

    #[test]
    fn test_black_scholes_reference_price() {
        // S=K=100, r=5%, sigma=20%, T=1: call ~ 10.4506
        let c = BlackScholesPricer.price(&atm(OptionKind::Call), 100.0, 0.2);
        assert!((c - 10.4506).abs() < 1e-3, "call={c}");
        let p = BlackScholesPricer.price(&atm(OptionKind::Put), 100.0, 0.2);
        let parity = c - p - (100.0 - 100.0 * (-0.05_f64).exp());
        assert!(parity.abs() < 1e-9);
    }

    #[test]
    fn test_call_greeks_match_analytic() {
        let g = greeks_with(&BlackScholesPricer, &atm(OptionKind::Call), &bumps()).unwrap();
        // d1 = 0.35: N(d1) = 0.63683, phi(d1) = 0.37524
        assert!((g.delta - 0.63683).abs() < 1e-3, "delta={}", g.delta);
        assert!((g.gamma - 0.018762).abs() < 1e-4, "gamma={}", g.gamma);
        assert!((g.vega - 37.524).abs() < 0.05, "vega={}", g.vega);
    }

    #[test]
    fn test_put_call_delta_parity() {
        let c = greeks_with(&BlackScholesPricer, &atm(OptionKind::Call), &bumps()).unwrap();
        let p = greeks_with(&BlackScholesPricer, &atm(OptionKind::Put), &bumps()).unwrap();
        assert!((c.delta - p.delta - 1.0).abs() < 1e-6);
        assert!((c.gamma - p.gamma).abs() < 1e-6);
    }

    #[test]
    fn test_quantity_scales_greeks() {
        let mut t = atm(OptionKind::Call);
        let one = greeks_with(&BlackScholesPricer, &t, &bumps()).unwrap();
        t.quantity = -10.0;
        let ten = greeks_with(&BlackScholesPricer, &t, &bumps()).unwrap();
        assert!((ten.delta + 10.0 * one.delta).abs() < 1e-9);
    }

    #[test]
    fn test_forward_greeks_linear() {
        let terms = DerivativeTerms {
            option_kind: None,
            underlying_price: 50.0,
            strike: 48.0,
            volatility: 0.0,
            risk_free_rate: 0.03,
            time_to_expiry: 0.5,
            quantity: 100.0,
        };
        let g = compute_greeks(&position(InstrumentType::Future, Some(terms)), &bumps())
            .unwrap()
            .unwrap();
        assert!((g.delta - 100.0).abs() < 1e-6);
        assert!(g.gamma.abs() < 1e-6);
        assert_eq!(g.vega, 0.0);
    }

    #[test]
    fn test_non_derivative_has_no_greeks() {
        assert!(compute_greeks(&position(InstrumentType::Spot, None), &bumps())
            .unwrap()
            .is_none());
        assert!(compute_greeks(&position(InstrumentType::Bond, None), &bumps())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_derivative_without_terms_rejected() {
        let err = compute_greeks(&position(InstrumentType::Option, None), &bumps()).unwrap_err();
        assert!(err.is_record_level());
    }

    /// Flat-price stand-in for a desk model.
    struct LinearPricer;

    impl PricingFunction for LinearPricer {
        fn name(&self) -> &'static str {
            "linear"
        }

        fn validate(&self, _terms: &DerivativeTerms) -> RiskEngineResult<()> {
            Ok(())
        }

        fn price(&self, _terms: &DerivativeTerms, underlying: f64, _volatility: f64) -> f64 {
            2.0 * underlying
        }

        fn vol_sensitive(&self) -> bool {
            false
        }
    }

    #[test]
    fn test_registry_overrides_default_pricer() {
        let pricers = PricerRegistry::new().with_pricer(InstrumentType::Option, LinearPricer);
        let pos = position(InstrumentType::Option, Some(atm(OptionKind::Call)));
        let g = compute_greeks_with(&pos, &bumps(), &pricers).unwrap().unwrap();
        assert!((g.delta - 2.0).abs() < 1e-9);
        assert_eq!(g.vega, 0.0);

        let default = compute_greeks(&pos, &bumps()).unwrap().unwrap();
        assert!((default.delta - 0.63683).abs() < 1e-3);
    }

    #[test]
    fn test_registry_can_price_bonds() {
        let pricers = PricerRegistry::new().with_pricer(InstrumentType::Bond, LinearPricer);
        let pos = position(InstrumentType::Bond, Some(atm(OptionKind::Call)));
        assert!(compute_greeks_with(&pos, &bumps(), &pricers).unwrap().is_some());
        assert!(compute_greeks(&pos, &bumps()).unwrap().is_none());
    }

    #[test]
    fn test_greeks_batch_collects_failures() {
        let cfg = EngineConfig::reference();
        let mut missing = position(InstrumentType::Option, None);
        missing.id = "NO-TERMS".into();
        let positions = vec![
            position(InstrumentType::Option, Some(atm(OptionKind::Put))),
            missing,
            position(InstrumentType::Spot, None),
        ];
        let out = calculate_greeks_batch(&positions, &PricerRegistry::default(), &cfg).unwrap();
        assert_eq!(out.result.results.len(), 2);
        assert!(out.result.results[0].greeks.is_some());
        assert!(out.result.results[1].greeks.is_none());
        assert_eq!(out.result.failures.len(), 1);
        assert_eq!(out.result.failures[0].record_id, "NO-TERMS");
        assert_eq!(out.warnings.len(), 1);
    }

    #[test]
    fn test_option_without_volatility_rejected() {
        let mut t = atm(OptionKind::Call);
        t.volatility = 0.0;
        assert!(compute_greeks(&position(InstrumentType::Option, Some(t)), &bumps()).is_err());
    }
}
