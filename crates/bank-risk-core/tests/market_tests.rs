use bank_risk_core::market::{
    apply_shock, backtest, calculate_market_risk, calculate_var, compute_cvar, compute_var,
    AssetClass, BacktestInput, DerivativeTerms, InstrumentType, MarketRiskRequest, OptionKind,
    Position, RiskScenario, ShockVector, VarInput, VarMethod,
};
use bank_risk_core::statistics::quantile;
use bank_risk_core::{EngineConfig, ErrorKind, ScenarioType};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

const RETURNS: [f64; 25] = [
    -0.02, 0.01, -0.015, -0.03, 0.005, 0.012, -0.008, 0.003, -0.025, 0.007, 0.015, -0.011, 0.002,
    -0.004, 0.009, -0.018, 0.006, 0.011, -0.001, 0.004, -0.007, 0.013, -0.022, 0.008, 0.001,
];

fn as_of() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 28).unwrap()
}

fn position(id: &str, class: AssetClass, value: Decimal) -> Position {
    Position {
        id: id.into(),
        asset_class: class,
        instrument_type: InstrumentType::Spot,
        market_value: value,
        notional_value: value,
        duration: Some(dec!(5)),
        as_of_date: as_of(),
        returns: RETURNS.to_vec(),
        derivative: None,
    }
}

fn scenario(shocks: ShockVector) -> RiskScenario {
    RiskScenario {
        name: "test".into(),
        scenario_type: ScenarioType::Adverse,
        shocks,
    }
}

fn all_methods() -> [VarMethod; 3] {
    [
        VarMethod::Historical,
        VarMethod::Parametric,
        VarMethod::MonteCarlo {
            simulations: 50_000,
            seed: Some(2024),
        },
    ]
}

// ===========================================================================
// VaR / CVaR
// ===========================================================================

#[test]
fn test_historical_var_equals_manual_percentile_loss() {
    let cfg = EngineConfig::reference();
    let p = position("EQ", AssetClass::Equity, dec!(1_000_000));
    let var = compute_var(&p, 0.95, VarMethod::Historical, &cfg).unwrap();

    let losses: Vec<f64> = RETURNS.iter().map(|r| -1_000_000.0 * r).collect();
    let manual = quantile(&losses, 0.95).unwrap();
    assert!((var.to_f64().unwrap() - manual).abs() < 1e-6, "{var} vs {manual}");
}

#[test]
fn test_var_monotone_in_confidence_for_every_method() {
    let cfg = EngineConfig::reference();
    for method in all_methods() {
        let input = VarInput {
            market_value: dec!(1_000_000),
            returns: RETURNS.to_vec(),
            confidence_levels: vec![0.90, 0.95, 0.975, 0.99],
            method,
        };
        let est = calculate_var(&input, &cfg).unwrap().result;
        for pair in est.windows(2) {
            assert!(pair[1].var >= pair[0].var, "{}: VaR not monotone", method.name());
        }
        for e in &est {
            assert!(e.cvar >= e.var, "{}: CVaR below VaR", method.name());
        }
    }
}

#[test]
fn test_cvar_at_least_var_per_position() {
    let cfg = EngineConfig::reference();
    let p = position("EQ", AssetClass::Equity, dec!(750_000));
    for method in all_methods() {
        let var = compute_var(&p, 0.99, method, &cfg).unwrap();
        let cvar = compute_cvar(&p, 0.99, method, &cfg).unwrap();
        assert!(cvar >= var);
    }
}

#[test]
fn test_historical_var_needs_minimum_history() {
    let cfg = EngineConfig::reference();
    let mut p = position("EQ", AssetClass::Equity, dec!(1_000_000));
    p.returns.truncate(10);
    let err = compute_var(&p, 0.95, VarMethod::Historical, &cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientData);
}

#[test]
fn test_seeded_monte_carlo_reproducible() {
    let cfg = EngineConfig::reference();
    let p = position("EQ", AssetClass::Equity, dec!(1_000_000));
    let method = VarMethod::MonteCarlo {
        simulations: 10_000,
        seed: Some(7),
    };
    assert_eq!(
        compute_var(&p, 0.99, method, &cfg).unwrap(),
        compute_var(&p, 0.99, method, &cfg).unwrap()
    );
}

#[test]
fn test_simulation_count_bounded_by_config() {
    let cfg = EngineConfig::reference();
    let p = position("EQ", AssetClass::Equity, dec!(1_000_000));
    let method = VarMethod::MonteCarlo {
        simulations: cfg.market.max_simulations + 1,
        seed: Some(1),
    };
    let err = compute_var(&p, 0.99, method, &cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_confidence_outside_unit_interval_rejected() {
    let cfg = EngineConfig::reference();
    let p = position("EQ", AssetClass::Equity, dec!(1_000_000));
    for c in [0.0, 1.0, 1.5] {
        assert!(compute_var(&p, c, VarMethod::Parametric, &cfg).is_err());
    }
}

// ===========================================================================
// Scenario shocks
// ===========================================================================

#[test]
fn test_equity_crash_thirty_percent() {
    let p = position("EQ", AssetClass::Equity, dec!(1_000_000));
    let s = apply_shock(
        &p,
        &scenario(ShockVector {
            equity_shock: dec!(-0.30),
            ..Default::default()
        }),
    )
    .unwrap();
    assert_eq!(s.post_shock_value, dec!(700_000));
    assert_eq!(s.loss, dec!(300_000));
    assert_eq!(s.loss_pct, Some(dec!(0.3)));
}

#[test]
fn test_rate_and_spread_shocks_through_duration() {
    let shocks = ShockVector {
        interest_rate_shock: dec!(0.01),
        credit_spread_shock: dec!(0.02),
        ..Default::default()
    };
    let bond = apply_shock(&position("FI", AssetClass::FixedIncome, dec!(100)), &scenario(shocks)).unwrap();
    // 100 x (1 - 5 x 0.01)
    assert_eq!(bond.post_shock_value, dec!(95));

    let credit = apply_shock(&position("CR", AssetClass::Credit, dec!(100)), &scenario(shocks)).unwrap();
    // 100 x 0.95 x (1 - 5 x 0.02)
    assert_eq!(credit.post_shock_value, dec!(85.5));

    let commodity =
        apply_shock(&position("CMD", AssetClass::Commodity, dec!(100)), &scenario(shocks)).unwrap();
    assert_eq!(commodity.loss, Decimal::ZERO);
}

#[test]
fn test_fixed_income_without_duration_rejected() {
    let mut p = position("FI", AssetClass::FixedIncome, dec!(100));
    p.duration = None;
    let err = apply_shock(&p, &scenario(ShockVector::default())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// ===========================================================================
// Greeks
// ===========================================================================

#[test]
fn test_put_greeks_signs() {
    let cfg = EngineConfig::reference();
    let mut p = position("PUT", AssetClass::Equity, dec!(50_000));
    p.instrument_type = InstrumentType::Option;
    p.derivative = Some(DerivativeTerms {
        option_kind: Some(OptionKind::Put),
        underlying_price: 100.0,
        strike: 100.0,
        volatility: 0.2,
        risk_free_rate: 0.01,
        time_to_expiry: 1.0,
        quantity: 1.0,
    });
    let request = MarketRiskRequest {
        confidence_levels: vec![0.99],
        method: VarMethod::Parametric,
        scenario: None,
    };
    let out = calculate_market_risk(&p, &request, &cfg).unwrap();
    let g = out.result.greeks.unwrap();
    assert!(g.delta < 0.0 && g.delta > -1.0);
    assert!(g.gamma > 0.0);
    assert!(g.vega > 0.0);
    assert!(!out.warnings.is_empty());
}

#[test]
fn test_spot_position_has_no_greeks() {
    let cfg = EngineConfig::reference();
    let request = MarketRiskRequest {
        confidence_levels: vec![0.95],
        method: VarMethod::Historical,
        scenario: None,
    };
    let out = calculate_market_risk(&position("EQ", AssetClass::Equity, dec!(1)), &request, &cfg)
        .unwrap();
    assert!(out.result.greeks.is_none());
    let json = serde_json::to_value(&out.result).unwrap();
    assert!(json["greeks"].is_null());
}

// ===========================================================================
// Backtesting
// ===========================================================================

#[test]
fn test_backtest_counts_strict_exceedances() {
    let dates: Vec<NaiveDate> = (1..=5)
        .map(|d| NaiveDate::from_ymd_opt(2024, 1, d).unwrap())
        .collect();
    let input = BacktestInput {
        confidence_level: 0.99,
        dates: dates.clone(),
        var_series: vec![dec!(100); 5],
        pnl_series: vec![dec!(-150), dec!(20), dec!(-100), dec!(-101), dec!(5)],
    };
    let r = backtest(&input).unwrap();
    assert_eq!(r.observations, 5);
    assert_eq!(r.exceptions, 2);
    assert_eq!(r.breach_dates, vec![dates[0], dates[3]]);
    assert!(r.kupiec_lr > 0.0);
    assert!(r.kupiec_p_value >= 0.0 && r.kupiec_p_value <= 1.0);
}

#[test]
fn test_backtest_rejects_mismatched_series() {
    let input = BacktestInput {
        confidence_level: 0.99,
        dates: vec![as_of()],
        var_series: vec![dec!(1), dec!(2)],
        pnl_series: vec![dec!(0)],
    };
    assert!(backtest(&input).is_err());
}
