//! Trading-book market risk: VaR / CVaR by historical, parametric and Monte
//! Carlo methods, finite-difference Greeks, scenario shocks and VaR
//! backtesting.

pub mod backtest;
pub mod calculator;
pub mod greeks;
pub mod position;
pub mod shock;
pub mod var;

pub use backtest::{backtest, BacktestInput, BacktestResult};
pub use calculator::{
    assess_position, calculate_market_risk, calculate_market_risk_batch, calculate_var,
    MarketRiskRequest, MarketRiskResult, StressedValue, VarInput,
};
pub use greeks::{
    calculate_greeks_batch, compute_greeks, compute_greeks_with, greeks_with, pricer_for,
    BlackScholesPricer, ForwardPricer, Greeks, PositionGreeks, PricerRegistry, PricingFunction,
};
pub use position::{AssetClass, DerivativeTerms, InstrumentType, OptionKind, Position};
pub use shock::{
    apply_shock, apply_shock_batch, shock_factor, RiskScenario, ShockVector, ShockedPosition,
};
pub use var::{compute_cvar, compute_var, estimate_series, VarEstimate, VarMethod};
