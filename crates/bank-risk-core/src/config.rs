//! Injected regulatory coefficient tables.
//!
//! Nothing in the engine embeds a PD calibration, risk weight, rating edge or
//! capital minimum: every calculation reads them from an [`EngineConfig`].
//! A missing entry is a [`RiskEngineError::Configuration`], which is fatal to
//! the run.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::RiskEngineError;
use crate::statistics::SeverityFitMethod;
use crate::types::{CollateralType, CreditRating, LoanType, Rate, ScenarioType};
use crate::RiskEngineResult;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Named, versioned logistic PD coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdCoefficientSet {
    pub name: String,
    pub version: String,
    pub intercept: Decimal,
    /// Per credit-score point
    pub credit_score: Decimal,
    pub debt_ratio: Decimal,
    /// Per past delinquency
    pub delinquency_count: Decimal,
    /// Applied when the borrower is unemployed
    pub unemployed: Decimal,
    /// PD output floor, strictly above zero
    pub pd_floor: Rate,
    /// PD output cap, strictly below one
    pub pd_cap: Rate,
}

/// Upper PD edge (inclusive) of a rating grade.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RatingBand {
    pub rating: CreditRating,
    pub max_pd: Rate,
}

/// Finite-difference bump sizes for Greeks.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GreeksConfig {
    /// Relative bump applied to the underlying price (0.01 = 1%)
    pub spot_bump: f64,
    /// Absolute bump applied to volatility (0.01 = 1 vol point)
    pub vol_bump: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarketRiskConfig {
    /// Minimum return history for historical VaR
    pub min_history_length: usize,
    /// Confidence level whose VaR feeds the market-risk capital charge
    pub regulatory_confidence: f64,
    /// Upper bound on Monte Carlo paths per calculation
    pub max_simulations: usize,
    pub greeks: GreeksConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OperationalRiskConfig {
    /// Minimum severity observations before an LDA fit is attempted
    pub min_event_count: usize,
    pub severity_method: SeverityFitMethod,
    pub default_percentile: f64,
    pub default_simulations: usize,
}

/// Capital buffer requirements stacked on top of the CET1 minimum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CapitalBuffers {
    pub conservation: Rate,
    pub countercyclical: Rate,
    pub systemic: Rate,
}

impl CapitalBuffers {
    pub fn total(&self) -> Rate {
        self.conservation + self.countercyclical + self.systemic
    }
}

/// Minimum ratios, supplied per regime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalMinima {
    pub cet1: Rate,
    pub tier1: Rate,
    pub total_capital: Rate,
    pub leverage: Rate,
    #[serde(default)]
    pub buffers: CapitalBuffers,
}

/// Which credit RWA figure feeds the capital ratios.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreditRwaApproach {
    /// `EAD × risk weight`
    #[default]
    Standardised,
    /// `EAD × PD × LGD × rwa_multiplier`
    Irb,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CapitalConfig {
    /// Capital-to-RWA conversion (12.5 = 1 / 8%)
    pub rwa_multiplier: Decimal,
    #[serde(default)]
    pub credit_rwa_approach: CreditRwaApproach,
    pub minima: CapitalMinima,
}

/// PD / LGD adjustments applied to credit inputs under a stress scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CreditStressOverlay {
    pub pd_multiplier: Decimal,
    pub lgd_add_on: Rate,
}

/// Full engine parameterisation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub version: String,
    pub pd_model: PdCoefficientSet,
    pub credit_conversion_factors: BTreeMap<LoanType, Rate>,
    pub risk_weights: BTreeMap<LoanType, Rate>,
    #[serde(default)]
    pub collateral_haircuts: BTreeMap<CollateralType, Rate>,
    pub lgd_floor: Rate,
    /// Ascending by `max_pd`, best rating first
    pub rating_bands: Vec<RatingBand>,
    pub market: MarketRiskConfig,
    pub operational: OperationalRiskConfig,
    pub capital: CapitalConfig,
    #[serde(default)]
    pub stress: BTreeMap<ScenarioType, CreditStressOverlay>,
}

// ---------------------------------------------------------------------------
// Reference parameterisation
// ---------------------------------------------------------------------------

impl EngineConfig {
    /// Documented reference parameter set (`reference-1`).
    ///
    /// PD coefficients are the legacy scorecard weights; risk weights follow
    /// the Basel standardised approach; rating edges and stress overlays are
    /// illustrative and should be replaced by a calibrated set in production.
    pub fn reference() -> Self {
        let credit_conversion_factors = BTreeMap::from([
            (LoanType::Sovereign, dec!(0.75)),
            (LoanType::Bank, dec!(0.75)),
            (LoanType::Corporate, dec!(0.75)),
            (LoanType::Retail, dec!(0.75)),
            (LoanType::ResidentialMortgage, dec!(0.75)),
            (LoanType::CommercialRealEstate, dec!(0.75)),
        ]);
        let risk_weights = BTreeMap::from([
            (LoanType::Sovereign, dec!(0)),
            (LoanType::Bank, dec!(0.20)),
            (LoanType::Corporate, dec!(1.00)),
            (LoanType::Retail, dec!(0.75)),
            (LoanType::ResidentialMortgage, dec!(0.35)),
            (LoanType::CommercialRealEstate, dec!(1.00)),
        ]);
        let collateral_haircuts = BTreeMap::from([
            (CollateralType::Cash, dec!(0)),
            (CollateralType::GovernmentBond, dec!(0.02)),
            (CollateralType::CorporateBond, dec!(0.08)),
            (CollateralType::Equity, dec!(0.25)),
            (CollateralType::RealEstate, dec!(0.30)),
        ]);
        let rating_bands = vec![
            RatingBand { rating: CreditRating::AAA, max_pd: dec!(0.0003) },
            RatingBand { rating: CreditRating::AA, max_pd: dec!(0.001) },
            RatingBand { rating: CreditRating::A, max_pd: dec!(0.0025) },
            RatingBand { rating: CreditRating::BBB, max_pd: dec!(0.01) },
            RatingBand { rating: CreditRating::BB, max_pd: dec!(0.04) },
            RatingBand { rating: CreditRating::B, max_pd: dec!(0.15) },
            RatingBand { rating: CreditRating::CCC, max_pd: dec!(1) },
        ];
        let stress = BTreeMap::from([
            (
                ScenarioType::Adverse,
                CreditStressOverlay { pd_multiplier: dec!(1.5), lgd_add_on: dec!(0.05) },
            ),
            (
                ScenarioType::Severe,
                CreditStressOverlay { pd_multiplier: dec!(2.5), lgd_add_on: dec!(0.10) },
            ),
        ]);

        EngineConfig {
            version: "reference-1".into(),
            pd_model: PdCoefficientSet {
                name: "legacy-logistic".into(),
                version: "1".into(),
                intercept: dec!(-2.5),
                credit_score: dec!(-0.015),
                debt_ratio: dec!(1.2),
                delinquency_count: dec!(0.8),
                unemployed: dec!(0.6),
                pd_floor: dec!(0.0001),
                pd_cap: dec!(0.9999),
            },
            credit_conversion_factors,
            risk_weights,
            collateral_haircuts,
            lgd_floor: dec!(0),
            rating_bands,
            market: MarketRiskConfig {
                min_history_length: 20,
                regulatory_confidence: 0.99,
                max_simulations: 1_000_000,
                greeks: GreeksConfig {
                    spot_bump: 0.01,
                    vol_bump: 0.01,
                },
            },
            operational: OperationalRiskConfig {
                min_event_count: 10,
                severity_method: SeverityFitMethod::MaximumLikelihood,
                default_percentile: 0.999,
                default_simulations: 100_000,
            },
            capital: CapitalConfig {
                rwa_multiplier: dec!(12.5),
                credit_rwa_approach: CreditRwaApproach::Standardised,
                minima: CapitalMinima {
                    cet1: dec!(0.045),
                    tier1: dec!(0.06),
                    total_capital: dec!(0.08),
                    leverage: dec!(0.03),
                    buffers: CapitalBuffers {
                        conservation: dec!(0.025),
                        countercyclical: dec!(0),
                        systemic: dec!(0),
                    },
                },
            },
            stress,
        }
    }
}

// ---------------------------------------------------------------------------
// Lookups
// ---------------------------------------------------------------------------

impl EngineConfig {
    pub fn credit_conversion_factor(&self, loan_type: LoanType) -> RiskEngineResult<Rate> {
        self.credit_conversion_factors
            .get(&loan_type)
            .copied()
            .ok_or_else(|| {
                RiskEngineError::Configuration(format!(
                    "no credit conversion factor configured for {loan_type:?}"
                ))
            })
    }

    pub fn risk_weight(&self, loan_type: LoanType) -> RiskEngineResult<Rate> {
        self.risk_weights.get(&loan_type).copied().ok_or_else(|| {
            RiskEngineError::Configuration(format!(
                "no risk weight configured for {loan_type:?}"
            ))
        })
    }

    pub fn collateral_haircut(&self, collateral_type: CollateralType) -> RiskEngineResult<Rate> {
        self.collateral_haircuts
            .get(&collateral_type)
            .copied()
            .ok_or_else(|| {
                RiskEngineError::Configuration(format!(
                    "no haircut configured for collateral type {collateral_type:?}"
                ))
            })
    }

    pub fn stress_overlay(&self, scenario_type: ScenarioType) -> Option<&CreditStressOverlay> {
        self.stress.get(&scenario_type)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn config_err(msg: impl Into<String>) -> RiskEngineError {
    RiskEngineError::Configuration(msg.into())
}

fn check_unit_interval(value: Decimal, name: &str) -> RiskEngineResult<()> {
    if value < Decimal::ZERO || value > Decimal::ONE {
        return Err(config_err(format!("{name} must lie in [0, 1], got {value}")));
    }
    Ok(())
}

fn check_open_unit(value: f64, name: &str) -> RiskEngineResult<()> {
    if !(value > 0.0 && value < 1.0) {
        return Err(config_err(format!("{name} must lie in (0, 1), got {value}")));
    }
    Ok(())
}

impl EngineConfig {
    /// Structural checks on the coefficient tables.
    pub fn validate(&self) -> RiskEngineResult<()> {
        if self.version.trim().is_empty() {
            return Err(config_err("config version must not be empty"));
        }

        let pd = &self.pd_model;
        if pd.name.trim().is_empty() || pd.version.trim().is_empty() {
            return Err(config_err("PD coefficient set must be named and versioned"));
        }
        if pd.pd_floor <= Decimal::ZERO || pd.pd_cap >= Decimal::ONE || pd.pd_floor >= pd.pd_cap {
            return Err(config_err(format!(
                "PD bounds must satisfy 0 < floor < cap < 1, got floor={} cap={}",
                pd.pd_floor, pd.pd_cap
            )));
        }

        for (lt, ccf) in &self.credit_conversion_factors {
            check_unit_interval(*ccf, &format!("credit_conversion_factors.{lt:?}"))?;
        }
        for (lt, rw) in &self.risk_weights {
            if *rw < Decimal::ZERO {
                return Err(config_err(format!("risk_weights.{lt:?} cannot be negative")));
            }
        }
        for (ct, h) in &self.collateral_haircuts {
            check_unit_interval(*h, &format!("collateral_haircuts.{ct:?}"))?;
        }
        check_unit_interval(self.lgd_floor, "lgd_floor")?;

        if self.rating_bands.is_empty() {
            return Err(config_err("rating_bands must not be empty"));
        }
        for pair in self.rating_bands.windows(2) {
            if pair[1].max_pd <= pair[0].max_pd || pair[1].rating <= pair[0].rating {
                return Err(config_err(
                    "rating_bands must be strictly increasing in max_pd and ordered best to worst",
                ));
            }
        }
        for band in &self.rating_bands {
            if band.max_pd <= Decimal::ZERO || band.max_pd > Decimal::ONE {
                return Err(config_err(format!(
                    "rating band {:?} edge must lie in (0, 1]",
                    band.rating
                )));
            }
        }

        let m = &self.market;
        if m.min_history_length < 2 {
            return Err(config_err("market.min_history_length must be at least 2"));
        }
        check_open_unit(m.regulatory_confidence, "market.regulatory_confidence")?;
        if m.max_simulations == 0 {
            return Err(config_err("market.max_simulations must be positive"));
        }
        if !(m.greeks.spot_bump > 0.0 && m.greeks.spot_bump < 1.0) || !(m.greeks.vol_bump > 0.0) {
            return Err(config_err("greeks bumps must be positive (spot bump below 1)"));
        }

        let op = &self.operational;
        if op.min_event_count < 2 {
            return Err(config_err("operational.min_event_count must be at least 2"));
        }
        check_open_unit(op.default_percentile, "operational.default_percentile")?;
        if op.default_simulations == 0 || op.default_simulations > m.max_simulations {
            return Err(config_err(
                "operational.default_simulations must be positive and within market.max_simulations",
            ));
        }

        let cap = &self.capital;
        if cap.rwa_multiplier <= Decimal::ZERO {
            return Err(config_err("capital.rwa_multiplier must be positive"));
        }
        let mins = &cap.minima;
        for (name, v) in [
            ("cet1", mins.cet1),
            ("tier1", mins.tier1),
            ("total_capital", mins.total_capital),
            ("leverage", mins.leverage),
            ("buffers.conservation", mins.buffers.conservation),
            ("buffers.countercyclical", mins.buffers.countercyclical),
            ("buffers.systemic", mins.buffers.systemic),
        ] {
            check_unit_interval(v, &format!("capital.minima.{name}"))?;
        }

        for (st, overlay) in &self.stress {
            if overlay.pd_multiplier <= Decimal::ZERO {
                return Err(config_err(format!("stress.{st:?}.pd_multiplier must be positive")));
            }
            check_unit_interval(overlay.lgd_add_on, &format!("stress.{st:?}.lgd_add_on"))?;
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_config_is_valid() {
        EngineConfig::reference().validate().unwrap();
    }

    #[test]
    fn test_missing_risk_weight_is_configuration_error() {
        let mut cfg = EngineConfig::reference();
        cfg.risk_weights.remove(&LoanType::Retail);
        let err = cfg.risk_weight(LoanType::Retail).unwrap_err();
        assert!(matches!(err, RiskEngineError::Configuration(_)));
    }

    #[test]
    fn test_non_monotonic_bands_rejected() {
        let mut cfg = EngineConfig::reference();
        cfg.rating_bands.swap(1, 2);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_ccf_out_of_range_rejected() {
        let mut cfg = EngineConfig::reference();
        cfg.credit_conversion_factors
            .insert(LoanType::Corporate, dec!(1.2));
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_pd_bounds_rejected() {
        let mut cfg = EngineConfig::reference();
        cfg.pd_model.pd_floor = Decimal::ZERO;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_config_json_roundtrip_keys() {
        let cfg = EngineConfig::reference();
        let json = serde_json::to_value(&cfg).unwrap();
        assert!(json["risk_weights"]["residential_mortgage"].is_string());
        let back: EngineConfig = serde_json::from_value(json).unwrap();
        assert_eq!(back, cfg);
    }
}
