use bank_risk_core::credit::{
    assess_exposure, calculate_credit_risk, calculate_credit_risk_batch, score_pd,
    EmploymentStatus, Exposure,
};
use bank_risk_core::{CollateralType, CreditRating, EngineConfig, ErrorKind, LoanType};
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn exposure(id: &str) -> Exposure {
    Exposure {
        id: id.into(),
        loan_type: Some(LoanType::Retail),
        current_balance: dec!(50_000),
        credit_limit: dec!(100_000),
        collateral_value: dec!(200_000),
        collateral_type: None,
        credit_score: dec!(650),
        debt_ratio: dec!(0.4),
        delinquency_count: 1,
        employment_status: EmploymentStatus::Employed,
        days_past_due: 0,
        origination_date: None,
        maturity_date: None,
    }
}

fn exposure_grid() -> Vec<Exposure> {
    let loan_types = [
        LoanType::Sovereign,
        LoanType::Bank,
        LoanType::Corporate,
        LoanType::Retail,
        LoanType::ResidentialMortgage,
        LoanType::CommercialRealEstate,
    ];
    let mut grid = Vec::new();
    for (i, lt) in loan_types.iter().enumerate() {
        for score in [dec!(300), dec!(580), dec!(720), dec!(850)] {
            for (balance, limit) in [(dec!(0), dec!(10_000)), (dec!(80_000), dec!(60_000))] {
                for collateral in [dec!(0), dec!(25_000), dec!(500_000)] {
                    grid.push(Exposure {
                        id: format!("G-{i}-{score}-{balance}-{collateral}"),
                        loan_type: Some(*lt),
                        current_balance: balance,
                        credit_limit: limit,
                        collateral_value: collateral,
                        collateral_type: Some(CollateralType::RealEstate),
                        credit_score: score,
                        debt_ratio: dec!(0.9),
                        delinquency_count: 3,
                        employment_status: EmploymentStatus::Unemployed,
                        days_past_due: 30,
                        origination_date: None,
                        maturity_date: None,
                    });
                }
            }
        }
    }
    grid
}

// ===========================================================================
// Worked example
// ===========================================================================

#[test]
fn test_worked_example_fully_collateralised() {
    let mut cfg = EngineConfig::reference();
    cfg.credit_conversion_factors.insert(LoanType::Retail, dec!(0.5));

    let out = calculate_credit_risk(&exposure("EX-1"), &cfg).unwrap();
    let r = &out.result;

    // EAD = 50k + 0.5 x (100k - 50k)
    assert_eq!(r.ead, dec!(75_000));
    // Collateral 200k covers the EAD, LGD sits at the zero floor
    assert_eq!(r.lgd, Decimal::ZERO);
    assert_eq!(r.expected_loss, Decimal::ZERO);
    // Retail weight 75%
    assert_eq!(r.rwa, dec!(56_250));
    assert_eq!(r.pd_model, "legacy-logistic@1");
}

#[test]
fn test_configured_lgd_floor_applies() {
    let mut cfg = EngineConfig::reference();
    cfg.lgd_floor = dec!(0.1);
    let r = calculate_credit_risk(&exposure("EX-1"), &cfg).unwrap().result;
    assert_eq!(r.lgd, dec!(0.1));
    assert_eq!(r.expected_loss, r.pd * dec!(0.1) * r.ead);
}

// ===========================================================================
// Invariants
// ===========================================================================

#[test]
fn test_invariants_over_exposure_grid() {
    let cfg = EngineConfig::reference();
    for e in exposure_grid() {
        let r = assess_exposure(&e, &cfg, None).unwrap();
        assert!(r.pd > Decimal::ZERO && r.pd < Decimal::ONE, "{}: pd {}", e.id, r.pd);
        assert!(r.lgd >= Decimal::ZERO && r.lgd <= Decimal::ONE, "{}: lgd {}", e.id, r.lgd);
        assert!(r.ead >= e.current_balance, "{}: ead {}", e.id, r.ead);
        assert!(r.expected_loss <= r.ead, "{}: el {}", e.id, r.expected_loss);
        assert!(r.rwa >= Decimal::ZERO);
    }
}

#[test]
fn test_over_limit_exposure_has_no_undrawn_amount() {
    let cfg = EngineConfig::reference();
    let mut e = exposure("OVER");
    e.current_balance = dec!(120_000);
    let r = assess_exposure(&e, &cfg, None).unwrap();
    assert_eq!(r.ead, dec!(120_000));
}

#[test]
fn test_pd_rises_with_risk_drivers() {
    let cfg = EngineConfig::reference();
    let base = exposure("BASE");
    let mut worse = base.clone();
    worse.delinquency_count = 4;
    worse.employment_status = EmploymentStatus::Unemployed;
    worse.credit_score = dec!(450);
    assert!(score_pd(&worse, &cfg.pd_model).unwrap() > score_pd(&base, &cfg.pd_model).unwrap());
}

#[test]
fn test_extreme_scores_clamp_to_bounds() {
    let cfg = EngineConfig::reference();
    let mut prime = exposure("PRIME");
    prime.credit_score = dec!(10_000);
    assert_eq!(score_pd(&prime, &cfg.pd_model).unwrap(), cfg.pd_model.pd_floor);

    let mut distressed = exposure("DISTRESSED");
    distressed.credit_score = dec!(-10_000);
    let out = calculate_credit_risk(&distressed, &cfg).unwrap();
    assert_eq!(out.result.pd, cfg.pd_model.pd_cap);
    assert_eq!(out.result.rating, CreditRating::CCC);
    assert!(out.warnings.iter().any(|w| w.contains("PD clamped")));
}

// ===========================================================================
// Edge cases
// ===========================================================================

#[test]
fn test_zero_ead_is_validation_error() {
    let cfg = EngineConfig::reference();
    let mut e = exposure("EMPTY");
    e.current_balance = dec!(0);
    e.credit_limit = dec!(0);
    let err = calculate_credit_risk(&e, &cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn test_exposure_from_json_reports_missing_loan_type() {
    let json = r#"{
        "id": "J-1",
        "current_balance": "1000",
        "credit_limit": "2000",
        "credit_score": "700",
        "debt_ratio": "0.3",
        "employment_status": "self_employed"
    }"#;
    let e: Exposure = serde_json::from_str(json).unwrap();
    let err = calculate_credit_risk(&e, &EngineConfig::reference()).unwrap_err();
    assert!(err.to_string().contains("loan_type"));
}

#[test]
fn test_batch_preserves_input_order() {
    let cfg = EngineConfig::reference();
    let exposures: Vec<Exposure> = (0..50).map(|i| exposure(&format!("E{i:02}"))).collect();
    let out = calculate_credit_risk_batch(&exposures, &cfg).unwrap();
    assert!(out.result.is_clean());
    let ids: Vec<&str> = out.result.results.iter().map(|r| r.exposure_id.as_str()).collect();
    let expected: Vec<String> = (0..50).map(|i| format!("E{i:02}")).collect();
    assert_eq!(ids, expected.iter().map(String::as_str).collect::<Vec<_>>());
}

#[test]
fn test_overflowing_records_fail_alone() {
    let cfg = EngineConfig::reference();
    let mut huge_ratio = exposure("HUGE-RATIO");
    huge_ratio.debt_ratio = Decimal::MAX;
    let mut huge_book = exposure("HUGE-BOOK");
    huge_book.current_balance = Decimal::MAX;
    huge_book.credit_limit = Decimal::MAX;
    huge_book.collateral_value = dec!(0);
    huge_book.credit_score = dec!(0);
    huge_book.debt_ratio = dec!(2);
    huge_book.delinquency_count = 5;

    let out = calculate_credit_risk_batch(
        &[exposure("A"), huge_ratio, exposure("B"), huge_book],
        &cfg,
    )
    .unwrap();
    let ids: Vec<&str> = out.result.results.iter().map(|r| r.exposure_id.as_str()).collect();
    assert_eq!(ids, vec!["A", "B"]);
    let failed: Vec<&str> = out.result.failures.iter().map(|f| f.record_id.as_str()).collect();
    assert_eq!(failed, vec!["HUGE-RATIO", "HUGE-BOOK"]);
    assert!(out
        .result
        .failures
        .iter()
        .all(|f| f.kind == ErrorKind::Validation && f.message.contains("arithmetic overflow")));
    assert!(out.result.failures[1].message.contains("rwa_irb"));
}

#[test]
fn test_portfolio_rwa_summary() {
    let cfg = EngineConfig::reference();
    let mut corporate = exposure("CORP");
    corporate.loan_type = Some(LoanType::Corporate);
    let out = calculate_credit_risk_batch(&[exposure("RET"), corporate], &cfg).unwrap();
    let summary = &out.result.summary;
    // EAD 50,000 + 0.75 × 50,000 each; weights 0.75 and 1.00
    assert_eq!(summary.exposure_count, 2);
    assert_eq!(summary.total_exposure, dec!(175_000));
    assert_eq!(summary.total_rwa, dec!(153_125));
    assert_eq!(summary.average_risk_weight, Some(dec!(0.875)));
    let irb: Decimal = out.result.results.iter().map(|r| r.expected_loss * dec!(12.5)).sum();
    assert_eq!(summary.total_rwa_irb, irb);
}
