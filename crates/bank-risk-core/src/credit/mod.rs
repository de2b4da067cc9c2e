//! Per-exposure credit risk: PD scoring, LGD, EAD, expected loss,
//! standardised and simplified-IRB RWA, rating assignment and the
//! portfolio RWA summary.

pub mod calculator;
pub mod exposure;
pub mod lgd_ead;
pub mod pd;
pub mod rwa;

pub use calculator::{
    assess_exposure, calculate_credit_risk, calculate_credit_risk_batch,
    summarize_credit_portfolio, CreditPortfolioRisk, CreditPortfolioSummary, CreditRiskResult,
};
pub use exposure::{EmploymentStatus, Exposure};
pub use lgd_ead::{effective_collateral, estimate_ead, estimate_lgd, expected_loss};
pub use pd::{assign_rating, pd_logit, score_pd};
pub use rwa::{irb_risk_weighted_assets, risk_weight, risk_weighted_assets};
