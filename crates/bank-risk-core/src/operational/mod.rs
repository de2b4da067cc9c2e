//! Operational risk capital by the Loss Distribution Approach.

pub mod lda;

pub use lda::{
    estimate_capital, estimate_capital_by_business_line, estimate_capital_record, CapitalParams,
    LossEvent, LossStatistics, OperationalCapital,
};
