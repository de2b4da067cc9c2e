pub mod batch;
pub mod config;
pub mod error;
pub mod statistics;
pub mod types;

#[cfg(feature = "credit")]
pub mod credit;

#[cfg(feature = "market")]
pub mod market;

#[cfg(feature = "operational")]
pub mod operational;

#[cfg(feature = "regulatory")]
pub mod regulatory;

pub use config::EngineConfig;
pub use error::{ErrorKind, RiskEngineError};
pub use types::*;

/// Standard result type for all risk-engine operations
pub type RiskEngineResult<T> = Result<T, RiskEngineError>;
