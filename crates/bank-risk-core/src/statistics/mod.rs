//! Shared numerical primitives: quantiles, distribution fitting, seedable
//! sampling and compound-Poisson convolution. Everything here works on `f64`;
//! callers convert to `Decimal` at their own boundary.

pub mod convolution;
pub mod descriptive;
pub mod fitting;
pub mod sampling;

pub use convolution::convolve_aggregate_loss;
pub use descriptive::{
    fit_normal, mean, normal_cdf, normal_inverse_cdf, normal_pdf, quantile, sample_std_dev,
    NormalFit,
};
pub use fitting::{
    fit_frequency, fit_severity, FrequencyFit, SeverityFit, SeverityFitMethod,
    DEFAULT_MIN_SEVERITY_OBSERVATIONS,
};
pub use sampling::{derive_seed, rng_from_seed, sample_monte_carlo, DistributionSpec};
