use super::fitting::{FrequencyFit, SeverityFit};
use super::sampling::{rng_from_seed, Sampler};
use crate::error::RiskEngineError;
use crate::RiskEngineResult;

/// Monte Carlo compound-Poisson convolution.
///
/// Each simulated period draws an event count from the frequency
/// distribution and sums that many severity draws. Returns one aggregate
/// loss per simulated period, in simulation order.
pub fn convolve_aggregate_loss(
    frequency: &FrequencyFit,
    severity: &SeverityFit,
    n_simulations: usize,
    seed: Option<u64>,
) -> RiskEngineResult<Vec<f64>> {
    if n_simulations == 0 {
        return Err(RiskEngineError::invalid("n_simulations", "must be positive"));
    }
    let frequency_sampler = Sampler::new(&frequency.distribution())?;
    let severity_sampler = Sampler::new(&severity.distribution())?;

    let mut rng = rng_from_seed(seed);
    let mut aggregate = Vec::with_capacity(n_simulations);
    for _ in 0..n_simulations {
        // Poisson draws are whole numbers
        let events = frequency_sampler.draw(&mut rng) as u64;
        let mut total = 0.0_f64;
        for _ in 0..events {
            total += severity_sampler.draw(&mut rng);
        }
        aggregate.push(total);
    }
    Ok(aggregate)
}
