//! Sampler capability.
//!
//! The change-point model only exposes an unnormalized log density; anything
//! implementing [`Sampler`] can turn that into posterior draws. Backends:
//!
//! - [`SliceSampler`]: coordinate-wise slice sampling (default)
//! - [`MetropolisSampler`]: component-wise adaptive Metropolis
//!
//! Both run chains in parallel, each with its own seeded RNG, and collect
//! results in chain order, so a fixed seed reproduces identical draws.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use thiserror::Error;

use crate::domain::{SamplerBackend, SamplerConfig};

pub mod draws;
pub mod metropolis;
pub mod slice;

pub use draws::PosteriorDraws;
pub use metropolis::MetropolisSampler;
pub use slice::SliceSampler;

/// An unnormalized log density over real-valued parameters.
///
/// Points outside the support return `-inf`. NaN or `+inf` signal a numerical
/// failure and are counted as divergent transitions by the samplers.
pub trait LogDensity: Sync {
    fn param_names(&self) -> &[&'static str];

    fn dim(&self) -> usize {
        self.param_names().len()
    }

    fn log_density(&self, theta: &[f64]) -> f64;

    /// A point inside the support to start a chain from.
    fn initial_point(&self, rng: &mut StdRng) -> Vec<f64>;

    /// Rough posterior scale per parameter, used for initial widths/step sizes.
    fn typical_scales(&self) -> Vec<f64>;

    /// Closed support `[lo, hi]` of parameter `index`, if bounded on both sides.
    fn support(&self, _index: usize) -> Option<(f64, f64)> {
        None
    }
}

#[derive(Debug, Error)]
pub enum SamplerError {
    #[error("invalid sampler configuration: {0}")]
    InvalidConfig(String),

    #[error("chain {chain}: initial point has non-finite log density ({log_density})")]
    InvalidInitialPoint { chain: usize, log_density: f64 },

    #[error("{divergent} of {total} post-warmup transitions diverged (allowed fraction {fraction})")]
    Diverged {
        divergent: usize,
        total: usize,
        fraction: f64,
    },

    #[error("failed to assemble draws: {0}")]
    Assembly(String),
}

/// Turns a log density into posterior draws.
pub trait Sampler: Sync {
    fn name(&self) -> &'static str;

    fn sample(
        &self,
        target: &dyn LogDensity,
        config: &SamplerConfig,
    ) -> Result<PosteriorDraws, SamplerError>;
}

/// Construct the backend selected on the command line.
pub fn sampler_for(backend: SamplerBackend) -> Box<dyn Sampler> {
    match backend {
        SamplerBackend::Slice => Box::new(SliceSampler::default()),
        SamplerBackend::Metropolis => Box::new(MetropolisSampler::default()),
    }
}

/// Output of one chain: retained draws plus post-warmup divergences.
#[derive(Debug, Clone)]
pub(crate) struct ChainOutput {
    pub draws: Vec<Vec<f64>>,
    pub divergences: usize,
}

/// Deterministic per-chain RNG.
pub(crate) fn chain_rng(seed: u64, chain: usize) -> StdRng {
    let mixed = seed ^ (chain as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    StdRng::seed_from_u64(mixed)
}

pub(crate) fn validate_config(config: &SamplerConfig) -> Result<(), SamplerError> {
    if config.draws == 0 || config.chains == 0 {
        return Err(SamplerError::InvalidConfig(
            "draws and chains must be > 0".to_string(),
        ));
    }
    if !(config.target_accept > 0.0 && config.target_accept < 1.0) {
        return Err(SamplerError::InvalidConfig(format!(
            "target_accept must be in (0, 1), got {}",
            config.target_accept
        )));
    }
    if !(0.0..=1.0).contains(&config.max_divergence_fraction) {
        return Err(SamplerError::InvalidConfig(format!(
            "max_divergence_fraction must be in [0, 1], got {}",
            config.max_divergence_fraction
        )));
    }
    Ok(())
}

/// Run `run_chain` for every chain in parallel and assemble the draws.
pub(crate) fn run_chains<F>(
    target: &dyn LogDensity,
    config: &SamplerConfig,
    run_chain: F,
) -> Result<PosteriorDraws, SamplerError>
where
    F: Fn(usize) -> Result<ChainOutput, SamplerError> + Sync,
{
    validate_config(config)?;

    // Collecting an indexed parallel iterator preserves chain order.
    let outputs: Vec<ChainOutput> = (0..config.chains)
        .into_par_iter()
        .map(&run_chain)
        .collect::<Result<_, _>>()?;

    let divergent: usize = outputs.iter().map(|o| o.divergences).sum();
    let total = config.chains * config.draws;
    if divergent as f64 > config.max_divergence_fraction * total as f64 {
        return Err(SamplerError::Diverged {
            divergent,
            total,
            fraction: config.max_divergence_fraction,
        });
    }

    let chains = outputs.into_iter().map(|o| o.draws).collect();
    PosteriorDraws::from_joint(target.param_names(), chains, divergent)
        .map_err(|e| SamplerError::Assembly(e.to_string()))
}

#[cfg(test)]
pub(crate) mod testing {
    //! Small targets for exercising samplers without the full model.

    use rand::Rng;
    use rand::rngs::StdRng;

    use super::LogDensity;

    static NAMES: [&str; 2] = ["x", "y"];

    /// Independent Normal(mean_j, sd_j) coordinates (at most two).
    pub struct IsoNormal {
        pub means: Vec<f64>,
        pub sds: Vec<f64>,
    }

    impl LogDensity for IsoNormal {
        fn param_names(&self) -> &[&'static str] {
            &NAMES[..self.means.len()]
        }

        fn log_density(&self, theta: &[f64]) -> f64 {
            theta
                .iter()
                .zip(self.means.iter().zip(self.sds.iter()))
                .map(|(x, (m, s))| -0.5 * ((x - m) / s).powi(2))
                .sum()
        }

        fn initial_point(&self, rng: &mut StdRng) -> Vec<f64> {
            self.means
                .iter()
                .zip(self.sds.iter())
                .map(|(m, s)| m + s * rng.gen_range(-2.0..2.0))
                .collect()
        }

        fn typical_scales(&self) -> Vec<f64> {
            self.sds.clone()
        }
    }

    /// One parameter on `[0, 100]` whose density is flat within unit cells and
    /// peaks in the cell `(89, 90]`, like `tau` in the change-point model.
    pub struct Stepped;

    impl LogDensity for Stepped {
        fn param_names(&self) -> &[&'static str] {
            &NAMES[..1]
        }

        fn log_density(&self, theta: &[f64]) -> f64 {
            let x = theta[0];
            if !(0.0..=100.0).contains(&x) {
                return f64::NEG_INFINITY;
            }
            -0.5 * (x.ceil() - 90.0).powi(2)
        }

        fn initial_point(&self, _rng: &mut StdRng) -> Vec<f64> {
            vec![10.0]
        }

        fn typical_scales(&self) -> Vec<f64> {
            vec![1.0]
        }

        fn support(&self, index: usize) -> Option<(f64, f64)> {
            (index == 0).then_some((0.0, 100.0))
        }
    }

    /// Density that is NaN everywhere.
    pub struct Broken;

    impl LogDensity for Broken {
        fn param_names(&self) -> &[&'static str] {
            &["x"]
        }

        fn log_density(&self, _theta: &[f64]) -> f64 {
            f64::NAN
        }

        fn initial_point(&self, _rng: &mut StdRng) -> Vec<f64> {
            vec![0.0]
        }

        fn typical_scales(&self) -> Vec<f64> {
            vec![1.0]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_rngs_differ_by_chain() {
        use rand::Rng;
        let a: u64 = chain_rng(42, 0).r#gen();
        let b: u64 = chain_rng(42, 1).r#gen();
        assert_ne!(a, b);
    }

    #[test]
    fn config_validation_rejects_bad_target_accept() {
        let config = SamplerConfig {
            target_accept: 1.0,
            ..SamplerConfig::default()
        };
        assert!(matches!(
            validate_config(&config),
            Err(SamplerError::InvalidConfig(_))
        ));
    }
}
