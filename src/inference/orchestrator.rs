//! Sampling orchestration.
//!
//! Hands the model to a sampler backend with a fixed, reproducible
//! configuration and checks that every model parameter came back. A failed
//! run is surfaced as `SamplingFailed`; nothing here retries.

use std::time::Instant;

use crate::domain::{PARAM_NAMES, SamplerConfig};
use crate::error::{ChangePointError, Result};
use crate::model::ChangePointModelSpec;
use crate::sampler::{PosteriorDraws, Sampler};

/// Sample the posterior of `spec`.
pub fn run(
    spec: &ChangePointModelSpec,
    config: &SamplerConfig,
    sampler: &dyn Sampler,
) -> Result<PosteriorDraws> {
    let started = Instant::now();
    tracing::info!(
        sampler = sampler.name(),
        draws = config.draws,
        warmup = config.warmup,
        chains = config.chains,
        seed = config.seed,
        n_obs = spec.n_obs(),
        "sampling change-point posterior"
    );

    let draws = sampler.sample(spec, config).map_err(|e| {
        tracing::error!(error = %e, "sampler failed");
        ChangePointError::SamplingFailed(e.to_string())
    })?;

    if let Some(missing) = PARAM_NAMES.iter().find(|name| !draws.contains(name)) {
        return Err(ChangePointError::SamplingFailed(format!(
            "sampler returned no draws for '{missing}'"
        )));
    }

    tracing::info!(
        divergences = draws.divergences(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "sampling finished"
    );
    Ok(draws)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::synthetic::{TwoRegimeSpec, generate_returns};
    use crate::domain::PriorConfig;
    use crate::model;
    use crate::sampler::{LogDensity, SamplerError, SliceSampler};

    struct FailingSampler;

    impl Sampler for FailingSampler {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn sample(
            &self,
            _target: &dyn LogDensity,
            _config: &SamplerConfig,
        ) -> std::result::Result<PosteriorDraws, SamplerError> {
            Err(SamplerError::Diverged {
                divergent: 90,
                total: 100,
                fraction: 0.05,
            })
        }
    }

    fn spec() -> ChangePointModelSpec {
        let returns = generate_returns(&TwoRegimeSpec::default()).unwrap();
        model::build(&returns, PriorConfig::default()).unwrap()
    }

    #[test]
    fn sampler_failure_surfaces_as_sampling_failed() {
        let err = run(&spec(), &SamplerConfig::default(), &FailingSampler).unwrap_err();
        match err {
            ChangePointError::SamplingFailed(msg) => assert!(msg.contains("90 of 100")),
            other => panic!("expected SamplingFailed, got {other:?}"),
        }
    }

    #[test]
    fn identical_inputs_reproduce_identical_draws() {
        let config = SamplerConfig {
            draws: 200,
            warmup: 200,
            ..SamplerConfig::default()
        };
        let spec = spec();
        let a = run(&spec, &config, &SliceSampler::default()).unwrap();
        let b = run(&spec, &config, &SliceSampler::default()).unwrap();
        assert_eq!(a, b);
        for name in PARAM_NAMES {
            assert_eq!(a.chains(name).unwrap().len(), 2);
        }
    }
}
