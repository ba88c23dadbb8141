//! Coordinate-wise slice sampler.
//!
//! Each sweep updates every parameter in turn with a univariate slice step
//! (stepping out + shrinkage). There is no step size to tune and the density
//! may be discontinuous, which suits the hard regime switch in `tau`.
//!
//! Widths start from the target's typical scales and are re-estimated once,
//! at the end of warmup, from the second half of the warmup samples.

use rand::Rng;
use rand::rngs::StdRng;

use crate::domain::SamplerConfig;
use crate::math;

use super::{
    ChainOutput, LogDensity, PosteriorDraws, Sampler, SamplerError, chain_rng, run_chains,
};

/// Width multiplier applied to the warmup standard deviation.
const WIDTH_PER_SD: f64 = 2.5;

#[derive(Debug, Clone)]
pub struct SliceSampler {
    /// Maximum stepping-out expansions per update.
    pub max_steps_out: usize,
    /// Shrinkage proposals before the update is declared divergent.
    pub max_shrink: usize,
}

impl Default for SliceSampler {
    fn default() -> Self {
        Self {
            max_steps_out: 32,
            max_shrink: 100,
        }
    }
}

/// Why a single coordinate update did not move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepFailure {
    /// The density returned NaN/`+inf` or the shrinkage budget ran out.
    Divergent,
}

impl Sampler for SliceSampler {
    fn name(&self) -> &'static str {
        "slice"
    }

    fn sample(
        &self,
        target: &dyn LogDensity,
        config: &SamplerConfig,
    ) -> Result<PosteriorDraws, SamplerError> {
        run_chains(target, config, |chain| self.run_chain(target, config, chain))
    }
}

impl SliceSampler {
    fn run_chain(
        &self,
        target: &dyn LogDensity,
        config: &SamplerConfig,
        chain: usize,
    ) -> Result<ChainOutput, SamplerError> {
        let mut rng = chain_rng(config.seed, chain);
        let mut x = target.initial_point(&mut rng);
        let mut lp = target.log_density(&x);
        if !lp.is_finite() {
            return Err(SamplerError::InvalidInitialPoint {
                chain,
                log_density: lp,
            });
        }

        let dim = x.len();
        let mut widths = target.typical_scales();
        let mut history: Vec<Vec<f64>> = vec![Vec::new(); dim];
        let mut draws = Vec::with_capacity(config.draws);
        let mut divergences = 0usize;

        for it in 0..config.warmup + config.draws {
            let sampling = it >= config.warmup;
            let mut diverged = false;
            for j in 0..dim {
                if self
                    .update(target, &mut x, &mut lp, j, widths[j], &mut rng)
                    .is_err()
                {
                    diverged = true;
                }
            }

            if sampling {
                if diverged {
                    divergences += 1;
                }
                draws.push(x.clone());
                continue;
            }

            if it >= config.warmup / 2 {
                for (h, &v) in history.iter_mut().zip(x.iter()) {
                    h.push(v);
                }
            }
            if it + 1 == config.warmup {
                retune_widths(&mut widths, &history);
            }
        }

        tracing::debug!(
            chain,
            divergences,
            widths = ?widths,
            "slice chain finished"
        );
        Ok(ChainOutput { draws, divergences })
    }

    /// One univariate slice update of coordinate `j` (Neal 2003, stepping out).
    fn update(
        &self,
        target: &dyn LogDensity,
        x: &mut [f64],
        lp: &mut f64,
        j: usize,
        width: f64,
        rng: &mut StdRng,
    ) -> Result<(), StepFailure> {
        let x0 = x[j];
        // Slice level: log(u * f(x0)) with u ~ U(0, 1].
        let log_y = *lp + (1.0 - rng.gen_range(0.0..1.0f64)).ln();

        let eval = |x: &mut [f64], v: f64| {
            x[j] = v;
            target.log_density(x)
        };

        let mut left = x0 - width * rng.gen_range(0.0..1.0);
        let mut right = left + width;
        let mut steps_left = (self.max_steps_out as f64 * rng.gen_range(0.0..1.0)) as usize;
        let mut steps_right = self.max_steps_out.saturating_sub(1 + steps_left);

        while steps_left > 0 && eval(x, left) > log_y {
            left -= width;
            steps_left -= 1;
        }
        while steps_right > 0 && eval(x, right) > log_y {
            right += width;
            steps_right -= 1;
        }

        for _ in 0..self.max_shrink {
            let candidate = left + (right - left) * rng.gen_range(0.0..1.0);
            let lp_candidate = eval(x, candidate);
            if lp_candidate.is_nan() || lp_candidate == f64::INFINITY {
                x[j] = x0;
                return Err(StepFailure::Divergent);
            }
            if lp_candidate >= log_y {
                x[j] = candidate;
                *lp = lp_candidate;
                return Ok(());
            }
            if candidate < x0 {
                left = candidate;
            } else {
                right = candidate;
            }
        }

        x[j] = x0;
        Err(StepFailure::Divergent)
    }
}

fn retune_widths(widths: &mut [f64], history: &[Vec<f64>]) {
    for (w, h) in widths.iter_mut().zip(history.iter()) {
        if let Some(sd) = math::std_dev(h) {
            if sd.is_finite() && sd > 0.0 {
                *w = WIDTH_PER_SD * sd;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sampler::testing::{Broken, IsoNormal};

    fn config(seed: u64) -> SamplerConfig {
        SamplerConfig {
            draws: 1000,
            warmup: 200,
            chains: 2,
            seed,
            ..SamplerConfig::default()
        }
    }

    #[test]
    fn recovers_independent_normals() {
        let target = IsoNormal {
            means: vec![1.0, -3.0],
            sds: vec![0.5, 2.0],
        };
        let draws = SliceSampler::default().sample(&target, &config(7)).unwrap();
        assert_eq!(draws.n_chains(), 2);
        assert_eq!(draws.n_draws(), 1000);

        let x = draws.pooled("x").unwrap();
        let y = draws.pooled("y").unwrap();
        assert!((math::mean(&x).unwrap() - 1.0).abs() < 0.1);
        assert!((math::mean(&y).unwrap() + 3.0).abs() < 0.4);
        assert!((math::std_dev(&x).unwrap() - 0.5).abs() < 0.1);
        assert_eq!(draws.divergences(), 0);
    }

    #[test]
    fn same_seed_same_draws() {
        let target = IsoNormal {
            means: vec![0.0],
            sds: vec![1.0],
        };
        let a = SliceSampler::default().sample(&target, &config(11)).unwrap();
        let b = SliceSampler::default().sample(&target, &config(11)).unwrap();
        let c = SliceSampler::default().sample(&target, &config(12)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a.pooled("x").unwrap(), c.pooled("x").unwrap());
    }

    #[test]
    fn nan_density_fails_at_initialisation() {
        let err = SliceSampler::default().sample(&Broken, &config(1)).unwrap_err();
        assert!(matches!(err, SamplerError::InvalidInitialPoint { .. }));
    }

    #[test]
    fn respects_hard_support_boundary() {
        // Half-normal on x > 0 expressed as -inf below zero.
        struct HalfNormal;
        impl LogDensity for HalfNormal {
            fn param_names(&self) -> &[&'static str] {
                &["x"]
            }
            fn log_density(&self, theta: &[f64]) -> f64 {
                if theta[0] <= 0.0 {
                    f64::NEG_INFINITY
                } else {
                    -0.5 * theta[0] * theta[0]
                }
            }
            fn initial_point(&self, _rng: &mut StdRng) -> Vec<f64> {
                vec![1.0]
            }
            fn typical_scales(&self) -> Vec<f64> {
                vec![1.0]
            }
        }

        let draws = SliceSampler::default().sample(&HalfNormal, &config(3)).unwrap();
        let x = draws.pooled("x").unwrap();
        assert!(x.iter().all(|&v| v > 0.0));
        // E|Z| = sqrt(2/pi) ~ 0.798
        assert!((math::mean(&x).unwrap() - 0.798).abs() < 0.1);
    }
}
