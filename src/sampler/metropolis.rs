//! Component-wise adaptive Metropolis (Metropolis-within-Gibbs).
//!
//! Each sweep updates one coordinate at a time with a univariate proposal:
//!
//! - a Gaussian random walk `x_j' = x_j + exp(log_step_j) * z`
//! - for coordinates bounded on both sides, with probability `jump_prob`, a
//!   uniform draw over the whole support instead
//!
//! The uniform proposal is symmetric, so both moves keep the plain Metropolis
//! ratio. It lets `tau` cross the flat cells of the hard switch that a
//! shrinking random walk would otherwise crawl through.
//!
//! During warmup each `log_step_j` follows a Robbins–Monro recursion towards
//! `target_accept`. Random-walk steps on a bounded coordinate never exceed
//! its support width. Adaptation stops at the end of warmup so retained draws
//! come from a fixed Markov kernel.

use rand::Rng;
use rand_distr::{Distribution, StandardNormal};

use crate::domain::SamplerConfig;

use super::{ChainOutput, LogDensity, PosteriorDraws, Sampler, SamplerError, chain_rng, run_chains};

/// Decay exponent of the step-size adaptation gain.
const ADAPT_KAPPA: f64 = 0.6;
/// Offset that damps the first few adaptation steps.
const ADAPT_T0: f64 = 10.0;

#[derive(Debug, Clone)]
pub struct MetropolisSampler {
    /// Per-coordinate acceptance rate the warmup adaptation aims for.
    pub target_accept: f64,
    /// Full sweeps over all coordinates between retained draws.
    pub sweeps_per_draw: usize,
    /// Probability of a uniform proposal on a bounded coordinate.
    pub jump_prob: f64,
}

impl Default for MetropolisSampler {
    fn default() -> Self {
        Self {
            // Optimal for univariate random-walk updates.
            target_accept: 0.44,
            sweeps_per_draw: 10,
            jump_prob: 0.1,
        }
    }
}

impl Sampler for MetropolisSampler {
    fn name(&self) -> &'static str {
        "metropolis"
    }

    fn sample(
        &self,
        target: &dyn LogDensity,
        config: &SamplerConfig,
    ) -> Result<PosteriorDraws, SamplerError> {
        if !(self.target_accept > 0.0 && self.target_accept < 1.0) {
            return Err(SamplerError::InvalidConfig(format!(
                "metropolis target_accept must be in (0, 1), got {}",
                self.target_accept
            )));
        }
        if self.sweeps_per_draw == 0 {
            return Err(SamplerError::InvalidConfig(
                "sweeps_per_draw must be > 0".to_string(),
            ));
        }
        run_chains(target, config, |chain| self.run_chain(target, config, chain))
    }
}

impl MetropolisSampler {
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
        let supports: Vec<Option<(f64, f64)>> = (0..dim)
            .map(|j| target.support(j).filter(|(lo, hi)| hi > lo))
            .collect();
        let max_log_steps: Vec<f64> = supports
            .iter()
            .map(|s| s.map_or(f64::INFINITY, |(lo, hi)| (hi - lo).ln()))
            .collect();
        let mut log_steps: Vec<f64> = target
            .typical_scales()
            .iter()
            .zip(&max_log_steps)
            .map(|(s, max)| s.ln().min(*max))
            .collect();

        let mut draws = Vec::with_capacity(config.draws);
        let mut divergences = 0usize;
        let mut accepted = 0usize;
        let mut adapt_steps = 0usize;

        for it in 0..config.warmup + config.draws {
            let sampling = it >= config.warmup;
            let mut diverged = false;

            for _ in 0..self.sweeps_per_draw {
                if !sampling {
                    adapt_steps += 1;
                }
                for j in 0..dim {
                    let jump = supports[j].filter(|_| rng.gen_range(0.0..1.0) < self.jump_prob);
                    let current = x[j];
                    x[j] = match jump {
                        Some((lo, hi)) => rng.gen_range(lo..=hi),
                        None => {
                            let z: f64 = StandardNormal.sample(&mut rng);
                            current + log_steps[j].exp() * z
                        }
                    };

                    let lp_proposal = target.log_density(&x);
                    let alpha = if lp_proposal.is_nan() || lp_proposal == f64::INFINITY {
                        diverged = true;
                        0.0
                    } else {
                        (lp_proposal - lp).min(0.0).exp()
                    };

                    if rng.gen_range(0.0..1.0) < alpha {
                        lp = lp_proposal;
                        if sampling {
                            accepted += 1;
                        }
                    } else {
                        x[j] = current;
                    }

                    if !sampling && jump.is_none() {
                        let gain = (adapt_steps as f64 + ADAPT_T0).powf(-ADAPT_KAPPA);
                        log_steps[j] = (log_steps[j] + gain * (alpha - self.target_accept))
                            .min(max_log_steps[j]);
                    }
                }
            }

            if sampling {
                if diverged {
                    divergences += 1;
                }
                draws.push(x.clone());
            }
        }

        let proposals = config.draws * self.sweeps_per_draw * dim;
        tracing::debug!(
            chain,
            divergences,
            accept_rate = accepted as f64 / proposals.max(1) as f64,
            steps = ?log_steps.iter().map(|s| s.exp()).collect::<Vec<_>>(),
            "metropolis chain finished"
        );
        Ok(ChainOutput { draws, divergences })
    }
}
