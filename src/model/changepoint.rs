//! Single change-point model for daily log returns.
//!
//! ```text
//! tau        ~ Uniform(margin, n - margin)        (continuous)
//! mu_pre     ~ Normal(0, mu_scale)
//! mu_post    ~ Normal(0, mu_scale)
//! sigma_pre  ~ HalfNormal(sigma_scale)
//! sigma_post ~ HalfNormal(sigma_scale)
//!
//! x_i ~ Normal(mu_pre,  sigma_pre)   if i < tau
//! x_i ~ Normal(mu_post, sigma_post)  otherwise
//! ```
//!
//! `tau` is real-valued so samplers never have to move a discrete parameter;
//! the switch itself stays hard. The number of indices with `i < tau` is the
//! number of integers in `[0, tau)`, i.e. `ceil(tau)`, so each regime's
//! log-likelihood reduces to prefix sums of `x` and `x^2` and one density
//! evaluation costs O(1) regardless of series length.

use std::f64::consts::{LN_2, PI};

use rand::Rng;
use rand::rngs::StdRng;

use crate::domain::{ObservationSeries, PARAM_NAMES, PriorConfig};
use crate::error::{ChangePointError, Result};
use crate::math;
use crate::sampler::LogDensity;

const HALF_LN_2PI: f64 = 0.918_938_533_204_672_8;

/// Immutable model description: priors, tau bounds and sufficient statistics.
#[derive(Debug, Clone)]
pub struct ChangePointModelSpec {
    priors: PriorConfig,
    tau_lower: f64,
    tau_upper: f64,
    n: usize,
    /// `prefix_sum[k] = sum(x[..k])`
    prefix_sum: Vec<f64>,
    /// `prefix_sq[k] = sum(x[..k]^2)`
    prefix_sq: Vec<f64>,
    data_sd: f64,
}

/// Build the model for a prepared return series.
pub fn build(series: &ObservationSeries, priors: PriorConfig) -> Result<ChangePointModelSpec> {
    if !(priors.mu_scale.is_finite() && priors.mu_scale > 0.0) {
        return Err(ChangePointError::InvalidInput(format!(
            "mu prior scale must be finite and > 0, got {}",
            priors.mu_scale
        )));
    }
    if !(priors.sigma_scale.is_finite() && priors.sigma_scale > 0.0) {
        return Err(ChangePointError::InvalidInput(format!(
            "sigma prior scale must be finite and > 0, got {}",
            priors.sigma_scale
        )));
    }

    let n = series.len();
    let need = priors.min_observations();
    if n < need {
        return Err(ChangePointError::InsufficientData { got: n, need });
    }

    let values = series.values();
    let mut prefix_sum = Vec::with_capacity(n + 1);
    let mut prefix_sq = Vec::with_capacity(n + 1);
    prefix_sum.push(0.0);
    prefix_sq.push(0.0);
    for &x in values {
        prefix_sum.push(prefix_sum[prefix_sum.len() - 1] + x);
        prefix_sq.push(prefix_sq[prefix_sq.len() - 1] + x * x);
    }

    // Constant series have zero sd; keep a positive starting volatility.
    let data_sd = math::std_dev(values)
        .filter(|sd| sd.is_finite() && *sd > 0.0)
        .unwrap_or(priors.sigma_scale);

    Ok(ChangePointModelSpec {
        priors,
        tau_lower: priors.margin as f64,
        tau_upper: (n - priors.margin) as f64,
        n,
        prefix_sum,
        prefix_sq,
        data_sd,
    })
}

impl ChangePointModelSpec {
    pub fn priors(&self) -> &PriorConfig {
        &self.priors
    }

    /// Support of the `tau` prior.
    pub fn tau_bounds(&self) -> (f64, f64) {
        (self.tau_lower, self.tau_upper)
    }

    /// Number of observations the likelihood covers.
    pub fn n_obs(&self) -> usize {
        self.n
    }

    /// Observations assigned to the pre-break regime for a given `tau`.
    pub fn pre_count(&self, tau: f64) -> usize {
        if tau <= 0.0 {
            return 0;
        }
        (tau.ceil() as usize).min(self.n)
    }

    /// Gaussian log-likelihood of observations `start..end`.
    fn segment_log_lik(&self, start: usize, end: usize, mu: f64, sigma: f64) -> f64 {
        let m = (end - start) as f64;
        if m == 0.0 {
            return 0.0;
        }
        let sx = self.prefix_sum[end] - self.prefix_sum[start];
        let sxx = self.prefix_sq[end] - self.prefix_sq[start];
        let ss = (sxx - 2.0 * mu * sx + m * mu * mu).max(0.0);
        -m * (sigma.ln() + HALF_LN_2PI) - ss / (2.0 * sigma * sigma)
    }

    /// Log-likelihood only (no priors).
    pub fn log_likelihood(&self, theta: &[f64]) -> f64 {
        let [tau, mu_pre, mu_post, sigma_pre, sigma_post] = match theta {
            &[a, b, c, d, e] => [a, b, c, d, e],
            _ => return f64::NAN,
        };
        if !(sigma_pre > 0.0 && sigma_post > 0.0) {
            return f64::NEG_INFINITY;
        }
        let k = self.pre_count(tau);
        self.segment_log_lik(0, k, mu_pre, sigma_pre)
            + self.segment_log_lik(k, self.n, mu_post, sigma_post)
    }

    fn log_prior(&self, theta: &[f64]) -> f64 {
        let (tau, mu_pre, mu_post, sigma_pre, sigma_post) =
            (theta[0], theta[1], theta[2], theta[3], theta[4]);

        if !(tau >= self.tau_lower && tau <= self.tau_upper) {
            return f64::NEG_INFINITY;
        }
        if !(sigma_pre > 0.0 && sigma_post > 0.0) {
            return f64::NEG_INFINITY;
        }

        let mu_s = self.priors.mu_scale;
        let sigma_s = self.priors.sigma_scale;
        -(self.tau_upper - self.tau_lower).ln()
            + normal_log_pdf(mu_pre, mu_s)
            + normal_log_pdf(mu_post, mu_s)
            + LN_2
            + normal_log_pdf(sigma_pre, sigma_s)
            + LN_2
            + normal_log_pdf(sigma_post, sigma_s)
    }
}

/// `log N(x | 0, scale)`.
fn normal_log_pdf(x: f64, scale: f64) -> f64 {
    let z = x / scale;
    -0.5 * z * z - scale.ln() - 0.5 * (2.0 * PI).ln()
}

impl LogDensity for ChangePointModelSpec {
    fn param_names(&self) -> &[&'static str] {
        &PARAM_NAMES
    }

    fn log_density(&self, theta: &[f64]) -> f64 {
        if theta.len() != PARAM_NAMES.len() {
            return f64::NAN;
        }
        let prior = self.log_prior(theta);
        if prior == f64::NEG_INFINITY {
            return prior;
        }
        prior + self.log_likelihood(theta)
    }

    fn initial_point(&self, rng: &mut StdRng) -> Vec<f64> {
        // Spread chain starts over the middle of the tau support so R-hat
        // can detect chains stuck in different modes.
        let span = self.tau_upper - self.tau_lower;
        let tau = self.tau_lower + span * rng.gen_range(0.25..0.75);
        let jitter = self.data_sd / (self.priors.margin.max(1) as f64).sqrt();
        vec![
            tau,
            rng.gen_range(-jitter..jitter),
            rng.gen_range(-jitter..jitter),
            self.data_sd * rng.gen_range(0.8..1.25),
            self.data_sd * rng.gen_range(0.8..1.25),
        ]
    }

    fn typical_scales(&self) -> Vec<f64> {
        let regime = self.data_sd / (self.priors.margin.max(1) as f64).sqrt();
        let tau = ((self.tau_upper - self.tau_lower) / 10.0).max(1.0);
        vec![tau, regime, regime, regime, regime]
    }

    fn support(&self, index: usize) -> Option<(f64, f64)> {
        (index == 0).then_some((self.tau_lower, self.tau_upper))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Observation;
    use chrono::NaiveDate;

    fn series(values: &[f64]) -> ObservationSeries {
        let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        let obs = values
            .iter()
            .enumerate()
            .map(|(i, &v)| Observation {
                date: start + chrono::Duration::days(i as i64),
                value: v,
            })
            .collect();
        ObservationSeries::new(obs).unwrap()
    }

    fn wiggle(n: usize) -> Vec<f64> {
        (0..n).map(|i| ((i * 37 % 11) as f64 - 5.0) * 0.002).collect()
    }

    fn naive_log_lik(x: &[f64], theta: &[f64]) -> f64 {
        x.iter()
            .enumerate()
            .map(|(i, &v)| {
                let (mu, sigma) = if (i as f64) < theta[0] {
                    (theta[1], theta[3])
                } else {
                    (theta[2], theta[4])
                };
                let z = (v - mu) / sigma;
                -0.5 * z * z - sigma.ln() - HALF_LN_2PI
            })
            .sum()
    }

    #[test]
    fn prefix_sum_likelihood_matches_direct_sum() {
        let x = wiggle(100);
        let model = build(&series(&x), PriorConfig::default()).unwrap();
        for tau in [30.0, 30.2, 49.999, 50.0, 50.0001, 69.5, 70.0] {
            let theta = [tau, 0.001, -0.002, 0.01, 0.02];
            let fast = model.log_likelihood(&theta);
            let slow = naive_log_lik(&x, &theta);
            assert!((fast - slow).abs() < 1e-8, "tau={tau}: {fast} vs {slow}");
        }
    }

    #[test]
    fn switch_is_hard_on_continuous_tau() {
        let model = build(&series(&wiggle(100)), PriorConfig::default()).unwrap();
        assert_eq!(model.pre_count(50.0), 50);
        assert_eq!(model.pre_count(50.0001), 51);
        assert_eq!(model.pre_count(50.9), 51);
        // Within one integer interval the density is flat in tau.
        let a = model.log_density(&[50.2, 0.0, 0.0, 0.01, 0.02]);
        let b = model.log_density(&[50.8, 0.0, 0.0, 0.01, 0.02]);
        assert_eq!(a, b);
    }

    #[test]
    fn outside_support_is_negative_infinity() {
        let model = build(&series(&wiggle(100)), PriorConfig::default()).unwrap();
        assert_eq!(model.tau_bounds(), (30.0, 70.0));
        assert_eq!(
            model.log_density(&[29.9, 0.0, 0.0, 0.01, 0.01]),
            f64::NEG_INFINITY
        );
        assert_eq!(
            model.log_density(&[50.0, 0.0, 0.0, -0.01, 0.01]),
            f64::NEG_INFINITY
        );
        assert!(model.log_density(&[50.0, 0.0]).is_nan());
    }

    #[test]
    fn too_short_series_is_insufficient() {
        let err = build(&series(&wiggle(40)), PriorConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            ChangePointError::InsufficientData { got: 40, need: 61 }
        ));
    }

    #[test]
    fn initial_point_is_inside_support() {
        use rand::SeedableRng;
        let model = build(&series(&wiggle(200)), PriorConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..20 {
            let theta = model.initial_point(&mut rng);
            assert!(model.log_density(&theta).is_finite());
        }
    }
}
