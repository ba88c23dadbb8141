//! Convergence diagnostics.
//!
//! For each tracked parameter we compute:
//!
//! - rank-normalized split R-hat, taking the worse of the bulk and folded
//!   (tail) variants
//! - bulk effective sample size on rank-normalized split chains, truncating
//!   the autocorrelation sum with Geyer's initial monotone sequence
//!
//! Following Vehtari et al. (2021), "Rank-normalization, folding, and
//! localization: an improved R-hat for assessing convergence of MCMC".
//!
//! A failed verdict is returned as data (`converged = false`), never as an
//! error.

use crate::domain::{ConvergencePolicy, ConvergenceReport, PARAM_NAMES, ParamDiagnostics};
use crate::math;
use crate::sampler::PosteriorDraws;

/// Diagnose all model parameters against `policy`.
pub fn diagnose(draws: &PosteriorDraws, policy: &ConvergencePolicy) -> ConvergenceReport {
    let mut params = Vec::with_capacity(PARAM_NAMES.len());
    for name in PARAM_NAMES {
        let Ok(chains) = draws.chains(name) else {
            tracing::warn!(param = name, "no draws to diagnose");
            params.push(ParamDiagnostics {
                name: name.to_string(),
                mean: f64::NAN,
                sd: f64::NAN,
                r_hat: f64::INFINITY,
                ess_bulk: 0.0,
            });
            continue;
        };
        let pooled: Vec<f64> = chains.iter().flatten().copied().collect();
        params.push(ParamDiagnostics {
            name: name.to_string(),
            mean: math::mean(&pooled).unwrap_or(f64::NAN),
            sd: math::std_dev(&pooled).unwrap_or(f64::NAN),
            r_hat: sanitize_r_hat(rank_r_hat(chains)),
            ess_bulk: sanitize_ess(ess_bulk(chains)),
        });
    }

    let max_r_hat = params.iter().map(|p| p.r_hat).fold(f64::NEG_INFINITY, f64::max);
    let min_ess = params.iter().map(|p| p.ess_bulk).fold(f64::INFINITY, f64::min);
    let converged = max_r_hat < policy.max_r_hat && min_ess > policy.min_ess;

    if !converged {
        tracing::warn!(
            max_r_hat,
            min_ess,
            policy_r_hat = policy.max_r_hat,
            policy_ess = policy.min_ess,
            "posterior did not pass convergence policy"
        );
    }

    ConvergenceReport {
        max_r_hat,
        min_ess,
        converged,
        params,
    }
}

/// Undefined R-hat (e.g. constant chains) counts as the worst possible value.
fn sanitize_r_hat(r: f64) -> f64 {
    if r.is_finite() { r } else { f64::INFINITY }
}

fn sanitize_ess(ess: f64) -> f64 {
    if ess.is_finite() { ess.max(0.0) } else { 0.0 }
}

/// Split every chain into first and second halves (odd middle draw dropped).
pub fn split_chains(chains: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut out = Vec::with_capacity(chains.len() * 2);
    for chain in chains {
        let half = chain.len() / 2;
        out.push(chain[..half].to_vec());
        out.push(chain[chain.len() - half..].to_vec());
    }
    out
}

/// Replace values by Normal scores of their pooled average ranks.
pub fn rank_normalize(chains: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let mut indexed: Vec<(f64, usize, usize)> = chains
        .iter()
        .enumerate()
        .flat_map(|(c, chain)| chain.iter().enumerate().map(move |(d, &v)| (v, c, d)))
        .collect();
    indexed.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

    let size = indexed.len() as f64;
    let mut out: Vec<Vec<f64>> = chains.iter().map(|c| vec![0.0; c.len()]).collect();

    let mut i = 0;
    while i < indexed.len() {
        let mut j = i + 1;
        while j < indexed.len() && indexed[j].0 == indexed[i].0 {
            j += 1;
        }
        // 1-based average rank of the tie block i..j
        let rank = (i + 1 + j) as f64 / 2.0;
        let z = math::normal_quantile((rank - 0.375) / (size + 0.25));
        for &(_, c, d) in &indexed[i..j] {
            out[c][d] = z;
        }
        i = j;
    }
    out
}

/// Classic potential scale reduction on equal-length chains.
pub fn basic_r_hat(chains: &[Vec<f64>]) -> f64 {
    let n = chains.first().map(Vec::len).unwrap_or(0);
    if chains.len() < 2 || n < 2 {
        return f64::NAN;
    }
    let means: Vec<f64> = chains.iter().filter_map(|c| math::mean(c)).collect();
    let vars: Vec<f64> = chains.iter().filter_map(|c| math::variance(c)).collect();
    let Some(between_var) = math::variance(&means) else {
        return f64::NAN;
    };
    let Some(within) = math::mean(&vars) else {
        return f64::NAN;
    };
    let n = n as f64;
    let between = n * between_var;
    ((between / within + n - 1.0) / n).sqrt()
}

/// Rank-normalized split R-hat: max of bulk and folded variants.
pub fn rank_r_hat(chains: &[Vec<f64>]) -> f64 {
    let split = split_chains(chains);
    let bulk = basic_r_hat(&rank_normalize(&split));

    let pooled: Vec<f64> = chains.iter().flatten().copied().collect();
    let Some(med) = math::median(&pooled) else {
        return f64::NAN;
    };
    let folded: Vec<Vec<f64>> = split
        .iter()
        .map(|c| c.iter().map(|v| (v - med).abs()).collect())
        .collect();
    let tail = basic_r_hat(&rank_normalize(&folded));

    if bulk.is_nan() || tail.is_nan() {
        return f64::NAN;
    }
    bulk.max(tail)
}

/// Bulk effective sample size.
pub fn ess_bulk(chains: &[Vec<f64>]) -> f64 {
    ess(&rank_normalize(&split_chains(chains)))
}

/// Biased (`1/n`) autocovariance at `lag`.
fn autocov(x: &[f64], mean: f64, lag: usize) -> f64 {
    let n = x.len();
    let mut acc = 0.0;
    for i in 0..n - lag {
        acc += (x[i] - mean) * (x[i + lag] - mean);
    }
    acc / n as f64
}

/// Multi-chain ESS with Geyer's initial monotone sequence.
pub fn ess(chains: &[Vec<f64>]) -> f64 {
    let m = chains.len();
    let n = chains.first().map(Vec::len).unwrap_or(0);
    if m == 0 || n < 4 || chains.iter().any(|c| c.len() != n) {
        return f64::NAN;
    }

    let means: Vec<f64> = chains.iter().map(|c| math::mean(c).unwrap_or(0.0)).collect();
    let acov_at = |lag: usize| -> f64 {
        chains
            .iter()
            .zip(means.iter())
            .map(|(c, &mu)| autocov(c, mu, lag))
            .sum::<f64>()
            / m as f64
    };

    let nf = n as f64;
    let mean_var = acov_at(0) * nf / (nf - 1.0);
    let mut var_plus = mean_var * (nf - 1.0) / nf;
    if m > 1 {
        var_plus += math::variance(&means).unwrap_or(0.0);
    }
    if !(var_plus > 0.0) {
        return f64::NAN;
    }

    let mut rho = vec![0.0; n];
    rho[0] = 1.0;
    let mut rho_even = 1.0;
    let mut rho_odd = 1.0 - (mean_var - acov_at(1)) / var_plus;
    rho[1] = rho_odd;

    let mut t = 1usize;
    while t + 3 < n && rho_even + rho_odd > 0.0 {
        rho_even = 1.0 - (mean_var - acov_at(t + 1)) / var_plus;
        rho_odd = 1.0 - (mean_var - acov_at(t + 2)) / var_plus;
        if rho_even + rho_odd >= 0.0 {
            rho[t + 1] = rho_even;
            rho[t + 2] = rho_odd;
        }
        t += 2;
    }

    // Last lag index included in the positive sum; -1 when the loop never ran.
    let max_t = t as isize - 2;
    if rho_even > 0.0 {
        rho[(max_t + 1) as usize] = rho_even;
    }

    let mut t = 1isize;
    while t <= max_t - 2 {
        let (i, j) = (t as usize, (t + 1) as usize);
        if rho[j] + rho[j + 1] > rho[i - 1] + rho[i] {
            rho[j] = (rho[i - 1] + rho[i]) / 2.0;
            rho[j + 1] = rho[j];
        }
        t += 2;
    }

    let total = (m * n) as f64;
    let head: f64 = if max_t >= 0 {
        rho[..=(max_t as usize)].iter().sum()
    } else {
        0.0
    };
    let next = rho.get((max_t + 1) as usize).copied().unwrap_or(0.0);
    let tau_hat = (-1.0 + 2.0 * head + next).max(1.0 / total.log10());
    total / tau_hat
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, StandardNormal};
    use std::collections::BTreeMap;

    fn iid_chains(seed: u64, m: usize, n: usize, offset: &[f64]) -> Vec<Vec<f64>> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..m)
            .map(|c| {
                (0..n)
                    .map(|_| {
                        let z: f64 = StandardNormal.sample(&mut rng);
                        z + offset.get(c).copied().unwrap_or(0.0)
                    })
                    .collect()
            })
            .collect()
    }

    fn ar1_chain(seed: u64, n: usize, phi: f64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut x = 0.0;
        (0..n)
            .map(|_| {
                let z: f64 = StandardNormal.sample(&mut rng);
                x = phi * x + z;
                x
            })
            .collect()
    }

    fn draws_from(chains: Vec<Vec<f64>>) -> PosteriorDraws {
        let mut params = BTreeMap::new();
        for name in PARAM_NAMES {
            params.insert(name.to_string(), chains.clone());
        }
        PosteriorDraws::new(params, 0).unwrap()
    }

    #[test]
    fn iid_chains_look_converged() {
        let chains = iid_chains(1, 4, 500, &[]);
        let r = rank_r_hat(&chains);
        let e = ess_bulk(&chains);
        assert!(r < 1.02, "r_hat={r}");
        assert!(e > 1200.0, "ess={e}");
    }

    #[test]
    fn shifted_chain_inflates_r_hat() {
        let chains = iid_chains(2, 2, 500, &[0.0, 3.0]);
        assert!(rank_r_hat(&chains) > 1.5);
    }

    #[test]
    fn autocorrelation_reduces_ess() {
        let chains = vec![ar1_chain(3, 1000, 0.9), ar1_chain(4, 1000, 0.9)];
        let e = ess_bulk(&chains);
        // Theoretical ESS ~ 2000 * (1 - 0.9) / (1 + 0.9) ~ 105.
        assert!(e < 300.0, "ess={e}");
        assert!(e > 30.0, "ess={e}");
    }

    #[test]
    fn split_drops_middle_of_odd_chain() {
        let split = split_chains(&[vec![1.0, 2.0, 3.0, 4.0, 5.0]]);
        assert_eq!(split, vec![vec![1.0, 2.0], vec![4.0, 5.0]]);
    }

    #[test]
    fn rank_normalize_averages_ties() {
        let z = rank_normalize(&[vec![1.0, 1.0], vec![2.0, 0.0]]);
        assert_eq!(z[0][0], z[0][1]);
        assert!(z[1][1] < z[0][0] && z[0][0] < z[1][0]);
    }

    #[test]
    fn report_uses_worst_parameter() {
        let report = diagnose(&draws_from(iid_chains(5, 2, 500, &[])), &ConvergencePolicy::default());
        assert!(report.converged);
        assert_eq!(report.params.len(), 5);
        let worst = report.params.iter().map(|p| p.r_hat).fold(0.0, f64::max);
        assert_eq!(report.max_r_hat, worst);
    }

    #[test]
    fn constant_chains_do_not_converge() {
        let report = diagnose(
            &draws_from(vec![vec![1.0; 100], vec![1.0; 100]]),
            &ConvergencePolicy::default(),
        );
        assert!(!report.converged);
        assert_eq!(report.min_ess, 0.0);
        assert!(report.max_r_hat.is_infinite());
    }

    #[test]
    fn policy_thresholds_are_configurable() {
        let draws = draws_from(iid_chains(6, 2, 200, &[]));
        let strict = ConvergencePolicy {
            max_r_hat: 1.05,
            min_ess: 10_000.0,
        };
        assert!(!diagnose(&draws, &strict).converged);
        let lenient = ConvergencePolicy {
            max_r_hat: 1.05,
            min_ess: 50.0,
        };
        assert!(diagnose(&draws, &lenient).converged);
    }
}
