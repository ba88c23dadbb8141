//! Before/after impact as posterior statements.
//!
//! Shifts are computed per joint draw (`mu_post[k] - mu_pre[k]`), never by
//! recombining draws from different indices, so the shift posterior keeps the
//! correlation between regimes.

use crate::domain::{ImpactSummary, ImpactThresholds};
use crate::error::{ChangePointError, Result};
use crate::math;
use crate::sampler::PosteriorDraws;

/// Percentile band reported for both shifts.
pub const SHIFT_BAND: (f64, f64) = (0.025, 0.975);

/// Summarize mean and volatility shifts across the break.
pub fn quantify(draws: &PosteriorDraws, thresholds: &ImpactThresholds) -> Result<ImpactSummary> {
    let mean_shift = paired_difference(draws, "mu_post", "mu_pre")?;
    let vol_shift = paired_difference(draws, "sigma_post", "sigma_pre")?;

    let (mean_shift_median, mean_shift_ci) = median_and_band(&mean_shift)?;
    let (vol_shift_median, vol_shift_ci) = median_and_band(&vol_shift)?;

    Ok(ImpactSummary {
        mean_shift_median,
        mean_shift_ci,
        prob_mean_increase: math::fraction_where(&mean_shift, |s| s > thresholds.mean_shift),
        prob_mean_decrease: math::fraction_where(&mean_shift, |s| s < -thresholds.mean_shift),
        vol_shift_median,
        vol_shift_ci,
        prob_vol_increase: math::fraction_where(&vol_shift, |s| s > thresholds.vol_shift),
    })
}

/// A log-return shift expressed as a percentage price move.
pub fn shift_to_percent(shift: f64) -> f64 {
    shift.exp_m1() * 100.0
}

fn paired_difference(draws: &PosteriorDraws, after: &str, before: &str) -> Result<Vec<f64>> {
    let a = draws.pooled(after)?;
    let b = draws.pooled(before)?;
    if a.len() != b.len() {
        return Err(ChangePointError::InvalidInput(format!(
            "'{after}' and '{before}' have different draw counts"
        )));
    }
    Ok(a.iter().zip(b.iter()).map(|(x, y)| x - y).collect())
}

fn median_and_band(values: &[f64]) -> Result<(f64, (f64, f64))> {
    let sorted = math::sorted(values);
    let empty = || ChangePointError::InvalidInput("no draws to summarize".to_string());
    let median = math::quantile_sorted(&sorted, 0.5).ok_or_else(empty)?;
    let lo = math::quantile_sorted(&sorted, SHIFT_BAND.0).ok_or_else(empty)?;
    let hi = math::quantile_sorted(&sorted, SHIFT_BAND.1).ok_or_else(empty)?;
    Ok((median, (lo, hi)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn draws(mu_pre: Vec<f64>, mu_post: Vec<f64>, s_pre: Vec<f64>, s_post: Vec<f64>) -> PosteriorDraws {
        let mut params = BTreeMap::new();
        params.insert("mu_pre".to_string(), vec![mu_pre]);
        params.insert("mu_post".to_string(), vec![mu_post]);
        params.insert("sigma_pre".to_string(), vec![s_pre]);
        params.insert("sigma_post".to_string(), vec![s_post]);
        PosteriorDraws::new(params, 0).unwrap()
    }

    #[test]
    fn shifts_are_paired_by_draw_index() {
        // Each draw has a shift of exactly 0.02 even though the marginals overlap.
        let pre = vec![0.00, 0.01, 0.02, 0.03];
        let post = vec![0.02, 0.03, 0.04, 0.05];
        let d = draws(pre, post, vec![0.01; 4], vec![0.01; 4]);
        let s = quantify(&d, &ImpactThresholds::default()).unwrap();
        assert!((s.mean_shift_median - 0.02).abs() < 1e-12);
        assert!((s.mean_shift_ci.0 - 0.02).abs() < 1e-12);
        assert!((s.mean_shift_ci.1 - 0.02).abs() < 1e-12);
        assert_eq!(s.prob_mean_increase, 1.0);
        assert_eq!(s.prob_mean_decrease, 0.0);
    }

    #[test]
    fn probabilities_use_practical_significance_floor() {
        let pre = vec![0.0; 4];
        let post = vec![0.005, 0.015, -0.02, 0.0];
        let d = draws(pre, post, vec![0.01; 4], vec![0.02, 0.0, 0.016, 0.01]);
        let s = quantify(&d, &ImpactThresholds::default()).unwrap();
        assert_eq!(s.prob_mean_increase, 0.25);
        assert_eq!(s.prob_mean_decrease, 0.25);
        // vol shifts: 0.01, -0.01, 0.006, 0.0 -> two above 0.005
        assert_eq!(s.prob_vol_increase, 0.5);
        assert!(s.mean_shift_ci.0 <= s.mean_shift_ci.1);
        assert!(s.vol_shift_ci.0 <= s.vol_shift_ci.1);
    }

    #[test]
    fn percent_conversion_uses_exponential() {
        assert!(shift_to_percent(0.0).abs() < 1e-12);
        assert!((shift_to_percent(0.1) - 10.517_091_807_564_76).abs() < 1e-9);
        assert!(shift_to_percent(-0.1) < 0.0);
    }

    #[test]
    fn missing_parameter_is_reported() {
        let mut params = BTreeMap::new();
        params.insert("mu_pre".to_string(), vec![vec![0.0]]);
        let d = PosteriorDraws::new(params, 0).unwrap();
        assert!(quantify(&d, &ImpactThresholds::default()).is_err());
    }
}
