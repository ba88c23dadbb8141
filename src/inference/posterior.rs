//! Posterior over `tau` -> calendar date + credible interval.
//!
//! `tau` is sampled on a continuous scale; this is the one place where it is
//! discretised. All chains are pooled first.

use chrono::NaiveDate;

use crate::domain::ChangePointEstimate;
use crate::error::{ChangePointError, Result};
use crate::math;
use crate::sampler::PosteriorDraws;

pub const DEFAULT_CREDIBLE_MASS: f64 = 0.95;

/// Map the pooled `tau` posterior onto `dates`.
///
/// - point estimate: `round(median)` (ties to even)
/// - interval: equal-tailed empirical quantiles, each floored
/// - every index is clamped into `[0, dates.len() - 1]`
///
/// Flooring both bounds can leave the rounded median just outside the
/// interval (e.g. median 100.6, upper quantile 100.9); the interval is then
/// widened to include it.
pub fn extract(
    draws: &PosteriorDraws,
    dates: &[NaiveDate],
    credible_mass: f64,
) -> Result<ChangePointEstimate> {
    if !(credible_mass > 0.0 && credible_mass < 1.0) {
        return Err(ChangePointError::InvalidInput(format!(
            "credible mass must be in (0, 1), got {credible_mass}"
        )));
    }
    if dates.is_empty() {
        return Err(ChangePointError::InvalidInput(
            "no dates to map the change point onto".to_string(),
        ));
    }

    let tau = math::sorted(&draws.pooled("tau")?);
    let median = math::quantile_sorted(&tau, 0.5)
        .ok_or_else(|| ChangePointError::InvalidInput("no tau draws".to_string()))?;
    let tail = (1.0 - credible_mass) / 2.0;
    let lower = math::quantile_sorted(&tau, tail).unwrap_or(median);
    let upper = math::quantile_sorted(&tau, 1.0 - tail).unwrap_or(median);

    let last = dates.len() - 1;
    let index_median = clamp_index(median.round_ties_even(), last);
    let ci_start_index = clamp_index(lower.floor(), last).min(index_median);
    let ci_end_index = clamp_index(upper.floor(), last).max(index_median);

    Ok(ChangePointEstimate {
        index_median,
        calendar_date: dates[index_median],
        credible_interval_start: dates[ci_start_index],
        credible_interval_end: dates[ci_end_index],
        ci_start_index,
        ci_end_index,
        credible_mass,
    })
}

fn clamp_index(value: f64, last: usize) -> usize {
    if value.is_nan() || value <= 0.0 {
        0
    } else if value >= last as f64 {
        last
    } else {
        value as usize
    }
}
