//! Synthetic two-regime price paths.
//!
//! Used by `oilcp simulate` and by tests that need a series with a known
//! break. Returns are Gaussian with one set of (mean, volatility) before
//! `break_index` and another from `break_index` on; prices are the
//! exponentiated cumulative sum starting from `start_price`.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{Observation, ObservationSeries};
use crate::error::{ChangePointError, Result};

/// Parameters of a synthetic series with a single structural break.
#[derive(Debug, Clone, PartialEq)]
pub struct TwoRegimeSpec {
    /// Number of log returns (prices are one longer).
    pub n: usize,
    /// Index of the first post-break return.
    pub break_index: usize,
    pub mu_pre: f64,
    pub mu_post: f64,
    pub sigma_pre: f64,
    pub sigma_post: f64,
    pub seed: u64,
    pub start_date: NaiveDate,
    pub start_price: f64,
}

impl Default for TwoRegimeSpec {
    fn default() -> Self {
        Self {
            n: 200,
            break_index: 100,
            mu_pre: 0.0,
            mu_post: 0.02,
            sigma_pre: 0.01,
            sigma_post: 0.01,
            seed: 42,
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap_or_default(),
            start_price: 60.0,
        }
    }
}

/// Simulate the daily log returns directly.
///
/// Return `i` is dated on the trading day of the price it ends at, matching
/// what `series::prepare` produces from [`simulate_prices`].
pub fn generate_returns(spec: &TwoRegimeSpec) -> Result<ObservationSeries> {
    let returns = draw_returns(spec)?;
    let dates = trading_days(spec.start_date, spec.n + 1);
    let observations = dates[1..]
        .iter()
        .zip(returns)
        .map(|(&date, value)| Observation { date, value })
        .collect();
    ObservationSeries::new(observations)
}

/// Simulate a price path of `n + 1` trading days.
pub fn simulate_prices(spec: &TwoRegimeSpec) -> Result<ObservationSeries> {
    if !(spec.start_price.is_finite() && spec.start_price > 0.0) {
        return Err(ChangePointError::InvalidInput(format!(
            "start price must be positive, got {}",
            spec.start_price
        )));
    }
    let returns = draw_returns(spec)?;
    let dates = trading_days(spec.start_date, spec.n + 1);

    let mut price = spec.start_price;
    let mut observations = Vec::with_capacity(dates.len());
    observations.push(Observation { date: dates[0], value: price });
    for (&date, r) in dates[1..].iter().zip(returns) {
        price *= r.exp();
        observations.push(Observation { date, value: price });
    }
    ObservationSeries::new(observations)
}

fn draw_returns(spec: &TwoRegimeSpec) -> Result<Vec<f64>> {
    if spec.n == 0 {
        return Err(ChangePointError::InvalidInput(
            "synthetic series needs at least one return".to_string(),
        ));
    }
    if spec.break_index > spec.n {
        return Err(ChangePointError::InvalidInput(format!(
            "break index {} is past the end of a {}-return series",
            spec.break_index, spec.n
        )));
    }
    let pre = regime(spec.mu_pre, spec.sigma_pre)?;
    let post = regime(spec.mu_post, spec.sigma_post)?;

    let mut rng = StdRng::seed_from_u64(spec.seed);
    Ok((0..spec.n)
        .map(|i| {
            if i < spec.break_index {
                pre.sample(&mut rng)
            } else {
                post.sample(&mut rng)
            }
        })
        .collect())
}

fn regime(mu: f64, sigma: f64) -> Result<Normal<f64>> {
    if !(mu.is_finite() && sigma.is_finite() && sigma > 0.0) {
        return Err(ChangePointError::InvalidInput(format!(
            "regime needs a finite mean and positive volatility, got ({mu}, {sigma})"
        )));
    }
    Normal::new(mu, sigma)
        .map_err(|e| ChangePointError::InvalidInput(format!("return distribution error: {e}")))
}

/// `count` consecutive weekdays starting at `start` (rolled forward off a weekend).
fn trading_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut day = start;
    while days.len() < count {
        if !matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(day);
        }
        day += Duration::days(1);
    }
    days
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_series() {
        let spec = TwoRegimeSpec::default();
        let a = generate_returns(&spec).unwrap();
        let b = generate_returns(&spec).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 200);
    }

    #[test]
    fn regimes_differ_across_the_break() {
        let spec = TwoRegimeSpec {
            n: 2000,
            break_index: 1000,
            ..TwoRegimeSpec::default()
        };
        let r = generate_returns(&spec).unwrap();
        let pre: f64 = r.values()[..1000].iter().sum::<f64>() / 1000.0;
        let post: f64 = r.values()[1000..].iter().sum::<f64>() / 1000.0;
        assert!(pre.abs() < 0.002, "pre mean {pre}");
        assert!((post - 0.02).abs() < 0.002, "post mean {post}");
    }

    #[test]
    fn prices_and_returns_agree() {
        let spec = TwoRegimeSpec {
            n: 30,
            break_index: 15,
            ..TwoRegimeSpec::default()
        };
        let prices = simulate_prices(&spec).unwrap();
        let returns = generate_returns(&spec).unwrap();
        assert_eq!(prices.len(), 31);
        assert_eq!(prices.values()[0], 60.0);
        assert_eq!(&prices.dates()[1..], returns.dates());
        let implied = (prices.values()[5] / prices.values()[4]).ln();
        assert!((implied - returns.values()[4]).abs() < 1e-12);
    }

    #[test]
    fn dates_skip_weekends() {
        // 2020-01-03 is a Friday.
        let days = trading_days(NaiveDate::from_ymd_opt(2020, 1, 3).unwrap(), 3);
        assert_eq!(days[1], NaiveDate::from_ymd_opt(2020, 1, 6).unwrap());
        assert!(days.iter().all(|d| d.weekday().number_from_monday() <= 5));
    }

    #[test]
    fn invalid_specs_are_rejected() {
        let past_end = TwoRegimeSpec { break_index: 201, ..TwoRegimeSpec::default() };
        assert!(generate_returns(&past_end).is_err());
        let flat = TwoRegimeSpec { sigma_post: 0.0, ..TwoRegimeSpec::default() };
        assert!(generate_returns(&flat).is_err());
    }
}
