//! Augmented Dickey–Fuller unit-root test.
//!
//! ```text
//! dy_t = a + g * y_{t-1} + sum_{i=1..p} b_i * dy_{t-i} + e_t
//! ```
//!
//! The statistic is the t-ratio of `g`. Its p-value comes from MacKinnon's
//! (1994) response-surface approximation for the constant-only regression.
//! The lag order is fixed at `floor(4 * (n / 100)^(1/4))`.
//!
//! Raw prices are expected to carry a unit root; log returns should not.

use nalgebra::{DMatrix, DVector};
use serde::Serialize;

use crate::domain::ObservationSeries;
use crate::error::{ChangePointError, Result};
use crate::math;

/// Shortest series the test runs on.
pub const ADF_MIN_LEN: usize = 10;
/// p-value below which a series is reported as stationary.
pub const ADF_SIGNIFICANCE: f64 = 0.05;

// MacKinnon (1994), constant only, one series.
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038_269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.932_02, -0.127_45, -0.010_368];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AdfResult {
    pub label: String,
    pub statistic: f64,
    pub p_value: f64,
    pub lags: usize,
    /// Rows in the test regression.
    pub n_obs: usize,
    pub stationary: bool,
}

impl AdfResult {
    pub fn interpretation(&self) -> String {
        format!(
            "{} is {} (ADF={:.3}, p={:.4})",
            self.label,
            if self.stationary { "STATIONARY" } else { "NON-STATIONARY" },
            self.statistic,
            self.p_value
        )
    }
}

/// ADF results for the raw prices and the log returns derived from them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityReport {
    pub prices: AdfResult,
    pub returns: AdfResult,
}

pub fn analyze_stationarity(
    prices: &ObservationSeries,
    returns: &ObservationSeries,
) -> Result<StationarityReport> {
    Ok(StationarityReport {
        prices: adf_test(prices.values(), "Raw prices")?,
        returns: adf_test(returns.values(), "Log returns")?,
    })
}

/// Lag order used for a series of `n` points.
pub fn adf_lag_order(n: usize) -> usize {
    let schwert = (4.0 * (n as f64 / 100.0).powf(0.25)).floor() as usize;
    // Keep more regression rows than columns: n - 1 - p > p + 2.
    schwert.min(n.saturating_sub(4) / 2)
}

/// Run the test on `values`, ignoring non-finite entries.
pub fn adf_test(values: &[f64], label: &str) -> Result<AdfResult> {
    let y: Vec<f64> = values.iter().copied().filter(|v| v.is_finite()).collect();
    if y.len() < ADF_MIN_LEN {
        return Err(ChangePointError::InsufficientData {
            got: y.len(),
            need: ADF_MIN_LEN,
        });
    }

    let lags = adf_lag_order(y.len());
    let dy: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();
    let n_obs = dy.len() - lags;
    let k = lags + 2;

    let mut design = DMatrix::<f64>::zeros(n_obs, k);
    let mut response = DVector::<f64>::zeros(n_obs);
    for (row, t) in (lags..dy.len()).enumerate() {
        response[row] = dy[t];
        design[(row, 0)] = 1.0;
        design[(row, 1)] = y[t];
        for i in 1..=lags {
            design[(row, 1 + i)] = dy[t - i];
        }
    }

    let statistic = math::ols(&design, &response)
        .map(|fit| fit.beta[1] / fit.std_errors[1])
        .filter(|t| t.is_finite())
        .ok_or_else(|| {
            ChangePointError::InvalidInput(format!(
                "{label}: Dickey-Fuller regression is singular (constant series?)"
            ))
        })?;

    let p_value = mackinnon_p_value(statistic);
    let result = AdfResult {
        label: label.to_string(),
        statistic,
        p_value,
        lags,
        n_obs,
        stationary: p_value < ADF_SIGNIFICANCE,
    };
    tracing::debug!(label, statistic, p_value, lags, "adf test");
    Ok(result)
}

/// Approximate p-value of an ADF statistic (constant, no trend).
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }
    let coef: &[f64] = if statistic <= TAU_STAR {
        &TAU_SMALL_P
    } else {
        &TAU_LARGE_P
    };
    let z = coef.iter().rev().fold(0.0, |acc, c| acc * statistic + c);
    math::normal_cdf(z)
}
