//! Price series -> log-return series.
//!
//! Prices are non-stationary; the model works on daily log returns
//! `ln(p[i] / p[i-1])`, each dated at the later day of its pair.

use chrono::NaiveDate;
use serde::Serialize;

use crate::domain::{Observation, ObservationSeries};
use crate::error::{ChangePointError, Result};
use crate::math;

/// Summary stats about a prepared return series (for reports).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeriesSummary {
    pub n: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub mean: f64,
    pub std_dev: f64,
}

/// Convert prices into log returns.
///
/// Fails with `InvalidInput` on a non-positive price (the log is undefined)
/// and with `InsufficientData` when fewer than `min_len` returns remain.
pub fn prepare(prices: &ObservationSeries, min_len: usize) -> Result<ObservationSeries> {
    let dates = prices.dates();
    let values = prices.values();

    if let Some((idx, &p)) = values.iter().enumerate().find(|(_, p)| **p <= 0.0) {
        return Err(ChangePointError::InvalidInput(format!(
            "non-positive price {p} on {} (log return undefined)",
            dates[idx]
        )));
    }

    let mut out = Vec::with_capacity(values.len().saturating_sub(1));
    for i in 1..values.len() {
        let r = (values[i] / values[i - 1]).ln();
        // Only reachable on overflow/underflow of the ratio; drop rather than fail.
        if !r.is_finite() {
            tracing::warn!(date = %dates[i], "dropping non-finite log return");
            continue;
        }
        out.push(Observation {
            date: dates[i],
            value: r,
        });
    }

    if out.len() < min_len {
        return Err(ChangePointError::InsufficientData {
            got: out.len(),
            need: min_len,
        });
    }

    tracing::debug!(n = out.len(), "prepared log returns");
    ObservationSeries::new(out)
}

/// Summarize a non-empty series.
pub fn summarize(series: &ObservationSeries) -> Option<SeriesSummary> {
    Some(SeriesSummary {
        n: series.len(),
        first_date: series.first_date()?,
        last_date: series.last_date()?,
        mean: math::mean(series.values())?,
        std_dev: math::std_dev(series.values()).unwrap_or(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prices(values: &[f64]) -> ObservationSeries {
        let start = NaiveDate::from_ymd_opt(2022, 2, 1).unwrap();
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

    #[test]
    fn log_returns_align_to_later_date() {
        let p = prices(&[100.0, 110.0, 99.0]);
        let r = prepare(&p, 1).unwrap();
        assert_eq!(r.len(), 2);
        assert_eq!(r.dates()[0], p.dates()[1]);
        assert!((r.values()[0] - (1.1f64).ln()).abs() < 1e-12);
        assert!((r.values()[1] - (99.0f64 / 110.0).ln()).abs() < 1e-12);
    }

    #[test]
    fn non_positive_price_is_invalid_input() {
        let p = prices(&[100.0, 0.0, 99.0]);
        assert!(matches!(
            prepare(&p, 1),
            Err(ChangePointError::InvalidInput(_))
        ));
    }

    #[test]
    fn short_series_is_insufficient() {
        let p = prices(&[50.0; 41]);
        match prepare(&p, 61) {
            Err(ChangePointError::InsufficientData { got, need }) => {
                assert_eq!(got, 40);
                assert_eq!(need, 61);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }

    #[test]
    fn summary_reports_range() {
        let p = prices(&[1.0, 2.0, 4.0, 8.0]);
        let r = prepare(&p, 1).unwrap();
        let s = summarize(&r).unwrap();
        assert_eq!(s.n, 3);
        assert!((s.mean - 2f64.ln()).abs() < 1e-12);
        assert!(s.std_dev.abs() < 1e-12);
    }
}
