//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between pipeline stages by value
//! - exported to JSON for the query layer
//! - reloaded later without re-running the sampler

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ChangePointError, Result};

/// Parameter names tracked by the change-point model, in sampler order.
pub const PARAM_NAMES: [&str; 5] = ["tau", "mu_pre", "mu_post", "sigma_pre", "sigma_post"];

/// One dated value (a price or a log return, depending on the stage).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: f64,
}

/// Dated values, strictly increasing by date, all finite.
///
/// Raw prices and prepared log returns share this type; the stage that built
/// the series decides what `value` means.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationSeries {
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl ObservationSeries {
    /// Build a series, rejecting unordered/duplicate dates and non-finite values.
    pub fn new(observations: Vec<Observation>) -> Result<Self> {
        let mut dates = Vec::with_capacity(observations.len());
        let mut values = Vec::with_capacity(observations.len());

        for obs in observations {
            if !obs.value.is_finite() {
                return Err(ChangePointError::InvalidInput(format!(
                    "non-finite value {} on {}",
                    obs.value, obs.date
                )));
            }
            if let Some(prev) = dates.last() {
                if obs.date <= *prev {
                    return Err(ChangePointError::InvalidInput(format!(
                        "dates must be strictly increasing ({} follows {prev})",
                        obs.date
                    )));
                }
            }
            dates.push(obs.date);
            values.push(obs.value);
        }

        Ok(Self { dates, values })
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = Observation> + '_ {
        self.dates
            .iter()
            .zip(self.values.iter())
            .map(|(&date, &value)| Observation { date, value })
    }

    /// Observations with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Vec<Observation> {
        self.iter()
            .filter(|o| o.date >= start && o.date <= end)
            .collect()
    }
}

/// Prior hyperparameters for the single change-point model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriorConfig {
    /// Scale of the Normal(0, s) prior on both regime means.
    pub mu_scale: f64,
    /// Scale of the half-Normal prior on both regime volatilities.
    pub sigma_scale: f64,
    /// Observations reserved on each side of the series for the break location.
    pub margin: usize,
}

impl Default for PriorConfig {
    fn default() -> Self {
        Self {
            mu_scale: 0.05,
            sigma_scale: 0.05,
            margin: 30,
        }
    }
}

impl PriorConfig {
    /// Shortest prepared series the model accepts.
    ///
    /// The Uniform prior on `tau` spans `[margin, n - margin]` and needs a
    /// positive width.
    pub fn min_observations(&self) -> usize {
        2 * self.margin + 1
    }
}

/// Which sampler backend to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SamplerBackend {
    /// Coordinate-wise slice sampling (no step size to tune).
    Slice,
    /// Component-wise adaptive Metropolis with uniform jumps for `tau`.
    Metropolis,
}

/// Sampling configuration handed to a sampler backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SamplerConfig {
    /// Retained draws per chain.
    pub draws: usize,
    /// Warmup (tuning) iterations per chain, discarded.
    pub warmup: usize,
    pub chains: usize,
    /// Target acceptance rate for step-size controlled (Hamiltonian) backends.
    /// Validated and recorded; the built-in backends tune their own.
    pub target_accept: f64,
    pub seed: u64,
    /// Fraction of divergent transitions above which the run fails.
    pub max_divergence_fraction: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            draws: 500,
            warmup: 500,
            chains: 2,
            target_accept: 0.85,
            seed: 42,
            max_divergence_fraction: 0.05,
        }
    }
}

/// Policy thresholds for the convergence verdict.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConvergencePolicy {
    /// Largest acceptable R-hat (exclusive).
    pub max_r_hat: f64,
    /// Smallest acceptable bulk ESS (exclusive).
    pub min_ess: f64,
}

impl Default for ConvergencePolicy {
    fn default() -> Self {
        Self {
            max_r_hat: 1.05,
            min_ess: 200.0,
        }
    }
}

/// Per-parameter convergence statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParamDiagnostics {
    pub name: String,
    pub mean: f64,
    pub sd: f64,
    pub r_hat: f64,
    pub ess_bulk: f64,
}

/// Worst-case convergence statistics plus the verdict they imply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvergenceReport {
    pub max_r_hat: f64,
    pub min_ess: f64,
    pub converged: bool,
    pub params: Vec<ParamDiagnostics>,
}

/// Posterior break location mapped onto the calendar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePointEstimate {
    pub index_median: usize,
    pub calendar_date: NaiveDate,
    pub credible_interval_start: NaiveDate,
    pub credible_interval_end: NaiveDate,
    pub ci_start_index: usize,
    pub ci_end_index: usize,
    pub credible_mass: f64,
}

/// Posterior before/after shifts, as probabilities and bands.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactSummary {
    pub mean_shift_median: f64,
    pub mean_shift_ci: (f64, f64),
    pub prob_mean_increase: f64,
    pub prob_mean_decrease: f64,
    pub vol_shift_median: f64,
    pub vol_shift_ci: (f64, f64),
    pub prob_vol_increase: f64,
}

/// Practical-significance floors used when turning shifts into probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImpactThresholds {
    pub mean_shift: f64,
    pub vol_shift: f64,
}

impl Default for ImpactThresholds {
    fn default() -> Self {
        Self {
            mean_shift: 0.01,
            vol_shift: 0.005,
        }
    }
}

/// A curated geopolitical/economic event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CuratedEvent {
    pub date: NaiveDate,
    pub event_type: String,
    pub description: String,
    pub region: String,
}

/// An event found near a change point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventMatch {
    pub event: CuratedEvent,
    pub days_from_change_point: u32,
    /// 1 at zero distance, 0 at the window edge.
    pub proximity_score: f64,
}

/// Flat artifact persisted for the query layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangePointRecord {
    pub tool: String,
    pub index_median: usize,
    pub change_point_date: NaiveDate,
    pub credible_interval_start: NaiveDate,
    pub credible_interval_end: NaiveDate,
    pub credible_mass: f64,
    /// `None` when R-hat could not be computed (serialized as JSON `null`).
    pub max_r_hat: Option<f64>,
    pub min_ess: f64,
    pub converged: bool,
    pub mean_shift_median: f64,
    pub mean_shift_ci_low: f64,
    pub mean_shift_ci_high: f64,
    pub prob_mean_increase: f64,
    pub prob_mean_decrease: f64,
    pub vol_shift_median: f64,
    pub vol_shift_ci_low: f64,
    pub vol_shift_ci_high: f64,
    pub prob_vol_increase: f64,
    pub top_event: Option<CuratedEvent>,
    pub narrative: String,
}

/// Knobs for one analysis of a prepared series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalysisConfig {
    pub priors: PriorConfig,
    pub sampler: SamplerConfig,
    pub backend: SamplerBackend,
    pub policy: ConvergencePolicy,
    pub thresholds: ImpactThresholds,
    pub credible_mass: f64,
    /// Half-width of the event search window, in calendar days.
    pub window_days: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            priors: PriorConfig::default(),
            sampler: SamplerConfig::default(),
            backend: SamplerBackend::Slice,
            policy: ConvergencePolicy::default(),
            thresholds: ImpactThresholds::default(),
            credible_mass: crate::inference::DEFAULT_CREDIBLE_MASS,
            window_days: crate::events::DEFAULT_WINDOW_DAYS,
        }
    }
}

/// A full `detect` run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct DetectConfig {
    pub prices_csv: PathBuf,
    pub events_csv: Option<PathBuf>,
    pub export: Option<PathBuf>,
    pub analysis: AnalysisConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn series_rejects_unordered_dates() {
        let obs = vec![
            Observation { date: d(2020, 1, 2), value: 1.0 },
            Observation { date: d(2020, 1, 1), value: 1.0 },
        ];
        assert!(matches!(
            ObservationSeries::new(obs),
            Err(ChangePointError::InvalidInput(_))
        ));
    }

    #[test]
    fn series_rejects_non_finite_values() {
        let obs = vec![Observation { date: d(2020, 1, 1), value: f64::NAN }];
        assert!(ObservationSeries::new(obs).is_err());
    }

    #[test]
    fn between_is_inclusive() {
        let obs = (1..=5)
            .map(|i| Observation { date: d(2020, 1, i), value: i as f64 })
            .collect();
        let series = ObservationSeries::new(obs).unwrap();
        let window = series.between(d(2020, 1, 2), d(2020, 1, 4));
        assert_eq!(window.len(), 3);
        assert_eq!(window[0].value, 2.0);
    }

    #[test]
    fn min_observations_leaves_room_for_tau() {
        assert_eq!(PriorConfig::default().min_observations(), 61);
    }
}
