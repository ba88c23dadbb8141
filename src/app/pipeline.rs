//! Shared "detect pipeline" logic used by the CLI subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! prices -> log returns -> model -> sampling -> diagnostics/interpretation
//! -> impact -> event matching -> narrative
//!
//! Callers only deal with presentation (report text, JSON export).

use std::path::Path;

use crate::domain::{
    AnalysisConfig, ChangePointEstimate, ChangePointRecord, ConvergenceReport, CuratedEvent,
    DetectConfig, EventMatch, ImpactSummary, ObservationSeries,
};
use crate::error::{ChangePointError, Result};
use crate::events;
use crate::inference;
use crate::io::{self, PriceLoad};
use crate::model;
use crate::report;
use crate::sampler::{self, PosteriorDraws};
use crate::series::{self, SeriesSummary, StationarityReport};

/// Tool name stamped on exported records.
pub const TOOL_NAME: &str = "oilcp";

/// Everything computed from one prepared return series.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub summary: SeriesSummary,
    /// ADF tests on prices vs returns; absent when analysis starts from returns.
    pub stationarity: Option<StationarityReport>,
    pub draws: PosteriorDraws,
    pub convergence: ConvergenceReport,
    pub estimate: ChangePointEstimate,
    pub impact: ImpactSummary,
    pub matches: Vec<EventMatch>,
    pub narrative: String,
}

/// All computed outputs of a single `oilcp detect` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub prices: PriceLoad,
    pub events: Vec<CuratedEvent>,
    pub analysis: Analysis,
    pub record: ChangePointRecord,
}

/// Execute the full detect pipeline from files on disk.
pub fn run_detect(config: &DetectConfig) -> Result<RunOutput> {
    let prices = io::load_prices(&config.prices_csv)?;
    let events = match &config.events_csv {
        Some(path) => io::load_events(path)?.events,
        None => Vec::new(),
    };

    let analysis = analyze_prices(&prices.series, &events, &config.analysis)?;
    let record = build_record(&analysis);

    if let Some(path) = &config.export {
        export_record(path, &record)?;
    }

    Ok(RunOutput {
        prices,
        events,
        analysis,
        record,
    })
}

/// Prepare log returns from `prices` and analyze them.
pub fn analyze_prices(
    prices: &ObservationSeries,
    events: &[CuratedEvent],
    config: &AnalysisConfig,
) -> Result<Analysis> {
    let returns = series::prepare(prices, config.priors.min_observations())?;
    let stationarity = match series::analyze_stationarity(prices, &returns) {
        Ok(report) => {
            tracing::info!(
                prices = %report.prices.interpretation(),
                returns = %report.returns.interpretation(),
                "stationarity"
            );
            Some(report)
        }
        Err(err) => {
            tracing::warn!(error = %err, "stationarity test skipped");
            None
        }
    };

    let mut analysis = analyze_returns(&returns, events, config)?;
    analysis.stationarity = stationarity;
    Ok(analysis)
}

/// Fit the single change-point model to `returns` and interpret the posterior.
pub fn analyze_returns(
    returns: &ObservationSeries,
    events: &[CuratedEvent],
    config: &AnalysisConfig,
) -> Result<Analysis> {
    let summary = series::summarize(returns).ok_or_else(|| ChangePointError::InsufficientData {
        got: 0,
        need: config.priors.min_observations(),
    })?;
    let spec = model::build(returns, config.priors)?;

    let backend = sampler::sampler_for(config.backend);
    let draws = inference::run(&spec, &config.sampler, backend.as_ref())?;

    // Diagnostics and interpretation are independent reads of the draws.
    let (convergence, interpreted) = rayon::join(
        || inference::diagnose(&draws, &config.policy),
        || -> Result<(ChangePointEstimate, ImpactSummary)> {
            let estimate = inference::extract(&draws, returns.dates(), config.credible_mass)?;
            let impact = inference::quantify(&draws, &config.thresholds)?;
            Ok((estimate, impact))
        },
    );
    let (estimate, impact) = interpreted?;

    let matches = events::associate(estimate.calendar_date, events, config.window_days);
    let narrative = match matches.first() {
        Some(best) => report::describe(best, &impact),
        None => report::describe_unmatched(&estimate, &impact, config.window_days),
    };

    tracing::info!(
        date = %estimate.calendar_date,
        index = estimate.index_median,
        converged = convergence.converged,
        matches = matches.len(),
        "change point located"
    );

    Ok(Analysis {
        summary,
        stationarity: None,
        draws,
        convergence,
        estimate,
        impact,
        matches,
        narrative,
    })
}

/// Flatten an analysis into the persisted record.
pub fn build_record(analysis: &Analysis) -> ChangePointRecord {
    let Analysis {
        convergence,
        estimate,
        impact,
        matches,
        narrative,
        ..
    } = analysis;

    ChangePointRecord {
        tool: TOOL_NAME.to_string(),
        index_median: estimate.index_median,
        change_point_date: estimate.calendar_date,
        credible_interval_start: estimate.credible_interval_start,
        credible_interval_end: estimate.credible_interval_end,
        credible_mass: estimate.credible_mass,
        max_r_hat: convergence.max_r_hat.is_finite().then_some(convergence.max_r_hat),
        min_ess: convergence.min_ess,
        converged: convergence.converged,
        mean_shift_median: impact.mean_shift_median,
        mean_shift_ci_low: impact.mean_shift_ci.0,
        mean_shift_ci_high: impact.mean_shift_ci.1,
        prob_mean_increase: impact.prob_mean_increase,
        prob_mean_decrease: impact.prob_mean_decrease,
        vol_shift_median: impact.vol_shift_median,
        vol_shift_ci_low: impact.vol_shift_ci.0,
        vol_shift_ci_high: impact.vol_shift_ci.1,
        prob_vol_increase: impact.prob_vol_increase,
        top_event: matches.first().map(|m| m.event.clone()),
        narrative: narrative.clone(),
    }
}

fn export_record(path: &Path, record: &ChangePointRecord) -> Result<()> {
    io::write_record_json(path, record)?;
    tracing::info!(path = %path.display(), "wrote change-point record");
    Ok(())
}
