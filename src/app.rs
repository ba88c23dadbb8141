//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs logging
//! - parses CLI arguments
//! - runs change-point detection or a read-only query
//! - prints reports/JSON
//! - writes optional exports

use clap::Parser;
use serde::Serialize;

use crate::cli::{Command, DetectArgs, EventsArgs, ImpactArgs, PricesArgs, ResultsArgs, SimulateArgs};
use crate::data::{TwoRegimeSpec, simulate_prices};
use crate::domain::{
    AnalysisConfig, ConvergencePolicy, DetectConfig, ImpactThresholds, PriorConfig, SamplerConfig,
};
use crate::error::{AppError, ChangePointError};
use crate::query::Artifacts;

pub mod logging;
pub mod pipeline;

/// Entry point for the `oilcp` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is the normal case.
    let _ = dotenvy::dotenv();
    logging::init();

    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Detect(args) => handle_detect(args),
        Command::Simulate(args) => handle_simulate(args),
        Command::Prices(args) => handle_prices(args),
        Command::Events(args) => handle_events(args),
        Command::Impact(args) => handle_impact(args),
        Command::Results(args) => handle_results(args),
    }
}

fn handle_detect(args: DetectArgs) -> Result<(), AppError> {
    let config = detect_config_from_args(&args);
    let run = pipeline::run_detect(&config)?;

    if args.json {
        print_json(&run.record)?;
    } else {
        println!("{}", crate::report::format_run_summary(&run, &config.analysis));
    }
    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let spec = TwoRegimeSpec {
        n: args.n,
        break_index: args.break_index,
        mu_pre: args.mu_pre,
        mu_post: args.mu_post,
        sigma_pre: args.sigma_pre,
        sigma_post: args.sigma_post,
        seed: args.seed,
        start_date: args.start_date,
        start_price: args.start_price,
    };
    let prices = simulate_prices(&spec)?;
    crate::io::write_prices(&args.out, &prices)?;

    // Return `break_index` is dated on price row `break_index + 1`.
    let break_date = prices.dates().get(spec.break_index + 1).copied();
    tracing::info!(
        path = %args.out.display(),
        prices = prices.len(),
        break_date = ?break_date,
        "wrote synthetic price history"
    );
    Ok(())
}

fn handle_prices(args: PricesArgs) -> Result<(), AppError> {
    let artifacts = Artifacts::load(Some(args.prices.as_path()), None, None)?;
    let prices = artifacts.prices_in_range(args.start, args.end);
    if prices.is_empty() {
        return Err(AppError::new(3, "No prices in the requested range."));
    }
    print_json(&prices)
}

fn handle_events(args: EventsArgs) -> Result<(), AppError> {
    let artifacts = Artifacts::load(None, Some(args.events.as_path()), None)?;
    print_json(&artifacts.events_filtered(args.event_type.as_deref(), args.start, args.end))
}

fn handle_impact(args: ImpactArgs) -> Result<(), AppError> {
    if args.window_days < 0 {
        return Err(AppError::new(2, "--window-days must be >= 0."));
    }
    let artifacts = Artifacts::load(Some(args.prices.as_path()), None, None)?;
    print_json(&artifacts.impact_window(args.date, args.window_days))
}

fn handle_results(args: ResultsArgs) -> Result<(), AppError> {
    let artifacts = Artifacts::load(None, None, Some(args.record.as_path()))?;
    let record = artifacts.change_point_results().ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "No change-point results at '{}'. Run `oilcp detect --export` first.",
                args.record.display()
            ),
        )
    })?;
    print_json(record)
}

pub fn detect_config_from_args(args: &DetectArgs) -> DetectConfig {
    DetectConfig {
        prices_csv: args.prices.clone(),
        events_csv: args.events.clone(),
        export: args.export.clone(),
        analysis: AnalysisConfig {
            priors: PriorConfig {
                mu_scale: args.mu_scale,
                sigma_scale: args.sigma_scale,
                margin: args.margin,
            },
            sampler: SamplerConfig {
                draws: args.sampler.draws,
                warmup: args.sampler.warmup,
                chains: args.sampler.chains,
                target_accept: args.sampler.target_accept,
                seed: args.sampler.seed,
                max_divergence_fraction: args.sampler.max_divergence_fraction,
            },
            backend: args.sampler.sampler,
            policy: ConvergencePolicy {
                max_r_hat: args.max_r_hat,
                min_ess: args.min_ess,
            },
            thresholds: ImpactThresholds {
                mean_shift: args.mean_threshold,
                vol_shift: args.vol_threshold,
            },
            credible_mass: args.credible_mass,
            window_days: args.window_days,
        },
    }
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value).map_err(ChangePointError::from)?;
    println!("{text}");
    Ok(())
}
