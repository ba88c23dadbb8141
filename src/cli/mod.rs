//! Command-line parsing for the oil price change-point detector.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the inference code.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};

use crate::domain::SamplerBackend;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "oilcp",
    version,
    about = "Bayesian single change-point detection for oil price log returns"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Locate the most probable structural break, report it, and optionally export it.
    Detect(DetectArgs),
    /// Write a synthetic two-regime price CSV with a known break.
    Simulate(SimulateArgs),
    /// Print prices in a date range as JSON.
    Prices(PricesArgs),
    /// Print curated events as JSON, optionally filtered by type.
    Events(EventsArgs),
    /// Print average prices before/after a date as JSON.
    Impact(ImpactArgs),
    /// Print a previously exported change-point record.
    Results(ResultsArgs),
}

/// Options for `detect`.
#[derive(Debug, Parser, Clone)]
pub struct DetectArgs {
    /// Price history CSV (date, price).
    #[arg(long, env = "OIL_PRICES_CSV", value_name = "CSV")]
    pub prices: PathBuf,

    /// Curated event catalog CSV (date, event_type, description, region).
    #[arg(long, env = "OIL_EVENTS_CSV", value_name = "CSV")]
    pub events: Option<PathBuf>,

    #[command(flatten)]
    pub sampler: SamplerArgs,

    /// Observations reserved on each side of the series for the break.
    #[arg(long, default_value_t = 30)]
    pub margin: usize,

    /// Scale of the Normal prior on regime means.
    #[arg(long, default_value_t = 0.05)]
    pub mu_scale: f64,

    /// Scale of the half-Normal prior on regime volatilities.
    #[arg(long, default_value_t = 0.05)]
    pub sigma_scale: f64,

    /// Largest R-hat still counted as converged.
    #[arg(long, default_value_t = 1.05)]
    pub max_r_hat: f64,

    /// Smallest bulk ESS still counted as converged.
    #[arg(long, default_value_t = 200.0)]
    pub min_ess: f64,

    /// Posterior mass of the change-point credible interval.
    #[arg(long, default_value_t = 0.95)]
    pub credible_mass: f64,

    /// Minimum |mean shift| counted as a real increase/decrease.
    #[arg(long, default_value_t = 0.01)]
    pub mean_threshold: f64,

    /// Minimum volatility shift counted as a real increase.
    #[arg(long, default_value_t = 0.005)]
    pub vol_threshold: f64,

    /// Half-width of the event search window (calendar days).
    #[arg(long, default_value_t = 7)]
    pub window_days: u32,

    /// Export the change-point record to JSON.
    #[arg(long, env = "OIL_RESULTS_JSON", value_name = "JSON")]
    pub export: Option<PathBuf>,

    /// Print the record as JSON instead of the text report.
    #[arg(long)]
    pub json: bool,
}

/// Sampler knobs shared by commands that sample.
#[derive(Debug, Args, Clone)]
pub struct SamplerArgs {
    /// Sampler backend.
    #[arg(long, value_enum, default_value_t = SamplerBackend::Slice)]
    pub sampler: SamplerBackend,

    /// Retained draws per chain.
    #[arg(long, default_value_t = 500)]
    pub draws: usize,

    /// Warmup iterations per chain.
    #[arg(long, default_value_t = 500)]
    pub warmup: usize,

    #[arg(long, default_value_t = 2)]
    pub chains: usize,

    /// Target acceptance rate for step-size controlled backends.
    #[arg(long, default_value_t = 0.85)]
    pub target_accept: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Fraction of divergent transitions that fails the run.
    #[arg(long, default_value_t = 0.05)]
    pub max_divergence_fraction: f64,
}

/// Options for `simulate`.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of log returns (the CSV has one more price row).
    #[arg(short = 'n', long, default_value_t = 200)]
    pub n: usize,

    /// Index of the first post-break return.
    #[arg(long, default_value_t = 100)]
    pub break_index: usize,

    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub mu_pre: f64,

    #[arg(long, default_value_t = 0.02, allow_negative_numbers = true)]
    pub mu_post: f64,

    #[arg(long, default_value_t = 0.01)]
    pub sigma_pre: f64,

    #[arg(long, default_value_t = 0.01)]
    pub sigma_post: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// First trading day of the path.
    #[arg(long, value_parser = parse_cli_date, default_value = "2020-01-01")]
    pub start_date: NaiveDate,

    #[arg(long, default_value_t = 60.0)]
    pub start_price: f64,
}

/// Options for `prices`.
#[derive(Debug, Parser, Clone)]
pub struct PricesArgs {
    #[arg(long, env = "OIL_PRICES_CSV", value_name = "CSV")]
    pub prices: PathBuf,

    #[arg(long, value_parser = parse_cli_date)]
    pub start: Option<NaiveDate>,

    #[arg(long, value_parser = parse_cli_date)]
    pub end: Option<NaiveDate>,
}

/// Options for `events`.
#[derive(Debug, Parser, Clone)]
pub struct EventsArgs {
    #[arg(long, env = "OIL_EVENTS_CSV", value_name = "CSV")]
    pub events: PathBuf,

    /// Only events of this type (case-insensitive).
    #[arg(long = "type", value_name = "TYPE")]
    pub event_type: Option<String>,

    /// Only events on or after this date.
    #[arg(long, value_parser = parse_cli_date)]
    pub start: Option<NaiveDate>,

    /// Only events on or before this date.
    #[arg(long, value_parser = parse_cli_date)]
    pub end: Option<NaiveDate>,
}

/// Options for `impact`.
#[derive(Debug, Parser, Clone)]
pub struct ImpactArgs {
    /// Event date.
    #[arg(value_parser = parse_cli_date)]
    pub date: NaiveDate,

    #[arg(long, env = "OIL_PRICES_CSV", value_name = "CSV")]
    pub prices: PathBuf,

    /// Days on each side of the date.
    #[arg(long, default_value_t = 7)]
    pub window_days: i64,
}

/// Options for `results`.
#[derive(Debug, Parser, Clone)]
pub struct ResultsArgs {
    /// Record JSON produced by `oilcp detect --export`.
    #[arg(long, env = "OIL_RESULTS_JSON", value_name = "JSON")]
    pub record: PathBuf,
}

fn parse_cli_date(s: &str) -> Result<NaiveDate, String> {
    crate::io::parse_date(s).ok_or_else(|| format!("invalid date '{s}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn detect_defaults_match_library_defaults() {
        let cli = Cli::try_parse_from(["oilcp", "detect", "--prices", "brent.csv"]).unwrap();
        let Command::Detect(args) = cli.command else {
            panic!("expected detect");
        };
        assert_eq!(args.sampler.draws, 500);
        assert_eq!(args.sampler.chains, 2);
        assert_eq!(args.sampler.seed, 42);
        assert_eq!(args.sampler.sampler, SamplerBackend::Slice);
        assert_eq!(args.margin, 30);
        assert_eq!(args.window_days, 7);
    }

    #[test]
    fn impact_accepts_day_first_dates() {
        let cli = Cli::try_parse_from(["oilcp", "impact", "09/03/2020", "--prices", "p.csv"]).unwrap();
        let Command::Impact(args) = cli.command else {
            panic!("expected impact");
        };
        assert_eq!(args.date, NaiveDate::from_ymd_opt(2020, 3, 9).unwrap());
    }

    #[test]
    fn events_accept_a_date_window() {
        let cli = Cli::try_parse_from([
            "oilcp", "events", "--events", "e.csv", "--type", "OPEC", "--start", "2020-03-01",
            "--end", "31/12/2020",
        ])
        .unwrap();
        let Command::Events(args) = cli.command else {
            panic!("expected events");
        };
        assert_eq!(args.event_type.as_deref(), Some("OPEC"));
        assert_eq!(args.start, NaiveDate::from_ymd_opt(2020, 3, 1));
        assert_eq!(args.end, NaiveDate::from_ymd_opt(2020, 12, 31));
    }
}
