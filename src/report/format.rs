//! Formatted terminal output for `oilcp detect`.
//!
//! We keep formatting code in one place so:
//! - the inference code stays clean and testable
//! - output changes are localized

use crate::app::pipeline::RunOutput;
use crate::domain::{AnalysisConfig, EventMatch, ParamDiagnostics};
use crate::inference::shift_to_percent;
use crate::series::StationarityReport;

/// Format the full run summary (data + sampler + diagnostics + results).
pub fn format_run_summary(run: &RunOutput, config: &AnalysisConfig) -> String {
    let mut out = String::new();
    let analysis = &run.analysis;
    let summary = &analysis.summary;

    out.push_str("=== oilcp - Bayesian change-point detection ===\n");
    out.push_str(&format!(
        "Prices : rows={} kept={} | dropped dates={} duplicates={} forward-filled={} gaps>{}d={}\n",
        run.prices.rows_read,
        run.prices.series.len(),
        run.prices.dropped_dates,
        run.prices.duplicates,
        run.prices.forward_filled,
        crate::io::LARGE_GAP_DAYS,
        run.prices.large_gaps,
    ));
    out.push_str(&format!(
        "Returns: n={} | {} .. {} | mean={:.5} sd={:.5}\n",
        summary.n, summary.first_date, summary.last_date, summary.mean, summary.std_dev
    ));
    if let Some(stationarity) = &analysis.stationarity {
        out.push_str(&format_stationarity(stationarity));
    }
    out.push_str(&format!(
        "Sampler: {:?} | chains={} draws={} warmup={} seed={} | divergences={}\n",
        config.backend,
        config.sampler.chains,
        config.sampler.draws,
        config.sampler.warmup,
        config.sampler.seed,
        analysis.draws.divergences(),
    ));

    out.push_str("\nConvergence:\n");
    out.push_str(&format_diagnostics_table(&analysis.convergence.params));
    out.push_str(&format!(
        "{} (max R-hat={:.3} < {}, min ESS={:.0} > {})\n",
        if analysis.convergence.converged { "converged" } else { "NOT converged" },
        analysis.convergence.max_r_hat,
        config.policy.max_r_hat,
        analysis.convergence.min_ess,
        config.policy.min_ess,
    ));

    let est = &analysis.estimate;
    out.push_str("\nChange point:\n");
    out.push_str(&format!("- date : {} (index {})\n", est.calendar_date, est.index_median));
    out.push_str(&format!(
        "- {:.0}% CI: {} .. {} (index {}..{})\n",
        est.credible_mass * 100.0,
        est.credible_interval_start,
        est.credible_interval_end,
        est.ci_start_index,
        est.ci_end_index,
    ));

    let impact = &analysis.impact;
    out.push_str("\nImpact:\n");
    out.push_str(&format!(
        "- mean shift: {:+.5} [{:+.5}, {:+.5}] ({:+.2}%/day) | P(up)={:.2} P(down)={:.2}\n",
        impact.mean_shift_median,
        impact.mean_shift_ci.0,
        impact.mean_shift_ci.1,
        shift_to_percent(impact.mean_shift_median),
        impact.prob_mean_increase,
        impact.prob_mean_decrease,
    ));
    out.push_str(&format!(
        "- vol shift : {:+.5} [{:+.5}, {:+.5}] | P(up)={:.2}\n",
        impact.vol_shift_median, impact.vol_shift_ci.0, impact.vol_shift_ci.1, impact.prob_vol_increase,
    ));

    out.push_str(&format!("\nEvents within {} days:\n", config.window_days));
    out.push_str(&format_matches(&analysis.matches));

    out.push_str("\nNarrative:\n");
    out.push_str(&analysis.narrative);
    out.push('\n');

    out
}

fn format_diagnostics_table(params: &[ParamDiagnostics]) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<12} {:>12} {:>12} {:>8} {:>10}\n",
        "param", "mean", "sd", "r_hat", "ess_bulk"
    ));
    out.push_str(&format!("{:-<12} {:-<12} {:-<12} {:-<8} {:-<10}\n", "", "", "", "", ""));
    for p in params {
        out.push_str(&format!(
            "{:<12} {:>12.5} {:>12.5} {:>8.3} {:>10.0}\n",
            p.name, p.mean, p.sd, p.r_hat, p.ess_bulk
        ));
    }
    out
}

fn format_matches(matches: &[EventMatch]) -> String {
    if matches.is_empty() {
        return "(none)\n".to_string();
    }
    let mut out = String::new();
    for m in matches {
        out.push_str(&format!(
            "- {} [{}] {} ({}) | {}d, score={:.2}\n",
            m.event.date,
            m.event.event_type,
            truncate(&m.event.description, 60),
            m.event.region,
            m.days_from_change_point,
            m.proximity_score,
        ));
    }
    out
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

fn format_stationarity(report: &StationarityReport) -> String {
    format!(
        "ADF    : {} | {}\n",
        report.prices.interpretation(),
        report.returns.interpretation()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CuratedEvent;
    use chrono::NaiveDate;

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("abcdefghij", 5), "abcd.");
    }

    #[test]
    fn diagnostics_table_has_one_row_per_param() {
        let params = vec![
            ParamDiagnostics {
                name: "tau".to_string(),
                mean: 100.2,
                sd: 1.1,
                r_hat: 1.001,
                ess_bulk: 812.0,
            },
            ParamDiagnostics {
                name: "mu_pre".to_string(),
                mean: 0.0004,
                sd: 0.001,
                r_hat: 1.0,
                ess_bulk: 950.0,
            },
        ];
        let table = format_diagnostics_table(&params);
        assert_eq!(table.lines().count(), 4);
        assert!(table.lines().nth(2).unwrap().starts_with("tau"));
    }

    #[test]
    fn stationarity_line_contrasts_prices_and_returns() {
        use crate::series::AdfResult;

        let result = |label: &str, statistic: f64, p_value: f64| AdfResult {
            label: label.to_string(),
            statistic,
            p_value,
            lags: 4,
            n_obs: 195,
            stationary: p_value < 0.05,
        };
        let line = format_stationarity(&StationarityReport {
            prices: result("Raw prices", -1.2, 0.6712),
            returns: result("Log returns", -7.5, 0.0),
        });
        assert_eq!(
            line,
            "ADF    : Raw prices is NON-STATIONARY (ADF=-1.200, p=0.6712) | \
             Log returns is STATIONARY (ADF=-7.500, p=0.0000)\n"
        );
    }

    #[test]
    fn empty_matches_say_none() {
        assert_eq!(format_matches(&[]), "(none)\n");
        let m = EventMatch {
            event: CuratedEvent {
                date: NaiveDate::from_ymd_opt(2020, 3, 6).unwrap(),
                event_type: "OPEC".to_string(),
                description: "OPEC+ talks collapse".to_string(),
                region: "Middle East".to_string(),
            },
            days_from_change_point: 3,
            proximity_score: 0.571,
        };
        let text = format_matches(&[m]);
        assert!(text.contains("[OPEC] OPEC+ talks collapse (Middle East) | 3d, score=0.57"));
    }
}
