//! One-sentence summaries of a detected break.
//!
//! Output is a pure function of its inputs so it can be persisted and
//! compared verbatim.

use crate::domain::{ChangePointEstimate, EventMatch, ImpactSummary};
use crate::inference::shift_to_percent;

/// Posterior probability above which a direction is asserted.
pub const DIRECTION_CONFIDENCE: f64 = 0.9;

/// Describe a break attributed to the best-matching curated event.
pub fn describe(event_match: &EventMatch, impact: &ImpactSummary) -> String {
    let event = &event_match.event;
    format!(
        "Following {} event '{}' ({}), {}",
        event.event_type,
        event.description,
        event.date,
        break_statement(impact)
    )
}

/// Describe a break with no curated event inside the search window.
pub fn describe_unmatched(
    estimate: &ChangePointEstimate,
    impact: &ImpactSummary,
    window_days: u32,
) -> String {
    format!(
        "No curated event within {window_days} days of {}; {}",
        estimate.calendar_date,
        break_statement(impact)
    )
}

fn break_statement(impact: &ImpactSummary) -> String {
    let (direction, probability) = direction(impact);
    let pct = shift_to_percent(impact.mean_shift_median);
    let magnitude = if direction == "increase" {
        format!("+{pct:.1}%")
    } else {
        format!("{pct:.1}%")
    };
    format!(
        "Bayesian analysis detects structural break with {direction} of {magnitude} ({:.0}% probability). {}.",
        probability * 100.0,
        volatility_statement(impact.vol_shift_median)
    )
}

/// Chosen direction plus the probability that backs it.
fn direction(impact: &ImpactSummary) -> (&'static str, f64) {
    if impact.prob_mean_increase > DIRECTION_CONFIDENCE {
        ("increase", impact.prob_mean_increase)
    } else if impact.prob_mean_decrease > DIRECTION_CONFIDENCE {
        ("decrease", impact.prob_mean_decrease)
    } else if impact.mean_shift_median >= 0.0 {
        ("shift", impact.prob_mean_increase)
    } else {
        ("shift", impact.prob_mean_decrease)
    }
}

fn volatility_statement(vol_shift_median: f64) -> String {
    let verb = if vol_shift_median > 0.0 { "increased" } else { "decreased" };
    format!(
        "Volatility {verb} by {:.0}%",
        shift_to_percent(vol_shift_median).abs()
    )
}
