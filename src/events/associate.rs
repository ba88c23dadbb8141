//! Match curated events to a detected change point.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::domain::{CuratedEvent, EventMatch};

/// Default half-width of the matching window, in calendar days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Events within `window_days` (inclusive) of `date`, best match first.
///
/// Score is linear in distance: `1 - days / window_days` (a zero-day window
/// only matches same-day events, with score 1). Ordering is by score
/// descending, then distance ascending, then event date.
pub fn associate(date: NaiveDate, events: &[CuratedEvent], window_days: u32) -> Vec<EventMatch> {
    let mut matches: Vec<EventMatch> = events
        .iter()
        .filter_map(|event| {
            let days = (event.date - date).num_days().unsigned_abs();
            if days > u64::from(window_days) {
                return None;
            }
            let days = days as u32;
            Some(EventMatch {
                event: event.clone(),
                days_from_change_point: days,
                proximity_score: proximity_score(days, window_days),
            })
        })
        .collect();

    matches.sort_by(|a, b| {
        b.proximity_score
            .partial_cmp(&a.proximity_score)
            .unwrap_or(Ordering::Equal)
            .then(a.days_from_change_point.cmp(&b.days_from_change_point))
            .then(a.event.date.cmp(&b.event.date))
    });
    matches
}

fn proximity_score(days: u32, window_days: u32) -> f64 {
    if window_days == 0 {
        1.0
    } else {
        1.0 - f64::from(days) / f64::from(window_days)
    }
}

/// Events whose `event_type` equals `event_type` (case-insensitive).
pub fn events_of_type<'a>(events: &'a [CuratedEvent], event_type: &str) -> Vec<&'a CuratedEvent> {
    events
        .iter()
        .filter(|e| e.event_type.eq_ignore_ascii_case(event_type))
        .collect()
}

/// Events dated within `[start, end]`.
pub fn events_in_window<'a>(
    events: impl IntoIterator<Item = &'a CuratedEvent>,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<&'a CuratedEvent> {
    events
        .into_iter()
        .filter(|e| e.date >= start && e.date <= end)
        .collect()
}
