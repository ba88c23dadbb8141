//! Read-only queries over loaded artifacts.
//!
//! [`Artifacts`] is built once (prices, event catalog, optional persisted
//! change-point record) and every query is a pure read over it. A missing
//! record is `None`; an empty impact window is [`ImpactWindow::NoData`].

use std::path::Path;

use chrono::{NaiveDate, TimeDelta};
use serde::Serialize;

use crate::domain::{ChangePointRecord, CuratedEvent, Observation, ObservationSeries};
use crate::error::Result;
use crate::events;
use crate::io;
use crate::math;

/// Default half-width of an impact window, in calendar days.
pub const DEFAULT_IMPACT_WINDOW_DAYS: i64 = 7;

/// Everything the query surface reads from.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub prices: ObservationSeries,
    pub events: Vec<CuratedEvent>,
    pub change_point: Option<ChangePointRecord>,
}

/// Price behaviour around one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ImpactWindow {
    /// No prices fall inside the window.
    NoData { event_date: NaiveDate },
    Window(ImpactStats),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactStats {
    pub event_date: NaiveDate,
    pub window_start: NaiveDate,
    pub window_end: NaiveDate,
    /// Mean price strictly before the event date.
    pub before_avg: Option<f64>,
    /// Mean price on or after the event date.
    pub after_avg: Option<f64>,
    /// `(after - before) / before * 100`, when both sides have data.
    pub change_pct: Option<f64>,
    pub n_before: usize,
    pub n_after: usize,
}

impl Artifacts {
    /// Load whichever artifacts are configured; absent ones stay empty.
    ///
    /// A configured record path that does not exist yet is not an error: the
    /// record is produced by a later `detect --export`.
    pub fn load(prices: Option<&Path>, events: Option<&Path>, record: Option<&Path>) -> Result<Self> {
        let prices = match prices {
            Some(path) => io::load_prices(path)?.series,
            None => ObservationSeries::default(),
        };
        let events = match events {
            Some(path) => io::load_events(path)?.events,
            None => Vec::new(),
        };
        let change_point = match record {
            Some(path) if path.exists() => Some(io::read_record_json(path)?),
            Some(path) => {
                tracing::info!(path = %path.display(), "no change-point record yet");
                None
            }
            None => None,
        };
        Ok(Self {
            prices,
            events,
            change_point,
        })
    }

    /// Prices within `[start, end]`; open bounds default to the series ends.
    pub fn prices_in_range(&self, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<Observation> {
        let (Some(first), Some(last)) = (self.prices.first_date(), self.prices.last_date()) else {
            return Vec::new();
        };
        self.prices.between(start.unwrap_or(first), end.unwrap_or(last))
    }

    /// All events, or only those of `event_type`.
    pub fn events_by_type(&self, event_type: Option<&str>) -> Vec<&CuratedEvent> {
        match event_type {
            Some(t) => events::events_of_type(&self.events, t),
            None => self.events.iter().collect(),
        }
    }

    /// Events of `event_type` (or any type) dated within `[start, end]`;
    /// open bounds are unbounded.
    pub fn events_filtered(
        &self,
        event_type: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Vec<&CuratedEvent> {
        events::events_in_window(
            self.events_by_type(event_type),
            start.unwrap_or(NaiveDate::MIN),
            end.unwrap_or(NaiveDate::MAX),
        )
    }

    pub fn change_point_results(&self) -> Option<&ChangePointRecord> {
        self.change_point.as_ref()
    }

    /// Average price before vs after `date` within `±window_days`.
    ///
    /// Window edges past the representable calendar clamp to
    /// `NaiveDate::MIN`/`NaiveDate::MAX`.
    pub fn impact_window(&self, date: NaiveDate, window_days: i64) -> ImpactWindow {
        let span = TimeDelta::try_days(window_days);
        let window_start = span
            .and_then(|s| date.checked_sub_signed(s))
            .unwrap_or(NaiveDate::MIN);
        let window_end = span
            .and_then(|s| date.checked_add_signed(s))
            .unwrap_or(NaiveDate::MAX);
        let window = self.prices.between(window_start, window_end);
        if window.is_empty() {
            return ImpactWindow::NoData { event_date: date };
        }

        let (before, after): (Vec<Observation>, Vec<Observation>) =
            window.into_iter().partition(|o| o.date < date);
        let before_values: Vec<f64> = before.iter().map(|o| o.value).collect();
        let after_values: Vec<f64> = after.iter().map(|o| o.value).collect();
        let before_avg = math::mean(&before_values);
        let after_avg = math::mean(&after_values);
        let change_pct = match (before_avg, after_avg) {
            (Some(b), Some(a)) if b != 0.0 => Some((a - b) / b * 100.0),
            _ => None,
        };

        ImpactWindow::Window(ImpactStats {
            event_date: date,
            window_start,
            window_end,
            before_avg,
            after_avg,
            change_pct,
            n_before: before_values.len(),
            n_after: after_values.len(),
        })
    }
}
