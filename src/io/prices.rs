//! Price history CSV ingest.
//!
//! The file is two positional columns, `(date, price)`; header names are
//! ignored. Normalization rules:
//!
//! - rows with unparseable dates are dropped (reported, not fatal)
//! - rows are sorted by date; for duplicate dates the first row in the file wins
//! - empty price cells are forward-filled from the last known price
//! - leading empty prices (nothing to fill from) are dropped
//! - a price cell that is present but not a finite number is fatal

use std::io::{Read, Write};
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::{Observation, ObservationSeries};
use crate::error::{ChangePointError, Result};
use crate::io::{create_file, open_file};
use crate::io::dates::parse_date;

/// Calendar gap (in days) above which consecutive rows are flagged.
pub const LARGE_GAP_DAYS: i64 = 3;

/// A row-level problem encountered during ingest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowIssue {
    pub line: usize,
    pub message: String,
}

/// Ingest output: the cleaned price series plus what was done to get it.
#[derive(Debug, Clone)]
pub struct PriceLoad {
    pub series: ObservationSeries,
    pub rows_read: usize,
    pub row_issues: Vec<RowIssue>,
    pub dropped_dates: usize,
    pub duplicates: usize,
    pub forward_filled: usize,
    pub leading_missing: usize,
    pub large_gaps: usize,
}

/// Load a price CSV from disk.
pub fn load_prices(path: &Path) -> Result<PriceLoad> {
    let file = open_file(path)?;
    let load = read_prices(file)?;
    tracing::info!(
        path = %path.display(),
        rows = load.rows_read,
        kept = load.series.len(),
        "loaded price history"
    );
    Ok(load)
}

/// Parse and normalize a price CSV from any reader.
pub fn read_prices<R: Read>(reader: R) -> Result<PriceLoad> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let width = reader.headers()?.len();
    if width < 2 {
        let missing = ["date", "price"][width..].iter().map(|s| s.to_string()).collect();
        return Err(ChangePointError::Schema { missing });
    }

    let mut rows: Vec<(NaiveDate, Option<f64>, usize)> = Vec::new();
    let mut row_issues = Vec::new();
    let mut rows_read = 0usize;
    let mut dropped_dates = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: one for the header, one for 1-based line numbers.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_issues.push(RowIssue {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let raw_date = record.get(0).unwrap_or("");
        let Some(date) = parse_date(raw_date) else {
            dropped_dates += 1;
            row_issues.push(RowIssue {
                line,
                message: format!("unparseable date '{raw_date}'"),
            });
            continue;
        };

        let price = parse_price(record.get(1).unwrap_or(""))
            .map_err(|msg| ChangePointError::InvalidInput(format!("line {line}: {msg}")))?;
        rows.push((date, price, line));
    }

    if dropped_dates > 0 {
        tracing::warn!(dropped = dropped_dates, "dropped rows with unparseable dates");
    }

    // Stable sort keeps file order among equal dates, so `dedup` keeps the first.
    rows.sort_by_key(|(date, _, _)| *date);
    let before = rows.len();
    rows.dedup_by_key(|(date, _, _)| *date);
    let duplicates = before - rows.len();
    if duplicates > 0 {
        tracing::warn!(duplicates, "dropped rows with duplicate dates");
    }

    let mut observations = Vec::with_capacity(rows.len());
    let mut last_price: Option<f64> = None;
    let mut forward_filled = 0usize;
    let mut leading_missing = 0usize;
    for (date, price, line) in rows {
        let value = match (price, last_price) {
            (Some(p), _) => p,
            (None, Some(prev)) => {
                forward_filled += 1;
                prev
            }
            (None, None) => {
                leading_missing += 1;
                row_issues.push(RowIssue {
                    line,
                    message: "missing price with no earlier price to carry forward".to_string(),
                });
                continue;
            }
        };
        last_price = Some(value);
        observations.push(Observation { date, value });
    }

    let large_gaps = observations
        .windows(2)
        .filter(|w| (w[1].date - w[0].date).num_days() > LARGE_GAP_DAYS)
        .count();
    if large_gaps > 0 {
        tracing::warn!(
            gaps = large_gaps,
            max_days = LARGE_GAP_DAYS,
            "price history has calendar gaps"
        );
    }

    if observations.is_empty() {
        return Err(ChangePointError::InsufficientData { got: 0, need: 2 });
    }

    Ok(PriceLoad {
        series: ObservationSeries::new(observations)?,
        rows_read,
        row_issues,
        dropped_dates,
        duplicates,
        forward_filled,
        leading_missing,
        large_gaps,
    })
}

/// Write a price series as a two-column `Date,Price` CSV.
pub fn write_prices(path: &Path, series: &ObservationSeries) -> Result<()> {
    let file = create_file(path)?;
    write_prices_to(file, series)
}

pub fn write_prices_to<W: Write>(writer: W, series: &ObservationSeries) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    writer.write_record(["Date", "Price"])?;
    for obs in series.iter() {
        writer.write_record([obs.date.to_string(), format!("{:.6}", obs.value)])?;
    }
    writer.flush()?;
    Ok(())
}

fn parse_price(raw: &str) -> std::result::Result<Option<f64>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.replace(',', "").parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(format!("non-numeric price '{raw}'")),
    }
}
