//! Curated event catalog CSV ingest.
//!
//! Required columns (any order, case-insensitive): `date`, `event_type`,
//! `description`, `region`. Extra columns are ignored.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;

use crate::domain::CuratedEvent;
use crate::error::{ChangePointError, Result};
use crate::io::open_file;
use crate::io::dates::parse_date;
use crate::io::prices::RowIssue;

pub const REQUIRED_COLUMNS: [&str; 4] = ["date", "event_type", "description", "region"];

/// Ingest output: events sorted by date, plus skipped rows.
#[derive(Debug, Clone)]
pub struct EventLoad {
    pub events: Vec<CuratedEvent>,
    pub row_issues: Vec<RowIssue>,
}

/// Load an event catalog from disk.
pub fn load_events(path: &Path) -> Result<EventLoad> {
    let file = open_file(path)?;
    let load = read_events(file)?;
    tracing::info!(
        path = %path.display(),
        events = load.events.len(),
        skipped = load.row_issues.len(),
        "loaded event catalog"
    );
    Ok(load)
}

/// Parse an event catalog from any reader.
pub fn read_events<R: Read>(reader: R) -> Result<EventLoad> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let header_map = build_header_map(reader.headers()?);
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|c| !header_map.contains_key(**c))
        .map(|c| c.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ChangePointError::Schema { missing });
    }

    let mut events = Vec::new();
    let mut row_issues = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let parsed = result
            .map_err(|e| format!("CSV parse error: {e}"))
            .and_then(|record| parse_event(&record, &header_map));
        match parsed {
            Ok(event) => events.push(event),
            Err(message) => row_issues.push(RowIssue { line, message }),
        }
    }

    if !row_issues.is_empty() {
        tracing::warn!(skipped = row_issues.len(), "skipped invalid event rows");
    }

    events.sort_by_key(|e| e.date);
    Ok(EventLoad { events, row_issues })
}

fn parse_event(record: &StringRecord, header_map: &HashMap<String, usize>) -> std::result::Result<CuratedEvent, String> {
    let raw_date = get_required(record, header_map, "date")?;
    let date = parse_date(raw_date).ok_or_else(|| format!("unparseable date '{raw_date}'"))?;
    Ok(CuratedEvent {
        date,
        event_type: get_required(record, header_map, "event_type")?.to_string(),
        description: get_required(record, header_map, "description")?.to_string(),
        region: get_required(record, header_map, "region")?.to_string(),
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports can prefix the first header with a UTF-8 BOM.
    name.trim().trim_start_matches('\u{feff}').to_ascii_lowercase()
}

fn get_required<'a>(
    record: &'a StringRecord,
    header_map: &HashMap<String, usize>,
    name: &str,
) -> std::result::Result<&'a str, String> {
    let idx = header_map
        .get(name)
        .ok_or_else(|| format!("missing required column: `{name}`"))?;
    record
        .get(*idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing required value: `{name}`"))
}
