//! Read/write change-point record JSON files.
//!
//! The record is the portable result of a `detect` run. The query layer loads
//! it at startup instead of re-running the sampler. The schema is
//! `domain::ChangePointRecord`.

use std::io::{Read, Write};
use std::path::Path;

use crate::domain::ChangePointRecord;
use crate::error::Result;
use crate::io::{create_file, open_file};

/// Write a record JSON file.
pub fn write_record_json(path: &Path, record: &ChangePointRecord) -> Result<()> {
    let file = create_file(path)?;
    write_record(file, record)
}

/// Read a record JSON file.
pub fn read_record_json(path: &Path) -> Result<ChangePointRecord> {
    let file = open_file(path)?;
    read_record(file)
}

pub fn write_record<W: Write>(mut writer: W, record: &ChangePointRecord) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, record)?;
    writer.write_all(b"\n")?;
    Ok(())
}

pub fn read_record<R: Read>(reader: R) -> Result<ChangePointRecord> {
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::CuratedEvent;
    use crate::error::ChangePointError;
    use chrono::NaiveDate;

    fn record() -> ChangePointRecord {
        let d = |m, day| NaiveDate::from_ymd_opt(2020, m, day).unwrap();
        ChangePointRecord {
            tool: "oilcp".to_string(),
            index_median: 42,
            change_point_date: d(3, 9),
            credible_interval_start: d(3, 5),
            credible_interval_end: d(3, 12),
            credible_mass: 0.95,
            max_r_hat: None,
            min_ess: 0.0,
            converged: false,
            mean_shift_median: -0.03,
            mean_shift_ci_low: -0.05,
            mean_shift_ci_high: -0.01,
            prob_mean_increase: 0.0,
            prob_mean_decrease: 0.93,
            vol_shift_median: 0.02,
            vol_shift_ci_low: 0.01,
            vol_shift_ci_high: 0.03,
            prob_vol_increase: 0.99,
            top_event: Some(CuratedEvent {
                date: d(3, 6),
                event_type: "OPEC".to_string(),
                description: "OPEC+ talks collapse".to_string(),
                region: "Middle East".to_string(),
            }),
            narrative: "Following OPEC event ...".to_string(),
        }
    }

    #[test]
    fn record_survives_json() {
        let mut buf = Vec::new();
        write_record(&mut buf, &record()).unwrap();
        let text = String::from_utf8(buf.clone()).unwrap();
        assert!(text.contains("\"max_r_hat\": null"));
        assert!(text.contains("\"change_point_date\": \"2020-03-09\""));
        assert_eq!(read_record(buf.as_slice()).unwrap(), record());
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(matches!(
            read_record("{\"tool\": 1}".as_bytes()),
            Err(ChangePointError::Json(_))
        ));
    }

    #[test]
    fn unreadable_path_names_the_file() {
        let path = std::path::Path::new("/nonexistent-dir/oilcp/record.json");
        match read_record_json(path) {
            Err(err @ ChangePointError::File { .. }) => {
                assert!(err.to_string().contains("/nonexistent-dir/oilcp/record.json"));
                assert_eq!(err.exit_code(), 2);
            }
            other => panic!("expected a file error, got {other:?}"),
        }
        assert!(matches!(
            write_record_json(path, &record()),
            Err(ChangePointError::File { .. })
        ));
    }
}
