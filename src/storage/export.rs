// src/storage/export.rs
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::utils::error::StorageError;

const DELIMITER: u8 = b';';

/// One firm-year observation as written to the panel CSV.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PanelRow {
    #[serde(rename = "cik")]
    pub cik10: String,
    pub ticker: Option<String>,
    pub year: i32,
    pub filing_date: NaiveDate,
    pub accession_number: String,

    #[serde(rename = "item1a_word_count")]
    pub item1a_word_count: usize,

    pub risk_count: usize,
    #[serde(rename = "risk_freq")]
    pub risk_frequency: f64,

    pub negative_count: usize,
    #[serde(rename = "negative_freq")]
    pub negative_frequency: f64,

    pub uncertainty_count: usize,
    #[serde(rename = "uncertainty_freq")]
    pub uncertainty_frequency: f64,

    pub llm_risk_score: Option<f64>,

    /// Where the raw document is cached; kept for logs, not exported.
    #[serde(skip)]
    pub local_html_path: Option<PathBuf>,
}

/// Writes the panel as `;`-delimited CSV.
///
/// With `overwrite` the file is replaced; otherwise rows are appended and the
/// header is only written when the file is new or empty. No rows, no file.
pub fn write_panel_csv(rows: &[PanelRow], output_path: &Path, overwrite: bool) -> Result<usize, StorageError> {
    if rows.is_empty() {
        tracing::info!("No panel rows to write, skipping {}", output_path.display());
        return Ok(0);
    }

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let existing_len = std::fs::metadata(output_path).map(|m| m.len()).unwrap_or(0);
    let write_header = overwrite || existing_len == 0;

    let file = if overwrite {
        OpenOptions::new().create(true).write(true).truncate(true).open(output_path)?
    } else {
        OpenOptions::new().create(true).append(true).open(output_path)?
    };

    let mut writer = csv::WriterBuilder::new()
        .delimiter(DELIMITER)
        .has_headers(write_header)
        .from_writer(file);

    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;

    tracing::info!("Wrote {} panel rows to {}", rows.len(), output_path.display());
    Ok(rows.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cik: &str, year: i32) -> PanelRow {
        PanelRow {
            cik10: cik.to_string(),
            ticker: Some("AAPL".to_string()),
            year,
            filing_date: NaiveDate::from_ymd_opt(year, 11, 3).unwrap(),
            accession_number: "0000320193-23-000106".to_string(),
            item1a_word_count: 812,
            risk_count: 3,
            risk_frequency: 0.5,
            negative_count: 1,
            negative_frequency: 0.25,
            uncertainty_count: 0,
            uncertainty_frequency: 0.0,
            llm_risk_score: None,
            local_html_path: Some(PathBuf::from("/tmp/x.htm")),
        }
    }

    #[test]
    fn writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("risk_panel.csv");

        let written = write_panel_csv(&[row("0000320193", 2023)], &path, true).unwrap();
        assert_eq!(written, 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let mut lines = content.lines();
        assert_eq!(
            lines.next().unwrap(),
            "cik;ticker;year;filing_date;accession_number;item1a_word_count;risk_count;risk_freq;\
             negative_count;negative_freq;uncertainty_count;uncertainty_freq;llm_risk_score"
        );
        assert_eq!(
            lines.next().unwrap(),
            "0000320193;AAPL;2023;2023-11-03;0000320193-23-000106;812;3;0.5;1;0.25;0;0.0;"
        );
        assert!(lines.next().is_none());
    }

    #[test]
    fn append_mode_keeps_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk_panel.csv");

        write_panel_csv(&[row("0000320193", 2022)], &path, false).unwrap();
        write_panel_csv(&[row("0000320193", 2023)], &path, false).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 3);
        assert_eq!(content.matches("cik;ticker").count(), 1);
    }

    #[test]
    fn empty_panel_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("risk_panel.csv");
        assert_eq!(write_panel_csv(&[], &path, true).unwrap(), 0);
        assert!(!path.exists());
    }
}
