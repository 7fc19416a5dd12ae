// src/pipeline/firms.rs
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use crate::edgar::models::{normalize_cik10, Firm};
use crate::utils::error::{AppError, StorageError};

/// Reads the firm list: `cik,ticker,name` rows (ticker and name optional) or a
/// plain list of CIKs. A header row, `#` comments and blank lines are skipped.
pub fn load_firms(path: &Path) -> Result<Vec<Firm>, AppError> {
    let file = std::fs::File::open(path)
        .map_err(|e| AppError::Config(format!("Cannot open firm list {}: {}", path.display(), e)))?;

    let firms = parse_firms(file)?;
    tracing::info!("Loaded {} firms from {}", firms.len(), path.display());
    Ok(firms)
}

pub fn parse_firms<R: Read>(reader: R) -> Result<Vec<Firm>, AppError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut firms = Vec::new();
    for (line_no, record) in csv_reader.records().enumerate() {
        let record = record.map_err(StorageError::from)?;

        let raw_cik = record.get(0).unwrap_or_default();
        if raw_cik.is_empty() {
            continue;
        }
        if line_no == 0 && raw_cik.eq_ignore_ascii_case("cik") {
            continue;
        }

        let Some(cik10) = normalize_cik10(raw_cik) else {
            tracing::warn!("Skipping firm list row {}: '{}' is not a CIK", line_no + 1, raw_cik);
            continue;
        };

        firms.push(Firm {
            cik10,
            ticker: non_empty(record.get(1)).map(|t| t.to_uppercase()),
            name: non_empty(record.get(2)).map(str::to_string),
        });
    }

    Ok(firms)
}

fn non_empty(field: Option<&str>) -> Option<&str> {
    field.filter(|f| !f.is_empty())
}

/// Drops repeated CIKs, keeping the first occurrence and its ticker/name.
pub fn dedupe_firms(firms: Vec<Firm>) -> Vec<Firm> {
    let mut seen = HashSet::new();
    firms
        .into_iter()
        .filter(|firm| seen.insert(firm.cik10.clone()))
        .collect()
}
