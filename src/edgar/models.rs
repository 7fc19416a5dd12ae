// src/edgar/models.rs
use chrono::{Datelike, NaiveDate};
use serde::Deserialize;
use serde_json::Value;

/// Structure representing the parts of the EDGAR company submission index we read.
/// Example: https://data.sec.gov/submissions/CIK0000320193.json
///
/// Every level is optional: a document without `filings.recent` simply has no history.
#[derive(Debug, Default, Deserialize)]
pub struct CompanySubmission {
    #[serde(default)]
    pub filings: Option<Filings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Filings {
    #[serde(default)]
    pub recent: Option<FilingsList>,
}

/// Parallel arrays, one entry per filing. Entries are kept as raw JSON values
/// because SEC occasionally ships `null` (or worse) in place of a string.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilingsList {
    #[serde(default)]
    pub accession_number: Vec<Value>,
    #[serde(default)]
    pub filing_date: Vec<Value>,
    #[serde(default)]
    pub report_date: Option<Vec<Value>>,
    #[serde(default)]
    pub form: Vec<Value>,
    #[serde(default)]
    pub primary_document: Vec<Value>,
}

/// One entry of https://www.sec.gov/files/company_tickers.json
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyTicker {
    pub cik_str: u64,
    pub ticker: String,
    pub title: String,
}

/// A registered firm, keyed by its 10-digit zero-padded CIK.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Firm {
    pub cik10: String,
    pub ticker: Option<String>,
    pub name: Option<String>,
}

impl Firm {
    pub fn new(cik10: impl Into<String>) -> Self {
        Self {
            cik10: cik10.into(),
            ticker: None,
            name: None,
        }
    }
}

/// One annual-report submission selected for processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filing {
    pub cik10: String,
    pub form: String,
    /// With dashes, e.g. "0000320193-23-000106"
    pub accession_number: String,
    pub filing_date: NaiveDate,
    pub period_of_report: Option<NaiveDate>,
    /// Primary doc file name, e.g. "a10-k20230930.htm"
    pub primary_document: String,
}

impl Filing {
    pub fn year(&self) -> i32 {
        self.filing_date.year()
    }

    pub fn accession_no_dashes(&self) -> String {
        accession_no_dashes(&self.accession_number)
    }
}

pub fn accession_no_dashes(accession_number: &str) -> String {
    accession_number.replace('-', "")
}

/// EDGAR archive paths use the integer-like CIK without leading zeros.
pub fn cik_without_leading_zeros(cik10: &str) -> String {
    let trimmed = cik10.trim().trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Left-pads a numeric CIK to 10 digits. Returns `None` for anything that is
/// not 1-10 ASCII digits.
pub fn normalize_cik10(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.len() > 10 || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(format!("{:0>10}", raw))
}

/// Accepts "YYYY-MM-DD" or anything starting with it (RFC 3339 timestamps).
pub fn parse_edgar_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}
