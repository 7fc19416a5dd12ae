// src/edgar/index.rs
use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::edgar::client::{DocumentSource, EdgarUrls};
use crate::edgar::models::{parse_edgar_date, CompanySubmission, Filing, FilingsList, Firm};
use crate::utils::error::EdgarError;

pub const FORM_10K: &str = "10-K";
pub const FORM_10K_AMENDMENT: &str = "10-K/A";

/// Resolves a firm's annual reports from its EDGAR submission history.
/// The submissions document is fetched on every call; it is not cached.
pub struct FilingIndex<S: ?Sized> {
    source: Arc<S>,
    urls: EdgarUrls,
}

impl<S> FilingIndex<S>
where
    S: DocumentSource + ?Sized,
{
    pub fn new(source: Arc<S>, urls: EdgarUrls) -> Self {
        Self { source, urls }
    }

    /// Annual reports filed in `[start_year, end_year]`, at most one per
    /// calendar year, ordered by filing date.
    pub async fn list_filings(
        &self,
        firm: &Firm,
        start_year: i32,
        end_year: i32,
        include_amendments: bool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Filing>, EdgarError> {
        let url = self.urls.submissions_url(&firm.cik10);
        let bytes = self.source.fetch(&url, cancel).await?;

        let submission: CompanySubmission = serde_json::from_slice(&bytes)
            .map_err(|e| EdgarError::Parse(format!("submissions for CIK {}: {}", firm.cik10, e)))?;

        let recent = submission
            .filings
            .and_then(|f| f.recent)
            .unwrap_or_default();

        let history = parse_recent_filings(&recent, &firm.cik10);
        tracing::debug!(
            cik = %firm.cik10,
            "Submission history has {} usable records",
            history.len()
        );

        let in_range: Vec<Filing> = history
            .into_iter()
            .filter(|f| is_allowed_form(&f.form, include_amendments))
            .filter(|f| f.year() >= start_year && f.year() <= end_year)
            .collect();

        Ok(pick_one_per_year(in_range))
    }
}

fn is_allowed_form(form: &str, include_amendments: bool) -> bool {
    form.eq_ignore_ascii_case(FORM_10K)
        || (include_amendments && form.eq_ignore_ascii_case(FORM_10K_AMENDMENT))
}

/// Zips the parallel arrays into filings. The arrays are cut to the shortest
/// required one and any record with a blank or malformed field is dropped.
pub(crate) fn parse_recent_filings(recent: &FilingsList, cik10: &str) -> Vec<Filing> {
    let n = [
        recent.form.len(),
        recent.accession_number.len(),
        recent.filing_date.len(),
        recent.primary_document.len(),
    ]
    .into_iter()
    .min()
    .unwrap_or(0);

    let mut result = Vec::with_capacity(n);

    for i in 0..n {
        let (Some(form), Some(accession), Some(date_str), Some(primary)) = (
            non_blank(&recent.form[i]),
            non_blank(&recent.accession_number[i]),
            non_blank(&recent.filing_date[i]),
            non_blank(&recent.primary_document[i]),
        ) else {
            tracing::trace!(index = i, "Skipping submission record with missing field");
            continue;
        };

        if !is_accession_number(accession) {
            tracing::trace!(index = i, "Skipping submission record with bad accession {}", accession);
            continue;
        }

        let Some(filing_date) = parse_edgar_date(date_str) else {
            tracing::trace!(index = i, "Skipping submission record with bad date {}", date_str);
            continue;
        };

        let period_of_report = recent
            .report_date
            .as_ref()
            .and_then(|dates| dates.get(i))
            .and_then(non_blank)
            .and_then(parse_edgar_date);

        result.push(Filing {
            cik10: cik10.to_string(),
            form: form.to_string(),
            accession_number: accession.to_string(),
            filing_date,
            period_of_report,
            primary_document: primary.to_string(),
        });
    }

    result
}

/// Digits and dashes only; the value becomes a cache directory name.
fn is_accession_number(s: &str) -> bool {
    s.bytes().any(|b| b.is_ascii_digit()) && s.bytes().all(|b| b.is_ascii_digit() || b == b'-')
}

fn non_blank(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Keeps the latest filing per calendar year. Filings on the same date are
/// resolved by the greater accession number so the choice is deterministic.
pub(crate) fn pick_one_per_year(filings: Vec<Filing>) -> Vec<Filing> {
    let mut by_year: BTreeMap<i32, Filing> = BTreeMap::new();

    for filing in filings {
        match by_year.get(&filing.year()) {
            Some(kept)
                if (kept.filing_date, &kept.accession_number)
                    >= (filing.filing_date, &filing.accession_number) => {}
            _ => {
                by_year.insert(filing.year(), filing);
            }
        }
    }

    let mut picked: Vec<Filing> = by_year.into_values().collect();
    picked.sort_by(|a, b| a.filing_date.cmp(&b.filing_date));
    picked
}
