// src/pipeline/mod.rs
pub mod firms;

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use crate::config::Settings;
use crate::edgar::client::DocumentSource;
use crate::edgar::index::FilingIndex;
use crate::edgar::models::{Filing, Firm};
use crate::extractors::normalize::html_to_text;
use crate::extractors::section::SectionExtractor;
use crate::measures::lexicon::Lexicon;
use crate::measures::llm::LlmRiskScorer;
use crate::measures::scorer::LexiconScorer;
use crate::storage::export::PanelRow;
use crate::storage::DocumentCache;
use crate::utils::error::AppError;
use crate::utils::html_debug;

/// A filing (or a whole firm, when `accession_number` is `None`) that could not be processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilingFailure {
    pub cik10: String,
    pub accession_number: Option<String>,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct RunReport {
    /// Sorted by CIK, then filing date.
    pub rows: Vec<PanelRow>,
    pub filings_seen: usize,
    /// Item 1A missing or shorter than the minimum word count.
    pub skipped_quality: usize,
    pub failures: Vec<FilingFailure>,
    pub cancelled: bool,
}

enum FilingOutcome {
    Row(Box<PanelRow>),
    BelowQuality,
}

/// Drives filings through cache, normalization, extraction and scoring.
pub struct PanelBuilder<S: ?Sized> {
    settings: Arc<Settings>,
    index: FilingIndex<S>,
    cache: DocumentCache<S>,
    extractor: SectionExtractor,
    scorer: LexiconScorer,
    llm: Option<LlmRiskScorer>,
}

impl<S> PanelBuilder<S>
where
    S: DocumentSource + ?Sized,
{
    pub fn new(settings: Arc<Settings>, source: Arc<S>, lexicon: Arc<Lexicon>) -> Result<Self, AppError> {
        let index = FilingIndex::new(source.clone(), settings.urls.clone());
        let cache = DocumentCache::new(
            &settings.raw_dir,
            source,
            settings.urls.clone(),
            settings.overwrite_raw_files,
        )?;

        Ok(Self {
            index,
            cache,
            extractor: SectionExtractor::with_heuristics(settings.toc),
            scorer: LexiconScorer::new(lexicon),
            llm: settings.llm_stub.then(LlmRiskScorer::default),
            settings,
        })
    }

    /// Processes every firm in order. Per-filing errors are recorded in the
    /// report and never stop the run; cancellation stops it early.
    pub async fn run(&self, firms: &[Firm], cancel: &CancellationToken) -> RunReport {
        let mut report = RunReport::default();

        for firm in firms {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let filings = match self
                .index
                .list_filings(
                    firm,
                    self.settings.start_year,
                    self.settings.end_year,
                    self.settings.include_amendments,
                    cancel,
                )
                .await
            {
                Ok(filings) => filings,
                Err(e) if e.is_cancelled() => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    tracing::warn!(cik = %firm.cik10, "Could not list filings: {}", e);
                    report.failures.push(FilingFailure {
                        cik10: firm.cik10.clone(),
                        accession_number: None,
                        message: e.to_string(),
                    });
                    continue;
                }
            };

            tracing::info!(
                cik = %firm.cik10,
                ticker = firm.ticker.as_deref().unwrap_or("-"),
                "Found {} annual reports in {}-{}",
                filings.len(),
                self.settings.start_year,
                self.settings.end_year
            );
            report.filings_seen += filings.len();

            let outcomes: Vec<(Filing, Result<FilingOutcome, AppError>)> = stream::iter(filings)
                .map(|filing| async move {
                    let outcome = self.process_filing(firm, &filing, cancel).await;
                    (filing, outcome)
                })
                .buffer_unordered(self.settings.concurrency.max(1))
                .collect()
                .await;

            for (filing, outcome) in outcomes {
                match outcome {
                    Ok(FilingOutcome::Row(row)) => report.rows.push(*row),
                    Ok(FilingOutcome::BelowQuality) => report.skipped_quality += 1,
                    Err(e) if e.is_cancelled() => report.cancelled = true,
                    Err(e) => {
                        tracing::warn!(cik = %filing.cik10, accession = %filing.accession_number, "Filing failed: {}", e);
                        report.failures.push(FilingFailure {
                            cik10: filing.cik10.clone(),
                            accession_number: Some(filing.accession_number.clone()),
                            message: e.to_string(),
                        });
                    }
                }
            }
        }

        report
            .rows
            .sort_by(|a, b| (&a.cik10, a.filing_date).cmp(&(&b.cik10, b.filing_date)));

        tracing::info!(
            rows = report.rows.len(),
            filings = report.filings_seen,
            skipped = report.skipped_quality,
            failed = report.failures.len(),
            cancelled = report.cancelled,
            "Panel run finished"
        );
        report
    }

    async fn process_filing(
        &self,
        firm: &Firm,
        filing: &Filing,
        cancel: &CancellationToken,
    ) -> Result<FilingOutcome, AppError> {
        let local_path = self
            .cache
            .get_or_fetch(&filing.cik10, &filing.accession_number, &filing.primary_document, cancel)
            .await?;

        let bytes = tokio::fs::read(&local_path).await?;
        let html = String::from_utf8_lossy(&bytes);
        let text = html_to_text(&html);

        if self.settings.debug {
            let debug_path = self
                .settings
                .debug_dir()
                .join(format!("{}_{}.html", filing.cik10, filing.accession_no_dashes()));
            if let Err(e) = html_debug::write_section_debug(&text, &debug_path, self.settings.extract_item7) {
                tracing::warn!(cik = %filing.cik10, accession = %filing.accession_number, "Failed to write debug HTML: {}", e);
            }
        }

        let sections = self.extractor.extract(&text, self.settings.extract_item7);
        let item_1a = sections.item_1a;

        if let Some(item_7) = &sections.item_7 {
            tracing::debug!(
                cik = %filing.cik10,
                accession = %filing.accession_number,
                "Item 7 found: {} ({} words)",
                item_7.found,
                item_7.word_count
            );
        }

        if !item_1a.passes_quality(self.settings.min_item1a_words) {
            tracing::info!(
                cik = %filing.cik10,
                accession = %filing.accession_number,
                found = item_1a.found,
                words = item_1a.word_count,
                toc_hit = item_1a.likely_toc_hit,
                "Item 1A below quality threshold, skipping"
            );
            return Ok(FilingOutcome::BelowQuality);
        }

        let scores = self.scorer.score(&item_1a.text);
        let llm_risk_score = match &self.llm {
            Some(llm) => llm.score(&item_1a.text).await.map(|s| s.score),
            None => None,
        };

        tracing::debug!(
            cik = %filing.cik10,
            accession = %filing.accession_number,
            words = item_1a.word_count,
            risk = scores.risk_count,
            "Scored Item 1A"
        );

        Ok(FilingOutcome::Row(Box::new(PanelRow {
            cik10: filing.cik10.clone(),
            ticker: firm.ticker.clone(),
            year: filing.year(),
            filing_date: filing.filing_date,
            accession_number: filing.accession_number.clone(),
            item1a_word_count: item_1a.word_count,
            risk_count: scores.risk_count,
            risk_frequency: scores.risk_frequency,
            negative_count: scores.negative_count,
            negative_frequency: scores.negative_frequency,
            uncertainty_count: scores.uncertainty_count,
            uncertainty_frequency: scores.uncertainty_frequency,
            llm_risk_score,
            local_html_path: Some(local_path),
        })))
    }
}
