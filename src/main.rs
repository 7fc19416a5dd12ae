// src/main.rs
mod config;
mod edgar;
mod extractors;
mod measures;
mod pipeline;
mod storage;
mod utils;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio_util::sync::CancellationToken;

use config::Settings;
use edgar::client::{lookup_tickers, EdgarClient};
use edgar::models::{normalize_cik10, Firm};
use edgar::throttle::RequestThrottle;
use extractors::section::TocHeuristics;
use measures::lexicon::Lexicon;
use pipeline::firms::{dedupe_firms, load_firms};
use pipeline::PanelBuilder;
use storage::export::write_panel_csv;
use utils::AppError;

/// Builds a firm-year panel of Item 1A risk-factor measures from EDGAR 10-K filings
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Root for raw/, dictionaries/ and output/
    #[arg(long, env = "RISK_PANEL_DATA_DIR", default_value = "data")]
    data_dir: PathBuf,

    /// Firm list: CSV with cik,ticker,name or one CIK per line
    #[arg(short, long)]
    firms: Option<PathBuf>,

    /// Additional CIK to process (repeatable)
    #[arg(long)]
    cik: Vec<String>,

    /// Additional ticker to resolve through the SEC ticker map (repeatable)
    #[arg(short, long)]
    ticker: Vec<String>,

    #[arg(long, default_value_t = config::DEFAULT_START_YEAR)]
    start_year: i32,

    #[arg(long, default_value_t = config::DEFAULT_END_YEAR)]
    end_year: i32,

    /// Identifying User-Agent required by EDGAR, e.g. "Jane Doe jane@example.edu"
    #[arg(long, env = "EDGAR_USER_AGENT")]
    user_agent: Option<String>,

    /// Minimum delay between EDGAR requests
    #[arg(long, env = "EDGAR_REQUEST_DELAY_MS", default_value_t = config::DEFAULT_REQUEST_DELAY_MS)]
    request_delay_ms: u64,

    /// Also accept 10-K/A amendments
    #[arg(long)]
    include_amendments: bool,

    /// Also extract Item 7 (MD&A)
    #[arg(long)]
    extract_item7: bool,

    /// Download documents again even if they are cached
    #[arg(long)]
    overwrite_raw: bool,

    /// Filings whose Item 1A has fewer words are left out of the panel
    #[arg(long, default_value_t = config::DEFAULT_MIN_ITEM1A_WORDS)]
    min_item1a_words: usize,

    /// Filings processed at once per firm (requests stay throttled)
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Add the placeholder LLM risk score column
    #[arg(long)]
    llm_stub: bool,

    /// Debug mode - save annotated HTML of the normalized text
    #[arg(short, long)]
    debug: bool,

    /// Append to an existing panel instead of replacing it
    #[arg(long)]
    append: bool,

    /// Panel CSV path (default: <data-dir>/output/risk_panel.csv)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Debug-level logging unless RUST_LOG is set
    #[arg(short, long)]
    verbose: bool,

    // TOC heuristic overrides
    #[arg(long)]
    toc_early_cap_chars: Option<usize>,
    #[arg(long)]
    toc_early_divisor: Option<usize>,
    #[arg(long)]
    toc_phrase_radius: Option<usize>,
    #[arg(long)]
    toc_density_radius: Option<usize>,
    #[arg(long)]
    toc_density_threshold: Option<usize>,
    #[arg(long)]
    toc_leader_radius: Option<usize>,
    #[arg(long)]
    toc_leader_dot_threshold: Option<usize>,
    #[arg(long)]
    min_span_chars: Option<usize>,
}

impl Args {
    fn to_settings(&self) -> Result<Settings, AppError> {
        let mut settings = Settings::new(&self.data_dir, self.user_agent.as_deref().unwrap_or_default());
        settings.start_year = self.start_year;
        settings.end_year = self.end_year;
        settings.request_delay = Duration::from_millis(self.request_delay_ms);
        settings.include_amendments = self.include_amendments;
        settings.extract_item7 = self.extract_item7;
        settings.overwrite_raw_files = self.overwrite_raw;
        settings.min_item1a_words = self.min_item1a_words;
        settings.concurrency = self.concurrency;
        settings.llm_stub = self.llm_stub;
        settings.debug = self.debug;
        settings.toc = self.toc_heuristics();

        settings.validate()?;
        Ok(settings)
    }

    fn toc_heuristics(&self) -> TocHeuristics {
        let d = TocHeuristics::default();
        TocHeuristics {
            early_cap_chars: self.toc_early_cap_chars.unwrap_or(d.early_cap_chars),
            early_divisor: self.toc_early_divisor.unwrap_or(d.early_divisor),
            phrase_radius: self.toc_phrase_radius.unwrap_or(d.phrase_radius),
            density_radius: self.toc_density_radius.unwrap_or(d.density_radius),
            density_threshold: self.toc_density_threshold.unwrap_or(d.density_threshold),
            leader_radius: self.toc_leader_radius.unwrap_or(d.leader_radius),
            leader_dot_threshold: self.toc_leader_dot_threshold.unwrap_or(d.leader_dot_threshold),
            min_span_chars: self.min_span_chars.unwrap_or(d.min_span_chars),
        }
    }
}

/// Firm list file, then --cik, then --ticker; first occurrence of a CIK wins.
async fn collect_firms(
    args: &Args,
    client: &EdgarClient,
    settings: &Settings,
    cancel: &CancellationToken,
) -> Result<Vec<Firm>, AppError> {
    let mut firms = match &args.firms {
        Some(path) => load_firms(path)?,
        None => Vec::new(),
    };

    for raw in &args.cik {
        let cik10 = normalize_cik10(raw).ok_or_else(|| AppError::Config(format!("'{}' is not a valid CIK", raw)))?;
        firms.push(Firm::new(cik10));
    }

    firms.extend(lookup_tickers(client, &settings.urls, &args.ticker, cancel).await?);

    Ok(dedupe_firms(firms))
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments and setup logging (reads RUST_LOG env var)
    let args = Args::parse();
    utils::logging::setup_logging(args.verbose);
    tracing::debug!("Starting with args: {:?}", args);

    // 2. Validate configuration and prepare directories
    let settings = Arc::new(args.to_settings()?);
    settings.ensure_directories()?;

    // 3. Lexicon problems are fatal before any request is made
    let lexicon = Arc::new(Lexicon::load_dir(&settings.dict_dir)?);

    // 4. One throttle shared by every request of this process
    let throttle = Arc::new(RequestThrottle::new(settings.request_delay));
    let client = Arc::new(EdgarClient::new(&settings.user_agent, throttle)?);

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after in-flight work");
                cancel.cancel();
            }
        });
    }

    // 5. Firms
    let firms = collect_firms(&args, &client, &settings, &cancel).await?;
    if firms.is_empty() {
        return Err(AppError::Config(
            "No firms to process: pass --firms, --cik or --ticker".to_string(),
        ));
    }
    tracing::info!("Processing {} firms, years {}-{}", firms.len(), settings.start_year, settings.end_year);

    // 6. Build the panel
    let builder = PanelBuilder::new(settings.clone(), client, lexicon)?;
    let report = builder.run(&firms, &cancel).await;

    // 7. Export
    let panel_path = args.output.clone().unwrap_or_else(|| settings.panel_path());
    let written = write_panel_csv(&report.rows, &panel_path, !args.append)?;

    for failure in &report.failures {
        tracing::warn!(
            cik = %failure.cik10,
            accession = failure.accession_number.as_deref().unwrap_or("-"),
            "Failed: {}",
            failure.message
        );
    }
    tracing::info!(
        "Processing finished. Rows: {}, below quality: {}, failures: {}, written to {}",
        written,
        report.skipped_quality,
        report.failures.len(),
        panel_path.display()
    );

    if report.cancelled {
        return Err(AppError::Processing("Run cancelled before all firms were processed".to_string()));
    }
    if report.rows.is_empty() && !report.failures.is_empty() {
        return Err(AppError::Processing(format!(
            "No panel rows produced; {} filings or firms failed",
            report.failures.len()
        )));
    }

    Ok(())
}
