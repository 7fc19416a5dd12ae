// src/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::edgar::client::EdgarUrls;
use crate::extractors::section::TocHeuristics;
use crate::utils::error::AppError;

pub const DEFAULT_START_YEAR: i32 = 2010;
pub const DEFAULT_END_YEAR: i32 = 2023;
pub const DEFAULT_REQUEST_DELAY_MS: u64 = 200;
pub const DEFAULT_MIN_ITEM1A_WORDS: usize = 200;
pub const PANEL_FILE_NAME: &str = "risk_panel.csv";

/// Validated run configuration. Built once in `main` and shared read-only.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub raw_dir: PathBuf,
    pub dict_dir: PathBuf,
    pub output_dir: PathBuf,

    pub start_year: i32,
    pub end_year: i32,

    pub user_agent: String,
    pub request_delay: Duration,
    pub urls: EdgarUrls,

    pub include_amendments: bool,
    pub extract_item7: bool,
    pub overwrite_raw_files: bool,
    pub min_item1a_words: usize,
    pub concurrency: usize,
    pub toc: TocHeuristics,

    pub llm_stub: bool,
    pub debug: bool,
}

impl Settings {
    /// Defaults rooted at `data_dir`. The user agent still has to be set.
    pub fn new<P: AsRef<Path>>(data_dir: P, user_agent: &str) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            raw_dir: data_dir.join("raw"),
            dict_dir: data_dir.join("dictionaries"),
            output_dir: data_dir.join("output"),
            data_dir,
            start_year: DEFAULT_START_YEAR,
            end_year: DEFAULT_END_YEAR,
            user_agent: user_agent.trim().to_string(),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            urls: EdgarUrls::default(),
            include_amendments: false,
            extract_item7: false,
            overwrite_raw_files: false,
            min_item1a_words: DEFAULT_MIN_ITEM1A_WORDS,
            concurrency: 1,
            toc: TocHeuristics::default(),
            llm_stub: false,
            debug: false,
        }
    }

    /// Rejects settings that would make every request or every filing fail.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.user_agent.trim().is_empty() {
            return Err(AppError::Config(
                "a User-Agent identifying you is required by EDGAR (e.g. \"Name email@domain\")".to_string(),
            ));
        }
        if self.start_year > self.end_year {
            return Err(AppError::Config(format!(
                "start year {} is after end year {}",
                self.start_year, self.end_year
            )));
        }
        if self.concurrency == 0 {
            return Err(AppError::Config("concurrency must be at least 1".to_string()));
        }
        if self.toc.early_divisor == 0 {
            return Err(AppError::Config("TOC early divisor must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn ensure_directories(&self) -> Result<(), AppError> {
        for dir in [&self.data_dir, &self.raw_dir, &self.dict_dir, &self.output_dir] {
            std::fs::create_dir_all(dir)?;
        }
        if self.debug {
            std::fs::create_dir_all(self.debug_dir())?;
        }
        Ok(())
    }

    pub fn panel_path(&self) -> PathBuf {
        self.output_dir.join(PANEL_FILE_NAME)
    }

    pub fn debug_dir(&self) -> PathBuf {
        self.output_dir.join("debug")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn paths_derive_from_data_dir() {
        let settings = Settings::new("/tmp/panel", "Lab lab@example.edu");
        assert_eq!(settings.raw_dir, PathBuf::from("/tmp/panel/raw"));
        assert_eq!(settings.dict_dir, PathBuf::from("/tmp/panel/dictionaries"));
        assert_eq!(settings.panel_path(), PathBuf::from("/tmp/panel/output/risk_panel.csv"));
        assert_eq!(settings.debug_dir(), PathBuf::from("/tmp/panel/output/debug"));
    }

    #[test]
    fn defaults() {
        let settings = Settings::new("data", "Lab lab@example.edu");
        assert_eq!((settings.start_year, settings.end_year), (2010, 2023));
        assert_eq!(settings.request_delay, Duration::from_millis(200));
        assert_eq!(settings.min_item1a_words, 200);
        assert_eq!(settings.concurrency, 1);
        assert!(!settings.extract_item7 && !settings.overwrite_raw_files && !settings.include_amendments);
        assert_ok!(settings.validate());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert_err!(Settings::new("data", "  ").validate());

        let mut years = Settings::new("data", "Lab lab@example.edu");
        years.start_year = 2024;
        years.end_year = 2020;
        assert_err!(years.validate());

        let mut workers = Settings::new("data", "Lab lab@example.edu");
        workers.concurrency = 0;
        assert_err!(workers.validate());
    }

    #[test]
    fn directories_are_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::new(dir.path().join("data"), "Lab lab@example.edu");
        settings.debug = true;

        assert_ok!(settings.ensure_directories());
        assert!(settings.raw_dir.is_dir());
        assert!(settings.dict_dir.is_dir());
        assert!(settings.debug_dir().is_dir());
    }
}
