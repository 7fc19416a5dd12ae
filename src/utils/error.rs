// src/utils/error.rs
use std::path::PathBuf;
use thiserror::Error;

// Define specific error types for different parts of the application
#[derive(Error, Debug)]
pub enum EdgarError {
    #[error("Network request failed: {0}")]
    Network(#[from] reqwest::Error), // Automatically convert reqwest errors

    #[error("HTTP error {status} for {url}")]
    Http { status: reqwest::StatusCode, url: String },

    #[error("SEC rate limit likely exceeded (403) for {0}")]
    RateLimited(String),

    #[error("Could not find specified filing document: {0}")]
    FilingDocNotFound(String),

    #[error("Failed to parse EDGAR response: {0}")]
    Parse(String),

    #[error("Invalid User-Agent header: {0}")]
    InvalidUserAgent(String),

    #[error("Request cancelled")]
    Cancelled,
}

impl EdgarError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, EdgarError::Cancelled)
    }
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[derive(Error, Debug)]
pub enum LexiconError {
    #[error("Dictionary file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read dictionary {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{category} list loaded 0 words (check {})", path.display())]
    Empty { category: &'static str, path: PathBuf },
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error), // Automatically convert IO errors

    #[error("EDGAR interaction failed: {0}")]
    Edgar(#[from] EdgarError), // Automatically convert Edgar errors

    #[error("Lexicon error: {0}")]
    Lexicon(#[from] LexiconError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Data processing failed: {0}")]
    Processing(String),
}

impl AppError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Edgar(e) if e.is_cancelled())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_is_recognised_through_app_error() {
        let err: AppError = EdgarError::Cancelled.into();
        assert!(err.is_cancelled());

        let other: AppError = EdgarError::Parse("bad json".to_string()).into();
        assert!(!other.is_cancelled());
    }

    #[test]
    fn empty_lexicon_message_names_category_and_path() {
        let err = LexiconError::Empty {
            category: "risk",
            path: PathBuf::from("dictionaries/risk.txt"),
        };
        let msg = err.to_string();
        assert!(msg.contains("risk list loaded 0 words"));
        assert!(msg.contains("dictionaries/risk.txt"));
    }
}
