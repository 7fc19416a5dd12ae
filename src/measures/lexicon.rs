// src/measures/lexicon.rs
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::utils::error::LexiconError;

pub const RISK_FILE: &str = "risk.txt";
pub const NEGATIVE_FILE: &str = "negative.txt";
pub const UNCERTAINTY_FILE: &str = "uncertainty.txt";

/// Loughran-McDonald style word lists, upper-cased and letters only.
///
/// The three sets are independent; one word may sit in several of them.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    pub risk: HashSet<String>,
    pub negative: HashSet<String>,
    pub uncertainty: HashSet<String>,
}

impl Lexicon {
    /// Loads `risk.txt`, `negative.txt` and `uncertainty.txt` from `dict_dir`.
    pub fn load_dir(dict_dir: &Path) -> Result<Self, LexiconError> {
        Self::load(
            &dict_dir.join(RISK_FILE),
            &dict_dir.join(NEGATIVE_FILE),
            &dict_dir.join(UNCERTAINTY_FILE),
        )
    }

    /// Loads the three lists. Fails if a file is missing or yields no words,
    /// since an empty list would silently score every document as zero.
    pub fn load(risk_path: &Path, negative_path: &Path, uncertainty_path: &Path) -> Result<Self, LexiconError> {
        let lexicon = Self {
            risk: load_word_set(risk_path)?,
            negative: load_word_set(negative_path)?,
            uncertainty: load_word_set(uncertainty_path)?,
        };

        for (category, set, path) in [
            ("risk", &lexicon.risk, risk_path),
            ("negative", &lexicon.negative, negative_path),
            ("uncertainty", &lexicon.uncertainty, uncertainty_path),
        ] {
            if set.is_empty() {
                return Err(LexiconError::Empty {
                    category,
                    path: path.to_path_buf(),
                });
            }
        }

        tracing::info!(
            risk = lexicon.risk.len(),
            negative = lexicon.negative.len(),
            uncertainty = lexicon.uncertainty.len(),
            "Loaded lexicon"
        );
        Ok(lexicon)
    }
}

/// Reads one word list: one entry per line, `#` comments and blank lines ignored.
pub fn load_word_set(path: &Path) -> Result<HashSet<String>, LexiconError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LexiconError::NotFound(path.to_path_buf())
        } else {
            LexiconError::Io {
                path: PathBuf::from(path),
                source: e,
            }
        }
    })?;

    Ok(parse_word_list(&content))
}

pub fn parse_word_list(content: &str) -> HashSet<String> {
    content.lines().filter_map(normalize_entry).collect()
}

/// Multi-word or hyphenated entries collapse to their letters ("WRITE-DOWN" -> "WRITEDOWN").
fn normalize_entry(line: &str) -> Option<String> {
    let entry = line.trim();
    if entry.is_empty() || entry.starts_with('#') {
        return None;
    }

    let word: String = entry
        .to_uppercase()
        .chars()
        .filter(|c| c.is_alphabetic())
        .collect();

    (!word.is_empty()).then_some(word)
}
