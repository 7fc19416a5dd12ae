// src/measures/scorer.rs
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::measures::lexicon::Lexicon;

// Letters only: digits, hyphens and apostrophes split tokens.
static TOKEN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z]+").expect("token regex"));

/// Word counts and frequencies for one document.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DictionaryScores {
    pub total_words: usize,

    pub risk_count: usize,
    pub risk_frequency: f64,

    pub negative_count: usize,
    pub negative_frequency: f64,

    pub uncertainty_count: usize,
    pub uncertainty_frequency: f64,
}

/// Counts lexicon hits in extracted text. Stateless apart from the shared,
/// read-only lexicon, so one scorer can serve many tasks at once.
#[derive(Debug, Clone)]
pub struct LexiconScorer {
    lexicon: Arc<Lexicon>,
}

impl LexiconScorer {
    pub fn new(lexicon: Arc<Lexicon>) -> Self {
        Self { lexicon }
    }

    pub fn score(&self, text: &str) -> DictionaryScores {
        let mut total_words = 0;
        let mut risk_count = 0;
        let mut negative_count = 0;
        let mut uncertainty_count = 0;

        for token in tokenize(text) {
            total_words += 1;

            if self.lexicon.risk.contains(&token) {
                risk_count += 1;
            }
            if self.lexicon.negative.contains(&token) {
                negative_count += 1;
            }
            if self.lexicon.uncertainty.contains(&token) {
                uncertainty_count += 1;
            }
        }

        DictionaryScores {
            total_words,
            risk_count,
            risk_frequency: safe_frequency(risk_count, total_words),
            negative_count,
            negative_frequency: safe_frequency(negative_count, total_words),
            uncertainty_count,
            uncertainty_frequency: safe_frequency(uncertainty_count, total_words),
        }
    }
}

/// Upper-cased alphabetic tokens. ASCII case mapping keeps results identical across hosts.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    TOKEN_RE.find_iter(text).map(|m| m.as_str().to_ascii_uppercase())
}

fn safe_frequency(count: usize, total_words: usize) -> f64 {
    if total_words == 0 {
        return 0.0;
    }
    count as f64 / total_words as f64
}
