// src/measures/llm.rs
//! Placeholder for a model-based risk score.
//!
//! No model is called. The stub builds the prompts a real scorer would send and
//! returns a deterministic score derived from text length, so the panel column
//! and the plumbing around it can be exercised end to end.

use serde::Serialize;

pub const DEFAULT_MODEL_NAME: &str = "stub-risk-model";
pub const DEFAULT_MAX_CHARS_PER_CHUNK: usize = 8000;

// A chunk may end early at whitespace, but only past this share of the limit.
const MIN_BREAK_RATIO: f64 = 0.6;

const PROMPT_HEADER: &str = "You are a financial analyst. Read the following excerpt from the \
Risk Factors section of a 10-K filing and rate the overall severity of the disclosed risks \
on a scale from 0 (negligible) to 100 (severe). Answer with a single number.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LlmScore {
    pub score: f64,
    pub model: String,
    pub notes: String,
}

#[derive(Debug, Clone)]
pub struct LlmRiskScorer {
    model_name: String,
    max_chars_per_chunk: usize,
}

impl Default for LlmRiskScorer {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL_NAME, DEFAULT_MAX_CHARS_PER_CHUNK)
    }
}

impl LlmRiskScorer {
    pub fn new(model_name: &str, max_chars_per_chunk: usize) -> Self {
        Self {
            model_name: model_name.to_string(),
            max_chars_per_chunk: max_chars_per_chunk.max(1),
        }
    }

    /// Returns `None` for blank text.
    pub async fn score(&self, text: &str) -> Option<LlmScore> {
        if text.trim().is_empty() {
            return None;
        }

        let chunks = chunk_text(text, self.max_chars_per_chunk);
        let prompts: Vec<String> = chunks.iter().map(|c| build_prompt(c)).collect();
        tracing::debug!(model = %self.model_name, chunks = prompts.len(), "Built LLM prompts (stub, not sent)");

        let length = text.chars().count();
        let score = (((length + 1) as f64).log10() * 25.0).min(100.0);

        Some(LlmScore {
            score,
            model: self.model_name.clone(),
            notes: format!("stub score from {} chars in {} chunk(s)", length, prompts.len()),
        })
    }
}

pub fn build_prompt(chunk: &str) -> String {
    format!("{}\n\n---\n{}\n---", PROMPT_HEADER, chunk.trim())
}

/// Splits `text` into chunks of at most `max_chars` characters, preferring to
/// break at whitespace once a chunk is at least 60% full.
pub fn chunk_text(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let min_break = ((max_chars as f64) * MIN_BREAK_RATIO).ceil() as usize;
    let chars: Vec<char> = text.chars().collect();

    let mut chunks = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let hard_end = (start + max_chars).min(chars.len());
        let mut end = hard_end;

        if hard_end < chars.len() {
            if let Some(pos) = (start + min_break..hard_end).rev().find(|&i| chars[i].is_whitespace()) {
                end = pos;
            }
        }

        let chunk: String = chars[start..end].iter().collect();
        let chunk = chunk.trim();
        if !chunk.is_empty() {
            chunks.push(chunk.to_string());
        }

        start = end;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
    }
    chunks
}
