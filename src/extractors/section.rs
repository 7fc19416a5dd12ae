// src/extractors/section.rs

// --- Imports ---
use once_cell::sync::Lazy;
use regex::{Match, Regex};

pub const EXTRACTION_METHOD_VERSION: &str = "v1";

// --- Regex Patterns for Text Matching (Lazy Static) ---

/// Start/end boundaries of one 10-K item. Kept as data so the patterns can be
/// tuned and tested apart from the selection procedure.
#[derive(Debug)]
pub struct SectionPatterns {
    pub label: &'static str,
    pub start: Regex,
    pub end: Regex,
}

// "Item 1A" with optional punctuation and optional "Risk Factors".
// Ends at Item 1B, Item 2, or Part II.
pub static ITEM_1A_PATTERNS: Lazy<SectionPatterns> = Lazy::new(|| SectionPatterns {
    label: "Item 1A",
    start: Regex::new(r"(?is)\bitem\s*1a\b\s*[\.\-:–—]?\s*(?:risk\s*factors)?\b")
        .expect("Failed to compile Item 1A start pattern"),
    end: Regex::new(r"(?is)\bitem\s*1b\b|\bitem\s*2\b|\bpart\s*ii\b")
        .expect("Failed to compile Item 1A end pattern"),
});

// "Item 7" with optional "Management's Discussion and Analysis". Ends at Item 7A or Item 8.
pub static ITEM_7_PATTERNS: Lazy<SectionPatterns> = Lazy::new(|| SectionPatterns {
    label: "Item 7",
    start: Regex::new(r"(?is)\bitem\s*7\b\s*[\.\-:–—]?\s*(?:management[’']?s\s*discussion\s*and\s*analysis)?\b")
        .expect("Failed to compile Item 7 start pattern"),
    end: Regex::new(r"(?is)\bitem\s*7a\b|\bitem\s*8\b")
        .expect("Failed to compile Item 7 end pattern"),
});

pub(crate) static TOC_PHRASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)table\s+of\s+contents").expect("Failed to compile TOC phrase pattern"));

// Any "Item N" / "Item NX" label; a dense cluster of these is what a TOC looks like.
static ITEM_HEADING_ANY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)\bitem\s*\d+\s*[a-z]?\b").expect("Failed to compile item heading pattern"));

// --- Heuristic thresholds ---

/// Table-of-contents heuristics. The defaults are empirical; distances are in bytes
/// of normalized text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TocHeuristics {
    /// A start is "early" below `min(early_cap_chars, len / early_divisor)`.
    pub early_cap_chars: usize,
    pub early_divisor: usize,
    /// Early starts with "table of contents" within this radius are TOC.
    pub phrase_radius: usize,
    /// Early starts with at least `density_threshold` item labels within this radius are TOC.
    pub density_radius: usize,
    pub density_threshold: usize,
    /// Any start with more than `leader_dot_threshold` dots within this radius is TOC.
    pub leader_radius: usize,
    pub leader_dot_threshold: usize,
    /// Shortest start-to-end span accepted for a non-fallback candidate.
    pub min_span_chars: usize,
}

impl Default for TocHeuristics {
    fn default() -> Self {
        Self {
            early_cap_chars: 25_000,
            early_divisor: 8,
            phrase_radius: 3_000,
            density_radius: 4_000,
            density_threshold: 6,
            leader_radius: 2_500,
            leader_dot_threshold: 300,
            min_span_chars: 500,
        }
    }
}

// --- Data Structures ---
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedSection {
    pub text: String,
    pub found: bool,
    pub word_count: usize,
    /// Some candidate heading was rejected as a table-of-contents entry.
    pub likely_toc_hit: bool,
}

impl ExtractedSection {
    fn not_found(likely_toc_hit: bool) -> Self {
        Self {
            likely_toc_hit,
            ..Self::default()
        }
    }

    /// Found and long enough to be kept in the panel.
    pub fn passes_quality(&self, min_word_count: usize) -> bool {
        self.found && self.word_count >= min_word_count
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedSections {
    pub item_1a: ExtractedSection,
    /// Only populated when Item 7 was requested.
    pub item_7: Option<ExtractedSection>,
    pub method_version: &'static str,
}

// --- Main Extractor Structure ---
#[derive(Debug, Clone, Default)]
pub struct SectionExtractor {
    heuristics: TocHeuristics,
}

impl SectionExtractor {
    pub fn with_heuristics(heuristics: TocHeuristics) -> Self {
        Self { heuristics }
    }

    /// Extracts Item 1A (Risk Factors) and, if asked, Item 7 (MD&A) from normalized text.
    pub fn extract(&self, cleaned_text: &str, extract_item7: bool) -> ExtractedSections {
        let item_1a = self.extract_section(cleaned_text, &ITEM_1A_PATTERNS);
        let item_7 = extract_item7.then(|| self.extract_section(cleaned_text, &ITEM_7_PATTERNS));

        ExtractedSections {
            item_1a,
            item_7,
            method_version: EXTRACTION_METHOD_VERSION,
        }
    }

    /// Candidate enumeration, TOC filter, then accept-or-fallback.
    pub fn extract_section(&self, text: &str, patterns: &SectionPatterns) -> ExtractedSection {
        if text.trim().is_empty() {
            return ExtractedSection::not_found(false);
        }

        let starts: Vec<Match> = patterns.start.find_iter(text).collect();
        if starts.is_empty() {
            tracing::debug!("No '{}' heading found", patterns.label);
            return ExtractedSection::not_found(false);
        }

        let mut likely_toc_hit = false;
        let mut chosen: Option<(usize, usize)> = None;

        for start in &starts {
            if self.is_likely_toc_start(text, start.start()) {
                tracing::trace!("Skipping '{}' at {} - likely in ToC", patterns.label, start.start());
                likely_toc_hit = true;
                continue;
            }

            let Some(end) = patterns.end.find_at(text, start.end()) else {
                continue;
            };
            if end.start() <= start.start() {
                continue;
            }
            // A passing mention ("see Item 1A") is usually followed closely by another label.
            if end.start() - start.start() < self.heuristics.min_span_chars {
                tracing::trace!(
                    "Skipping '{}' at {} - span of {} bytes too short",
                    patterns.label,
                    start.start(),
                    end.start() - start.start()
                );
                continue;
            }

            chosen = Some((start.start(), end.start()));
            break;
        }

        let (begin, finish) = match chosen {
            Some(bounds) => bounds,
            None => {
                // The body heading is usually the last occurrence, even when the heuristics misfire.
                let Some(last) = starts.last() else {
                    return ExtractedSection::not_found(likely_toc_hit);
                };
                match patterns.end.find_at(text, last.end()) {
                    Some(end) if end.start() > last.start() => {
                        tracing::debug!(
                            "Falling back to last '{}' heading at {} of {}",
                            patterns.label,
                            last.start(),
                            starts.len()
                        );
                        (last.start(), end.start())
                    }
                    _ => {
                        tracing::debug!("No end marker after last '{}' heading", patterns.label);
                        return ExtractedSection::not_found(likely_toc_hit);
                    }
                }
            }
        };

        let section = collapse_whitespace(&text[begin..finish]);
        if section.is_empty() {
            return ExtractedSection::not_found(likely_toc_hit);
        }

        let word_count = count_words(&section);
        tracing::debug!(
            "Extracted '{}' from {}..{} ({} words, toc hit: {})",
            patterns.label,
            begin,
            finish,
            word_count,
            likely_toc_hit
        );

        ExtractedSection {
            text: section,
            found: true,
            word_count,
            likely_toc_hit,
        }
    }

    /// Checks whether a heading at `start_index` is likely a table-of-contents entry.
    pub fn is_likely_toc_start(&self, text: &str, start_index: usize) -> bool {
        let h = &self.heuristics;

        // Heuristic 1: early in the document and near a TOC marker or a cluster of item labels
        let early_cap = h.early_cap_chars.min(text.len() / h.early_divisor.max(1));
        if start_index < early_cap {
            if TOC_PHRASE_RE.is_match(window(text, start_index, h.phrase_radius)) {
                return true;
            }

            let item_labels = ITEM_HEADING_ANY_RE
                .find_iter(window(text, start_index, h.density_radius))
                .count();
            if item_labels >= h.density_threshold {
                return true;
            }
        }

        // Heuristic 2: dot leaders ("Risk Factors ........ 12") anywhere in the document
        let dots = window(text, start_index, h.leader_radius)
            .bytes()
            .filter(|b| *b == b'.')
            .count();
        dots > h.leader_dot_threshold
    }
}

/// Slice of `text` within `radius` bytes of `center`, widened to char boundaries.
fn window(text: &str, center: usize, radius: usize) -> &str {
    let mut start = center.saturating_sub(radius).min(text.len());
    while !text.is_char_boundary(start) {
        start -= 1;
    }
    let mut end = center.saturating_add(radius).min(text.len());
    while !text.is_char_boundary(end) {
        end += 1;
    }
    &text[start..end]
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn count_words(text: &str) -> usize {
    text.split_whitespace().count()
}
