// src/utils/html_debug.rs
use std::path::Path;

use regex::Regex;

use crate::extractors::section::{ITEM_1A_PATTERNS, ITEM_7_PATTERNS, TOC_PHRASE_RE};
use crate::utils::error::AppError;

/// Renders normalized text as HTML with the given byte ranges highlighted.
/// Overlapping ranges are dropped in favour of the earlier one.
pub fn render_debug_html(text: &str, highlights: &[(usize, usize, &str)]) -> String {
    let mut debug_html = String::from("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<style>\n");

    // CSS for highlight colors
    debug_html.push_str("body { font-family: monospace; white-space: pre-wrap; }\n");
    debug_html.push_str(".highlight-start { background-color: #90EE90; }\n");
    debug_html.push_str(".highlight-end { background-color: #FFA500; }\n");
    debug_html.push_str(".highlight-toc { background-color: #FFFF00; }\n");
    debug_html.push_str(".highlight-custom { background-color: #FFC0CB; }\n");
    debug_html.push_str("</style>\n</head>\n<body>\n");

    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| (h.0, h.1));

    let mut last_pos = 0;
    for (start, end, highlight_type) in sorted_highlights {
        if start < last_pos || end > text.len() || start >= end {
            continue;
        }
        debug_html.push_str(&escape_html(&text[last_pos..start]));

        let css_class = match highlight_type {
            t if t.ends_with("start") => "highlight-start",
            t if t.ends_with("end") => "highlight-end",
            "toc" => "highlight-toc",
            _ => "highlight-custom",
        };
        debug_html.push_str(&format!(
            "<span class=\"{}\" title=\"Position: {}-{}, Type: {}\">",
            css_class, start, end, highlight_type
        ));
        debug_html.push_str(&escape_html(&text[start..end]));
        debug_html.push_str("</span>");

        last_pos = end;
    }

    if last_pos < text.len() {
        debug_html.push_str(&escape_html(&text[last_pos..]));
    }

    debug_html.push_str("\n</body>\n</html>\n");
    debug_html
}

/// Highlights every match of each `(pattern, type)` pair and writes the page to `path`.
pub fn create_debug_html(text: &str, path: &Path, patterns: &[(&Regex, &str)]) -> Result<(), AppError> {
    let highlights: Vec<(usize, usize, &str)> = patterns
        .iter()
        .flat_map(|(re, highlight_type)| re.find_iter(text).map(move |m| (m.start(), m.end(), *highlight_type)))
        .collect();

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, render_debug_html(text, &highlights))?;

    tracing::debug!("Saved debug HTML to {}", path.display());
    Ok(())
}

/// Annotates the section boundaries the extractor looks for.
pub fn write_section_debug(text: &str, path: &Path, include_item7: bool) -> Result<(), AppError> {
    let mut patterns: Vec<(&Regex, &str)> = vec![
        (&ITEM_1A_PATTERNS.start, "item1a-start"),
        (&ITEM_1A_PATTERNS.end, "item1a-end"),
        (&*TOC_PHRASE_RE, "toc"),
    ];
    if include_item7 {
        patterns.push((&ITEM_7_PATTERNS.start, "item7-start"));
        patterns.push((&ITEM_7_PATTERNS.end, "item7-end"));
    }
    create_debug_html(text, path, &patterns)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}
