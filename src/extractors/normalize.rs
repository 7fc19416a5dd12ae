// src/extractors/normalize.rs
//! Markup-to-text conversion for filing documents.
//!
//! Block boundaries are turned into newlines before tags are stripped, since the
//! section extractor relies on headings landing on their own lines.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SCRIPT_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>").expect("script regex"));

static STYLE_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style\s*>").expect("style regex"));

static COMMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("comment regex"));

static BR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\s*/?>").expect("br regex"));

static BLOCK_END_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)</(?:p|div|tr|li|h[1-6]|table|section|article)\s*>").expect("block end regex")
});

// Real markup only: a bare "<" before a digit or space ("<5%", "a < b") is text.
static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)</?[A-Za-z!?][^>]*>").expect("tag regex"));

static ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&(#[0-9]{1,7}|#[xX][0-9a-fA-F]{1,6}|[A-Za-z][A-Za-z0-9]{1,31});").expect("entity regex"));

// Horizontal whitespace only; newlines carry structure. Includes the no-break space.
static HORIZONTAL_WS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\x0B\x0C\u{00A0}]+").expect("whitespace regex"));

static EXCESS_NEWLINES_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("newline regex"));

/// Converts filing markup into plain text with paragraph structure preserved.
///
/// Total and deterministic: blank input gives an empty string.
pub fn html_to_text(html: &str) -> String {
    if html.trim().is_empty() {
        return String::new();
    }

    let text = html.replace("\r\n", "\n").replace('\r', "\n");

    let text = SCRIPT_BLOCK_RE.replace_all(&text, " ");
    let text = STYLE_BLOCK_RE.replace_all(&text, " ");
    let text = COMMENT_RE.replace_all(&text, " ");

    let text = BR_RE.replace_all(&text, "\n");
    let text = BLOCK_END_RE.replace_all(&text, "\n\n");

    let text = TAG_RE.replace_all(&text, " ");
    let text = decode_entities(&text);

    let text = normalize_whitespace_keep_newlines(&text);
    let text = EXCESS_NEWLINES_RE.replace_all(&text, "\n\n");

    text.trim().to_string()
}

/// Decodes numeric entities and the named entities that occur in EDGAR
/// filings. Unknown names are left as written.
pub fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    ENTITY_RE
        .replace_all(text, |caps: &Captures| {
            let body = &caps[1];
            let decoded = if let Some(num) = body.strip_prefix('#') {
                let code = match num.strip_prefix(['x', 'X']) {
                    Some(hex) => u32::from_str_radix(hex, 16).ok(),
                    None => num.parse::<u32>().ok(),
                };
                code.and_then(char::from_u32).map(String::from)
            } else {
                named_entity(body).map(String::from)
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn named_entity(name: &str) -> Option<&'static str> {
    let s = match name {
        "amp" | "AMP" => "&",
        "lt" | "LT" => "<",
        "gt" | "GT" => ">",
        "quot" | "QUOT" => "\"",
        "apos" => "'",
        "nbsp" => "\u{00A0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "ndash" => "\u{2013}",
        "mdash" => "\u{2014}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "sbquo" => "\u{201A}",
        "ldquo" => "\u{201C}",
        "rdquo" => "\u{201D}",
        "bdquo" => "\u{201E}",
        "bull" => "\u{2022}",
        "middot" => "\u{00B7}",
        "hellip" => "\u{2026}",
        "copy" => "\u{00A9}",
        "reg" => "\u{00AE}",
        "trade" => "\u{2122}",
        "sect" => "\u{00A7}",
        "para" => "\u{00B6}",
        "deg" => "\u{00B0}",
        "plusmn" => "\u{00B1}",
        "times" => "\u{00D7}",
        "divide" => "\u{00F7}",
        "frac12" => "\u{00BD}",
        "frac14" => "\u{00BC}",
        "frac34" => "\u{00BE}",
        "cent" => "\u{00A2}",
        "pound" => "\u{00A3}",
        "euro" => "\u{20AC}",
        "yen" => "\u{00A5}",
        "dagger" => "\u{2020}",
        "Dagger" => "\u{2021}",
        "shy" => "\u{00AD}",
        "zwsp" => "\u{200B}",
        "eacute" => "\u{00E9}",
        "Eacute" => "\u{00C9}",
        "egrave" => "\u{00E8}",
        "aacute" => "\u{00E1}",
        "oacute" => "\u{00F3}",
        "uuml" => "\u{00FC}",
        "ouml" => "\u{00F6}",
        "auml" => "\u{00E4}",
        "ccedil" => "\u{00E7}",
        "ntilde" => "\u{00F1}",
        _ => return None,
    };
    Some(s)
}

fn normalize_whitespace_keep_newlines(text: &str) -> String {
    let collapsed = HORIZONTAL_WS_RE.replace_all(text, " ");
    collapsed
        .split('\n')
        .map(str::trim)
        .collect::<Vec<_>>()
        .join("\n")
}
