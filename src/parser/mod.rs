//! Splits a free-text assistant reply into summary, recommendations and
//! disclaimer sections.
//!
//! Section markers are recognised case-insensitively. A header marker
//! (`Summary:`, `## Recommendations`, `**Disclaimer:**`, `- Summary:` ...) is
//! stripped from the output. The fixed disclaimer opening "This information
//! is" is kept as part of the disclaimer text.

pub mod bullets;

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub summary: String,
    pub recommendations: String,
    pub disclaimer: String,
}

impl ParsedResponse {
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty() && self.recommendations.is_empty() && self.disclaimer.is_empty()
    }

    /// Non-empty sections joined by a blank line.
    pub fn to_plain_text(&self) -> String {
        [&self.summary, &self.recommendations, &self.disclaimer]
            .into_iter()
            .filter(|s| !s.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A header word at the start of a line, optionally behind a `#` heading or a
/// list glyph and wrapped in `*`/`_` emphasis, followed by a colon or the end
/// of the line. A `#` heading may also carry further words after the header
/// word ("## Recommendations for better sleep"); the whole line is the marker.
fn header_pattern(word: &str) -> Regex {
    let emphasis = r"(?:\*{1,2}|_{1,2})";
    let pattern = format!(
        r"(?im)^[ \t]*(?:(?:#{{1,6}}[ \t]*|[-*+][ \t]+)?{emphasis}?(?:{word}){emphasis}?[ \t]*(?::(?:[ \t]*{emphasis})?|\r?$)|#{{1,6}}[ \t]*{emphasis}?(?:{word})\b[^\r\n]*)"
    );
    Regex::new(&pattern).expect("section header pattern")
}

static SUMMARY_HEADER: LazyLock<Regex> = LazyLock::new(|| header_pattern("summary"));
static RECOMMENDATIONS_HEADER: LazyLock<Regex> =
    LazyLock::new(|| header_pattern("recommendations?"));
static DISCLAIMER_HEADER: LazyLock<Regex> = LazyLock::new(|| header_pattern("disclaimer"));

// Group 1 starts the disclaimer, including any emphasis or quote glyphs.
static DISCLAIMER_PHRASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?im)(?:^[ \t>]*|[.!?][ \t]+)(["*_]*this information is\b)"#)
        .expect("disclaimer phrase pattern")
});

static HORIZONTAL_RULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:-{3,}|\*{3,}|_{3,}|={3,})$").expect("horizontal rule pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Marker {
    /// Where the previous section stops.
    start: usize,
    /// Where this section's content begins.
    content_start: usize,
}

fn find_header(pattern: &Regex, text: &str, from: usize) -> Option<Marker> {
    pattern.find_at(text, from).map(|m| Marker {
        start: m.start(),
        content_start: m.end(),
    })
}

fn find_disclaimer(text: &str, from: usize) -> Option<Marker> {
    let header = find_header(&DISCLAIMER_HEADER, text, from);
    let phrase = DISCLAIMER_PHRASE
        .captures_at(text, from)
        .and_then(|caps| caps.get(1))
        .map(|m| Marker {
            start: m.start(),
            content_start: m.start(),
        });

    match (header, phrase) {
        (Some(h), Some(p)) => Some(if p.start < h.start { p } else { h }),
        (h, p) => h.or(p),
    }
}

fn is_rule(line: &str) -> bool {
    HORIZONTAL_RULE.is_match(line.trim())
}

/// Trims whitespace and peels horizontal rules off both ends of a slice.
fn clean(slice: &str) -> &str {
    let mut s = slice.trim();
    loop {
        let (head, tail) = s.split_once('\n').unwrap_or((s, ""));
        if is_rule(head) {
            s = tail.trim();
            continue;
        }
        let (rest, last) = s.rsplit_once('\n').unwrap_or(("", s));
        if is_rule(last) {
            s = rest.trim();
            continue;
        }
        return s;
    }
}

/// Parse an assistant reply into its three sections.
///
/// Markers are looked up in the fixed order summary, recommendations,
/// disclaimer; each search starts after the previous marker that was found.
/// A section runs from its marker to the next marker present, or to the end
/// of the text. Text ahead of the first marker is kept as (the start of) the
/// summary. Without any marker the whole trimmed reply is the summary.
pub fn parse_response(text: &str) -> ParsedResponse {
    let summary = find_header(&SUMMARY_HEADER, text, 0);
    let recommendations = find_header(
        &RECOMMENDATIONS_HEADER,
        text,
        summary.map_or(0, |m| m.content_start),
    );
    let disclaimer = find_disclaimer(
        text,
        recommendations.or(summary).map_or(0, |m| m.content_start),
    );

    let markers = [summary, recommendations, disclaimer];
    let Some(first) = markers.iter().flatten().next().copied() else {
        debug!(len = text.len(), "no section markers in reply");
        return ParsedResponse {
            summary: text.trim().to_string(),
            ..Default::default()
        };
    };

    let section = |index: usize| -> String {
        let Some(marker) = markers[index] else {
            return String::new();
        };
        let end = markers[index + 1..]
            .iter()
            .flatten()
            .next()
            .map_or(text.len(), |next| next.start);
        clean(&text[marker.content_start..end]).to_string()
    };

    let preamble = clean(&text[..first.start]);
    let mut summary_text = section(0);
    if !preamble.is_empty() {
        summary_text = if summary_text.is_empty() {
            preamble.to_string()
        } else {
            format!("{preamble}\n\n{summary_text}")
        };
    }

    let parsed = ParsedResponse {
        summary: summary_text,
        recommendations: section(1),
        disclaimer: section(2),
    };
    debug!(
        summary = summary.is_some(),
        recommendations = recommendations.is_some(),
        disclaimer = disclaimer.is_some(),
        "parsed reply sections"
    );
    parsed
}
