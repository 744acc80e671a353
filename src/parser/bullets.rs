use regex::Regex;
use std::sync::LazyLock;

// Inline separators inside a single line, e.g. "Walk • Stretch • Hydrate".
// ` * ` inside a line is left alone (multiplication).
static INLINE_BULLET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]+•[ \t]+").expect("inline bullet pattern"));

static LIST_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[*\-•+]|\d{1,3}[.)])(?:[ \t]+|$)").expect("list prefix pattern")
});

/// Split a list-like block into trimmed, non-empty items.
///
/// `*`, `-`, `•` and `+` bullets (and `1.` / `1)` numbering) all map to the
/// same line-break separator before splitting. Only `•` also separates items
/// within a line.
pub fn format_bullets(text: &str) -> Vec<String> {
    let normalized = INLINE_BULLET.replace_all(text, "\n");
    normalized
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            let item = match LIST_PREFIX.find(line) {
                Some(prefix) => line[prefix.end()..].trim(),
                None => line,
            };
            (!item.is_empty()).then(|| item.to_string())
        })
        .collect()
}
