//! Candidate SQL extraction from free-form model output.
//!
//! Language models wrap SQL in markdown fences or lead with a sentence of
//! prose. [`extract`] peels those wrappers off and never invents content:
//! when nothing SQL-like is found the trimmed input is returned as-is and
//! left for the validator to reject.

use once_cell::sync::Lazy;
use regex::Regex;

/// First fenced code block, non-greedy, spanning lines.
static CODE_FENCE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```(.*?)```").expect("Invalid regex: code fence pattern"));

/// First `select` keyword followed by whitespace.
static FIRST_SELECT_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bselect\s").expect("Invalid regex: first select pattern"));

/// SQL language label on the opening fence line. Any other first line is
/// part of the body.
static FENCE_LABEL_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(sql|postgresql|postgres|psql|pgsql)$")
        .expect("Invalid regex: fence label pattern")
});

/// Inline `sql` tag directly followed by the statement on the same line.
static INLINE_SQL_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^sql\s+").expect("Invalid regex: inline sql tag pattern"));

/// Extract the most likely SQL statement from raw model output.
///
/// Priority order, first match wins:
/// 1. trimmed body of the first fenced code block, language tag dropped;
/// 2. trimmed text from the first `select` keyword to the end;
/// 3. the trimmed input.
pub fn extract(raw: &str) -> String {
    if let Some(captures) = CODE_FENCE_REGEX.captures(raw) {
        let body = captures.get(1).map_or("", |m| m.as_str());
        return strip_fence_label(body).trim().to_string();
    }

    if let Some(found) = FIRST_SELECT_REGEX.find(raw) {
        return raw[found.start()..].trim().to_string();
    }

    raw.trim().to_string()
}

/// Drop the language label that may follow the opening backticks.
fn strip_fence_label(body: &str) -> &str {
    if let Some((first_line, rest)) = body.split_once('\n') {
        let label = first_line.trim();
        if label.is_empty() || FENCE_LABEL_REGEX.is_match(label) {
            return rest;
        }
    }

    // ```sql SELECT ...``` on a single line
    match INLINE_SQL_TAG_REGEX.find(body) {
        Some(tag) => &body[tag.end()..],
        None => body,
    }
}
