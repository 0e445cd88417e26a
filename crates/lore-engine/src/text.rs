//! Small text helpers used at the extraction boundary

use std::sync::LazyLock;

use regex::Regex;

static TAG_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").expect("tag regex must compile"));

static WHITESPACE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t]{2,}").expect("whitespace regex must compile"));

/// Strip HTML tags from host rich-text fields, collapsing runs of spaces.
///
/// This is deliberately not an HTML parser: host descriptions are shallow
/// editor output and the engine only needs readable plain text out of them.
pub fn strip_html(input: &str) -> String {
    let without_tags = TAG_REGEX.replace_all(input, " ");
    let collapsed = WHITESPACE_REGEX.replace_all(&without_tags, " ");
    collapsed.trim().to_string()
}

/// True when the candidate is an absolute external URL.
///
/// Image fields on remote payloads only accept these; host-relative asset
/// paths ("icons/svg/mystery-man.svg") are rejected.
pub fn is_external_url(candidate: &str) -> bool {
    let trimmed = candidate.trim();
    trimmed.starts_with("https://") || trimmed.starts_with("http://")
}
