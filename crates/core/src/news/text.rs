use regex::Regex;
use std::sync::LazyLock;

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Decode HTML character references, including the legacy forms written
/// without a trailing semicolon. Unknown names are left as written.
pub fn unescape_html(input: &str) -> String {
    htmlize::unescape(input).into_owned()
}

/// Feed text to plain text: decode entities, drop tags, collapse whitespace.
pub fn clean_text(input: &str) -> String {
    let unescaped = unescape_html(input);
    let stripped = TAG_REGEX.replace_all(&unescaped, "");
    WHITESPACE_REGEX
        .replace_all(stripped.trim(), " ")
        .into_owned()
}
