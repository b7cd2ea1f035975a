//! Plain-text cleanup for markup renditions.

use regex::Regex;
use std::sync::LazyLock;

static BOILERPLATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(script|style|nav|header|footer)\b[^>]*>.*?</(script|style|nav|header|footer)>")
        .expect("boilerplate pattern is valid")
});
static BLOCK_BREAK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<br\s*/?>|</(p|div|li|tr|h[1-6]|pre)>").expect("break pattern is valid")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("tag pattern is valid"));

/// Strip markup down to its visible text.
///
/// Scripts, styles and page chrome (nav, header, footer) are dropped along
/// with their content, block-level closers become line breaks, remaining
/// tags are removed, common entities are decoded, and blank lines are
/// dropped.
pub fn html_to_text(html: &str) -> String {
    let text = BOILERPLATE.replace_all(html, "");
    let text = BLOCK_BREAK.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, "");

    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&sect;", "\u{a7}")
        .replace("&amp;", "&");

    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Trim a plain-text body, dropping a UTF-8 byte-order mark.
pub fn normalize_plain_text(text: &str) -> String {
    text.trim_start_matches('\u{feff}').trim().to_string()
}
