//! Description text normalization.

use std::sync::LazyLock;

use regex::Regex;

static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\r\n|\n").expect("line break pattern is valid"));

/// Replace every `\r\n` or `\n` with an HTML `<br />` tag.
///
/// Lone `\r` characters are left untouched.
#[must_use]
pub fn normalize_description(text: &str) -> String {
    LINE_BREAK.replace_all(text, "<br />").into_owned()
}
