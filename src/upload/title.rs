//! Default title derivation from file names.
//!
//! Mirrors the library service's own title generation so that titles
//! computed client-side match what the server would have produced:
//! strip the extension, remove special characters (keeping a few
//! meaningful ones like `$ % # &`), collapse whitespace, title-case,
//! and cap the length. Title-casing restarts at every non-letter, so
//! "hello_world" becomes "Hello_World".

use std::sync::LazyLock;

use regex::Regex;

/// Maximum derived title length in characters.
const MAX_TITLE_LENGTH: usize = 50;

/// Fallback title when nothing usable remains after cleanup.
const FALLBACK_TITLE: &str = "Untitled Document";

static DISALLOWED_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // static pattern, cannot fail
    Regex::new(r"[^\w\s$%#&]").unwrap()
});

static WHITESPACE_RUNS: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)] // static pattern, cannot fail
    Regex::new(r"\s+").unwrap()
});

/// Derives a display title from a file name.
///
/// # Example
///
/// ```
/// use uploader_core::title_from_filename;
///
/// assert_eq!(title_from_filename("annual_report.pdf"), "Annual_Report");
/// assert_eq!(title_from_filename("???.pdf"), "Untitled Document");
/// ```
#[must_use]
pub fn title_from_filename(file_name: &str) -> String {
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _ext)) if !stem.is_empty() => stem,
        _ => file_name,
    };

    let cleaned = DISALLOWED_CHARS.replace_all(stem, "");
    let collapsed = WHITESPACE_RUNS.replace_all(&cleaned, " ");
    let title: String = title_case(collapsed.trim())
        .chars()
        .take(MAX_TITLE_LENGTH)
        .collect();

    if title.trim().is_empty() {
        FALLBACK_TITLE.to_string()
    } else {
        title
    }
}

/// Uppercases every letter that follows a non-letter (or starts the
/// string) and lowercases the rest; non-letters pass through unchanged.
fn title_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev_was_letter = false;
    for ch in text.chars() {
        if ch.is_alphabetic() {
            if prev_was_letter {
                out.extend(ch.to_lowercase());
            } else {
                out.extend(ch.to_uppercase());
            }
            prev_was_letter = true;
        } else {
            out.push(ch);
            prev_was_letter = false;
        }
    }
    out
}
