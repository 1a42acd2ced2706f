// src/dag/slug.rs

use std::sync::LazyLock;

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

static STRIP_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[^\w\s-]").unwrap());
static HYPHENATE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[-\s]+").unwrap());

/// Derive a URL-safe slug from a display name.
///
/// The name is decomposed (NFKD) so accented letters keep their ASCII base;
/// whatever is still non-ASCII is dropped. Anything that is not a word
/// character, whitespace or hyphen is stripped, the result is lowercased and
/// runs of whitespace/hyphens collapse into a single `-`.
///
/// ```
/// use clusterdag::dag::slugify;
/// assert_eq!(slugify("This -- is a ## test ---"), "this-is-a-test");
/// assert_eq!(slugify("Café Prüfung"), "cafe-prufung");
/// ```
pub fn slugify(value: &str) -> String {
    let ascii: String = value.nfkd().filter(char::is_ascii).collect();
    let stripped = STRIP_RE.replace_all(&ascii, "");
    let lowered = stripped.trim().to_lowercase();
    HYPHENATE_RE
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string()
}
