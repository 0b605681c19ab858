//! Lookup key and placeholder name generation.

use regex::Regex;
use std::sync::LazyLock;

static NON_ALPHANUMERIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap());

/// Lower-cases `text` and joins its alphanumeric runs with single
/// underscores.
///
/// ```ignore
/// assert_eq!(slugify("Hello, World!"), "hello_world");
/// assert_eq!(slugify("current_user.name"), "current_user_name");
/// ```
pub fn slugify(text: &str) -> String {
    let lower = text.to_lowercase();
    NON_ALPHANUMERIC
        .replace_all(&lower, "_")
        .trim_matches('_')
        .to_string()
}

/// Builds the lookup key for a sentence: its slug cut to `max_len`
/// characters. The cut ignores word boundaries, so a key may end in a
/// partial word or an underscore.
pub fn generate_key(sentence: &str, max_len: usize) -> String {
    slugify(sentence).chars().take(max_len).collect()
}

/// Derives a usable keyword name for an interpolation argument.
///
/// Empty slugs become `link`, slugs starting with a digit get a `link_`
/// prefix so they stay valid Ruby keywords.
pub fn placeholder_name(text: &str) -> String {
    let slug = slugify(text);
    match slug.chars().next() {
        None => "link".to_string(),
        Some(c) if c.is_numeric() => format!("link_{}", slug),
        Some(_) => slug,
    }
}
