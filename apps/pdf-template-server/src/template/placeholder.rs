//! Placeholder scanning
//!
//! A placeholder is the shortest run of characters between a literal `{{`
//! and the next literal `}}`. Names are captured verbatim: no trimming and
//! no character-set validation. Nesting is not supported, so `{{{{x}}}}`
//! yields the name `{{x`.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Shortest-match placeholder pattern. Names never span a line break:
/// `\n`, `\r`, U+2028 or U+2029.
static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([^\n\r\x{2028}\x{2029}]*?)\}\}").expect("placeholder pattern is valid")
});

/// Scan text for placeholder names.
///
/// Returns each distinct name once, in order of first appearance.
pub fn scan(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for caps in PLACEHOLDER_RE.captures_iter(text) {
        let name = caps.get(1).map_or("", |m| m.as_str());
        if seen.insert(name) {
            names.push(name.to_string());
        }
    }

    names
}
