//! Line-anchored directive scanning.
//!
//! This is a textual heuristic, not a preprocessor. It lives behind
//! [`DirectiveScanner`] so a real lexer can replace it without touching
//! staleness or orchestration.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static QUOTED_INCLUDE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^[ \t]*#[ \t]*include[ \t]*"([^"]+)"[ \t]*$"#).unwrap()
});

static ENTRY_POINT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[ \t]*(?:void|int)[ \t]+main[ \t]*\(").unwrap());

/// Extracts the directives the build engine cares about from source text.
pub trait DirectiveScanner: Sync {
    /// Quoted include targets, deduplicated, in lexicographic order.
    fn quoted_includes(&self, text: &str) -> BTreeSet<String>;

    /// Whether some line starts a `main` definition.
    fn defines_entry_point(&self, text: &str) -> bool;
}

/// Regex-per-line scanner.
///
/// Angle-bracket includes are ignored. A `main` inside a comment or string
/// literal is still reported when it sits at the start of a line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TextualScanner;

impl DirectiveScanner for TextualScanner {
    fn quoted_includes(&self, text: &str) -> BTreeSet<String> {
        text.lines()
            .filter_map(|line| QUOTED_INCLUDE.captures(line.trim_end()))
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .collect()
    }

    fn defines_entry_point(&self, text: &str) -> bool {
        text.lines()
            .any(|line| ENTRY_POINT.is_match(line.trim_end()))
    }
}
