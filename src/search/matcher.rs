//! Pattern compilation on top of the ripgrep regex engine.
//!
//! Patterns are compiled once, before any file bytes are read, so an invalid
//! expression is rejected synchronously and never half-way through a stream.

use crate::error::{LineviewError, Result};
use grep_matcher::Matcher;
use grep_regex::{RegexMatcher, RegexMatcherBuilder};

/// How a search pattern is interpreted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchOptions {
    pub case_sensitive: bool,
    /// Treat the pattern as a regular expression instead of a literal
    pub regex_mode: bool,
    pub whole_word: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            case_sensitive: true,
            regex_mode: false,
            whole_word: false,
        }
    }
}

/// A compiled, reusable line matcher
#[derive(Debug, Clone)]
pub struct LineMatcher {
    matcher: RegexMatcher,
    pattern: String,
    options: SearchOptions,
}

impl LineMatcher {
    /// Compile `pattern` according to `options`
    ///
    /// Empty patterns are rejected; they would match every line.
    pub fn new(pattern: &str, options: &SearchOptions) -> Result<Self> {
        if pattern.is_empty() {
            return Err(LineviewError::pattern(pattern, "pattern is empty"));
        }

        let matcher = RegexMatcherBuilder::new()
            .fixed_strings(!options.regex_mode)
            .case_insensitive(!options.case_sensitive)
            .word(options.whole_word)
            .build(pattern)
            .map_err(|e| LineviewError::pattern(pattern, e.to_string()))?;

        Ok(Self {
            matcher,
            pattern: pattern.to_string(),
            options: options.clone(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn options(&self) -> &SearchOptions {
        &self.options
    }

    /// Whether the line (without terminator) contains a match
    pub fn is_match(&self, line: &[u8]) -> bool {
        self.matcher.is_match(line).unwrap_or(false)
    }

    /// Byte ranges of every non-empty match in `line`, for highlighting
    pub fn find_ranges(&self, line: &str) -> Vec<(usize, usize)> {
        let mut ranges = Vec::new();
        let _ = self.matcher.find_iter(line.as_bytes(), |m| {
            if m.start() < m.end() {
                ranges.push((m.start(), m.end()));
            }
            true
        });
        ranges
    }
}
