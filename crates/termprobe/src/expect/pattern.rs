//! Pattern types for expect operations.
//!
//! Patterns match against raw output bytes, so offsets stay exact even when
//! a read splits a multi-byte character.

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use regex::bytes::Regex;

/// A pattern that can be matched against terminal output.
#[derive(Clone)]
pub enum Pattern {
    /// Match an exact string.
    Literal(String),

    /// Match a regular expression.
    Regex(CompiledRegex),
}

impl Pattern {
    /// Create a literal pattern.
    #[must_use]
    pub fn literal(s: impl Into<String>) -> Self {
        Self::Literal(s.into())
    }

    /// Create a regex pattern.
    ///
    /// # Errors
    ///
    /// Returns an error if the regex pattern is invalid.
    pub fn regex(pattern: &str) -> Result<Self, regex::Error> {
        let regex = Regex::new(pattern)?;
        Ok(Self::Regex(CompiledRegex::new(pattern.to_string(), regex)))
    }

    /// Get the pattern source for display purposes.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(s) => s,
            Self::Regex(r) => r.pattern(),
        }
    }

    /// Check if this is a literal pattern.
    #[must_use]
    pub const fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    /// Number of capture groups, not counting the whole match.
    #[must_use]
    pub fn group_count(&self) -> usize {
        match self {
            Self::Literal(_) => 0,
            Self::Regex(r) => r.group_count(),
        }
    }

    /// Find the first match in `haystack` that starts at or after `from`.
    #[must_use]
    pub fn find_at(&self, haystack: &[u8], from: usize) -> Option<PatternMatch> {
        match self {
            Self::Literal(needle) => find_literal(haystack, needle.as_bytes(), from).map(|start| {
                PatternMatch {
                    start,
                    end: start + needle.len(),
                    groups: Vec::new(),
                }
            }),
            Self::Regex(r) => r.regex.captures_at(haystack, from).map(|caps| {
                let whole = caps.get(0).map_or(from..from, |m| m.range());
                PatternMatch {
                    start: whole.start,
                    end: whole.end,
                    groups: caps.iter().skip(1).map(|g| g.map(|m| m.range())).collect(),
                }
            }),
        }
    }

    /// Check if this pattern matches the given text.
    #[must_use]
    pub fn matches(&self, text: &str) -> Option<PatternMatch> {
        self.find_at(text.as_bytes(), 0)
    }

    /// Earliest offset a new search may start from, given that a previous
    /// search found nothing in the first `scanned` bytes.
    ///
    /// Regexes may match across old and new data in ways a prefix scan cannot
    /// rule out, so they always rescan.
    #[must_use]
    pub fn resume_offset(&self, scanned: usize) -> usize {
        match self {
            Self::Literal(needle) => scanned.saturating_sub(needle.len().saturating_sub(1)),
            Self::Regex(_) => 0,
        }
    }
}

fn find_literal(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() {
        return (from <= haystack.len()).then_some(from);
    }
    haystack
        .get(from..)?
        .windows(needle.len())
        .position(|window| window == needle)
        .map(|pos| pos + from)
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "Literal({s:?})"),
            Self::Regex(r) => write!(f, "Regex({:?})", r.pattern()),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal(s) => write!(f, "{s:?}"),
            Self::Regex(r) => write!(f, "/{}/", r.pattern()),
        }
    }
}

impl From<&str> for Pattern {
    fn from(s: &str) -> Self {
        Self::literal(s)
    }
}

impl From<String> for Pattern {
    fn from(s: String) -> Self {
        Self::literal(s)
    }
}

/// A compiled byte regex with its source pattern.
#[derive(Clone)]
pub struct CompiledRegex {
    pattern: String,
    regex: Regex,
}

impl CompiledRegex {
    /// Create a new compiled regex.
    #[must_use]
    pub const fn new(pattern: String, regex: Regex) -> Self {
        Self { pattern, regex }
    }

    /// Get the source pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Get the compiled regex.
    #[must_use]
    pub const fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Number of capture groups, not counting the whole match.
    #[must_use]
    pub fn group_count(&self) -> usize {
        self.regex.captures_len().saturating_sub(1)
    }
}

/// Location of a successful pattern match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternMatch {
    /// Start offset of the match.
    pub start: usize,
    /// End offset of the match (exclusive).
    pub end: usize,
    /// Capture group ranges, group 1 first. `None` for groups that did not participate.
    pub groups: Vec<Option<Range<usize>>>,
}

impl PatternMatch {
    /// Get the matched text from the original input.
    #[must_use]
    pub fn as_str<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end]
    }

    /// Capture texts from `haystack`, non-participating groups as empty strings.
    #[must_use]
    pub fn capture_texts(&self, haystack: &[u8]) -> Vec<String> {
        self.groups
            .iter()
            .map(|g| {
                g.as_ref()
                    .map(|r| String::from_utf8_lossy(&haystack[r.clone()]).into_owned())
                    .unwrap_or_default()
            })
            .collect()
    }

    /// Get the length of the match.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    /// Check if the match is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// An ordered set of patterns for one expect call.
///
/// Every set carries an id that changes whenever its contents change; the
/// pattern buffer keys its resume position on it.
#[derive(Debug, Clone)]
pub struct PatternSet {
    id: u64,
    patterns: Vec<NamedPattern>,
}

/// A pattern with an optional name and its position in the set.
#[derive(Debug, Clone)]
pub struct NamedPattern {
    /// The pattern.
    pub pattern: Pattern,
    /// Optional name for the pattern.
    pub name: Option<String>,
    /// Index in the pattern set.
    pub index: usize,
}

fn next_set_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

impl Default for PatternSet {
    fn default() -> Self {
        Self {
            id: next_set_id(),
            patterns: Vec::new(),
        }
    }
}

impl PatternSet {
    /// Create a new empty pattern set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pattern set from patterns, indexed in order.
    #[must_use]
    pub fn from_patterns(patterns: impl IntoIterator<Item = Pattern>) -> Self {
        let mut set = Self::new();
        for pattern in patterns {
            set.add(pattern);
        }
        set
    }

    /// Compile every string as a regex.
    ///
    /// # Errors
    ///
    /// Returns the first regex compilation error.
    pub fn regexes<I, S>(patterns: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        patterns
            .into_iter()
            .map(|p| Pattern::regex(p.as_ref()))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::from_patterns)
    }

    /// Add a pattern to the set.
    pub fn add(&mut self, pattern: Pattern) -> &mut Self {
        self.push(pattern, None)
    }

    /// Add a named pattern to the set.
    pub fn add_named(&mut self, name: impl Into<String>, pattern: Pattern) -> &mut Self {
        self.push(pattern, Some(name.into()))
    }

    fn push(&mut self, pattern: Pattern, name: Option<String>) -> &mut Self {
        let index = self.patterns.len();
        self.patterns.push(NamedPattern {
            pattern,
            name,
            index,
        });
        self.id = next_set_id();
        self
    }

    /// Identity of this set's current contents.
    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    /// Get the number of patterns in the set.
    #[must_use]
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    /// Check if the set is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Find the earliest-starting match among all patterns.
    ///
    /// When several patterns match at the same offset, the one listed first
    /// wins. Returns the pattern index and match details.
    #[must_use]
    pub fn find_match(&self, haystack: &[u8]) -> Option<(usize, PatternMatch)> {
        self.find_match_resuming(haystack, 0)
    }

    /// Like [`PatternSet::find_match`], skipping what a previous search of
    /// the first `scanned` bytes already ruled out.
    #[must_use]
    pub fn find_match_resuming(
        &self,
        haystack: &[u8],
        scanned: usize,
    ) -> Option<(usize, PatternMatch)> {
        let mut best: Option<(usize, PatternMatch)> = None;

        for (idx, named) in self.patterns.iter().enumerate() {
            let from = named.pattern.resume_offset(scanned).min(haystack.len());
            if let Some(m) = named.pattern.find_at(haystack, from) {
                match &best {
                    Some((_, current)) if m.start >= current.start => {}
                    _ => best = Some((idx, m)),
                }
            }
        }

        best
    }

    /// Get a pattern by index.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&NamedPattern> {
        self.patterns.get(index)
    }

    /// Pattern sources for diagnostics, with names where given.
    #[must_use]
    pub fn describe(&self) -> Vec<String> {
        self.patterns
            .iter()
            .map(|p| match &p.name {
                Some(name) => format!("{name}: {}", p.pattern),
                None => p.pattern.to_string(),
            })
            .collect()
    }

    /// Get iterator over patterns.
    pub fn iter(&self) -> impl Iterator<Item = &NamedPattern> {
        self.patterns.iter()
    }
}

impl From<Pattern> for PatternSet {
    fn from(pattern: Pattern) -> Self {
        Self::from_patterns([pattern])
    }
}

impl From<Vec<Pattern>> for PatternSet {
    fn from(patterns: Vec<Pattern>) -> Self {
        Self::from_patterns(patterns)
    }
}

impl From<&str> for PatternSet {
    fn from(literal: &str) -> Self {
        Self::from_patterns([Pattern::literal(literal)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_pattern_matches() {
        let pattern = Pattern::literal("hello");
        let m = pattern.matches("say hello world").expect("match");
        assert_eq!((m.start, m.end), (4, 9));
        assert!(m.groups.is_empty());
    }

    #[test]
    fn literal_is_not_a_regex() {
        let pattern = Pattern::literal("*.c");
        assert!(pattern.matches("ls *.c").is_some());
        assert!(pattern.matches("ls a.c").is_none());
    }

    #[test]
    fn regex_pattern_captures_are_positional() {
        let pattern = Pattern::regex(r"(\w+)@(\w+)?(x)?").expect("regex");
        let text = "email: user@ here";
        let m = pattern.matches(text).expect("match");
        assert_eq!(m.as_str(text), "user@");
        assert_eq!(m.capture_texts(text.as_bytes()), vec!["user", "", ""]);
        assert_eq!(pattern.group_count(), 3);
    }

    #[test]
    fn pattern_set_earliest_start_wins() {
        let mut set = PatternSet::new();
        set.add(Pattern::literal("world")).add(Pattern::literal("hello"));

        let (idx, _) = set.find_match(b"hello world").expect("match");
        assert_eq!(idx, 1);
    }

    #[test]
    fn pattern_set_tie_goes_to_first_listed() {
        let set = PatternSet::regexes([r"(\S+\.c)", r"(\S+\.h)", r"a"]).expect("regexes");

        let text = b"a.c b.h";
        let (idx, m) = set.find_match(text).expect("match");
        assert_eq!(idx, 0);
        assert_eq!(m.capture_texts(text), vec!["a.c"]);
    }

    #[test]
    fn resume_offset_backs_up_by_needle_length() {
        let literal = Pattern::literal("abcd");
        assert_eq!(literal.resume_offset(10), 7);
        assert_eq!(literal.resume_offset(2), 0);
        assert_eq!(Pattern::regex("x").expect("regex").resume_offset(10), 0);
    }

    #[test]
    fn adding_changes_set_id() {
        let mut set = PatternSet::new();
        let before = set.id();
        set.add(Pattern::literal("x"));
        assert_ne!(before, set.id());
        assert_eq!(set.clone().id(), set.id());
    }

    #[test]
    fn describe_includes_names() {
        let mut set = PatternSet::new();
        set.add_named("prompt", Pattern::literal("$ "));
        set.add(Pattern::regex(r"\d+").expect("regex"));
        assert_eq!(set.describe(), vec![r#"prompt: "$ ""#, r"/\d+/"]);
    }
}
