//! Route paths and prefix composition.
//!
//! A route path is either a literal string (`/users/:id`) or a compiled
//! regular expression. [`merge_paths`] composes a parent's path with a
//! child's to produce the path the child is registered under.

use std::fmt;

use regex::Regex;
use serde::{Serialize, Serializer};

use crate::error::{RouteError, RouteResult};

/// A literal path or a compiled pattern.
#[derive(Debug, Clone)]
pub enum PathSpec {
    /// A literal path, handed to the server as-is.
    Literal(String),
    /// A regular expression.
    Pattern(Regex),
}

impl PathSpec {
    /// Creates a literal path, trimming surrounding whitespace.
    #[must_use]
    pub fn literal(path: impl AsRef<str>) -> Self {
        Self::Literal(path.as_ref().trim().to_string())
    }

    /// Compiles a pattern path.
    ///
    /// The source is not trimmed.
    pub fn pattern(source: &str) -> RouteResult<Self> {
        compile(source).map(Self::Pattern)
    }

    /// Returns true for compiled patterns.
    #[must_use]
    pub fn is_pattern(&self) -> bool {
        matches!(self, Self::Pattern(_))
    }

    /// Returns the literal path or the pattern source.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Literal(path) => path,
            Self::Pattern(regex) => regex.as_str(),
        }
    }

    /// Returns the compiled pattern, if any.
    #[must_use]
    pub fn as_regex(&self) -> Option<&Regex> {
        match self {
            Self::Literal(_) => None,
            Self::Pattern(regex) => Some(regex),
        }
    }

    /// Returns true for an empty literal path.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Literal(path) if path.is_empty())
    }
}

impl Default for PathSpec {
    fn default() -> Self {
        Self::Literal(String::new())
    }
}

impl PartialEq for PathSpec {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Pattern(a), Self::Pattern(b)) => a.as_str() == b.as_str(),
            _ => false,
        }
    }
}

impl Eq for PathSpec {}

impl fmt::Display for PathSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Serializes as the literal path or the pattern source.
impl Serialize for PathSpec {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl From<&str> for PathSpec {
    fn from(path: &str) -> Self {
        Self::literal(path)
    }
}

impl From<String> for PathSpec {
    fn from(path: String) -> Self {
        Self::literal(path)
    }
}

impl From<Regex> for PathSpec {
    fn from(regex: Regex) -> Self {
        Self::Pattern(regex)
    }
}

/// Joins two literal paths with exactly one `/`.
///
/// Trailing slashes are stripped from `prefix` and leading slashes from
/// `current`. An empty prefix still yields a leading `/`.
///
/// ```rust
/// use trellis::merge_literal;
///
/// assert_eq!(merge_literal("/hello/", "/world"), "/hello/world");
/// assert_eq!(merge_literal("hello", "world"), "hello/world");
/// assert_eq!(merge_literal("", "world"), "/world");
/// ```
#[must_use]
pub fn merge_literal(prefix: &str, current: &str) -> String {
    let prefix = prefix.trim().trim_end_matches('/');
    let current = current.trim().trim_start_matches('/');
    format!("{prefix}/{current}")
}

/// Composes a parent path with a child path.
///
/// Two literals are joined with [`merge_literal`]. If either side is a
/// pattern, the literal side is promoted to a pattern source, the prefix's
/// end anchor and the child's start anchor are dropped, escaped slashes are
/// collapsed, and the joined source is compiled into a single pattern.
///
/// # Example
///
/// ```rust
/// use trellis::{merge_paths, PathSpec};
///
/// let prefix = PathSpec::pattern(r"^\/lets\/([a-z]+)\/$").unwrap();
/// let child = PathSpec::pattern(r"^\/this\/([a-z]+)$").unwrap();
///
/// let merged = merge_paths(&prefix, &child).unwrap();
/// let caps = merged.as_regex().unwrap().captures("/lets/test/this/out").unwrap();
/// assert_eq!(&caps[1], "test");
/// assert_eq!(&caps[2], "out");
/// ```
pub fn merge_paths(prefix: &PathSpec, current: &PathSpec) -> RouteResult<PathSpec> {
    if let (PathSpec::Literal(prefix), PathSpec::Literal(current)) = (prefix, current) {
        return Ok(PathSpec::Literal(merge_literal(prefix, current)));
    }

    let prefix = collapse_escaped_slashes(strip_end_anchor(prefix.as_str()));
    let current = collapse_escaped_slashes(strip_start_anchor(current.as_str()));

    compile(&merge_literal(&prefix, &current)).map(PathSpec::Pattern)
}

fn compile(source: &str) -> RouteResult<Regex> {
    Regex::new(source).map_err(|e| RouteError::invalid_config("path", e.to_string()))
}

fn strip_start_anchor(source: &str) -> &str {
    source.strip_prefix('^').unwrap_or(source)
}

fn strip_end_anchor(source: &str) -> &str {
    let Some(stripped) = source.strip_suffix('$') else {
        return source;
    };
    // `\$` is a literal dollar, not an anchor
    let escapes = stripped.chars().rev().take_while(|c| *c == '\\').count();
    if escapes % 2 == 1 {
        source
    } else {
        stripped
    }
}

/// Collapses each run of escaped slashes (`\/`) into one `/`.
///
/// Escape pairs are consumed together, so in `\\/` the backslash is the
/// escaped character and the slash is left alone.
fn collapse_escaped_slashes(source: &str) -> String {
    let mut collapsed = String::with_capacity(source.len());
    let mut chars = source.chars();
    let mut in_run = false;

    while let Some(c) = chars.next() {
        if c != '\\' {
            collapsed.push(c);
            in_run = false;
            continue;
        }
        match chars.next() {
            Some('/') => {
                if !in_run {
                    collapsed.push('/');
                }
                in_run = true;
            }
            Some(escaped) => {
                collapsed.push('\\');
                collapsed.push(escaped);
                in_run = false;
            }
            None => collapsed.push('\\'),
        }
    }
    collapsed
}
