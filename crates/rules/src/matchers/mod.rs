//! Matcher strategies.
//!
//! A rule's pattern compiles, once, into one of three matcher variants:
//! - [`SegmentMatcher`]: path-like template with named `$segment` captures
//! - [`RegexMatcher`]: raw regular expression, positional or named groups
//! - [`PrefixMatcher`]: literal prefix plus a required query-key set
//!
//! All three answer the same two questions: does a URI match, and what
//! parameters does it carry. `params` is only valid on a matching URI;
//! anything else is an invariant violation.

mod prefix;
mod regexp;
mod segment;

pub use prefix::PrefixMatcher;
pub use regexp::RegexMatcher;
pub use segment::{PatternOptions, SegmentMatcher};

use indexmap::IndexMap;
use loadstone_core::error::EngineError;

/// Parameters extracted from a matching URI. Values are always strings,
/// even when they look numeric; callers convert as needed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Params {
    /// Keyed by segment/group name, in pattern order.
    Named(IndexMap<String, String>),
    /// Ordered capture groups of a regex without group names (group 0
    /// excluded).
    Positional(Vec<String>),
}

impl Params {
    pub fn empty() -> Self {
        Params::Named(IndexMap::new())
    }

    /// Look up a named parameter. Always `None` for positional params.
    pub fn get(&self, name: &str) -> Option<&str> {
        match self {
            Params::Named(map) => map.get(name).map(String::as_str),
            Params::Positional(_) => None,
        }
    }

    /// Positional lookup. Named params answer by insertion order.
    pub fn at(&self, index: usize) -> Option<&str> {
        match self {
            Params::Named(map) => map.get_index(index).map(|(_, v)| v.as_str()),
            Params::Positional(values) => values.get(index).map(String::as_str),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::Named(map) => map.len(),
            Params::Positional(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Closed set of matcher strategies, selected at rule construction.
#[derive(Debug, Clone)]
pub enum Matcher {
    Segment(SegmentMatcher),
    Regex(RegexMatcher),
    Prefix(PrefixMatcher),
}

impl Matcher {
    pub fn matches(&self, uri: &str) -> bool {
        match self {
            Matcher::Segment(m) => m.matches(uri),
            Matcher::Regex(m) => m.matches(uri),
            Matcher::Prefix(m) => m.matches(uri),
        }
    }

    /// Extract parameters. Errors with
    /// [`EngineError::PatternMismatch`] when the URI does not match.
    pub fn params(&self, uri: &str) -> Result<Params, EngineError> {
        match self {
            Matcher::Segment(m) => m.params(uri),
            Matcher::Regex(m) => m.params(uri),
            Matcher::Prefix(m) => m.params(uri),
        }
    }
}
