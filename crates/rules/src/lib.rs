//! Rule layer of the loadstone engine.
//!
//! This crate provides:
//! - The three matcher strategies (named-segment templates, raw regexes,
//!   prefix-plus-required-query-params)
//! - [`Rule`]: pattern + loader + dependency/reload/unload configuration
//! - [`RuleSet`]: ordered lookup with soft-reported no-match/ambiguity

pub mod matchers;
pub mod rule;
pub mod rule_set;

pub use matchers::{Matcher, Params, PatternOptions, PrefixMatcher, RegexMatcher, SegmentMatcher};
pub use rule::{
    Dependency, JobStart, LoaderFn, OnLoadFn, Rule, RuleOptions, RulePattern, UnloadFn,
};
pub use rule_set::RuleSet;
