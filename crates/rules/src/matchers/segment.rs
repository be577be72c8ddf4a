use indexmap::IndexMap;
use loadstone_core::error::EngineError;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::Params;

/// How `$segment` captures are spelled and what characters a segment value
/// may contain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternOptions {
    /// Character introducing a named segment.
    pub segment_sigil: char,
    /// Regex character class (without brackets) a segment value may match.
    pub segment_value_charset: String,
}

impl Default for PatternOptions {
    fn default() -> Self {
        Self {
            segment_sigil: '$',
            segment_value_charset: r"a-zA-Z0-9\-,_%~\.!\*\(\)".to_string(),
        }
    }
}

/// Named-segment string pattern, e.g. `dl:posts-$id/$section`.
///
/// Compiles to a whole-string anchored regex with one named capture per
/// segment. Everything outside a segment is matched literally.
#[derive(Debug, Clone)]
pub struct SegmentMatcher {
    template: String,
    regex: Regex,
    names: Vec<String>,
}

impl SegmentMatcher {
    pub fn compile(template: &str, opts: &PatternOptions) -> Result<Self, EngineError> {
        let mut pattern = String::from("^");
        let mut names = Vec::new();

        let mut chars = template.chars().peekable();
        while let Some(c) = chars.next() {
            if c == opts.segment_sigil {
                let mut name = String::new();
                while let Some(&next) = chars.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        chars.next();
                    } else {
                        break;
                    }
                }
                if name.is_empty() {
                    return Err(EngineError::InvalidPattern(format!(
                        "segment sigil '{}' not followed by a name in {:?}",
                        opts.segment_sigil, template
                    )));
                }
                pattern.push_str("(?P<");
                pattern.push_str(&name);
                pattern.push_str(">[");
                pattern.push_str(&opts.segment_value_charset);
                pattern.push_str("]+)");
                names.push(name);
            } else {
                pattern.push_str(&regex::escape(&c.to_string()));
            }
        }
        pattern.push('$');

        let regex = Regex::new(&pattern)
            .map_err(|e| EngineError::InvalidPattern(format!("{template:?}: {e}")))?;
        tracing::debug!(template, %regex, "compiled segment template");

        Ok(Self {
            template: template.to_string(),
            regex,
            names,
        })
    }

    pub fn matches(&self, uri: &str) -> bool {
        self.regex.is_match(uri)
    }

    pub fn params(&self, uri: &str) -> Result<Params, EngineError> {
        let caps = self
            .regex
            .captures(uri)
            .ok_or_else(|| EngineError::PatternMismatch(uri.to_string()))?;

        let mut map = IndexMap::with_capacity(self.names.len());
        for name in &self.names {
            // every segment is a required capture, so the group participates
            map.insert(name.clone(), caps[name.as_str()].to_string());
        }
        Ok(Params::Named(map))
    }

    pub fn template(&self) -> &str {
        &self.template
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(template: &str) -> SegmentMatcher {
        SegmentMatcher::compile(template, &PatternOptions::default()).unwrap()
    }

    #[test]
    fn matches_and_extracts_single_segment() {
        let m = compile("/foo/$key");
        assert!(m.matches("/foo/78"));
        assert_eq!(m.params("/foo/78").unwrap().get("key"), Some("78"));

        assert!(m.matches("/foo/bar"));
        assert_eq!(m.params("/foo/bar").unwrap().get("key"), Some("bar"));
    }

    #[test]
    fn is_anchored_at_both_ends() {
        let m = compile("/foo/$key");
        assert!(!m.matches("xyz/foo/78"));
        assert!(!m.matches("/foo/78/trailing"));
    }

    #[test]
    fn params_on_non_match_is_an_invariant_violation() {
        let m = compile("/foo/$key");
        let err = m.params("xyz/foo/78").unwrap_err();
        assert!(matches!(err, EngineError::PatternMismatch(_)));
    }

    #[test]
    fn multiple_segments_in_template_order() {
        let m = compile("/$a-$b-$c");
        let params = m.params("/foo-bar-baz").unwrap();
        assert_eq!(params.get("a"), Some("foo"));
        assert_eq!(params.get("b"), Some("bar"));
        assert_eq!(params.get("c"), Some("baz"));
        assert_eq!(params.at(0), Some("foo"));
    }

    #[test]
    fn custom_sigil_and_charset() {
        let opts = PatternOptions {
            segment_sigil: ':',
            segment_value_charset: r"\d".to_string(),
        };
        let m = SegmentMatcher::compile("/foo/:key", &opts).unwrap();

        assert!(m.matches("/foo/78"));
        assert_eq!(m.params("/foo/78").unwrap().get("key"), Some("78"));

        assert!(!m.matches("/foo/0x78"));
        assert!(!m.matches("/foo/x"));
    }

    #[test]
    fn dangling_sigil_is_rejected() {
        let err = SegmentMatcher::compile("/foo/$", &PatternOptions::default()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidPattern(_)));
    }

    #[test]
    fn literal_regex_metacharacters_are_escaped() {
        let m = compile("a+b/$x");
        assert!(m.matches("a+b/1"));
        assert!(!m.matches("aab/1"));
    }
}
