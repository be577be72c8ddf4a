use indexmap::IndexMap;
use loadstone_core::error::EngineError;
use regex::Regex;

use super::Params;

/// Raw regular-expression matcher with search (unanchored) semantics.
///
/// With `group_names`, params come back as a mapping aligned positionally
/// to the capture groups; otherwise as the ordered sequence of captured
/// groups, group 0 excluded. Non-participating groups yield empty strings
/// so positions stay aligned.
#[derive(Debug, Clone)]
pub struct RegexMatcher {
    regex: Regex,
    group_names: Option<Vec<String>>,
}

impl RegexMatcher {
    pub fn new(regex: Regex, group_names: Option<Vec<String>>) -> Self {
        Self { regex, group_names }
    }

    pub fn matches(&self, uri: &str) -> bool {
        self.regex.is_match(uri)
    }

    pub fn params(&self, uri: &str) -> Result<Params, EngineError> {
        let caps = self
            .regex
            .captures(uri)
            .ok_or_else(|| EngineError::PatternMismatch(uri.to_string()))?;

        let group = |i: usize| {
            caps.get(i)
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        };

        match &self.group_names {
            Some(names) => {
                let mut map = IndexMap::with_capacity(names.len());
                for (i, name) in names.iter().enumerate() {
                    map.insert(name.clone(), group(i + 1));
                }
                Ok(Params::Named(map))
            }
            None => Ok(Params::Positional((1..caps.len()).map(group).collect())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_capture_groups() {
        let m = RegexMatcher::new(Regex::new(r"/foo(\d+)").unwrap(), None);
        assert!(m.matches("/foo78"));
        assert_eq!(m.params("/foo78").unwrap(), Params::Positional(vec!["78".into()]));
    }

    #[test]
    fn search_semantics_not_anchored() {
        let m = RegexMatcher::new(Regex::new(r"b..").unwrap(), None);
        assert!(m.matches("bar"));
        assert!(m.matches("xx-bar-xx"));
    }

    #[test]
    fn non_match_and_invariant_violation() {
        let m = RegexMatcher::new(Regex::new(r"/foo(\d+)").unwrap(), None);
        assert!(!m.matches("/food78"));
        assert!(matches!(
            m.params("/food78").unwrap_err(),
            EngineError::PatternMismatch(_)
        ));
    }

    #[test]
    fn multiple_positional_groups_in_order() {
        let m = RegexMatcher::new(Regex::new(r"(\w+)\s(\d+)").unwrap(), None);
        assert_eq!(
            m.params("foo 39").unwrap(),
            Params::Positional(vec!["foo".into(), "39".into()])
        );
    }

    #[test]
    fn group_names_produce_a_mapping() {
        let m = RegexMatcher::new(
            Regex::new(r"/foo(\d+)/(.*)").unwrap(),
            Some(vec!["i".into(), "z".into()]),
        );
        let params = m.params("/foo78/boo").unwrap();
        assert_eq!(params.get("i"), Some("78"));
        assert_eq!(params.get("z"), Some("boo"));
    }

    #[test]
    fn unparticipating_group_yields_empty_string() {
        let m = RegexMatcher::new(Regex::new(r"a(x)?(b)").unwrap(), None);
        assert_eq!(
            m.params("ab").unwrap(),
            Params::Positional(vec!["".into(), "b".into()])
        );
    }
}
