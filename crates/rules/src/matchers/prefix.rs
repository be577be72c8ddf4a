use indexmap::IndexMap;
use loadstone_core::error::EngineError;
use regex::Regex;

use super::Params;

/// Literal path prefix plus a set of required query keys.
///
/// Matches any URI starting with the prefix whose query string carries
/// every required key (`\bkey=` after the `?`, any order, extra keys
/// tolerated). With no required keys the bare prefix alone matches; this is
/// the permissive mode used for resources addressed by plain literal name.
///
/// `params` parses the full query string, not just the required keys,
/// URL-decoding values.
#[derive(Debug, Clone)]
pub struct PrefixMatcher {
    prefix: String,
    required: Vec<String>,
    key_patterns: Vec<Regex>,
}

impl PrefixMatcher {
    pub fn new(prefix: &str, required_params: &[String]) -> Result<Self, EngineError> {
        let mut required = required_params.to_vec();
        required.sort();

        let key_patterns = required
            .iter()
            .map(|key| {
                Regex::new(&format!(r"\b{}=", regex::escape(key)))
                    .map_err(|e| EngineError::InvalidPattern(format!("{key:?}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            prefix: prefix.to_string(),
            required,
            key_patterns,
        })
    }

    pub fn matches(&self, uri: &str) -> bool {
        let Some(rest) = uri.strip_prefix(self.prefix.as_str()) else {
            return false;
        };
        if self.required.is_empty() {
            return true;
        }
        if !rest.starts_with('?') {
            return false;
        }
        self.key_patterns.iter().all(|re| re.is_match(rest))
    }

    pub fn params(&self, uri: &str) -> Result<Params, EngineError> {
        if !self.matches(uri) {
            return Err(EngineError::PatternMismatch(uri.to_string()));
        }

        let mut map = IndexMap::new();
        if let Some((_, query)) = uri.split_once('?') {
            for pair in query.split('&').filter(|p| !p.is_empty()) {
                let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
                let decoded = urlencoding::decode(value)
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| value.to_string());
                map.insert(key.to_string(), decoded);
            }
        }
        Ok(Params::Named(map))
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

#[cfg(test)]
mod tests {
    use loadstone_core::uri::{canonical_uri, UriSpec};

    use super::*;

    fn strings(keys: &[&str]) -> Vec<String> {
        keys.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn required_params_must_all_be_present() {
        let m = PrefixMatcher::new("/asset", &strings(&["i", "z"])).unwrap();

        assert!(m.matches("/asset?i=foo&z=bar"));
        let params = m.params("/asset?i=foo&z=bar").unwrap();
        assert_eq!(params.get("i"), Some("foo"));
        assert_eq!(params.get("z"), Some("bar"));

        assert!(!m.matches("/asset?i=foo"));
        assert!(!m.matches("/asset"));
    }

    #[test]
    fn extra_params_are_tolerated_and_extracted() {
        let m = PrefixMatcher::new("/asset", &strings(&["i", "z"])).unwrap();

        assert!(m.matches("/asset?i=foo&k=baz&z=bar"));
        let params = m.params("/asset?i=foo&k=baz&z=bar").unwrap();
        assert_eq!(params.get("k"), Some("baz"));

        // required keys may appear in any position
        assert!(m.matches("/asset?a=z&i=foo&k=baz&z=bar"));
        let params = m.params("/asset?a=z&i=foo&k=baz&z=bar").unwrap();
        assert_eq!(params.len(), 4);
    }

    #[test]
    fn no_required_params_is_permissive() {
        let m = PrefixMatcher::new("/asset", &[]).unwrap();

        assert!(!m.matches("asset"));
        assert!(m.matches("/asset"));
        assert!(m.matches("/asset?i=foo"));

        assert!(m.params("/asset").unwrap().is_empty());
        assert!(m.params("/asset?").unwrap().is_empty());
        assert_eq!(m.params("/asset?i=foo").unwrap().get("i"), Some("foo"));
    }

    #[test]
    fn bare_key_maps_to_empty_string() {
        let m = PrefixMatcher::new("/asset", &[]).unwrap();
        let params = m.params("/asset?flag&x=1").unwrap();
        assert_eq!(params.get("flag"), Some(""));
        assert_eq!(params.get("x"), Some("1"));
    }

    #[test]
    fn params_on_non_match_is_an_invariant_violation() {
        let m = PrefixMatcher::new("/asset", &strings(&["i"])).unwrap();
        assert!(matches!(
            m.params("/other?i=1").unwrap_err(),
            EngineError::PatternMismatch(_)
        ));
    }

    #[test]
    fn canonical_uri_round_trips_through_params() {
        // URL-encode on the way in, decode on the way out, byte-identical.
        for value in ["8", "word", "two words", "questionable?", "ampersand a&p", "a=b+c/d*2"] {
            let m = PrefixMatcher::new("asset", &[]).unwrap();
            let uri = canonical_uri(&UriSpec::resource("asset").param("k", value));

            assert!(m.matches(&uri), "no match for {uri}");
            assert_eq!(m.params(&uri).unwrap().get("k"), Some(value), "bad round-trip for {uri}");
        }
    }
}
