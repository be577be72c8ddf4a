//! URI specs and canonicalization.
//!
//! Every loadable resource is keyed by one canonical string URI. Callers may
//! address resources either with a bare string or with a structured spec
//! (resource name plus a parameter map); the structured form is rendered to
//! a canonical string with query parameters alphabetized by key so that the
//! same logical resource always produces the same cache key.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

/// One query parameter value in a structured [`UriSpec`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Param {
    /// Rendered as `key=value` with the value URL-encoded.
    Value(String),
    /// Rendered as a bare `key` with no `=`.
    Bare,
}

impl From<&str> for Param {
    fn from(v: &str) -> Self {
        Param::Value(v.to_string())
    }
}

impl From<String> for Param {
    fn from(v: String) -> Self {
        Param::Value(v)
    }
}

impl From<u64> for Param {
    fn from(v: u64) -> Self {
        Param::Value(v.to_string())
    }
}

impl From<i64> for Param {
    fn from(v: i64) -> Self {
        Param::Value(v.to_string())
    }
}

/// A URI-like value accepted by the engine's public operations.
///
/// `Uri` passes through unchanged; `Resource` is rendered via
/// [`canonical_uri`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum UriSpec {
    Uri(String),
    Resource {
        resource: String,
        params: BTreeMap<String, Param>,
    },
}

impl UriSpec {
    /// Start a structured spec with no parameters.
    pub fn resource(resource: impl Into<String>) -> Self {
        UriSpec::Resource {
            resource: resource.into(),
            params: BTreeMap::new(),
        }
    }

    /// Add one parameter (builder style).
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Param>) -> Self {
        if let UriSpec::Resource { params, .. } = &mut self {
            params.insert(key.into(), value.into());
        }
        self
    }

    /// Add a bare (valueless) parameter.
    pub fn bare_param(self, key: impl Into<String>) -> Self {
        self.param(key, Param::Bare)
    }
}

impl From<&str> for UriSpec {
    fn from(s: &str) -> Self {
        UriSpec::Uri(s.to_string())
    }
}

impl From<String> for UriSpec {
    fn from(s: String) -> Self {
        UriSpec::Uri(s)
    }
}

impl From<&String> for UriSpec {
    fn from(s: &String) -> Self {
        UriSpec::Uri(s.clone())
    }
}

impl fmt::Display for UriSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&canonical_uri(self))
    }
}

/// Render a spec to its canonical string URI.
///
/// Params are appended alphabetized by key (the map is ordered), values
/// URL-encoded, bare params as a key with no `=`.
pub fn canonical_uri(spec: &UriSpec) -> String {
    match spec {
        UriSpec::Uri(uri) => uri.clone(),
        UriSpec::Resource { resource, params } => {
            let mut uri = resource.clone();
            for (i, (key, param)) in params.iter().enumerate() {
                uri.push(if i == 0 { '?' } else { '&' });
                uri.push_str(key);
                if let Param::Value(v) = param {
                    uri.push('=');
                    uri.push_str(&urlencoding::encode(v));
                }
            }
            uri
        }
    }
}

/// A URI containing the literal text `undefined` or `null` almost always
/// means a parameter resolved to a missing value upstream. Non-fatal, but
/// worth surfacing through the error channel.
pub fn sketchy_uri(uri: &str) -> bool {
    uri.contains("undefined") || uri.contains("null")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_string_passes_through() {
        assert_eq!(canonical_uri(&UriSpec::from("/foo?parm=cheese")), "/foo?parm=cheese");
    }

    #[test]
    fn resource_without_params_is_just_the_resource() {
        assert_eq!(canonical_uri(&UriSpec::resource("/foo")), "/foo");
    }

    #[test]
    fn single_param() {
        let spec = UriSpec::resource("/foo").param("bar", "baz");
        assert_eq!(canonical_uri(&spec), "/foo?bar=baz");
    }

    #[test]
    fn params_are_alphabetized() {
        let spec = UriSpec::resource("/foo")
            .param("b", "2")
            .param("a", "1")
            .param("c", "3");
        assert_eq!(canonical_uri(&spec), "/foo?a=1&b=2&c=3");
    }

    #[test]
    fn bare_params_render_without_equals() {
        let spec = UriSpec::resource("/foo").bare_param("bar").bare_param("baz");
        assert_eq!(canonical_uri(&spec), "/foo?bar&baz");
    }

    #[test]
    fn values_are_url_encoded() {
        let spec = UriSpec::resource("asset").param("k", "a=b+c/d*2");
        let uri = canonical_uri(&spec);
        assert!(uri.starts_with("asset?k="));
        assert!(!uri[8..].contains('='));
        assert!(!uri[8..].contains('/'));
    }

    #[test]
    fn numeric_params_render_as_strings() {
        let spec = UriSpec::resource("asset").param("k", 8u64);
        assert_eq!(canonical_uri(&spec), "asset?k=8");
    }

    #[test]
    fn specs_serialize_for_diagnostics() {
        let spec = UriSpec::resource("/foo").param("a", "1").bare_param("b");
        let json = serde_json::to_string(&spec).unwrap();
        assert!(json.contains("/foo"));
        assert!(json.contains("Bare"));
    }

    #[test]
    fn sketchy_uris_are_flagged() {
        assert!(sketchy_uri("/posts?id=undefined"));
        assert!(sketchy_uri("/posts/null"));
        assert!(!sketchy_uri("/posts?id=42"));
    }
}
