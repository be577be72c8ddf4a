use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Structural failures raised synchronously by the engine.
///
/// These are configuration or addressing problems, distinct from
/// [`LoadError`] which carries a loader's own rejection.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No registered rule matches the requested URI. Fatal to that call.
    #[error("Unmatched URI \"{0}\"")]
    UnmatchedUri(String),

    /// A rule was asked for params of a URI its matcher does not match.
    /// Never expected in normal operation.
    #[error("possible bug: pattern found but does not match job URI {0}")]
    PatternMismatch(String),

    /// A rule pattern could not be compiled.
    #[error("invalid rule pattern: {0}")]
    InvalidPattern(String),
}

/// A loader rejection, recorded on the failed job and propagated to every
/// caller holding the shared future.
///
/// Wraps an [`anyhow::Error`] in an `Arc` so the same failure can be cloned
/// out of a shared future by any number of waiters.
#[derive(Clone)]
pub struct LoadError(Arc<anyhow::Error>);

impl LoadError {
    pub fn new(err: anyhow::Error) -> Self {
        Self(Arc::new(err))
    }

    /// Build from a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self(Arc::new(anyhow::anyhow!(message.into())))
    }

    /// The underlying error chain.
    pub fn inner(&self) -> &anyhow::Error {
        &self.0
    }
}

impl From<anyhow::Error> for LoadError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err)
    }
}

impl fmt::Display for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl fmt::Debug for LoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, f)
    }
}

impl std::error::Error for LoadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.0.source()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unmatched_uri_display_quotes_the_uri() {
        let err = EngineError::UnmatchedUri("dl:missing".to_string());
        assert_eq!(err.to_string(), "Unmatched URI \"dl:missing\"");
    }

    #[test]
    fn load_error_is_cloneable_and_displays_message() {
        let err = LoadError::msg("backend gone");
        let clone = err.clone();
        assert_eq!(err.to_string(), "backend gone");
        assert_eq!(clone.to_string(), "backend gone");
    }

    #[test]
    fn load_error_from_anyhow_keeps_context() {
        let err: LoadError = anyhow::anyhow!("root cause")
            .context("fetching widget")
            .into();
        assert_eq!(err.to_string(), "fetching widget");
    }
}
