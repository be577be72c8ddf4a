//! Future aliases for pending loads.

use futures::future::{BoxFuture, Shared};

use crate::error::LoadError;

/// One load attempt: the boxed future a loader produces.
pub type BoxLoad<T> = BoxFuture<'static, Result<T, LoadError>>;

/// The cloneable handle every requester of the same URI shares. Awaiting a
/// clone never re-runs the underlying work.
pub type SharedLoad<T> = Shared<BoxLoad<T>>;
