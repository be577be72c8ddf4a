//! Engine layer of loadstone.
//!
//! This crate provides:
//! - [`Job`]: per-URI lifecycle state machine with capped re-polling
//! - [`JobRegistry`]: URI → job cache with pattern-based bulk queries
//! - [`Engine`]: the public orchestrator (load/unload/status, dependency
//!   resolution, and the background FIFO queue with its poll loop)

pub mod engine;
pub mod job;
pub mod options;
pub mod registry;

pub use engine::Engine;
pub use job::{Job, JobSnapshot, JobState};
pub use options::{resolve_options, LoadOptions, ResolvedOptions};
pub use registry::{JobMatcher, JobRegistry};

pub use loadstone_core::config::EngineConfig;
pub use loadstone_core::error::{EngineError, LoadError};
pub use loadstone_core::load::{BoxLoad, SharedLoad};
pub use loadstone_core::log::{CaptureSink, LogSink, Logger, NoopSink, TracingSink};
pub use loadstone_core::uri::{canonical_uri, sketchy_uri, Param, UriSpec};
pub use loadstone_rules::{
    Dependency, JobStart, Params, PatternOptions, Rule, RuleOptions, RulePattern, RuleSet,
};
