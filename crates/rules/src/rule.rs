//! Rule: a pattern bound to a loader, plus dependency/reload/unload
//! configuration. Immutable after construction; a rule is a factory shared
//! by reference into every job it spawns, never an owner of jobs.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use loadstone_core::error::{EngineError, LoadError};
use loadstone_core::load::{BoxLoad, SharedLoad};
use loadstone_core::uri::UriSpec;
use regex::Regex;

use crate::matchers::{Matcher, Params, PatternOptions, PrefixMatcher, RegexMatcher, SegmentMatcher};

/// Invokes the underlying fetch for one set of extracted params.
pub type LoaderFn<T> = Arc<dyn Fn(Params) -> BoxLoad<T> + Send + Sync>;

/// Derives a dependency URI from the requesting job's params.
pub type DependencyFn = Arc<dyn Fn(&Params) -> UriSpec + Send + Sync>;

/// Cleanup hook invoked with the job URI on unload.
pub type UnloadFn = Arc<dyn Fn(&str) + Send + Sync>;

/// Hook fired once a load is initiated (not once it completes), so
/// dispatch-on-start integrations can observe the in-flight future.
pub type OnLoadFn<T> = Arc<dyn Fn(&JobStart<T>) + Send + Sync>;

/// What an [`OnLoadFn`] observes: the job URI and the freshly started
/// shared computation.
#[derive(Clone)]
pub struct JobStart<T: Clone> {
    pub uri: String,
    pub future: SharedLoad<T>,
}

/// One declared dependency: a literal URI spec, or a function of the
/// requesting job's params.
#[derive(Clone)]
pub enum Dependency {
    Uri(UriSpec),
    Fn(DependencyFn),
}

impl Dependency {
    pub fn func(f: impl Fn(&Params) -> UriSpec + Send + Sync + 'static) -> Self {
        Dependency::Fn(Arc::new(f))
    }
}

impl From<UriSpec> for Dependency {
    fn from(spec: UriSpec) -> Self {
        Dependency::Uri(spec)
    }
}

impl From<&str> for Dependency {
    fn from(uri: &str) -> Self {
        Dependency::Uri(uri.into())
    }
}

impl From<String> for Dependency {
    fn from(uri: String) -> Self {
        Dependency::Uri(uri.into())
    }
}

/// What a rule can be registered against. The concrete matcher strategy is
/// chosen once, at construction, from the pattern shape and the options.
#[derive(Debug, Clone)]
pub enum RulePattern {
    /// Named-segment template, or a literal prefix when the options carry
    /// `required_params`.
    Template(String),
    /// Raw regular expression.
    Pattern(Regex),
    /// Explicit prefix-plus-required-query-params form.
    Resource {
        resource: String,
        required_params: Vec<String>,
    },
}

impl From<&str> for RulePattern {
    fn from(s: &str) -> Self {
        RulePattern::Template(s.to_string())
    }
}

impl From<String> for RulePattern {
    fn from(s: String) -> Self {
        RulePattern::Template(s)
    }
}

impl From<Regex> for RulePattern {
    fn from(re: Regex) -> Self {
        RulePattern::Pattern(re)
    }
}

/// Everything configurable on a rule. Cheap to clone; one options value can
/// be broadcast across several patterns.
pub struct RuleOptions<T: Clone> {
    pub loader: LoaderFn<T>,
    pub depends_on: Vec<Dependency>,
    pub reload_interval: Option<Duration>,
    pub reload_limit: Option<u32>,
    pub unload: Option<UnloadFn>,
    pub on_load: Option<OnLoadFn<T>>,
    /// Segment-matcher overrides (sigil, value charset).
    pub pattern_opts: Option<PatternOptions>,
    /// Names for regex capture groups; switches regex params from
    /// positional to named.
    pub group_names: Option<Vec<String>>,
    /// Presence switches a template pattern to the prefix matcher.
    pub required_params: Option<Vec<String>>,
}

impl<T: Clone> Clone for RuleOptions<T> {
    fn clone(&self) -> Self {
        Self {
            loader: Arc::clone(&self.loader),
            depends_on: self.depends_on.clone(),
            reload_interval: self.reload_interval,
            reload_limit: self.reload_limit,
            unload: self.unload.clone(),
            on_load: self.on_load.clone(),
            pattern_opts: self.pattern_opts.clone(),
            group_names: self.group_names.clone(),
            required_params: self.required_params.clone(),
        }
    }
}

impl<T: Clone> RuleOptions<T> {
    pub fn new<F, Fut>(loader: F) -> Self
    where
        F: Fn(Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, LoadError>> + Send + 'static,
    {
        Self {
            loader: Arc::new(move |params| loader(params).boxed()),
            depends_on: Vec::new(),
            reload_interval: None,
            reload_limit: None,
            unload: None,
            on_load: None,
            pattern_opts: None,
            group_names: None,
            required_params: None,
        }
    }

    pub fn depends_on(mut self, dep: impl Into<Dependency>) -> Self {
        self.depends_on.push(dep.into());
        self
    }

    pub fn depends_on_fn(mut self, f: impl Fn(&Params) -> UriSpec + Send + Sync + 'static) -> Self {
        self.depends_on.push(Dependency::func(f));
        self
    }

    pub fn reload_interval(mut self, interval: Duration) -> Self {
        self.reload_interval = Some(interval);
        self
    }

    pub fn reload_limit(mut self, limit: u32) -> Self {
        self.reload_limit = Some(limit);
        self
    }

    pub fn on_unload(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.unload = Some(Arc::new(f));
        self
    }

    pub fn on_load(mut self, f: impl Fn(&JobStart<T>) + Send + Sync + 'static) -> Self {
        self.on_load = Some(Arc::new(f));
        self
    }

    pub fn pattern_opts(mut self, opts: PatternOptions) -> Self {
        self.pattern_opts = Some(opts);
        self
    }

    pub fn group_names(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.group_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn required_params(mut self, keys: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.required_params = Some(keys.into_iter().map(Into::into).collect());
        self
    }
}

/// A registered rule: matcher + options.
pub struct Rule<T: Clone> {
    matcher: Matcher,
    options: RuleOptions<T>,
}

impl<T: Clone> Rule<T> {
    /// Build a rule, selecting the matcher strategy from the pattern shape:
    /// template + `required_params` → prefix matcher; template → segment
    /// matcher; regex → regex matcher; explicit resource form → prefix.
    pub fn new(pattern: impl Into<RulePattern>, options: RuleOptions<T>) -> Result<Self, EngineError> {
        let matcher = match pattern.into() {
            RulePattern::Template(template) => match &options.required_params {
                Some(required) => Matcher::Prefix(PrefixMatcher::new(&template, required)?),
                None => {
                    let opts = options.pattern_opts.clone().unwrap_or_default();
                    Matcher::Segment(SegmentMatcher::compile(&template, &opts)?)
                }
            },
            RulePattern::Pattern(regex) => {
                Matcher::Regex(RegexMatcher::new(regex, options.group_names.clone()))
            }
            RulePattern::Resource {
                resource,
                required_params,
            } => Matcher::Prefix(PrefixMatcher::new(&resource, &required_params)?),
        };

        Ok(Self { matcher, options })
    }

    pub fn matches(&self, uri: &str) -> bool {
        self.matcher.matches(uri)
    }

    pub fn params(&self, uri: &str) -> Result<Params, EngineError> {
        self.matcher.params(uri)
    }

    /// Normalize `depends_on` to concrete URI specs for one set of params.
    /// Function entries are invoked with the params; literals pass through.
    pub fn dependencies_as_uris(&self, params: &Params) -> Vec<UriSpec> {
        self.options
            .depends_on
            .iter()
            .map(|dep| match dep {
                Dependency::Uri(spec) => spec.clone(),
                Dependency::Fn(f) => f(params),
            })
            .collect()
    }

    /// Invoke the configured loader. "Raw" because dependencies are not
    /// factored in; the engine composes them around this.
    pub fn raw_loader_future(&self, params: Params) -> BoxLoad<T> {
        (self.options.loader)(params)
    }

    pub fn reload_interval(&self) -> Option<Duration> {
        self.options.reload_interval
    }

    pub fn reload_limit(&self) -> Option<u32> {
        self.options.reload_limit
    }

    pub fn unload_hook(&self) -> Option<&UnloadFn> {
        self.options.unload.as_ref()
    }

    pub fn on_load_hook(&self) -> Option<&OnLoadFn<T>> {
        self.options.on_load.as_ref()
    }
}
