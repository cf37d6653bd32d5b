//! Compiled template cache.
//!
//! A [`TemplateSet`] compiles templates lazily, the first time each name is
//! rendered. Every requested template gets its own [`Tera`] instance holding
//! that template plus the files it pulls in through a literal
//! `{% extends %}`, `{% import %}` or `{% include %}`. Templates that share no
//! files never affect each other: a syntax error in one file only fails the
//! templates that use it.
//!
//! In debug mode a render first compares the fingerprints of the requested
//! template's files against the disk and recompiles that template when any of
//! them changed, or when an `ignore missing` include has since appeared. A
//! failed recompile leaves the previous compile in place. Without debug mode a
//! cached template is never re-read.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::io::Write;
use std::sync::{Arc, LazyLock, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use regex::Regex;
use tera::{Context, Filter, Tera};

use crate::error::{RenderError, Result, extract_line_from_tera_error, format_tera_error};
use crate::filters::FilterRegistry;
use crate::loader::{Fingerprint, TemplateLoader, TemplateSource};

static TEMPLATE_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{%-?\s*(extends|import|include)\s+["']([^"']+)["']"#)
        .expect("template reference pattern is valid")
});

/// Top-level message Tera gives a template that failed to parse.
static PARSE_FAILURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Failed to parse '(.+)'$").expect("parse failure pattern is valid")
});

#[derive(Debug, Clone)]
struct CachedTemplate {
    source: String,
    fingerprint: Fingerprint,
}

impl From<TemplateSource> for CachedTemplate {
    fn from(source: TemplateSource) -> Self {
        Self {
            source: source.content,
            fingerprint: source.fingerprint,
        }
    }
}

/// One requested template, compiled together with the files it references.
struct CompiledTemplate {
    tera: Arc<Tera>,
    sources: BTreeMap<String, CachedTemplate>,
    /// `ignore missing` includes that did not exist at compile time
    absent: BTreeSet<String>,
}

struct SetState {
    compiled: BTreeMap<String, CompiledTemplate>,
    filters: FilterRegistry,
}

/// Named, lazily-compiled set of templates from one directory.
///
/// The set is shared by every render of a [`Renderer`](crate::Renderer) and
/// is safe to use from many threads. Lookups take a read lock; compiling takes
/// the write lock, and rendering runs on a shared handle to the compiled
/// template after the lock is released.
///
/// # Examples
///
/// ```rust,no_run
/// use tera::Context;
/// use tera_renderer::cache::TemplateSet;
/// use tera_renderer::filters::FilterRegistry;
/// use tera_renderer::loader::TemplateLoader;
///
/// # fn example() -> tera_renderer::Result<()> {
/// let loader = TemplateLoader::new("templates")?;
/// let set = TemplateSet::new("site", loader, FilterRegistry::with_defaults());
///
/// let mut out = Vec::new();
/// // Compiled on first use, reused afterwards
/// set.render_cached("index.html", false, &Context::new(), &mut out)?;
/// // `debug = true` recompiles when index.html or its parents changed on disk
/// set.render_cached("index.html", true, &Context::new(), &mut out)?;
/// assert!(set.cached_names().contains(&"index.html".to_string()));
/// # Ok(())
/// # }
/// ```
pub struct TemplateSet {
    name: String,
    loader: TemplateLoader,
    state: RwLock<SetState>,
}

impl std::fmt::Debug for TemplateSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplateSet")
            .field("name", &self.name)
            .field("base_dir", &self.loader.base_dir())
            .field("cached", &self.cached_names())
            .finish()
    }
}

impl TemplateSet {
    /// Create an empty set reading through `loader`.
    ///
    /// `name` only appears in log output. Every template compiled by the set
    /// gets the filters in `filters`.
    pub fn new(name: impl Into<String>, loader: TemplateLoader, filters: FilterRegistry) -> Self {
        Self {
            name: name.into(),
            loader,
            state: RwLock::new(SetState {
                compiled: BTreeMap::new(),
                filters,
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, SetState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, SetState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a filter for this set, replacing one with the same name.
    ///
    /// Already-cached templates are rebuilt from their cached sources with the
    /// new filter installed, so they see it on their next render without
    /// re-reading anything from disk.
    ///
    /// Returns `true` when a filter with that name was replaced.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidFilterName`] if `name` is not a template identifier.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use std::collections::HashMap;
    /// use tera::Value;
    /// # use tera_renderer::cache::TemplateSet;
    ///
    /// # fn example(set: &TemplateSet) -> tera_renderer::Result<()> {
    /// let replaced = set.register_filter("shout", |v: &Value, _: &HashMap<String, Value>| {
    ///     Ok::<_, tera::Error>(Value::String(v.as_str().unwrap_or_default().to_uppercase()))
    /// })?;
    /// assert!(!replaced);
    /// assert!(set.has_filter("shout"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn register_filter<F: Filter + 'static>(&self, name: &str, filter: F) -> Result<bool> {
        let mut state = self.write();
        let replaced = state.filters.register(name, filter)?;

        let SetState {
            compiled,
            filters,
        } = &mut *state;
        for (template, entry) in compiled.iter_mut() {
            entry.tera = Arc::new(build_tera(&entry.sources, filters, template)?);
        }

        tracing::debug!(set = %self.name, filter = name, replaced, "Registered template filter");
        Ok(replaced)
    }

    /// Whether a filter is registered under `name`.
    pub fn has_filter(&self, name: &str) -> bool {
        self.read().filters.contains(name)
    }

    /// Every template file currently compiled into the cache, including
    /// parents and includes pulled in by the requested templates, sorted.
    pub fn cached_names(&self) -> Vec<String> {
        let state = self.read();
        let names: BTreeSet<&String> =
            state.compiled.values().flat_map(|entry| entry.sources.keys()).collect();
        names.into_iter().cloned().collect()
    }

    /// Drop every cached template. Filters are kept.
    pub fn clear(&self) {
        self.write().compiled.clear();
        tracing::debug!(set = %self.name, "Cleared template cache");
    }

    fn is_stale(&self, entry: &CompiledTemplate) -> bool {
        entry
            .sources
            .iter()
            .any(|(name, cached)| self.loader.fingerprint(name) != Some(cached.fingerprint))
            || entry.absent.iter().any(|name| self.loader.fingerprint(name).is_some())
    }

    /// The compiled template for `name`, compiling or (in debug mode)
    /// recompiling it as needed.
    fn compiled(&self, name: &str, debug: bool) -> Result<Arc<Tera>> {
        {
            let state = self.read();
            if let Some(entry) = state.compiled.get(name) {
                if !debug || !self.is_stale(entry) {
                    tracing::trace!(set = %self.name, template = name, "Template cache hit");
                    return Ok(Arc::clone(&entry.tera));
                }
            }
        }

        let mut state = self.write();

        // Another render may have compiled it while we waited for the lock.
        match state.compiled.get(name) {
            Some(entry) if !debug || !self.is_stale(entry) => return Ok(Arc::clone(&entry.tera)),
            Some(_) => {
                tracing::debug!(set = %self.name, template = name, "Template changed on disk, recompiling");
            }
            None => {
                tracing::debug!(set = %self.name, template = name, "Template cache miss, compiling");
            }
        }

        let entry = self.compile(name, &state.filters)?;
        let tera = Arc::clone(&entry.tera);
        state.compiled.insert(name.to_string(), entry);
        Ok(tera)
    }

    /// Read `name` and everything it references from disk and compile them.
    fn compile(&self, name: &str, filters: &FilterRegistry) -> Result<CompiledTemplate> {
        let mut sources = BTreeMap::new();
        sources.insert(name.to_string(), CachedTemplate::from(self.loader.load(name)?));
        let absent = load_references(&self.loader, &mut sources)?;

        let tera = build_tera(&sources, filters, name)?;
        Ok(CompiledTemplate {
            tera: Arc::new(tera),
            sources,
            absent,
        })
    }

    /// Render a cached template into `out`, compiling it first if needed.
    ///
    /// With `debug` set, the template is recompiled when it or any file it
    /// references changed on disk since it was compiled.
    ///
    /// # Errors
    ///
    /// - [`RenderError::TemplateNotFound`] / [`RenderError::InvalidTemplateName`]
    ///   for the template or a required parent
    /// - [`RenderError::CompileError`] naming the file that failed to parse
    /// - [`RenderError::ExecutionError`] if Tera fails while rendering
    pub fn render_cached(
        &self,
        name: &str,
        debug: bool,
        context: &Context,
        out: &mut dyn Write,
    ) -> Result<()> {
        let tera = self.compiled(name, debug)?;
        tera.render_to(name, context, out).map_err(|e| execution_error(name, e))
    }

    /// Compile `name` straight from disk, bypassing the cache, and render it into `out`.
    ///
    /// Nothing is added to the cache.
    pub fn render_from_file(&self, name: &str, context: &Context, out: &mut dyn Write) -> Result<()> {
        let filters = self.read().filters.clone();
        let entry = self.compile(name, &filters)?;
        tracing::debug!(set = %self.name, template = name, "Compiled template from file");

        entry.tera.render_to(name, context, out).map_err(|e| execution_error(name, e))
    }
}

/// Literal template names referenced by `source`, with whether the reference is required.
fn template_references(source: &str) -> Vec<(String, bool)> {
    TEMPLATE_REFERENCE
        .captures_iter(source)
        .map(|caps| (caps[2].to_string(), &caps[1] != "include"))
        .collect()
}

/// Pull in every template reachable through literal references.
///
/// Missing `extends`/`import` targets are errors. Missing `include` targets are
/// skipped so `ignore missing` keeps working, and returned so a later debug
/// check can notice them appearing.
fn load_references(
    loader: &TemplateLoader,
    sources: &mut BTreeMap<String, CachedTemplate>,
) -> Result<BTreeSet<String>> {
    let mut queue: VecDeque<(String, bool)> =
        sources.values().flat_map(|cached| template_references(&cached.source)).collect();
    let mut absent = BTreeSet::new();

    while let Some((name, required)) = queue.pop_front() {
        if sources.contains_key(&name) || absent.contains(&name) {
            continue;
        }
        match loader.load(&name) {
            Ok(source) => {
                queue.extend(template_references(&source.content));
                sources.insert(name, source.into());
            }
            Err(RenderError::TemplateNotFound {
                ..
            }) if !required => {
                tracing::debug!(template = %name, "Included template not found, leaving it to Tera");
                absent.insert(name);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(absent)
}

fn build_tera(
    sources: &BTreeMap<String, CachedTemplate>,
    filters: &FilterRegistry,
    requested: &str,
) -> Result<Tera> {
    let mut tera = Tera::default();
    filters.install(&mut tera);

    tera.add_raw_templates(sources.iter().map(|(name, cached)| (name.as_str(), cached.source.as_str())))
        .map_err(|e| {
            let name = failed_template(&e).unwrap_or_else(|| requested.to_string());
            if name != requested {
                tracing::debug!(template = requested, failed = %name, "Referenced template failed to compile");
            }
            RenderError::CompileError {
                name,
                line: extract_line_from_tera_error(&e),
                message: format_tera_error(&e),
            }
        })?;

    Ok(tera)
}

/// The template Tera could not parse, when the error says which one.
fn failed_template(error: &tera::Error) -> Option<String> {
    PARSE_FAILURE.captures(&error.to_string()).map(|caps| caps[1].to_string())
}

fn execution_error(name: &str, error: tera::Error) -> RenderError {
    let message = format_tera_error(&error);
    tracing::warn!(template = name, error = %message, "Template execution failed");
    RenderError::ExecutionError {
        name: name.to_string(),
        message,
        source: error,
    }
}
