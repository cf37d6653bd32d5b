//! The renderer a web framework hands template rendering to.
//!
//! A [`Renderer`] is created once at startup for a template directory and
//! shared by every request. Each render call:
//!
//! 1. resolves the compiled template (cache or straight from the file,
//!    depending on [`RenderSource`])
//! 2. builds a fresh [`tera::Context`] from the caller's [`ContextData`]
//! 3. applies the renderer's global variables on top
//! 4. streams the output into the caller's writer
//!
//! Output is not buffered: if execution fails halfway, whatever was already
//! written stays in the writer.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use serde::Serialize;
use serde_json::Value;
use tera::Filter;

use crate::cache::TemplateSet;
use crate::constants::MIX_FILTER_NAME;
use crate::context::ContextData;
use crate::error::Result;
use crate::filters::{FilterRegistry, MixManifest};
use crate::loader::TemplateLoader;
use crate::options::{RenderSource, RendererOptions};

/// The rendering contract a host web framework calls into.
///
/// `C` is the framework's per-request context. It is passed through so
/// implementations can use it; [`Renderer`] ignores it.
pub trait Render<C: ?Sized = ()> {
    /// Render template `name` with `data` into `out`.
    fn render(&self, out: &mut dyn Write, name: &str, data: ContextData, request: &C)
    -> Result<()>;
}

/// Renders templates from one directory with Tera.
///
/// # Examples
///
/// ```rust,no_run
/// use std::collections::HashMap;
/// use tera_renderer::{Renderer, RendererOptions};
///
/// # fn example() -> anyhow::Result<()> {
/// let renderer = Renderer::with_options(
///     "templates",
///     RendererOptions::default().debug(true).manifest_folder("public"),
/// )?;
/// renderer.set_global("site_name", "Example");
///
/// let data = HashMap::from([("World", "mayowa")]);
/// let mut out = Vec::new();
/// renderer.render_serialize(&mut out, "hello.html", &data)?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Renderer {
    base_dir: PathBuf,
    options: RendererOptions,
    templates: TemplateSet,
    globals: RwLock<BTreeMap<String, Value>>,
}

impl Renderer {
    /// Create a renderer with default options: no debug, cache-backed, no `mix` filter.
    ///
    /// # Errors
    ///
    /// Same as [`Renderer::with_options`].
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tera_renderer::Renderer;
    ///
    /// # fn example() -> tera_renderer::Result<()> {
    /// let renderer = Renderer::new("templates")?;
    /// assert!(renderer.has_filter("dateFormat"));
    /// assert!(!renderer.has_filter("mix"));
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        Self::with_options(base_dir, RendererOptions::default())
    }

    /// Create a renderer for `base_dir`.
    ///
    /// The directory is checked once here. Templates themselves are not read
    /// until they are first rendered. `dateFormat` is always registered, and
    /// `mix` is registered when `options.manifest_folder` is set.
    ///
    /// # Errors
    ///
    /// - [`RenderError::NotADirectory`](crate::RenderError::NotADirectory) if
    ///   `base_dir` is missing or not a directory
    /// - [`RenderError::LoaderInitError`](crate::RenderError::LoaderInitError)
    ///   if the directory cannot be read
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tera_renderer::{RenderSource, Renderer, RendererOptions};
    ///
    /// # fn example() -> tera_renderer::Result<()> {
    /// // Development: pick up template edits without restarting
    /// let dev = Renderer::with_options("templates", RendererOptions::default().debug(true))?;
    ///
    /// // Production with hashed assets
    /// let prod = Renderer::with_options(
    ///     "templates",
    ///     RendererOptions::default()
    ///         .source(RenderSource::FromCache)
    ///         .manifest_folder("public"),
    /// )?;
    /// assert!(prod.has_filter("mix"));
    /// # let _ = dev;
    /// # Ok(())
    /// # }
    /// ```
    pub fn with_options(base_dir: impl AsRef<Path>, options: RendererOptions) -> Result<Self> {
        let base_dir = base_dir.as_ref();
        let loader = TemplateLoader::new(base_dir)?;

        let set_name = format!(
            "templates-{}",
            loader.base_dir().file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        );

        let mut filters = FilterRegistry::with_defaults();
        if let Some(folder) = &options.manifest_folder {
            filters.register(MIX_FILTER_NAME, MixManifest::new(folder))?;
        }

        tracing::debug!(
            set = %set_name,
            base_dir = %loader.base_dir().display(),
            debug = options.debug,
            source = ?options.source,
            manifest_folder = ?options.manifest_folder,
            "Created renderer"
        );

        Ok(Self {
            base_dir: base_dir.to_path_buf(),
            templates: TemplateSet::new(set_name, loader, filters),
            options,
            globals: RwLock::new(BTreeMap::new()),
        })
    }

    /// Directory templates are loaded from, as supplied.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Options the renderer was built with.
    pub fn options(&self) -> &RendererOptions {
        &self.options
    }

    /// The underlying template cache.
    pub fn templates(&self) -> &TemplateSet {
        &self.templates
    }

    /// Register a filter for templates rendered by this renderer.
    ///
    /// An existing filter with the same name, including the built-in ones, is
    /// replaced. Templates already in the cache see the new filter on their
    /// next render.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidFilterName`](crate::RenderError::InvalidFilterName)
    /// if `name` is not `[A-Za-z_][A-Za-z0-9_]*`.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use std::collections::HashMap;
    /// use tera::Value;
    /// # use tera_renderer::Renderer;
    ///
    /// # fn example(renderer: &Renderer) -> tera_renderer::Result<()> {
    /// renderer.register_filter("initial", |v: &Value, _: &HashMap<String, Value>| {
    ///     let first = v.as_str().and_then(|s| s.chars().next()).unwrap_or('?');
    ///     Ok::<_, tera::Error>(Value::String(first.to_string()))
    /// })?;
    /// // {{ user.name | initial }}
    /// # Ok(())
    /// # }
    /// ```
    pub fn register_filter<F: Filter + 'static>(&self, name: &str, filter: F) -> Result<()> {
        self.templates.register_filter(name, filter)?;
        Ok(())
    }

    /// Whether a filter is registered under `name`.
    pub fn has_filter(&self, name: &str) -> bool {
        self.templates.has_filter(name)
    }

    /// Set a variable that every render sees. The last write wins.
    ///
    /// Globals are applied after the render data, so a global replaces a data
    /// key with the same name.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use serde_json::json;
    /// # use tera_renderer::Renderer;
    ///
    /// # fn example(renderer: &Renderer) {
    /// renderer.set_global("site_name", "Example");
    /// renderer.set_global("nav", json!([{"href": "/", "label": "Home"}]));
    /// assert_eq!(renderer.globals()["site_name"], json!("Example"));
    /// # }
    /// ```
    pub fn set_global(&self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        tracing::debug!(global = %name, "Set template global");
        self.globals.write().unwrap_or_else(PoisonError::into_inner).insert(name, value.into());
    }

    /// Snapshot of the global variables.
    pub fn globals(&self) -> BTreeMap<String, Value> {
        self.globals.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn build_context(&self, data: ContextData) -> tera::Context {
        let kind = data.kind();
        let mut context = data.into_context();

        let globals = self.globals.read().unwrap_or_else(PoisonError::into_inner);
        for (name, value) in globals.iter() {
            if context.contains_key(name) {
                tracing::debug!(global = %name, data = kind, "Global overrides render data");
            }
            context.insert(name.as_str(), value);
        }
        context
    }

    /// Render `name` with already-classified data into `out`.
    ///
    /// Output is streamed: if execution fails partway, bytes already written
    /// stay in `out`.
    ///
    /// # Errors
    ///
    /// - [`RenderError::InvalidTemplateName`](crate::RenderError::InvalidTemplateName)
    ///   or [`RenderError::TemplateNotFound`](crate::RenderError::TemplateNotFound)
    ///   for the template or a parent it extends
    /// - [`RenderError::CompileError`](crate::RenderError::CompileError) naming the
    ///   file that failed to parse
    /// - [`RenderError::ExecutionError`](crate::RenderError::ExecutionError) for
    ///   failures while rendering, including filter errors
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use tera::Context;
    /// use tera_renderer::{ContextData, Renderer};
    ///
    /// # fn example(renderer: &Renderer) -> tera_renderer::Result<()> {
    /// let mut context = Context::new();
    /// context.insert("title", "Home");
    ///
    /// let mut out = Vec::new();
    /// renderer.render_data(&mut out, "index.html", ContextData::from(context))?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn render_data(&self, out: &mut dyn Write, name: &str, data: ContextData) -> Result<()> {
        let context = self.build_context(data);
        match self.options.source {
            RenderSource::FromFile => self.templates.render_from_file(name, &context, out),
            RenderSource::FromCache => {
                self.templates.render_cached(name, self.options.debug, &context, out)
            }
        }
    }

    /// Render `name` with any serializable struct or string-keyed map.
    ///
    /// # Errors
    ///
    /// [`RenderError::ContextConversionError`](crate::RenderError::ContextConversionError)
    /// if `data` is neither, in which case nothing is written. Otherwise as
    /// [`Renderer::render_data`].
    pub fn render_serialize<T: Serialize + ?Sized>(
        &self,
        out: &mut dyn Write,
        name: &str,
        data: &T,
    ) -> Result<()> {
        let data = ContextData::from_serialize(data)?;
        self.render_data(out, name, data)
    }

    /// Render `name` into a string.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use serde_json::json;
    /// use tera_renderer::{ContextData, Renderer};
    ///
    /// # fn example(renderer: &Renderer) -> anyhow::Result<()> {
    /// let data = ContextData::from_serialize(&json!({"World": "mayowa"}))?;
    /// let html = renderer.render_to_string("hello.html", data)?;
    /// # let _ = html;
    /// # Ok(())
    /// # }
    /// ```
    pub fn render_to_string(&self, name: &str, data: ContextData) -> Result<String> {
        let mut out = Vec::new();
        self.render_data(&mut out, name, data)?;
        Ok(String::from_utf8_lossy(&out).into_owned())
    }
}

impl<C: ?Sized> Render<C> for Renderer {
    fn render(
        &self,
        out: &mut dyn Write,
        name: &str,
        data: ContextData,
        _request: &C,
    ) -> Result<()> {
        self.render_data(out, name, data)
    }
}
