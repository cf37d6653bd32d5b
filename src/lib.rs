//! Tera renderer for web frameworks
//!
//! Lets a web framework hand HTML rendering to [Tera](https://keats.github.io/tera/)
//! templates stored in a directory. A [`Renderer`] loads templates by name,
//! compiles and caches them, merges request data and global variables into a
//! template context, and streams the output to any [`std::io::Write`].
//!
//! # Modules
//!
//! - [`renderer`] - the [`Renderer`] and the [`Render`] contract frameworks call
//! - [`cache`] - lazily-compiled template set with debug-mode invalidation
//! - [`loader`] - template name resolution and file loading
//! - [`context`] - turning structs and string-keyed maps into a template context
//! - [`filters`] - the `dateFormat` and `mix` filters and the filter registry
//! - [`options`] - construction-time options, loadable from TOML
//! - [`error`] - error types
//! - [`cli`] - the `tera-render` command
//!
//! # Render sources
//!
//! | Options                      | Template changes on disk          |
//! |------------------------------|-----------------------------------|
//! | `FromCache`, `debug = false` | ignored after first compile       |
//! | `FromCache`, `debug = true`  | picked up on the next render      |
//! | `FromFile`                   | always picked up, nothing cached  |
//!
//! # Example
//!
//! ```rust,no_run
//! use serde::Serialize;
//! use tera_renderer::{RenderSource, Renderer, RendererOptions};
//!
//! #[derive(Serialize)]
//! struct Page {
//!     title: String,
//! }
//!
//! # fn example() -> anyhow::Result<()> {
//! let options = RendererOptions::default()
//!     .source(RenderSource::FromCache)
//!     .manifest_folder("public");
//! let renderer = Renderer::with_options("templates", options)?;
//!
//! let mut out = Vec::new();
//! renderer.render_serialize(&mut out, "page.html", &Page { title: "Home".into() })?;
//! # Ok(())
//! # }
//! ```
//!
//! Templates can then use the built-in filters:
//!
//! ```text
//! <link rel="stylesheet" href="{{ '/css/app.css' | mix }}">
//! <time>{{ published | dateFormat(format="D, d M Y") }}</time>
//! ```

pub mod cache;
pub mod cli;
pub mod constants;
pub mod context;
pub mod error;
pub mod filters;
pub mod loader;
pub mod options;
pub mod renderer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;


pub use context::{ContextData, to_context};
pub use error::{ContextError, FilterError, RenderError, Result};
pub use filters::{DateFormat, FilterRegistry, MixManifest, PhpDateFormat};
pub use options::{RenderSource, RendererOptions};
pub use renderer::{Render, Renderer};
