//! Template filters and the per-renderer filter registry.
//!
//! Each [`Renderer`](crate::Renderer) owns a [`FilterRegistry`]. Every Tera
//! instance the renderer builds, cached or one-off, gets the registry's
//! filters installed, so registering a filter affects only that renderer.
//!
//! Built-in filters:
//! - `dateFormat` ([`DateFormat`]) - always registered
//! - `mix` ([`MixManifest`]) - registered when a manifest folder is configured

mod date;
mod mix;

pub use date::{DateFormat, PhpDateFormat};
pub use mix::MixManifest;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use tera::{Filter, Tera, Value};

use crate::constants::DATE_FORMAT_FILTER_NAME;
use crate::error::{RenderError, Result};

/// A filter shared between the registry and every Tera instance built from it.
#[derive(Clone)]
struct SharedFilter(Arc<dyn Filter>);

impl Filter for SharedFilter {
    fn filter(&self, value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        self.0.filter(value, args)
    }

    fn is_safe(&self) -> bool {
        self.0.is_safe()
    }
}

/// Named template filters.
///
/// Cloning is cheap: filters are shared, not copied.
///
/// # Examples
///
/// ```rust
/// use std::collections::HashMap;
/// use tera::Value;
/// use tera_renderer::filters::{FilterRegistry, MixManifest};
///
/// let mut registry = FilterRegistry::with_defaults();
/// registry.register("mix", MixManifest::new("public")).unwrap();
/// registry
///     .register("shout", |v: &Value, _: &HashMap<String, Value>| {
///         Ok::<_, tera::Error>(Value::String(v.as_str().unwrap_or_default().to_uppercase()))
///     })
///     .unwrap();
///
/// assert_eq!(registry.names(), vec!["dateFormat", "mix", "shout"]);
/// assert!(registry.register("not valid", MixManifest::new("public")).is_err());
/// ```
#[derive(Clone, Default)]
pub struct FilterRegistry {
    filters: BTreeMap<String, SharedFilter>,
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterRegistry").field("filters", &self.names()).finish()
    }
}

impl FilterRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the filters every renderer starts with: `dateFormat`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.insert(DATE_FORMAT_FILTER_NAME, DateFormat);
        registry
    }

    /// Register `filter` under `name`, replacing any filter already there.
    ///
    /// Returns `true` when an existing filter was replaced.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidFilterName`] if templates could not call a
    /// filter by that name.
    pub fn register<F: Filter + 'static>(&mut self, name: &str, filter: F) -> Result<bool> {
        if !is_valid_filter_name(name) {
            return Err(RenderError::InvalidFilterName {
                name: name.to_string(),
            });
        }
        Ok(self.insert(name, filter))
    }

    fn insert<F: Filter + 'static>(&mut self, name: &str, filter: F) -> bool {
        self.filters.insert(name.to_string(), SharedFilter(Arc::new(filter))).is_some()
    }

    /// Whether a filter is registered under `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.filters.contains_key(name)
    }

    /// Registered filter names, sorted.
    pub fn names(&self) -> Vec<&str> {
        self.filters.keys().map(String::as_str).collect()
    }

    /// Install a single registered filter into `tera`.
    pub(crate) fn install_one(&self, name: &str, tera: &mut Tera) {
        if let Some(filter) = self.filters.get(name) {
            tera.register_filter(name, filter.clone());
        }
    }

    /// Install every registered filter into `tera`.
    pub(crate) fn install(&self, tera: &mut Tera) {
        for (name, filter) in &self.filters {
            tera.register_filter(name, filter.clone());
        }
    }
}

fn is_valid_filter_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}
