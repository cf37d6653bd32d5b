//! `mix` filter: resolve assets through a laravel-mix style manifest.
//!
//! ```text
//! <link rel="stylesheet" href="{{ '/css/app.css' | mix }}">
//! ```
//!
//! The manifest is a flat JSON object written by the asset build:
//!
//! ```json
//! {"/css/app.css": "/css/app.a1b2c3.css"}
//! ```
//!
//! It is re-read on every call so a rebuild shows up without restarting.
//! Names missing from the manifest come back as given, HTML-escaped: the
//! filter's output bypasses autoescaping, and an unmapped value may be user
//! input.

use std::collections::HashMap;
use std::path::PathBuf;

use tera::{Filter, Value};

use crate::constants::MIX_MANIFEST_FILE;
use crate::error::FilterError;

/// Filter bound to the folder holding `mix-manifest.json`.
#[derive(Debug, Clone)]
pub struct MixManifest {
    folder: PathBuf,
}

impl MixManifest {
    /// Bind the filter to `folder`.
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    /// Full path of the manifest file.
    pub fn manifest_path(&self) -> PathBuf {
        self.folder.join(MIX_MANIFEST_FILE)
    }

    /// Read the manifest and look up `asset`.
    ///
    /// # Errors
    ///
    /// - [`FilterError::ManifestReadError`] if the file cannot be read
    /// - [`FilterError::ManifestParseError`] if it is not a string-to-string object
    pub fn lookup(&self, asset: &str) -> Result<Option<String>, FilterError> {
        let path = self.manifest_path();

        let content = std::fs::read_to_string(&path).map_err(|source| {
            FilterError::ManifestReadError {
                path: path.clone(),
                source,
            }
        })?;

        let mut manifest: HashMap<String, String> = serde_json::from_str(&content)
            .map_err(|source| FilterError::ManifestParseError {
                path: path.clone(),
                source,
            })?;

        let hashed = manifest.remove(asset);
        tracing::trace!(asset, hashed = ?hashed, manifest = %path.display(), "Mix manifest lookup");
        Ok(hashed)
    }
}

impl Filter for MixManifest {
    fn filter(&self, value: &Value, _args: &HashMap<String, Value>) -> tera::Result<Value> {
        let asset = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        match self.lookup(&asset)? {
            Some(hashed) => Ok(Value::String(hashed)),
            None => Ok(match value {
                Value::String(s) => Value::String(tera::escape_html(s)),
                Value::Array(_) | Value::Object(_) => Value::String(tera::escape_html(&asset)),
                scalar => scalar.clone(),
            }),
        }
    }

    /// Manifest entries are build-tool paths; unmapped values are escaped in `filter`.
    fn is_safe(&self) -> bool {
        true
    }
}
