//! Construction-time renderer configuration.
//!
//! Options can be built in code or loaded from TOML:
//!
//! ```toml
//! debug = true
//! source = "from-file"
//! manifest-folder = "public"
//! ```

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Where a render call gets its compiled template from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderSource {
    /// Compile on first use and reuse the compiled template afterwards.
    #[default]
    FromCache,
    /// Re-read and compile the file on every render, ignoring the cache.
    FromFile,
}

/// Options accepted by [`Renderer::with_options`](crate::Renderer::with_options).
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RendererOptions {
    /// Recompile cached templates whose file changed on disk.
    pub debug: bool,
    /// Cache-backed or file-direct rendering.
    pub source: RenderSource,
    /// Folder holding `mix-manifest.json`; enables the `mix` filter when set.
    pub manifest_folder: Option<PathBuf>,
}

impl RendererOptions {
    /// Enable or disable debug mode.
    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set the render source mode.
    pub fn source(mut self, source: RenderSource) -> Self {
        self.source = source;
        self
    }

    /// Enable the `mix` filter, reading manifests from `folder`.
    pub fn manifest_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.manifest_folder = Some(folder.into());
        self
    }

    /// Parse options from a TOML document. Missing keys take their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse renderer options")
    }

    /// Load options from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or does not match the
    /// options schema.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read renderer options from {}", path.display()))?;

        Self::from_toml_str(&content)
            .with_context(|| format!("Failed to parse renderer options from {}", path.display()))
    }
}
