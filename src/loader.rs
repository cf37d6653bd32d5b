//! Filesystem template loader.
//!
//! Resolves template names to files under a base directory and reads them.
//! Names are always relative: absolute names and `..` components that would
//! climb out of the base directory are rejected before any file is opened.

use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::SystemTime;

use strsim::levenshtein;
use walkdir::WalkDir;

use crate::constants::{MAX_TEMPLATE_SUGGESTIONS, SIMILARITY_THRESHOLD_PERCENT};
use crate::error::{RenderError, Result};

/// What the loader remembers about a file to detect on-disk changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Fingerprint {
    modified: Option<SystemTime>,
    len: u64,
}

impl Fingerprint {
    fn from_metadata(metadata: &fs::Metadata) -> Self {
        Self {
            modified: metadata.modified().ok(),
            len: metadata.len(),
        }
    }
}

/// A template file read from disk.
#[derive(Debug, Clone)]
pub(crate) struct TemplateSource {
    pub(crate) content: String,
    pub(crate) fingerprint: Fingerprint,
}

/// Reads templates from a single base directory.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    base_dir: PathBuf,
}

impl TemplateLoader {
    /// Create a loader rooted at `base_dir`.
    ///
    /// # Errors
    ///
    /// - [`RenderError::NotADirectory`] if the path is missing or not a directory
    /// - [`RenderError::LoaderInitError`] if it exists but cannot be resolved or listed
    pub fn new(base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref();

        let metadata = match fs::metadata(base_dir) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RenderError::NotADirectory {
                    path: base_dir.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(RenderError::LoaderInitError {
                    path: base_dir.to_path_buf(),
                    source,
                });
            }
        };
        if !metadata.is_dir() {
            return Err(RenderError::NotADirectory {
                path: base_dir.to_path_buf(),
            });
        }

        let canonical = base_dir.canonicalize().map_err(|source| RenderError::LoaderInitError {
            path: base_dir.to_path_buf(),
            source,
        })?;

        // Listing proves we can actually read templates from here.
        fs::read_dir(&canonical).map_err(|source| RenderError::LoaderInitError {
            path: base_dir.to_path_buf(),
            source,
        })?;

        Ok(Self {
            base_dir: canonical,
        })
    }

    /// Canonical base directory.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Map a template name to its file path without touching the filesystem.
    ///
    /// # Errors
    ///
    /// [`RenderError::InvalidTemplateName`] if the name is empty, absolute, or
    /// walks above the base directory.
    pub fn resolve(&self, name: &str) -> Result<PathBuf> {
        let invalid = |reason: &str| RenderError::InvalidTemplateName {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        if name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }

        let path = Path::new(name);
        if path.is_absolute() {
            return Err(invalid("absolute paths are not allowed"));
        }

        let mut depth: i32 = 0;
        for component in path.components() {
            match component {
                Component::Normal(_) => depth += 1,
                Component::CurDir => {}
                Component::ParentDir => {
                    depth -= 1;
                    if depth < 0 {
                        return Err(invalid("path escapes the template directory"));
                    }
                }
                Component::RootDir | Component::Prefix(_) => {
                    return Err(invalid("only relative paths are allowed"));
                }
            }
        }

        Ok(self.base_dir.join(path))
    }

    /// Read a template's source and fingerprint.
    pub(crate) fn load(&self, name: &str) -> Result<TemplateSource> {
        let path = self.resolve(name)?;

        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(RenderError::TemplateNotFound {
                    name: name.to_string(),
                    suggestions: self.suggestions(name),
                    path,
                });
            }
            Err(source) => {
                return Err(RenderError::TemplateReadError {
                    name: name.to_string(),
                    path,
                    source,
                });
            }
        };

        // Stat after reading so a write racing the read makes the entry look stale, not fresh.
        let fingerprint = fs::metadata(&path)
            .map(|metadata| Fingerprint::from_metadata(&metadata))
            .map_err(|source| RenderError::TemplateReadError {
                name: name.to_string(),
                path: path.clone(),
                source,
            })?;

        tracing::debug!(template = name, path = %path.display(), bytes = content.len(), "Loaded template");

        Ok(TemplateSource {
            content,
            fingerprint,
        })
    }

    /// Current fingerprint of a template file, `None` if it cannot be stat'ed.
    pub(crate) fn fingerprint(&self, name: &str) -> Option<Fingerprint> {
        let path = self.resolve(name).ok()?;
        fs::metadata(path).ok().map(|metadata| Fingerprint::from_metadata(&metadata))
    }

    /// Template names under the base directory that look like `name`.
    pub fn suggestions(&self, name: &str) -> Vec<String> {
        let max_distance = name.len() * SIMILARITY_THRESHOLD_PERCENT / 100;

        let mut scored: Vec<(String, usize)> = WalkDir::new(&self.base_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(&self.base_dir).ok()?;
                Some(relative.to_string_lossy().replace('\\', "/"))
            })
            .map(|candidate| {
                let distance = levenshtein(name, &candidate);
                (candidate, distance)
            })
            .filter(|(candidate, distance)| *distance <= max_distance && candidate != name)
            .collect();

        scored.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(&b.0)));
        scored.into_iter().take(MAX_TEMPLATE_SUGGESTIONS).map(|(candidate, _)| candidate).collect()
    }
}
