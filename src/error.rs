//! Error types for the renderer.
//!
//! Errors fall into three groups:
//! - [`RenderError`] - construction failures and per-render failures
//! - [`ContextError`] - render data that cannot become a template context
//! - [`FilterError`] - failures inside the custom template filters
//!
//! Filter errors are raised inside Tera, so they reach the caller wrapped in
//! [`RenderError::ExecutionError`]. Nothing here retries or recovers; errors
//! go straight back to whoever called `render`, and the host framework decides
//! what the user sees.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T, E = RenderError> = std::result::Result<T, E>;

/// Errors produced while building a renderer or rendering a template.
#[derive(Error, Debug)]
pub enum RenderError {
    /// The base directory does not exist or is not a directory.
    #[error("{} is not a directory", path.display())]
    NotADirectory {
        /// The path that was supplied
        path: PathBuf,
    },

    /// The template loader could not be set up for the base directory.
    ///
    /// Usually a permission problem: the directory exists but cannot be
    /// listed or canonicalized.
    #[error("Failed to initialize template loader for {}: {source}", path.display())]
    LoaderInitError {
        /// The base directory
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// A template name is absolute or escapes the base directory.
    #[error("Invalid template name '{name}': {reason}")]
    InvalidTemplateName {
        /// The rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// No template file exists for the requested name.
    #[error("Template '{name}' not found at {}{}", path.display(), format_suggestions(suggestions))]
    TemplateNotFound {
        /// The requested template name
        name: String,
        /// Where the loader looked
        path: PathBuf,
        /// Similarly named templates under the base directory
        suggestions: Vec<String>,
    },

    /// The template file exists but could not be read.
    #[error("Failed to read template '{name}' from {}: {source}", path.display())]
    TemplateReadError {
        /// The requested template name
        name: String,
        /// The file that failed to read
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// Tera rejected the template source.
    #[error("Failed to compile template '{name}'{}: {message}", format_line(*line))]
    CompileError {
        /// The template being compiled
        name: String,
        /// Line reported by the parser, if any
        line: Option<usize>,
        /// Cleaned-up parser message
        message: String,
    },

    /// The render data could not be turned into a template context.
    #[error(transparent)]
    ContextConversionError(#[from] ContextError),

    /// Tera failed while executing the template.
    ///
    /// Output already written to the stream before the failure stays there.
    #[error("Failed to render template '{name}': {message}")]
    ExecutionError {
        /// The template being executed
        name: String,
        /// Cleaned-up error chain
        message: String,
        /// The original Tera error
        #[source]
        source: tera::Error,
    },

    /// A filter name that templates could never call.
    #[error("Invalid filter name '{name}': filter names must match [A-Za-z_][A-Za-z0-9_]*")]
    InvalidFilterName {
        /// The rejected name
        name: String,
    },
}

/// Errors from converting render data into a template context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContextError {
    /// The value is not a struct or a string-keyed map.
    #[error("Can't convert {type_name} to a template context")]
    UnsupportedContextType {
        /// Rust type name of the rejected value
        type_name: String,
    },

    /// A field or entry value failed to serialize.
    #[error("Failed to serialize context value for '{key}': {message}")]
    ValueSerialization {
        /// The field or map key whose value failed
        key: String,
        /// Serializer message
        message: String,
    },
}

/// Errors raised by the custom template filters.
#[derive(Error, Debug)]
pub enum FilterError {
    /// The filter received a value of the wrong type.
    #[error("Filter `{filter}` expected {expected}, got {found}")]
    TypeMismatch {
        /// Filter name
        filter: &'static str,
        /// What the filter accepts
        expected: &'static str,
        /// What it received
        found: String,
    },

    /// A required filter argument was not supplied.
    #[error("Filter `{filter}` requires the `{argument}` argument")]
    MissingArgument {
        /// Filter name
        filter: &'static str,
        /// Missing argument name
        argument: &'static str,
    },

    /// The mix manifest could not be read.
    #[error("Can't read mix manifest at {}: {source}", path.display())]
    ManifestReadError {
        /// Manifest file path
        path: PathBuf,
        /// Underlying I/O failure
        #[source]
        source: std::io::Error,
    },

    /// The mix manifest is not a flat string-to-string JSON object.
    #[error("Can't parse mix manifest at {}: {source}", path.display())]
    ManifestParseError {
        /// Manifest file path
        path: PathBuf,
        /// Underlying JSON failure
        #[source]
        source: serde_json::Error,
    },
}

impl From<FilterError> for tera::Error {
    fn from(error: FilterError) -> Self {
        let message = error.to_string();
        tera::Error::chain(message, error)
    }
}

fn format_suggestions(suggestions: &[String]) -> String {
    if suggestions.is_empty() {
        String::new()
    } else {
        format!(" (did you mean: {}?)", suggestions.join(", "))
    }
}

fn format_line(line: Option<usize>) -> String {
    match line {
        Some(line) => format!(" at line {line}"),
        None => String::new(),
    }
}

/// Flatten a Tera error chain into a single readable message.
///
/// Tera nests the useful part (the parser message, the missing variable, the
/// failing filter) a few levels down its `source()` chain, behind generic
/// "Failed to render 'x'" wrappers. This walks the chain and keeps the
/// messages that add information.
pub fn format_tera_error(error: &tera::Error) -> String {
    use std::error::Error;

    let mut messages = vec![error.to_string()];
    let mut current: Option<&dyn Error> = error.source();
    while let Some(err) = current {
        messages.push(err.to_string());
        current = err.source();
    }

    let useful: Vec<String> = messages
        .into_iter()
        .map(|msg| msg.trim().to_string())
        .filter(|msg| {
            !msg.is_empty()
                && !(msg.starts_with("Failed to render '") && msg.ends_with('\''))
                && !(msg.starts_with("Failed to parse '") && msg.ends_with('\''))
        })
        .collect();

    if useful.is_empty() {
        error.to_string()
    } else {
        useful.join("\n  → ")
    }
}

/// Location marker pest puts in parse errors, e.g. ` --> 3:7`.
static PARSE_LOCATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-->\s*(\d+):(\d+)").expect("parse location pattern is valid")
});

/// Pull the line number out of a Tera parse error.
///
/// Looks for the pest location marker anywhere in the source chain.
pub(crate) fn extract_line_from_tera_error(error: &tera::Error) -> Option<usize> {
    use std::error::Error;

    let mut current: Option<&dyn Error> = Some(error);
    while let Some(err) = current {
        if let Some(caps) = PARSE_LOCATION.captures(&err.to_string()) {
            return caps[1].parse().ok();
        }
        current = err.source();
    }
    None
}
