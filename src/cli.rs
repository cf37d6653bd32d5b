//! Command-line front end for rendering a single template.
//!
//! Mostly useful for checking templates outside the web framework that
//! normally drives the [`Renderer`]:
//!
//! ```bash
//! # Render with data from a file
//! tera-render templates page.html --data page.json
//!
//! # Data from stdin, plus a global variable and the mix filter
//! echo '{"title": "Home"}' | tera-render templates page.html --data - \
//!     --set site_name='"Example"' --manifest-folder public
//!
//! # Options from a TOML file, overridden by flags
//! tera-render templates page.html --config renderer.toml --from-file
//! ```
//!
//! Output goes to stdout. Logs go to stderr and follow `RUST_LOG` unless
//! `--verbose` or `--quiet` is given.

use std::fmt;
use std::io::{Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use colored::Colorize;
use serde_json::Value;
use tracing_subscriber::EnvFilter;

use crate::context::ContextData;
use crate::error::RenderError;
use crate::options::{RenderSource, RendererOptions};
use crate::renderer::Renderer;

/// Render a Tera template from a directory to stdout.
#[derive(Parser, Debug)]
#[command(
    name = "tera-render",
    about = "Render a Tera template from a template directory",
    version,
    long_about = "Renders one template with the same loader, cache, context rules and filters \
                  (dateFormat, mix) a web framework gets from the library."
)]
pub struct Cli {
    /// Directory templates are loaded from.
    base_dir: PathBuf,

    /// Template name, relative to the base directory (e.g. `pages/home.html`).
    template: String,

    /// JSON file holding the render data, or `-` for stdin.
    ///
    /// The document must be a JSON object. Without `--data` the template
    /// sees an empty context plus any `--set` globals.
    #[arg(short, long, value_name = "FILE")]
    data: Option<PathBuf>,

    /// Global variable available to the template, as `KEY=VALUE`.
    ///
    /// VALUE is parsed as JSON when it can be and used as a plain string
    /// otherwise. Globals win over keys from `--data`.
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
    globals: Vec<(String, Value)>,

    /// Folder holding `mix-manifest.json`; enables the `mix` filter.
    #[arg(long, value_name = "DIR")]
    manifest_folder: Option<PathBuf>,

    /// Recompile templates whose files changed since they were cached.
    #[arg(long)]
    debug: bool,

    /// Read and compile the template file on every render instead of caching.
    #[arg(long)]
    from_file: bool,

    /// TOML file with renderer options. Flags override its values.
    #[arg(short, long, value_name = "FILE", env = "TERA_RENDER_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors.
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    /// Run the command: render the template into stdout.
    pub fn execute(self) -> Result<()> {
        self.init_logging();

        let options = self.build_options()?;
        let renderer = Renderer::with_options(&self.base_dir, options)?;
        for (name, value) in &self.globals {
            renderer.set_global(name.as_str(), value.clone());
        }

        let data = self.read_data()?;

        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        renderer.render_data(&mut out, &self.template, data)?;
        out.flush().context("Failed to flush rendered output")?;
        Ok(())
    }

    /// Options from `--config` (or defaults) with the command-line flags applied on top.
    pub fn build_options(&self) -> Result<RendererOptions> {
        let mut options = match &self.config {
            Some(path) => RendererOptions::load_from(path)?,
            None => RendererOptions::default(),
        };

        if self.debug {
            options.debug = true;
        }
        if self.from_file {
            options.source = RenderSource::FromFile;
        }
        if let Some(folder) = &self.manifest_folder {
            options.manifest_folder = Some(folder.clone());
        }
        Ok(options)
    }

    fn log_filter(&self) -> EnvFilter {
        if self.verbose {
            EnvFilter::new("tera_renderer=debug")
        } else if self.quiet {
            EnvFilter::new("error")
        } else {
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    }

    fn init_logging(&self) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(self.log_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    fn read_data(&self) -> Result<ContextData> {
        let Some(path) = &self.data else {
            return Ok(ContextData::from(tera::Context::new()));
        };

        let content = if path.as_os_str() == "-" {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf).context("Failed to read render data from stdin")?;
            buf
        } else {
            std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read render data from {}", path.display()))?
        };

        parse_data(&content)
    }
}

fn parse_data(content: &str) -> Result<ContextData> {
    let value: Value = serde_json::from_str(content).context("Render data is not valid JSON")?;
    if !value.is_object() {
        bail!("Render data must be a JSON object, got {}", json_type(&value));
    }
    Ok(ContextData::from_serialize(&value)?)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Parse a `KEY=VALUE` assignment, reading VALUE as JSON when possible.
fn parse_assignment(raw: &str) -> Result<(String, Value), String> {
    let (key, value) =
        raw.split_once('=').ok_or_else(|| format!("expected KEY=VALUE, got '{raw}'"))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }

    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// An error ready to be shown on the terminal, with optional hints.
#[derive(Debug)]
pub struct ErrorContext {
    /// The error message, including its cause chain
    pub message: String,
    /// Extra context about what went wrong
    pub details: Option<String>,
    /// What the user can do about it
    pub suggestion: Option<String>,
}

impl ErrorContext {
    /// Wrap a message with no hints.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            suggestion: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print to stderr: error in red, details in yellow, suggestion in green.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Attach hints to the render errors users commonly hit.
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let context = ErrorContext::new(format!("{error:#}"));

    let Some(render_error) = error.downcast_ref::<RenderError>() else {
        return context;
    };

    match render_error {
        RenderError::NotADirectory { .. } => context
            .with_suggestion("Pass the directory that holds your templates as the first argument"),
        RenderError::TemplateNotFound { suggestions, .. } if suggestions.is_empty() => context
            .with_suggestion("Template names are paths relative to the template directory"),
        RenderError::InvalidTemplateName { .. } => context.with_details(
            "Template names must be relative and stay inside the template directory",
        ),
        RenderError::CompileError { line: Some(line), .. } => {
            context.with_suggestion(format!("Check the template syntax around line {line}"))
        }
        RenderError::ContextConversionError(_) => context
            .with_details("Render data must be a struct or a map with string keys")
            .with_suggestion("Pass a JSON object with --data"),
        RenderError::ExecutionError { .. } => context.with_details(
            "The template compiled but failed while rendering; output may be incomplete",
        ),
        _ => context,
    }
}
