//! Integration test suite for tera-renderer
//!
//! End-to-end tests that drive the public API and the `tera-render` binary
//! against real template directories in temp dirs.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **cli**: the `tera-render` binary
//! - **filters**: `dateFormat` and `mix` inside templates
//! - **inheritance**: `extends`, `include` and `import` across template files
//! - **reload**: cache, debug-mode and file-direct reload behavior

mod cli;
mod filters;
mod inheritance;
mod reload;

use std::path::Path;

use tera_renderer::{ContextData, Renderer};

/// Render `name` with a JSON object as data.
pub fn render_json(renderer: &Renderer, name: &str, data: serde_json::Value) -> String {
    let data = ContextData::from_serialize(&data).unwrap();
    renderer.render_to_string(name, data).unwrap()
}

/// Write `content` to `dir/name`, creating parent directories.
pub fn write(dir: &Path, name: &str, content: &str) {
    tera_renderer::test_utils::write_template(dir, name, content).unwrap();
}
