//! Cache, debug-mode and file-direct reload behavior.

use std::fs::{self, OpenOptions};
use std::time::{Duration, SystemTime};

use serde_json::json;
use tempfile::TempDir;
use tera_renderer::{RenderSource, Renderer, RendererOptions};

use super::{render_json, write};

/// Push a file's mtime forward so the change is visible even on coarse-mtime filesystems.
fn touch_later(path: &std::path::Path) {
    let file = OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(SystemTime::now() + Duration::from_secs(5)).unwrap();
}

#[test]
fn test_cache_keeps_compiled_template() {
    tera_renderer::test_utils::init_test_logging(None);
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.html", "v1 {{ n }}");

    let renderer = Renderer::new(dir.path()).unwrap();
    assert_eq!(render_json(&renderer, "page.html", json!({"n": 1})), "v1 1");

    write(dir.path(), "page.html", "version two {{ n }}");
    touch_later(&dir.path().join("page.html"));
    assert_eq!(render_json(&renderer, "page.html", json!({"n": 2})), "v1 2");
    assert_eq!(renderer.templates().cached_names(), vec!["page.html".to_string()]);
}

#[test]
fn test_debug_recompiles_changed_parent() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "base.html", "[{% block body %}{% endblock %}]");
    write(dir.path(), "child.html", r#"{% extends "base.html" %}{% block body %}hi{% endblock %}"#);

    let renderer =
        Renderer::with_options(dir.path(), RendererOptions::default().debug(true)).unwrap();
    assert_eq!(render_json(&renderer, "child.html", json!({})), "[hi]");

    write(dir.path(), "base.html", "<<{% block body %}{% endblock %}>>");
    touch_later(&dir.path().join("base.html"));
    assert_eq!(render_json(&renderer, "child.html", json!({})), "<<hi>>");
}

#[test]
fn test_debug_keeps_last_good_compile_on_syntax_error() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.txt", "ok {{ n }}");

    let renderer =
        Renderer::with_options(dir.path(), RendererOptions::default().debug(true)).unwrap();
    assert_eq!(render_json(&renderer, "page.txt", json!({"n": 1})), "ok 1");

    write(dir.path(), "page.txt", "broken {% if %}");
    touch_later(&dir.path().join("page.txt"));
    let data = tera_renderer::ContextData::from_serialize(&json!({"n": 2})).unwrap();
    assert!(matches!(
        renderer.render_to_string("page.txt", data),
        Err(tera_renderer::RenderError::CompileError { .. })
    ));

    write(dir.path(), "page.txt", "fixed {{ n }}");
    touch_later(&dir.path().join("page.txt"));
    assert_eq!(render_json(&renderer, "page.txt", json!({"n": 3})), "fixed 3");
}

#[test]
fn test_from_file_never_caches() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.html", "one");

    let renderer = Renderer::with_options(
        dir.path(),
        RendererOptions::default().source(RenderSource::FromFile),
    )
    .unwrap();
    assert_eq!(render_json(&renderer, "page.html", json!({})), "one");

    fs::write(dir.path().join("page.html"), "two").unwrap();
    assert_eq!(render_json(&renderer, "page.html", json!({})), "two");
    assert!(renderer.templates().cached_names().is_empty());
}

#[test]
fn test_clear_forces_recompile() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.html", "one");

    let renderer = Renderer::new(dir.path()).unwrap();
    assert_eq!(render_json(&renderer, "page.html", json!({})), "one");

    fs::write(dir.path().join("page.html"), "two").unwrap();
    renderer.templates().clear();
    assert!(renderer.templates().cached_names().is_empty());
    assert_eq!(render_json(&renderer, "page.html", json!({})), "two");
}
