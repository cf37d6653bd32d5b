//! Templates that pull in other template files.

use serde_json::json;
use tempfile::TempDir;
use tera_renderer::{ContextData, RenderError, RenderSource, Renderer, RendererOptions};

use super::{render_json, write};

fn layout(dir: &std::path::Path) {
    write(
        dir,
        "layouts/base.html",
        "<title>{% block title %}Site{% endblock %}</title>{% block body %}{% endblock %}",
    );
    write(dir, "partials/nav.html", "<nav>{{ user }}</nav>");
    write(dir, "macros.html", "{% macro shout(text) %}{{ text | upper }}!{% endmacro shout %}");
    write(
        dir,
        "pages/home.html",
        r#"{% extends "layouts/base.html" %}{% import "macros.html" as m %}{% block title %}Home{% endblock %}{% block body %}{% include "partials/nav.html" %}{{ m::shout(text=greeting) }}{% endblock %}"#,
    );
}

#[test]
fn test_extends_include_and_import_from_cache() {
    let dir = TempDir::new().unwrap();
    layout(dir.path());

    let renderer = Renderer::new(dir.path()).unwrap();
    let out = render_json(&renderer, "pages/home.html", json!({"user": "ada", "greeting": "hi"}));
    assert_eq!(out, "<title>Home</title><nav>ada</nav>HI!");

    let cached = renderer.templates().cached_names();
    for name in ["layouts/base.html", "macros.html", "pages/home.html", "partials/nav.html"] {
        assert!(cached.contains(&name.to_string()), "{name} not cached: {cached:?}");
    }
}

#[test]
fn test_extends_include_and_import_from_file() {
    let dir = TempDir::new().unwrap();
    layout(dir.path());

    let renderer = Renderer::with_options(
        dir.path(),
        RendererOptions::default().source(RenderSource::FromFile),
    )
    .unwrap();
    let out = render_json(&renderer, "pages/home.html", json!({"user": "ada", "greeting": "hi"}));
    assert_eq!(out, "<title>Home</title><nav>ada</nav>HI!");
}

#[test]
fn test_missing_parent_is_reported() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "child.html", r#"{% extends "nope.html" %}"#);

    let renderer = Renderer::new(dir.path()).unwrap();
    let result = renderer.render_to_string("child.html", ContextData::from_serialize(&json!({})).unwrap());
    match result {
        Err(RenderError::TemplateNotFound { name, .. }) => assert_eq!(name, "nope.html"),
        other => panic!("expected TemplateNotFound, got {other:?}"),
    }
    assert!(renderer.templates().cached_names().is_empty());
}

#[test]
fn test_include_ignore_missing() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.html", r#"a{% include "gone.html" ignore missing %}b"#);

    let renderer = Renderer::new(dir.path()).unwrap();
    assert_eq!(render_json(&renderer, "page.html", json!({})), "ab");
}

#[test]
fn test_names_cannot_escape_base_dir() {
    let outer = TempDir::new().unwrap();
    write(outer.path(), "secret.html", "secret");
    write(outer.path(), "templates/page.html", "page");

    let renderer = Renderer::new(outer.path().join("templates")).unwrap();
    let data = || ContextData::from_serialize(&json!({})).unwrap();

    assert!(matches!(
        renderer.render_to_string("../secret.html", data()),
        Err(RenderError::InvalidTemplateName { .. })
    ));
    let absolute = outer.path().join("secret.html");
    assert!(matches!(
        renderer.render_to_string(absolute.to_str().unwrap(), data()),
        Err(RenderError::InvalidTemplateName { .. })
    ));
}

#[test]
fn test_missing_template_suggests_close_names() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "pages/home.html", "home");

    let renderer = Renderer::new(dir.path()).unwrap();
    let result =
        renderer.render_to_string("pages/hom.html", ContextData::from_serialize(&json!({})).unwrap());
    match result {
        Err(RenderError::TemplateNotFound { suggestions, .. }) => {
            assert_eq!(suggestions, vec!["pages/home.html".to_string()]);
        }
        other => panic!("expected TemplateNotFound, got {other:?}"),
    }
}
