//! `dateFormat` and `mix` used from real templates.

use serde::Serialize;
use serde_json::json;
use tempfile::TempDir;
use tera_renderer::test_utils::write_mix_manifest;
use tera_renderer::{ContextData, RenderError, Renderer, RendererOptions};

use super::{render_json, write};

#[test]
fn test_date_format_tokens_in_template() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "post.html",
        r#"{{ published | dateFormat(format="D, d M Y H:i:s") }}|{{ published | dateFormat(format="l, G:i a") }}"#,
    );

    let renderer = Renderer::new(dir.path()).unwrap();
    let out = render_json(&renderer, "post.html", json!({"published": "2021-07-04T13:04:05Z"}));
    assert_eq!(out, "Sun, 04 Jul 2021 13:04:05|Sunday, 13:04 pm");
}

#[test]
fn test_date_format_zone_name() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "time.txt", r#"{{ w | dateFormat(format="H:i T") }}"#);

    let renderer = Renderer::new(dir.path()).unwrap();
    assert_eq!(render_json(&renderer, "time.txt", json!({"w": "2021-07-04T10:00:00Z"})), "10:00 UTC");
    assert_eq!(
        render_json(&renderer, "time.txt", json!({"w": "2021-07-04T10:00:00+02:00"})),
        "10:00 +02:00"
    );
}

#[test]
fn test_date_format_from_chrono_struct_field() {
    #[derive(Serialize)]
    struct Post {
        published: chrono::DateTime<chrono::Utc>,
    }

    let dir = TempDir::new().unwrap();
    write(dir.path(), "post.txt", r#"{{ published | dateFormat(format="jS F Y") }}"#);

    let published = chrono::DateTime::parse_from_rfc3339("2021-03-22T08:00:00Z")
        .unwrap()
        .with_timezone(&chrono::Utc);
    let renderer = Renderer::new(dir.path()).unwrap();
    let mut out = Vec::new();
    renderer.render_serialize(&mut out, "post.txt", &Post { published }).unwrap();
    assert_eq!(String::from_utf8(out).unwrap(), "22nd March 2021");
}

#[test]
fn test_date_format_rejects_non_dates() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "post.txt", r#"{{ published | dateFormat(format="Y") }}"#);

    let renderer = Renderer::new(dir.path()).unwrap();
    let data = ContextData::from_serialize(&json!({"published": "yesterday"})).unwrap();
    let error = renderer.render_to_string("post.txt", data).unwrap_err();
    assert!(matches!(error, RenderError::ExecutionError { .. }));
}

#[test]
fn test_mix_maps_assets_and_escapes_unknown() {
    let public = TempDir::new().unwrap();
    write_mix_manifest(public.path(), &[("/js/app.js", "/js/app.js?id=abc123")]).unwrap();

    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "layout.html",
        r#"<script src="{{ "/js/app.js" | mix }}"></script><link href="{{ "/css/none.css" | mix }}">"#,
    );

    let renderer = Renderer::with_options(
        dir.path(),
        RendererOptions::default().manifest_folder(public.path()),
    )
    .unwrap();
    let out = render_json(&renderer, "layout.html", json!({}));
    assert_eq!(
        out,
        r#"<script src="/js/app.js?id=abc123"></script><link href="&#x2F;css&#x2F;none.css">"#
    );
}

#[test]
fn test_mix_reads_manifest_on_every_render() {
    let public = TempDir::new().unwrap();
    write_mix_manifest(public.path(), &[("/css/app.css", "/css/app.v1.css")]).unwrap();

    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.txt", r#"{{ "/css/app.css" | mix }}"#);

    let renderer = Renderer::with_options(
        dir.path(),
        RendererOptions::default().manifest_folder(public.path()),
    )
    .unwrap();
    assert_eq!(render_json(&renderer, "page.txt", json!({})), "/css/app.v1.css");

    write_mix_manifest(public.path(), &[("/css/app.css", "/css/app.v2.css")]).unwrap();
    assert_eq!(render_json(&renderer, "page.txt", json!({})), "/css/app.v2.css");
}

#[test]
fn test_mix_unavailable_without_manifest_folder() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), "page.txt", r#"{{ "/css/app.css" | mix }}"#);

    let renderer = Renderer::new(dir.path()).unwrap();
    let data = ContextData::from_serialize(&json!({})).unwrap();
    assert!(renderer.render_to_string("page.txt", data).is_err());
}

#[test]
fn test_custom_filter_alongside_builtins() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        "page.txt",
        r#"{{ name | initial }} {{ when | dateFormat(format="Y") }}"#,
    );

    let renderer = Renderer::new(dir.path()).unwrap();
    renderer
        .register_filter(
            "initial",
            |value: &tera::Value, _: &std::collections::HashMap<String, tera::Value>| {
                let first = value.as_str().and_then(|s| s.chars().next()).unwrap_or('?');
                Ok::<_, tera::Error>(tera::Value::String(first.to_string()))
            },
        )
        .unwrap();

    let out = render_json(&renderer, "page.txt", json!({"name": "mayowa", "when": "2020-01-01"}));
    assert_eq!(out, "m 2020");
}
