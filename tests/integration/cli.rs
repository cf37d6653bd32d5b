//! The `tera-render` binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use super::write;

fn tera_render() -> Command {
    let mut cmd = Command::cargo_bin("tera-render").unwrap();
    cmd.env_remove("RUST_LOG").env_remove("TERA_RENDER_CONFIG");
    cmd
}

#[test]
fn test_render_with_data_file() {
    let temp = TempDir::new().unwrap();
    let templates = temp.path().join("templates");
    write(&templates, "hello.html", "Hello {{ World }}!");
    write(temp.path(), "data.json", r#"{"World": "mayowa"}"#);

    tera_render()
        .arg(&templates)
        .arg("hello.html")
        .arg("--data")
        .arg(temp.path().join("data.json"))
        .assert()
        .success()
        .stdout("Hello mayowa!");
}

#[test]
fn test_render_with_stdin_and_globals() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "page.txt", "{{ title }} on {{ site }} ({{ count + 1 }})");

    tera_render()
        .arg(temp.path())
        .arg("page.txt")
        .args(["--data", "-", "--set", "site=Example", "--set", "count=41"])
        .write_stdin(r#"{"title": "Home"}"#)
        .assert()
        .success()
        .stdout("Home on Example (42)");
}

#[test]
fn test_render_with_mix_manifest() {
    let temp = TempDir::new().unwrap();
    let public = temp.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    tera_renderer::test_utils::write_mix_manifest(&public, &[("/css/app.css", "/css/app.123.css")])
        .unwrap();
    write(temp.path(), "layout.txt", r#"{{ "/css/app.css" | mix }}"#);

    tera_render()
        .arg(temp.path())
        .arg("layout.txt")
        .arg("--manifest-folder")
        .arg(&public)
        .assert()
        .success()
        .stdout("/css/app.123.css");
}

#[test]
fn test_options_from_config_file() {
    let temp = TempDir::new().unwrap();
    let public = temp.path().join("public");
    std::fs::create_dir_all(&public).unwrap();
    tera_renderer::test_utils::write_mix_manifest(&public, &[("/app.js", "/app.v9.js")]).unwrap();

    let templates = temp.path().join("templates");
    write(&templates, "page.txt", r#"{{ "/app.js" | mix }}"#);

    let config = temp.path().join("renderer.toml");
    std::fs::write(
        &config,
        format!("source = \"from-file\"\nmanifest-folder = {:?}\n", public.to_string_lossy()),
    )
    .unwrap();

    tera_render()
        .arg(&templates)
        .arg("page.txt")
        .arg("--config")
        .arg(&config)
        .assert()
        .success()
        .stdout("/app.v9.js");
}

#[test]
fn test_missing_template_suggests_name() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "index.html", "hi");

    tera_render()
        .arg(temp.path())
        .arg("indx.html")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Template 'indx.html' not found"))
        .stderr(predicate::str::contains("did you mean: index.html"));
}

#[test]
fn test_missing_base_dir_fails() {
    let temp = TempDir::new().unwrap();

    tera_render()
        .arg(temp.path().join("nope"))
        .arg("index.html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("is not a directory"));
}

#[test]
fn test_non_object_data_is_rejected() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "index.html", "hi");

    tera_render()
        .arg(temp.path())
        .arg("index.html")
        .args(["--data", "-"])
        .write_stdin("[1, 2, 3]")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be a JSON object"));
}

#[test]
fn test_compile_error_reports_line() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "broken.html", "fine\n{% if %}");

    tera_render()
        .arg(temp.path())
        .arg("broken.html")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to compile template 'broken.html' at line 2"));
}
