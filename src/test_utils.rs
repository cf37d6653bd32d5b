//! Test helpers shared by unit and integration tests.
//!
//! Enabled for this crate's own tests and, for `tests/`, through the
//! `test-utils` feature.

use std::fs;
use std::path::Path;
use std::sync::Once;

use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG` if it is set. With neither,
/// tests run without a subscriber.
///
/// ```bash
/// RUST_LOG=tera_renderer=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}

/// Write a template file under `dir`, creating parent directories.
pub fn write_template(dir: &Path, name: &str, content: &str) -> std::io::Result<()> {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)
}

/// Write a `mix-manifest.json` into `dir` from `(asset, hashed)` pairs.
pub fn write_mix_manifest(dir: &Path, entries: &[(&str, &str)]) -> std::io::Result<()> {
    let manifest: serde_json::Map<String, serde_json::Value> = entries
        .iter()
        .map(|(asset, hashed)| (asset.to_string(), serde_json::Value::from(*hashed)))
        .collect();
    let content = serde_json::to_string_pretty(&manifest).map_err(std::io::Error::other)?;
    fs::write(dir.join(crate::constants::MIX_MANIFEST_FILE), content)
}
