//! Names and limits shared across the crate.

/// File the `mix` filter reads from the configured manifest folder.
pub const MIX_MANIFEST_FILE: &str = "mix-manifest.json";

/// Template-visible name of the manifest filter.
pub const MIX_FILTER_NAME: &str = "mix";

/// Template-visible name of the PHP-style date filter.
pub const DATE_FORMAT_FILTER_NAME: &str = "dateFormat";

/// Maximum number of "did you mean" suggestions on a missing template.
pub const MAX_TEMPLATE_SUGGESTIONS: usize = 3;

/// Edit distance allowed for a suggestion, as a percentage of the requested name's length.
pub const SIMILARITY_THRESHOLD_PERCENT: usize = 50;
