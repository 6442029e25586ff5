//! Constants used throughout the formreg core crate.

/// Registry location used when nothing is configured: where the consuming application reads
/// its form definitions from.
pub const DEFAULT_REGISTRY_PATH: &str = "src/data/forms/registry.json";

/// Environment variable naming the registry file.
pub const REGISTRY_PATH_ENV: &str = "FORMREG_REGISTRY_PATH";

/// Environment variable selecting `strict` or `permissive` validation.
pub const VALIDATION_MODE_ENV: &str = "FORMREG_VALIDATION";

/// File extensions treated as YAML when loading candidate lists.
pub const YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];
