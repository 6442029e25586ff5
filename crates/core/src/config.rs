//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into
//! [`crate::RegistryService`]. Library code never reads environment variables itself; binaries
//! read them and hand the raw values to the `*_from_env_value` helpers below.

use crate::constants::DEFAULT_REGISTRY_PATH;
use crate::{RegistryError, RegistryResult};
use std::path::{Path, PathBuf};

/// How validation issues on candidate forms are treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMode {
    /// Any error-level issue on a candidate aborts the merge before anything is written.
    #[default]
    Strict,
    /// Issues are logged and the merge proceeds.
    Permissive,
}

impl ValidationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationMode::Strict => "strict",
            ValidationMode::Permissive => "permissive",
        }
    }
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ValidationMode {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(ValidationMode::Strict),
            "permissive" => Ok(ValidationMode::Permissive),
            other => Err(RegistryError::InvalidInput(format!(
                "unknown validation mode '{other}' (expected 'strict' or 'permissive')"
            ))),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    registry_path: PathBuf,
    validation_mode: ValidationMode,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidInput`] if `registry_path` is empty.
    pub fn new(registry_path: PathBuf, validation_mode: ValidationMode) -> RegistryResult<Self> {
        if registry_path.as_os_str().is_empty() {
            return Err(RegistryError::InvalidInput(
                "registry path cannot be empty".into(),
            ));
        }

        Ok(Self {
            registry_path,
            validation_mode,
        })
    }

    pub fn registry_path(&self) -> &Path {
        &self.registry_path
    }

    pub fn validation_mode(&self) -> ValidationMode {
        self.validation_mode
    }
}

/// Resolve the registry path from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_REGISTRY_PATH`].
pub fn registry_path_from_env_value(value: Option<String>) -> PathBuf {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_PATH))
}

/// Parse the validation mode from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`ValidationMode::Strict`].
pub fn validation_mode_from_env_value(value: Option<String>) -> RegistryResult<ValidationMode> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());
    let parsed = value.map(|v| v.parse::<ValidationMode>()).transpose()?;

    Ok(parsed.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_config_rejects_empty_path() {
        let err = CoreConfig::new(PathBuf::new(), ValidationMode::Strict).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidInput(msg) if msg.contains("cannot be empty")));
    }

    #[test]
    fn test_core_config_accessors() {
        let config =
            CoreConfig::new(PathBuf::from("forms.json"), ValidationMode::Permissive).unwrap();
        assert_eq!(config.registry_path(), Path::new("forms.json"));
        assert_eq!(config.validation_mode(), ValidationMode::Permissive);
    }

    #[test]
    fn test_registry_path_defaults_when_unset_or_blank() {
        assert_eq!(
            registry_path_from_env_value(None),
            PathBuf::from(DEFAULT_REGISTRY_PATH)
        );
        assert_eq!(
            registry_path_from_env_value(Some("   ".into())),
            PathBuf::from(DEFAULT_REGISTRY_PATH)
        );
        assert_eq!(
            registry_path_from_env_value(Some(" /data/registry.json ".into())),
            PathBuf::from("/data/registry.json")
        );
    }

    #[test]
    fn test_validation_mode_from_env_value() {
        assert_eq!(
            validation_mode_from_env_value(None).unwrap(),
            ValidationMode::Strict
        );
        assert_eq!(
            validation_mode_from_env_value(Some("Permissive".into())).unwrap(),
            ValidationMode::Permissive
        );
        assert!(validation_mode_from_env_value(Some("lenient".into())).is_err());
    }
}
