//! Loading candidate form lists.
//!
//! Candidates are ordinary input data: a JSON or YAML document whose root is a list of form
//! definitions. Schema mismatches are reported with a best-effort path (for example
//! `[1].fields[3].options`) via `serde_path_to_error`.

use crate::constants::YAML_EXTENSIONS;
use crate::error::{RegistryError, RegistryResult};
use crate::model::FormDefinition;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CandidateFormat {
    Json,
    Yaml,
}

impl CandidateFormat {
    /// Picks the format from a file extension: `.yaml`/`.yml` are YAML, anything else JSON.
    pub fn from_path(path: &Path) -> Self {
        let is_yaml = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                YAML_EXTENSIONS
                    .iter()
                    .any(|yaml| ext.eq_ignore_ascii_case(yaml))
            })
            .unwrap_or(false);

        if is_yaml {
            CandidateFormat::Yaml
        } else {
            CandidateFormat::Json
        }
    }
}

/// Parses a candidate list from text.
///
/// # Errors
///
/// Returns [`RegistryError::CandidateMalformed`] if the text is not a list of form definitions.
pub fn parse_candidates(text: &str, format: CandidateFormat) -> RegistryResult<Vec<FormDefinition>> {
    let result = match format {
        CandidateFormat::Json => {
            let mut deserializer = serde_json::Deserializer::from_str(text);
            serde_path_to_error::deserialize::<_, Vec<FormDefinition>>(&mut deserializer)
                .map_err(|err| schema_mismatch(err.path().to_string(), err.into_inner().to_string()))
        }
        CandidateFormat::Yaml => {
            let deserializer = serde_yaml::Deserializer::from_str(text);
            serde_path_to_error::deserialize::<_, Vec<FormDefinition>>(deserializer)
                .map_err(|err| schema_mismatch(err.path().to_string(), err.into_inner().to_string()))
        }
    };

    result.map_err(RegistryError::CandidateMalformed)
}

fn schema_mismatch(path: String, source: String) -> String {
    let path = if path.is_empty() || path == "." {
        "<root>"
    } else {
        path.as_str()
    };
    format!("candidate schema mismatch at {path}: {source}")
}

/// Reads and parses a candidate file, choosing the format from its extension.
///
/// # Errors
///
/// Returns [`RegistryError::CandidateInput`] if the file cannot be read or parsed.
pub fn load_candidates(path: &Path) -> RegistryResult<Vec<FormDefinition>> {
    let text = std::fs::read_to_string(path).map_err(|e| RegistryError::CandidateInput {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    let candidates =
        parse_candidates(&text, CandidateFormat::from_path(path)).map_err(|e| match e {
            RegistryError::CandidateMalformed(message) => RegistryError::CandidateInput {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;

    tracing::info!(
        "loaded {} candidate form(s) from {}",
        candidates.len(),
        path.display()
    );
    Ok(candidates)
}
