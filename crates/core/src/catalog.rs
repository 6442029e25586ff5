//! Built-in assessment forms.
//!
//! The catalog is a JSON asset compiled into the binary and parsed exactly like an external
//! candidate file, so changing a form means editing `catalog/assessment_forms.json`, not code.

use crate::candidates::{parse_candidates, CandidateFormat};
use crate::error::RegistryResult;
use crate::model::FormDefinition;

const ASSESSMENT_FORMS_JSON: &str = include_str!("../catalog/assessment_forms.json");

/// Returns the built-in assessment forms: anthropometry, PHQ-9 and GAD-7.
pub fn builtin_catalog() -> RegistryResult<Vec<FormDefinition>> {
    parse_candidates(ASSESSMENT_FORMS_JSON, CandidateFormat::Json)
}
