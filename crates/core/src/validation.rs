//! Structural validation of form definitions.
//!
//! The typed model already guarantees the shape of a definition (mandatory attributes present,
//! identifiers and titles non-empty). The checks here cover the relationships between attributes
//! that the consuming application relies on but never checks itself, such as `options` and
//! `scores` lining up by position. Stored records that do not fit the typed model at all are
//! reported by [`validate_stored`].
//!
//! Whether an [`IssueSeverity::Error`] blocks a merge is decided by the caller according to the
//! configured [`crate::config::ValidationMode`].

use crate::model::{FieldDefinition, FieldType, FormDefinition};
use crate::registry::StoredForm;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IssueSeverity {
    Warning,
    Error,
}

impl std::fmt::Display for IssueSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IssueSeverity::Warning => f.write_str("warning"),
            IssueSeverity::Error => f.write_str("error"),
        }
    }
}

/// A single problem found in a form definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    pub form_id: String,
    /// `None` for form-level issues.
    pub field_key: Option<String>,
    pub severity: IssueSeverity,
    pub message: String,
}

impl std::fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field_key {
            Some(key) => write!(
                f,
                "{} {}.{}: {}",
                self.severity, self.form_id, key, self.message
            ),
            None => write!(f, "{} {}: {}", self.severity, self.form_id, self.message),
        }
    }
}

/// Returns true if any issue in `issues` is an error.
pub fn has_errors(issues: &[ValidationIssue]) -> bool {
    issues.iter().any(|i| i.severity == IssueSeverity::Error)
}

/// Validates one form definition, returning every issue found (empty when clean).
pub fn validate_form(form: &FormDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    let form_id = form.form_id.as_str();

    if matches!(&form.auto_calculate, Some(names) if names.is_empty()) {
        issues.push(ValidationIssue {
            form_id: form_id.to_owned(),
            field_key: None,
            severity: IssueSeverity::Warning,
            message: "auto_calculate is present but empty".into(),
        });
    }

    let mut seen = HashSet::new();
    for field in &form.fields {
        if !seen.insert(field.key.as_str()) {
            issues.push(ValidationIssue {
                form_id: form_id.to_owned(),
                field_key: Some(field.key.as_str().to_owned()),
                severity: IssueSeverity::Error,
                message: "duplicate field key within form".into(),
            });
        }
        validate_field(form_id, field, &mut issues);
    }

    issues
}

/// Validates a record read from the registry, including one without a typed view.
pub fn validate_stored(stored: &StoredForm) -> Vec<ValidationIssue> {
    match (stored.definition(), stored.schema_error()) {
        (Some(definition), _) => validate_form(definition),
        (None, error) => vec![ValidationIssue {
            form_id: stored.form_id().to_owned(),
            field_key: None,
            severity: IssueSeverity::Error,
            message: error.unwrap_or("does not match the form schema").to_owned(),
        }],
    }
}

fn validate_field(form_id: &str, field: &FieldDefinition, issues: &mut Vec<ValidationIssue>) {
    let mut push = |severity: IssueSeverity, message: String| {
        issues.push(ValidationIssue {
            form_id: form_id.to_owned(),
            field_key: Some(field.key.as_str().to_owned()),
            severity,
            message,
        });
    };

    if !field.field_type.is_known() {
        push(
            IssueSeverity::Warning,
            format!("unknown field type '{}'", field.field_type),
        );
    }

    let has_numeric_constraints = field.min.is_some() || field.max.is_some() || field.step.is_some();
    if has_numeric_constraints && field.field_type != FieldType::Number {
        push(
            IssueSeverity::Warning,
            format!("min/max/step have no effect on a '{}' field", field.field_type),
        );
    }

    let min = field.min.as_ref().and_then(|n| n.as_f64());
    let max = field.max.as_ref().and_then(|n| n.as_f64());
    if let (Some(min), Some(max)) = (min, max) {
        if min > max {
            push(
                IssueSeverity::Error,
                format!("min ({min}) is greater than max ({max})"),
            );
        }
    }

    if let Some(step) = field.step.as_ref().and_then(|n| n.as_f64()) {
        if step <= 0.0 {
            push(
                IssueSeverity::Error,
                format!("step must be positive, got {step}"),
            );
        }
    }

    match (&field.options, &field.scores) {
        (Some(options), Some(scores)) if options.len() != scores.len() => push(
            IssueSeverity::Error,
            format!(
                "options ({}) and scores ({}) must have the same length",
                options.len(),
                scores.len()
            ),
        ),
        (None, Some(_)) => push(
            IssueSeverity::Error,
            "scores given without options".into(),
        ),
        _ => {}
    }

    if field.field_type == FieldType::Select && field.options().is_empty() {
        push(IssueSeverity::Error, "select field has no options".into());
    }

    if field.options.is_some() && field.field_type != FieldType::Select {
        push(
            IssueSeverity::Warning,
            format!("options have no effect on a '{}' field", field.field_type),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn form(fields: serde_json::Value) -> FormDefinition {
        serde_json::from_value(json!({
            "form_id": "test_form_v1",
            "title": "Test Form",
            "fields": fields
        }))
        .unwrap()
    }

    fn messages(issues: &[ValidationIssue]) -> Vec<&str> {
        issues.iter().map(|i| i.message.as_str()).collect()
    }

    #[test]
    fn test_validate_stored_reports_schema_mismatch() {
        let registry = crate::Registry::parse(
            json!([
                {"form_id": "v", "title": "V", "fields": [{"key": "sep", "label": "", "type": "text"}]},
                {"form_id": "s", "title": "S", "fields": [{"key": "q", "label": "Q", "type": "select"}]}
            ])
            .to_string()
            .as_bytes(),
        )
        .unwrap();

        let issues: Vec<ValidationIssue> = registry.iter().flat_map(validate_stored).collect();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].form_id, "v");
        assert_eq!(issues[0].severity, IssueSeverity::Error);
        assert!(issues[0].message.contains("fields[0].label"));
        assert_eq!(issues[1].message, "select field has no options");
    }

    #[test]
    fn test_clean_form_has_no_issues() {
        let form = form(json!([
            {"key": "screening_date", "label": "Screening Date", "type": "date", "required": true},
            {"key": "height_cm", "label": "Height (cm)", "type": "number", "min": 40, "max": 250, "step": 0.1},
            {"key": "q1", "label": "Q1", "type": "select", "options": ["No", "Yes"], "scores": [0, 1]}
        ]));

        assert!(validate_form(&form).is_empty());
    }

    #[test]
    fn test_options_scores_length_mismatch_is_error() {
        let form = form(json!([
            {"key": "q1", "label": "Q1", "type": "select", "options": ["No", "Yes"], "scores": [0, 1, 2]}
        ]));

        let issues = validate_form(&form);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Error);
        assert_eq!(issues[0].field_key.as_deref(), Some("q1"));
        assert!(issues[0].message.contains("same length"));
    }

    #[test]
    fn test_scores_without_options_is_error() {
        let form = form(json!([
            {"key": "q1", "label": "Q1", "type": "number", "scores": [0, 1]}
        ]));

        assert!(messages(&validate_form(&form)).contains(&"scores given without options"));
    }

    #[test]
    fn test_min_greater_than_max_is_error() {
        let form = form(json!([
            {"key": "weight_kg", "label": "Weight", "type": "number", "min": 300, "max": 1}
        ]));

        let issues = validate_form(&form);

        assert!(has_errors(&issues));
        assert!(issues[0].message.contains("greater than max"));
    }

    #[test]
    fn test_non_positive_step_is_error() {
        let form = form(json!([
            {"key": "weight_kg", "label": "Weight", "type": "number", "step": 0}
        ]));

        assert!(has_errors(&validate_form(&form)));
    }

    #[test]
    fn test_duplicate_field_key_is_error() {
        let form = form(json!([
            {"key": "q1", "label": "Q1", "type": "date"},
            {"key": "q1", "label": "Q1 again", "type": "date"}
        ]));

        let issues = validate_form(&form);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].message, "duplicate field key within form");
    }

    #[test]
    fn test_select_without_options_is_error() {
        let form = form(json!([{"key": "q1", "label": "Q1", "type": "select"}]));

        assert_eq!(
            messages(&validate_form(&form)),
            vec!["select field has no options"]
        );
    }

    #[test]
    fn test_unknown_type_is_only_a_warning() {
        let form = form(json!([{"key": "sig", "label": "Signature", "type": "signature_pad"}]));

        let issues = validate_form(&form);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, IssueSeverity::Warning);
        assert!(!has_errors(&issues));
    }

    #[test]
    fn test_misplaced_attributes_are_warnings() {
        let form = form(json!([
            {"key": "notes", "label": "Notes", "type": "text", "min": 1, "options": ["a"]}
        ]));

        let issues = validate_form(&form);

        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == IssueSeverity::Warning));
    }

    #[test]
    fn test_empty_auto_calculate_is_warning() {
        let form: FormDefinition = serde_json::from_value(json!({
            "form_id": "x", "title": "X", "auto_calculate": [], "fields": []
        }))
        .unwrap();

        let issues = validate_form(&form);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field_key, None);
        assert_eq!(issues[0].to_string(), "warning x: auto_calculate is present but empty");
    }

    #[test]
    fn test_issue_display_includes_field_key() {
        let issue = ValidationIssue {
            form_id: "phq9".into(),
            field_key: Some("q1".into()),
            severity: IssueSeverity::Error,
            message: "select field has no options".into(),
        };

        assert_eq!(issue.to_string(), "error phq9.q1: select field has no options");
    }
}
