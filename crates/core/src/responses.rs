//! Checking a set of form responses against a form definition.
//!
//! This applies the entry rules the consuming application enforces in its form renderer: required
//! inputs, numeric bounds, ISO dates and option membership. Responses arrive as loosely typed JSON
//! because HTML inputs submit numbers as strings.

use crate::error::{RegistryError, RegistryResult};
use crate::model::{FieldDefinition, FieldType, FormDefinition};
use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// Responses keyed by field key.
pub type Responses = BTreeMap<String, Value>;

/// Date format used by `date` inputs.
const DATE_FORMAT: &str = "%Y-%m-%d";

/// A problem with one response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseIssue {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ResponseIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Reads a response as a finite number, accepting numeric strings.
pub fn number_response(responses: &Responses, key: &str) -> Option<f64> {
    as_finite_number(responses.get(key)?)
}

/// `"NaN"` and `"inf"` parse as `f64` but are not numbers a form can record.
fn as_finite_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

/// Reads a JSON object of responses from a file.
pub fn load_responses(path: &Path) -> RegistryResult<Responses> {
    let text = std::fs::read_to_string(path).map_err(|source| RegistryError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| {
        RegistryError::InvalidInput(format!(
            "{} is not a JSON object of responses: {e}",
            path.display()
        ))
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Checks `responses` against `form`, returning every issue found (empty when acceptable).
pub fn check_responses(form: &FormDefinition, responses: &Responses) -> Vec<ResponseIssue> {
    let mut issues = Vec::new();

    for field in &form.fields {
        let key = field.key.as_str();
        match responses.get(key) {
            Some(value) if !is_blank(value) => {
                if let Err(message) = check_value(field, value) {
                    issues.push(ResponseIssue {
                        field: key.to_owned(),
                        message,
                    });
                }
            }
            _ if field.is_required() => issues.push(ResponseIssue {
                field: key.to_owned(),
                message: "required".into(),
            }),
            _ => {}
        }
    }

    for key in responses.keys() {
        if form.field(key).is_none() {
            issues.push(ResponseIssue {
                field: key.clone(),
                message: format!("not a field of {}", form.form_id),
            });
        }
    }

    issues
}

fn check_value(field: &FieldDefinition, value: &Value) -> Result<(), String> {
    match &field.field_type {
        FieldType::Number => {
            let number = as_finite_number(value)
                .ok_or_else(|| format!("expected a number, got {value}"))?;

            if let Some(min) = field.min.as_ref().and_then(|n| n.as_f64()) {
                if number < min {
                    return Err(format!("{number} is below the minimum of {min}"));
                }
            }
            if let Some(max) = field.max.as_ref().and_then(|n| n.as_f64()) {
                if number > max {
                    return Err(format!("{number} is above the maximum of {max}"));
                }
            }
            Ok(())
        }
        FieldType::Date => {
            let text = value
                .as_str()
                .ok_or_else(|| format!("expected a date string, got {value}"))?;
            NaiveDate::parse_from_str(text.trim(), DATE_FORMAT)
                .map(|_| ())
                .map_err(|e| format!("'{text}' is not a YYYY-MM-DD date: {e}"))
        }
        FieldType::Select => {
            let known = match value {
                Value::String(s) => field.option_index(s).is_some(),
                Value::Number(n) => n
                    .as_u64()
                    .is_some_and(|i| (i as usize) < field.options().len()),
                _ => false,
            };
            if known {
                Ok(())
            } else {
                Err(format!("{value} is not one of the options"))
            }
        }
        FieldType::Checkbox => value
            .is_boolean()
            .then_some(())
            .ok_or_else(|| format!("expected true or false, got {value}")),
        FieldType::Text | FieldType::Textarea => value
            .is_string()
            .then_some(())
            .ok_or_else(|| format!("expected text, got {value}")),
        FieldType::Other(_) => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::builtin_catalog;
    use serde_json::json;

    fn responses(value: Value) -> Responses {
        serde_json::from_value(value).unwrap()
    }

    fn anthropometric() -> FormDefinition {
        builtin_catalog().unwrap().remove(0)
    }

    #[test]
    fn test_complete_responses_have_no_issues() {
        let r = responses(json!({
            "assessment_date": "2026-10-16",
            "height_cm": "162.5",
            "weight_kg": 58
        }));

        assert!(check_responses(&anthropometric(), &r).is_empty());
    }

    #[test]
    fn test_missing_required_fields_are_reported() {
        let r = responses(json!({"assessment_date": "2026-10-16", "height_cm": ""}));

        let issues = check_responses(&anthropometric(), &r);

        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["height_cm", "weight_kg"]);
        assert!(issues.iter().all(|i| i.message == "required"));
    }

    #[test]
    fn test_number_bounds() {
        let r = responses(json!({
            "assessment_date": "2026-10-16",
            "height_cm": 300,
            "weight_kg": "heavy",
            "muac_cm": 4
        }));

        let issues = check_responses(&anthropometric(), &r);

        assert_eq!(issues.len(), 3);
        assert_eq!(issues[0].to_string(), "height_cm: 300 is above the maximum of 250");
        assert!(issues[1].message.starts_with("expected a number"));
        assert_eq!(issues[2].message, "4 is below the minimum of 5");
    }

    #[test]
    fn test_invalid_date_is_reported() {
        let r = responses(json!({
            "assessment_date": "16/10/2026",
            "height_cm": 160,
            "weight_kg": 60
        }));

        let issues = check_responses(&anthropometric(), &r);

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].field, "assessment_date");
        assert!(issues[0].message.contains("YYYY-MM-DD"));
    }

    #[test]
    fn test_select_membership_and_unknown_keys() {
        let phq9 = builtin_catalog().unwrap().remove(1);
        let mut r = responses(json!({
            "screening_date": "2026-10-16",
            "q1_interest": "Sometimes",
            "q2_depressed": 2,
            "q10_extra": "x"
        }));
        for key in [
            "q3_sleep",
            "q4_energy",
            "q5_appetite",
            "q6_self_worth",
            "q7_concentration",
            "q8_movement",
            "q9_self_harm",
        ] {
            r.insert(key.into(), json!("Not at all"));
        }

        let issues = check_responses(&phq9, &r);

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].field, "q1_interest");
        assert_eq!(issues[1].field, "q10_extra");
        assert!(issues[1].message.starts_with("not a field of"));
    }

    #[test]
    fn test_number_response_accepts_numeric_strings() {
        let r = responses(json!({"a": " 12.5 ", "b": 3, "c": true}));

        assert_eq!(number_response(&r, "a"), Some(12.5));
        assert_eq!(number_response(&r, "b"), Some(3.0));
        assert_eq!(number_response(&r, "c"), None);
        assert_eq!(number_response(&r, "missing"), None);
    }

    #[test]
    fn test_non_finite_numbers_are_rejected() {
        let form = anthropometric();
        for bad in ["NaN", "inf", "-infinity"] {
            let r = responses(json!({
                "assessment_date": "2026-10-16",
                "height_cm": 160,
                "weight_kg": bad
            }));

            let issues = check_responses(&form, &r);

            assert_eq!(issues.len(), 1, "{bad}");
            assert_eq!(issues[0].field, "weight_kg");
            assert!(issues[0].message.starts_with("expected a number"));
            assert_eq!(number_response(&r, "weight_kg"), None);
        }
    }

    #[test]
    fn test_load_responses() {
        let temp = tempfile::TempDir::new().unwrap();
        let good = temp.path().join("good.json");
        let bad = temp.path().join("bad.json");
        std::fs::write(&good, r#"{"height_cm": 170, "sex": "male"}"#).unwrap();
        std::fs::write(&bad, "[1, 2]").unwrap();

        assert_eq!(load_responses(&good).unwrap()["sex"], json!("male"));
        assert!(matches!(
            load_responses(&bad).unwrap_err(),
            RegistryError::InvalidInput(_)
        ));
        assert!(matches!(
            load_responses(&temp.path().join("missing.json")).unwrap_err(),
            RegistryError::FileRead { .. }
        ));
    }

    #[test]
    fn test_checkbox_and_text_types() {
        let form: FormDefinition = serde_json::from_value(json!({
            "form_id": "consent_v1",
            "title": "Consent",
            "fields": [
                {"key": "agreed", "label": "Agreed", "type": "checkbox"},
                {"key": "notes", "label": "Notes", "type": "textarea"},
                {"key": "sig", "label": "Signature", "type": "signature_pad"}
            ]
        }))
        .unwrap();
        let r = responses(json!({"agreed": "yes", "notes": 5, "sig": {"strokes": []}}));

        let issues = check_responses(&form, &r);

        let fields: Vec<&str> = issues.iter().map(|i| i.field.as_str()).collect();
        assert_eq!(fields, vec!["agreed", "notes"]);
    }
}
