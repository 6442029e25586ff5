//! Form definition data model.
//!
//! These structs are the typed view of one registry record. They are deliberately lenient about
//! what they do not understand: attributes outside the known set are kept in `extra` and written
//! back unchanged, and field types outside the known set parse as [`FieldType::Other`].
//!
//! Numeric attributes use [`serde_json::Number`] rather than `f64`. With `arbitrary_precision`
//! enabled a number keeps its source spelling, so `40`, `1e2` and `0.10` are written back as
//! `40`, `1e2` and `0.10`.

use formreg_types::{FieldKey, FormId, NonEmptyText};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};

/// A data-collection form as stored in the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormDefinition {
    /// Primary key, unique across the registry.
    pub form_id: FormId,

    pub title: NonEmptyText,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Names of values the consuming application derives from the raw inputs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_calculate: Option<Vec<String>>,

    /// Fields in display and entry order.
    pub fields: Vec<FieldDefinition>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FormDefinition {
    /// Looks up a field by key.
    pub fn field(&self, key: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.key.as_str() == key)
    }

    /// Derivation names, empty when the form declares none.
    pub fn auto_calculate(&self) -> &[String] {
        self.auto_calculate.as_deref().unwrap_or(&[])
    }
}

/// One input on a form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    /// Unique within the parent form.
    pub key: FieldKey,

    pub label: NonEmptyText,

    #[serde(rename = "type")]
    pub field_type: FieldType,

    /// `None` means absent from the record, which the consuming application treats as `false`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<Number>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    /// Weights aligned by position with `options`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scores: Option<Vec<Number>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FieldDefinition {
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    pub fn options(&self) -> &[String] {
        self.options.as_deref().unwrap_or(&[])
    }

    /// Score for the option at `index`, if the field is scored and the index is in range.
    pub fn score_at(&self, index: usize) -> Option<f64> {
        self.scores
            .as_ref()
            .and_then(|scores| scores.get(index))
            .and_then(Number::as_f64)
    }

    /// Index of the option whose display text equals `option`.
    pub fn option_index(&self, option: &str) -> Option<usize> {
        self.options().iter().position(|o| o == option)
    }
}

/// The input kind of a field.
///
/// The registry format has no closed list of kinds, so anything unrecognised is carried through
/// as `Other` and written back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldType {
    Date,
    Number,
    Select,
    Text,
    Textarea,
    Checkbox,
    Other(String),
}

impl FieldType {
    pub fn as_str(&self) -> &str {
        match self {
            FieldType::Date => "date",
            FieldType::Number => "number",
            FieldType::Select => "select",
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::Checkbox => "checkbox",
            FieldType::Other(name) => name,
        }
    }

    /// Parses a type name. Never fails: unknown names become [`FieldType::Other`].
    pub fn parse(name: &str) -> Self {
        match name {
            "date" => FieldType::Date,
            "number" => FieldType::Number,
            "select" => FieldType::Select,
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "checkbox" => FieldType::Checkbox,
            other => FieldType::Other(other.to_owned()),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, FieldType::Other(_))
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FieldType {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for FieldType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        Ok(FieldType::parse(&name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn phq_item() -> Value {
        json!({
            "key": "q1_interest",
            "label": "1. Little interest or pleasure in doing things",
            "type": "select",
            "required": true,
            "options": ["Not at all", "Several days", "More than half the days", "Nearly every day"],
            "scores": [0, 1, 2, 3]
        })
    }

    #[test]
    fn test_field_parses_select_with_scores() {
        let field: FieldDefinition = serde_json::from_value(phq_item()).unwrap();

        assert_eq!(field.key.as_str(), "q1_interest");
        assert_eq!(field.field_type, FieldType::Select);
        assert!(field.is_required());
        assert_eq!(field.option_index("Several days"), Some(1));
        assert_eq!(field.score_at(3), Some(3.0));
        assert_eq!(field.score_at(4), None);
    }

    #[test]
    fn test_field_required_defaults_to_false() {
        let field: FieldDefinition = serde_json::from_value(json!({
            "key": "muac_cm",
            "label": "MUAC (cm)",
            "type": "number"
        }))
        .unwrap();

        assert!(!field.is_required());
        assert_eq!(field.required, None);
    }

    #[test]
    fn test_field_serialization_keeps_number_representation() {
        let raw = json!({
            "key": "height_cm",
            "label": "Height (cm)",
            "type": "number",
            "required": true,
            "min": 40,
            "max": 250,
            "step": 0.1
        });
        let field: FieldDefinition = serde_json::from_value(raw.clone()).unwrap();

        let text = serde_json::to_string(&field).unwrap();

        assert_eq!(
            text,
            r#"{"key":"height_cm","label":"Height (cm)","type":"number","required":true,"min":40,"max":250,"step":0.1}"#
        );
        assert_eq!(serde_json::to_value(&field).unwrap(), raw);
    }

    #[test]
    fn test_unknown_type_is_tolerated_and_written_back() {
        let field: FieldDefinition = serde_json::from_value(json!({
            "key": "photo",
            "label": "Photo",
            "type": "image_upload"
        }))
        .unwrap();

        assert_eq!(field.field_type, FieldType::Other("image_upload".into()));
        assert!(!field.field_type.is_known());
        assert_eq!(serde_json::to_value(&field).unwrap()["type"], "image_upload");
    }

    #[test]
    fn test_unknown_attributes_survive_round_trip() {
        let raw = json!({
            "form_id": "household_survey_v1",
            "title": "Household Survey",
            "category": "household",
            "fields": [{
                "key": "water_source",
                "label": "Water source",
                "type": "select",
                "options": ["Tap", "Well"],
                "placeholder": "Choose one"
            }]
        });

        let form: FormDefinition = serde_json::from_value(raw.clone()).unwrap();

        assert_eq!(form.extra.get("category"), Some(&json!("household")));
        assert_eq!(form.fields[0].extra.get("placeholder"), Some(&json!("Choose one")));
        assert_eq!(serde_json::to_value(&form).unwrap(), raw);
    }

    #[test]
    fn test_form_requires_mandatory_attributes() {
        let err = serde_json::from_value::<FormDefinition>(json!({
            "form_id": "a",
            "title": "A"
        }))
        .unwrap_err();
        assert!(err.to_string().contains("fields"));

        let err = serde_json::from_value::<FormDefinition>(json!({
            "form_id": "",
            "title": "A",
            "fields": []
        }))
        .unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_form_field_lookup_and_auto_calculate() {
        let form: FormDefinition = serde_json::from_value(json!({
            "form_id": "phq9_depression_screening_v1",
            "title": "PHQ-9 Depression Screening",
            "auto_calculate": ["total_score", "severity"],
            "fields": [phq_item()]
        }))
        .unwrap();

        assert!(form.field("q1_interest").is_some());
        assert!(form.field("q2_depressed").is_none());
        assert_eq!(form.auto_calculate(), ["total_score", "severity"]);
    }
}
