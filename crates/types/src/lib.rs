//! Validated primitive types shared across the form registry crates.
//!
//! These wrappers guarantee their invariants once constructed, so the rest of the workspace can
//! pass them around without re-checking. All of them (de)serialise as plain JSON strings and
//! validate on the way in, which means a malformed registry record fails at parse time with a
//! precise path instead of surfacing later as a confusing merge result.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,

    /// An identifier had leading or trailing whitespace
    #[error("Identifier '{0}' must not have leading or trailing whitespace")]
    SurroundingWhitespace(String),

    /// An identifier contained a control character
    #[error("Identifier contains a control character")]
    ControlCharacter,
}

/// A string type that guarantees non-empty content.
///
/// The input is stored exactly as given; only whitespace-only input is rejected. Used for
/// human-readable display strings such as form titles and field labels, which are written back
/// to the registry unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if input.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Identifiers are compared byte-for-byte, so unlike [`NonEmptyText`] they are never trimmed:
/// an id with stray whitespace is rejected rather than silently changed.
fn check_identifier(input: &str) -> Result<(), TextError> {
    if input.trim().is_empty() {
        return Err(TextError::Empty);
    }
    if input.trim() != input {
        return Err(TextError::SurroundingWhitespace(input.to_owned()));
    }
    if input.chars().any(char::is_control) {
        return Err(TextError::ControlCharacter);
    }
    Ok(())
}

/// Primary key of a form definition within the registry.
///
/// Examples: `anthropometric_assessment_v1`, `phq9_depression_screening_v1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FormId(String);

impl FormId {
    /// Parses a form identifier.
    ///
    /// # Errors
    ///
    /// Returns a [`TextError`] if the input is blank, has surrounding whitespace, or contains
    /// control characters.
    pub fn parse(input: impl Into<String>) -> Result<Self, TextError> {
        let input = input.into();
        check_identifier(&input)?;
        Ok(Self(input))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Key of a field, unique within its parent form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldKey(String);

impl FieldKey {
    /// Parses a field key with the same rules as [`FormId::parse`].
    pub fn parse(input: impl Into<String>) -> Result<Self, TextError> {
        let input = input.into();
        check_identifier(&input)?;
        Ok(Self(input))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! identifier_impls {
    ($ty:ident) => {
        impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl std::str::FromStr for $ty {
            type Err = TextError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(&self.0)
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $ty::parse(s).map_err(serde::de::Error::custom)
            }
        }
    };
}

identifier_impls!(FormId);
identifier_impls!(FieldKey);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_keeps_input_verbatim() {
        let text = NonEmptyText::new("  Height (cm) ").unwrap();
        assert_eq!(text.as_str(), "  Height (cm) ");

        let parsed: NonEmptyText = serde_json::from_str("\" L \"").unwrap();
        assert_eq!(serde_json::to_string(&parsed).unwrap(), "\" L \"");
    }

    #[test]
    fn test_non_empty_text_rejects_whitespace_only() {
        assert_eq!(NonEmptyText::new("   "), Err(TextError::Empty));
        assert_eq!(NonEmptyText::new(""), Err(TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_keeps_non_latin_script() {
        let text = NonEmptyText::new("ಎತ್ತರ (ಸೆಂ.ಮೀ)").unwrap();
        assert_eq!(text.as_str(), "ಎತ್ತರ (ಸೆಂ.ಮೀ)");
    }

    #[test]
    fn test_form_id_accepts_registry_style_ids() {
        let id = FormId::parse("phq9_depression_screening_v1").unwrap();
        assert_eq!(id.as_str(), "phq9_depression_screening_v1");
        assert_eq!(id.to_string(), "phq9_depression_screening_v1");
    }

    #[test]
    fn test_form_id_rejects_surrounding_whitespace() {
        let err = FormId::parse(" bmi_v1").unwrap_err();
        assert!(matches!(err, TextError::SurroundingWhitespace(id) if id == " bmi_v1"));
    }

    #[test]
    fn test_field_key_rejects_control_characters() {
        assert_eq!(FieldKey::parse("q1\n"), Err(TextError::SurroundingWhitespace("q1\n".into())));
        assert_eq!(FieldKey::parse("q1\u{0007}x"), Err(TextError::ControlCharacter));
    }

    #[test]
    fn test_identifiers_deserialize_with_validation() {
        let id: FormId = serde_json::from_str("\"gad7_anxiety_screening_v1\"").unwrap();
        assert_eq!(id.as_str(), "gad7_anxiety_screening_v1");

        let err = serde_json::from_str::<FieldKey>("\"  \"").unwrap_err();
        assert!(err.to_string().contains("cannot be empty"));
    }

    #[test]
    fn test_identifier_serializes_as_plain_string() {
        let key = FieldKey::parse("height_cm").unwrap();
        assert_eq!(serde_json::to_string(&key).unwrap(), "\"height_cm\"");
    }
}
