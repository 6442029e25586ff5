//! The in-memory registry and the append-if-absent merge.
//!
//! A [`Registry`] is an ordered list of [`StoredForm`]s with unique `form_id`s. Every stored form
//! keeps the JSON object it was read from next to its typed view (when it has one), and
//! serialisation always writes that original object. Records that were already in the file
//! therefore come back out with the same keys, key order and number spelling, even if this crate
//! does not model all of them.

use crate::error::{RegistryError, RegistryResult};
use crate::model::FormDefinition;
use formreg_types::FormId;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;

/// Indentation used when writing the registry file.
const REGISTRY_INDENT: &[u8] = b"    ";

/// A registry record: the exact JSON it is persisted as, plus a typed view when it has one.
///
/// Records already in the file only need a string `form_id`, a string `title` and a `fields`
/// array. Anything else the typed model rejects (an empty label, `"required": "true"`) leaves
/// the record without a typed view; it is still carried through merges unchanged and reported by
/// validation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredForm {
    form_id: String,
    title: String,
    typed: Result<FormDefinition, String>,
    raw: Value,
}

impl StoredForm {
    /// Wraps a new definition, deriving its persisted JSON from the typed view.
    pub fn from_definition(definition: FormDefinition) -> RegistryResult<Self> {
        let raw = serde_json::to_value(&definition).map_err(RegistryError::Serialization)?;
        Ok(Self {
            form_id: definition.form_id.as_str().to_owned(),
            title: definition.title.as_str().to_owned(),
            typed: Ok(definition),
            raw,
        })
    }

    /// The typed view, or `None` if the record does not fit the form model.
    pub fn definition(&self) -> Option<&FormDefinition> {
        self.typed.as_ref().ok()
    }

    /// Why the record has no typed view, with the offending path.
    pub fn schema_error(&self) -> Option<&str> {
        self.typed.as_ref().err().map(String::as_str)
    }

    pub fn form_id(&self) -> &str {
        &self.form_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Number of entries in the record's `fields` array.
    pub fn field_count(&self) -> usize {
        self.raw
            .get("fields")
            .and_then(Value::as_array)
            .map_or(0, Vec::len)
    }

    /// The JSON object written for this record.
    pub fn raw(&self) -> &Value {
        &self.raw
    }
}

/// Result of offering one candidate to the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeOutcome {
    Added { form_id: FormId, title: String },
    /// A form with this id already existed; the candidate was dropped unchanged.
    Skipped { form_id: FormId, title: String },
}

impl MergeOutcome {
    pub fn form_id(&self) -> &FormId {
        match self {
            MergeOutcome::Added { form_id, .. } | MergeOutcome::Skipped { form_id, .. } => form_id,
        }
    }

    pub fn is_added(&self) -> bool {
        matches!(self, MergeOutcome::Added { .. })
    }
}

impl std::fmt::Display for MergeOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MergeOutcome::Added { title, .. } => write!(f, "Added: {title}"),
            MergeOutcome::Skipped { title, .. } => write!(f, "Skipped (already exists): {title}"),
        }
    }
}

/// Per-candidate outcomes of a merge, in candidate order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MergeReport {
    pub outcomes: Vec<MergeOutcome>,
    /// Number of forms in the registry after the merge.
    pub total_forms: usize,
}

impl MergeReport {
    pub fn added_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_added()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.len() - self.added_count()
    }

    /// True if at least one candidate was appended.
    pub fn has_changes(&self) -> bool {
        self.outcomes.iter().any(MergeOutcome::is_added)
    }
}

/// Ordered collection of form definitions, unique by `form_id`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Registry {
    forms: Vec<StoredForm>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a registry document.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InputMalformed`] if the bytes are not JSON, the root is not an
    /// array, an element is not an object, an element lacks a string `form_id`, a string `title`
    /// or a `fields` array, or two elements share a `form_id`. Other schema mismatches do not
    /// fail the parse; see [`StoredForm::schema_error`].
    pub fn parse(bytes: &[u8]) -> RegistryResult<Self> {
        let root: Value = serde_json::from_slice(bytes)
            .map_err(|e| RegistryError::InputMalformed(format!("invalid JSON: {e}")))?;

        let elements = match root {
            Value::Array(elements) => elements,
            other => {
                return Err(RegistryError::InputMalformed(format!(
                    "root must be an array, found {}",
                    json_kind(&other)
                )));
            }
        };

        let mut forms = Vec::with_capacity(elements.len());
        let mut seen = HashSet::with_capacity(elements.len());
        for (index, raw) in elements.into_iter().enumerate() {
            let stored = parse_record(index, raw)?;

            if !seen.insert(stored.form_id.clone()) {
                return Err(RegistryError::InputMalformed(format!(
                    "[{index}] repeats form_id '{}'",
                    stored.form_id
                )));
            }
            if let Some(error) = stored.schema_error() {
                tracing::debug!("[{index}] has no typed view: {error}");
            }

            forms.push(stored);
        }

        Ok(Self { forms })
    }

    /// Serialises the registry as pretty-printed JSON with four-space indentation.
    ///
    /// Non-ASCII text is written as UTF-8, not as `\u` escapes.
    pub fn to_json_bytes(&self) -> RegistryResult<Vec<u8>> {
        let raws: Vec<&Value> = self.forms.iter().map(|f| &f.raw).collect();

        let mut buffer = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(REGISTRY_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
        raws.serialize(&mut serializer)
            .map_err(RegistryError::Serialization)?;
        Ok(buffer)
    }

    pub fn len(&self) -> usize {
        self.forms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.forms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StoredForm> {
        self.forms.iter()
    }

    pub fn contains(&self, form_id: &FormId) -> bool {
        self.stored(form_id.as_str()).is_some()
    }

    pub fn stored(&self, form_id: &str) -> Option<&StoredForm> {
        self.forms.iter().find(|f| f.form_id() == form_id)
    }

    pub fn get(&self, form_id: &str) -> Option<&FormDefinition> {
        self.stored(form_id).and_then(StoredForm::definition)
    }

    /// The candidates [`Registry::merge`] would append, in order.
    pub fn appendable<'a>(&self, candidates: &'a [FormDefinition]) -> Vec<&'a FormDefinition> {
        let mut present: HashSet<&str> = self.forms.iter().map(StoredForm::form_id).collect();
        candidates
            .iter()
            .filter(|&candidate| present.insert(candidate.form_id.as_str()))
            .collect()
    }

    /// Appends every candidate whose `form_id` is not already present.
    ///
    /// Existing records are never modified or reordered. Candidates are considered in order, so
    /// a batch that repeats an id keeps its first occurrence.
    pub fn merge(
        &mut self,
        candidates: impl IntoIterator<Item = FormDefinition>,
    ) -> RegistryResult<MergeReport> {
        let mut present: HashSet<String> =
            self.forms.iter().map(|f| f.form_id.clone()).collect();
        let mut outcomes = Vec::new();

        for candidate in candidates {
            let form_id = candidate.form_id.clone();
            let title = candidate.title.as_str().to_owned();

            if present.contains(form_id.as_str()) {
                tracing::debug!("skipping {}: form_id already present", form_id);
                outcomes.push(MergeOutcome::Skipped { form_id, title });
                continue;
            }

            tracing::debug!("appending {}", form_id);
            self.forms.push(StoredForm::from_definition(candidate)?);
            present.insert(form_id.as_str().to_owned());
            outcomes.push(MergeOutcome::Added { form_id, title });
        }

        Ok(MergeReport {
            outcomes,
            total_forms: self.forms.len(),
        })
    }
}

fn parse_record(index: usize, raw: Value) -> RegistryResult<StoredForm> {
    let Some(object) = raw.as_object() else {
        return Err(RegistryError::InputMalformed(format!(
            "[{index}] must be an object, found {}",
            json_kind(&raw)
        )));
    };

    let required_string = |key: &str| -> RegistryResult<String> {
        match object.get(key) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => Err(RegistryError::InputMalformed(format!(
                "[{index}].{key} must be a string, found {}",
                json_kind(other)
            ))),
            None => Err(RegistryError::InputMalformed(format!(
                "[{index}] is missing {key}"
            ))),
        }
    };
    let form_id = required_string("form_id")?;
    let title = required_string("title")?;

    match object.get("fields") {
        Some(Value::Array(_)) => {}
        Some(other) => {
            return Err(RegistryError::InputMalformed(format!(
                "[{index}].fields must be an array, found {}",
                json_kind(other)
            )));
        }
        None => {
            return Err(RegistryError::InputMalformed(format!(
                "[{index}] is missing fields"
            )));
        }
    }

    let typed = serde_path_to_error::deserialize::<_, FormDefinition>(&raw).map_err(|err| {
        let path = err.path().to_string();
        let source = err.into_inner();
        if path.is_empty() || path == "." {
            format!("form schema mismatch: {source}")
        } else {
            format!("form schema mismatch at {path}: {source}")
        }
    });

    Ok(StoredForm {
        form_id,
        title,
        typed,
        raw,
    })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
