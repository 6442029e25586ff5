//! # formreg core
//!
//! Core logic for the form registry: the JSON file of data-collection form definitions that the
//! consuming application renders as dynamic forms.
//!
//! This crate contains pure data operations:
//! - The typed form model ([`model`]) and the ordered, id-unique [`Registry`]
//! - The append-if-absent merge and its per-candidate [`MergeReport`]
//! - Structural validation of definitions ([`validation`])
//! - Candidate loading from JSON/YAML files and the built-in [`catalog`]
//! - Reference `auto_calculate` derivations ([`derive`]) and response checks ([`responses`])
//!
//! **No byte-level file handling**: locking, digests and atomic writes live in `formreg_files`.
//! **No process concerns**: environment variables and argument parsing belong to the binaries.

pub mod candidates;
pub mod catalog;
pub mod config;
pub mod constants;
pub mod derive;
pub mod error;
pub mod model;
pub mod registry;
pub mod responses;
pub mod validation;

pub use config::{CoreConfig, ValidationMode};
pub use error::{RegistryError, RegistryResult};
pub use model::{FieldDefinition, FieldType, FormDefinition};
pub use registry::{MergeOutcome, MergeReport, Registry, StoredForm};
pub use validation::{IssueSeverity, ValidationIssue};

use formreg_files::RegistryFile;
use std::path::Path;

/// Registry operations bound to one configured registry file.
#[derive(Clone, Debug)]
pub struct RegistryService {
    config: CoreConfig,
}

impl RegistryService {
    /// Creates a new instance of RegistryService.
    pub fn new(config: CoreConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// Loads the registry.
    ///
    /// The registry lock is held while reading so a concurrent merge is never observed half
    /// way through, and released before returning.
    pub fn load(&self) -> RegistryResult<Registry> {
        let file = RegistryFile::open(self.config.registry_path())?;
        let loaded = file.read()?;
        let registry = Registry::parse(&loaded.bytes)?;
        tracing::info!(
            "loaded {} form(s) from {}",
            registry.len(),
            file.path().display()
        );
        Ok(registry)
    }

    /// Returns one stored form by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownForm`] if no form has this id.
    pub fn form(&self, form_id: &str) -> RegistryResult<StoredForm> {
        self.load()?
            .stored(form_id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownForm(form_id.to_owned()))
    }

    /// Validates every form currently in the registry.
    pub fn validate_registry(&self) -> RegistryResult<Vec<ValidationIssue>> {
        let registry = self.load()?;
        Ok(registry
            .iter()
            .flat_map(validation::validate_stored)
            .collect())
    }

    /// Merges `candidates` into the registry file.
    ///
    /// The whole run holds the registry lock: load, validate, merge, then write the complete
    /// document atomically. Only candidates that will be appended are validated; one whose
    /// `form_id` is already present is skipped whatever it contains. If every candidate is
    /// skipped the file is left untouched.
    ///
    /// # Errors
    ///
    /// Any error aborts the run before the registry file is modified:
    /// - [`RegistryError::InputNotFound`] / [`RegistryError::InputUnreadable`] /
    ///   [`RegistryError::InputMalformed`] for a bad registry
    /// - [`RegistryError::Locked`] if another run holds the lock
    /// - [`RegistryError::Validation`] if strict validation rejects a candidate
    /// - [`RegistryError::ConcurrentModification`] if the file changed while the run held it
    /// - [`RegistryError::OutputWriteFailure`] if the new document cannot be written
    pub fn merge_candidates(&self, candidates: Vec<FormDefinition>) -> RegistryResult<MergeReport> {
        let file = RegistryFile::open(self.config.registry_path())?;
        let loaded = file.read()?;
        let mut registry = Registry::parse(&loaded.bytes)?;

        for stored in registry.iter() {
            for issue in validation::validate_stored(stored) {
                tracing::debug!("existing record: {}", issue);
            }
        }
        self.check_candidates(&registry.appendable(&candidates))?;

        let report = registry.merge(candidates)?;
        for outcome in &report.outcomes {
            tracing::debug!("{}", outcome);
        }

        if report.has_changes() {
            let bytes = registry.to_json_bytes()?;
            file.write_atomic(&bytes, &loaded.digest)?;
        } else {
            tracing::info!(
                "no new forms, {} left unchanged",
                file.path().display()
            );
        }

        Ok(report)
    }

    /// Loads candidates from a JSON or YAML file and merges them.
    pub fn merge_file(&self, candidates_path: &Path) -> RegistryResult<MergeReport> {
        let candidates = candidates::load_candidates(candidates_path)?;
        self.merge_candidates(candidates)
    }

    /// Merges the built-in assessment catalog.
    pub fn seed_builtin(&self) -> RegistryResult<MergeReport> {
        self.merge_candidates(catalog::builtin_catalog()?)
    }

    fn check_candidates(&self, candidates: &[&FormDefinition]) -> RegistryResult<()> {
        let issues: Vec<ValidationIssue> = candidates
            .iter()
            .flat_map(|candidate| validation::validate_form(candidate))
            .collect();

        for issue in &issues {
            tracing::warn!("candidate {}", issue);
        }

        match self.config.validation_mode() {
            ValidationMode::Strict if validation::has_errors(&issues) => {
                Err(RegistryError::Validation(issues))
            }
            _ => Ok(()),
        }
    }
}
