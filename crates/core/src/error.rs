use crate::validation::{IssueSeverity, ValidationIssue};
use formreg_files::FilesError;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("registry not found: {}", path.display())]
    InputNotFound { path: PathBuf },
    #[error("registry unreadable: {0}")]
    InputUnreadable(#[source] FilesError),
    #[error("registry is malformed: {0}")]
    InputMalformed(String),

    #[error("{0}")]
    Locked(#[source] FilesError),
    #[error("{0}")]
    ConcurrentModification(#[source] FilesError),
    #[error("failed to write registry: {0}")]
    OutputWriteFailure(#[source] FilesError),
    #[error("failed to serialize registry: {0}")]
    Serialization(serde_json::Error),

    #[error(
        "{} candidate validation error(s), nothing was written: {}",
        error_count(.0),
        summarise(.0)
    )]
    Validation(Vec<ValidationIssue>),

    #[error("candidate file {}: {message}", path.display())]
    CandidateInput { path: PathBuf, message: String },
    #[error("invalid candidate list: {0}")]
    CandidateMalformed(String),

    #[error("unknown form: {0}")]
    UnknownForm(String),
    #[error("failed to read {}: {source}", path.display())]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type RegistryResult<T> = std::result::Result<T, RegistryError>;

fn error_count(issues: &[ValidationIssue]) -> usize {
    issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::Error)
        .count()
}

fn summarise(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .filter(|i| i.severity == IssueSeverity::Error)
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl From<FilesError> for RegistryError {
    fn from(err: FilesError) -> Self {
        match err {
            FilesError::NotFound { path } => RegistryError::InputNotFound { path },
            FilesError::NotAFile { .. } | FilesError::Unreadable { .. } => {
                RegistryError::InputUnreadable(err)
            }
            FilesError::Locked { .. } | FilesError::LockFailed { .. } => RegistryError::Locked(err),
            FilesError::ConcurrentModification { .. } => RegistryError::ConcurrentModification(err),
            FilesError::WriteFailed { .. } | FilesError::AtomicRenameFailed { .. } => {
                RegistryError::OutputWriteFailure(err)
            }
        }
    }
}
