//! Registry file access for formreg.
//!
//! The form registry is a single JSON file shared by everything that reads or edits it. This
//! crate owns the byte-level concerns of touching that file so the rest of the workspace only
//! ever sees whole, consistent documents:
//!
//! - Access is scoped: a [`RegistryFile`] holds an exclusive sidecar lock from construction until
//!   it is dropped, on every exit path including errors
//! - Reads return the bytes together with their SHA-256 [`ContentDigest`]
//! - Writes go to a sibling temporary file, are flushed and synced, then renamed over the
//!   destination, so readers never observe a truncated registry
//! - Before the rename the on-disk digest is compared with the one recorded at load time, and a
//!   mismatch aborts the write instead of discarding someone else's update
//!
//! ## Layout
//!
//! ```text
//! src/data/forms/
//! ├── registry.json        # the registry itself
//! ├── registry.json.lock   # present only while a run holds the lock
//! └── registry.json.tmp    # present only between write and rename
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use formreg_files::RegistryFile;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let file = RegistryFile::open(Path::new("src/data/forms/registry.json"))?;
//! let loaded = file.read()?;
//! file.write_atomic(&loaded.bytes, &loaded.digest)?;
//! # Ok(())
//! # }
//! ```

mod constants;
mod registry_file;

pub use constants::{LOCK_SUFFIX, TEMP_SUFFIX};
pub use registry_file::{content_digest, ContentDigest, LoadedFile, RegistryFile};

use std::path::PathBuf;

/// Errors that can occur while accessing the registry file
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// The registry file does not exist
    #[error("Registry file not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// The registry path exists but is not a regular file
    #[error("Registry path is not a file: {}", path.display())]
    NotAFile { path: PathBuf },

    /// The registry file exists but could not be read
    #[error("Failed to read registry file {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another process holds the registry lock
    #[error(
        "Registry is locked by another run (remove {} if no run is active)",
        lock_path.display()
    )]
    Locked { lock_path: PathBuf },

    /// The lock file could not be created
    #[error("Failed to create lock file {}: {source}", lock_path.display())]
    LockFailed {
        lock_path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The registry changed on disk after it was loaded
    #[error(
        "Registry {} was modified by another writer since it was loaded (expected {expected}, found {found})",
        path.display()
    )]
    ConcurrentModification {
        path: PathBuf,
        expected: ContentDigest,
        found: ContentDigest,
    },

    /// Writing the temporary file failed
    #[error("Failed to {operation} {}: {source}", path.display())]
    WriteFailed {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Renaming the temporary file over the registry failed
    #[error(
        "Failed to replace {} with {}: {source}",
        target_path.display(),
        temp_path.display()
    )]
    AtomicRenameFailed {
        temp_path: PathBuf,
        target_path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for registry file operations.
pub type FilesResult<T> = Result<T, FilesError>;
