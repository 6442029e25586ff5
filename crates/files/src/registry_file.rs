//! Scoped registry file handle.
//!
//! [`RegistryFile`] is the only type in the workspace that opens the registry for writing. It
//! combines three guarantees:
//!
//! - **Exclusive access**: a sidecar `<name>.lock` file is created with `create_new` when the
//!   handle is opened and removed when it is dropped
//! - **Whole-document writes**: bytes are written to `<name>.tmp`, synced, then renamed over the
//!   registry
//! - **Lost-update detection**: the SHA-256 digest recorded at load time must still match the
//!   file on disk immediately before the rename
//!
//! The lock is advisory. Tools that edit the registry without going through this type are not
//! blocked, which is what the digest check is for.

use crate::constants::{LOCK_SUFFIX, TEMP_SUFFIX};
use crate::{FilesError, FilesResult};
use sha2::{Digest, Sha256};
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Hex-encoded SHA-256 digest of a registry document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ContentDigest(String);

impl ContentDigest {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Computes the SHA-256 digest of `bytes`.
pub fn content_digest(bytes: &[u8]) -> ContentDigest {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    ContentDigest(hex::encode(hasher.finalize()))
}

/// Bytes read from the registry together with their digest.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub bytes: Vec<u8>,
    pub digest: ContentDigest,
}

/// Removes the lock file when dropped.
#[derive(Debug)]
struct LockGuard {
    lock_path: PathBuf,
}

impl LockGuard {
    fn acquire(lock_path: PathBuf) -> FilesResult<Self> {
        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&lock_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                return Err(FilesError::Locked { lock_path });
            }
            Err(source) => return Err(FilesError::LockFailed { lock_path, source }),
        };

        // Owner pid helps an operator decide whether a leftover lock is stale.
        if let Err(source) = writeln!(file, "{}", std::process::id()) {
            let _ = fs::remove_file(&lock_path);
            return Err(FilesError::LockFailed { lock_path, source });
        }

        tracing::debug!("acquired registry lock {}", lock_path.display());
        Ok(Self { lock_path })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        match fs::remove_file(&self.lock_path) {
            Ok(()) => tracing::debug!("released registry lock {}", self.lock_path.display()),
            Err(e) => tracing::warn!(
                "failed to release registry lock {}: {}",
                self.lock_path.display(),
                e
            ),
        }
    }
}

/// Exclusive, scoped access to one registry file.
///
/// Not `Clone`: the lock belongs to exactly one handle.
#[derive(Debug)]
pub struct RegistryFile {
    path: PathBuf,
    lock: LockGuard,
}

impl RegistryFile {
    /// Opens an existing registry file and takes its lock.
    ///
    /// Existence is checked before the lock is taken, so a missing registry never leaves a lock
    /// file behind.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - the file does not exist or is not a regular file
    /// - its metadata cannot be read
    /// - another run already holds the lock, or the lock cannot be created
    pub fn open(path: &Path) -> FilesResult<Self> {
        let metadata = match fs::metadata(path) {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(FilesError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(source) => {
                return Err(FilesError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        if !metadata.is_file() {
            return Err(FilesError::NotAFile {
                path: path.to_path_buf(),
            });
        }

        let lock = LockGuard::acquire(sibling_path(path, LOCK_SUFFIX))?;

        Ok(Self {
            path: path.to_path_buf(),
            lock,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path of the sidecar lock file held by this handle.
    pub fn lock_path(&self) -> &Path {
        &self.lock.lock_path
    }

    /// Reads the whole registry file.
    pub fn read(&self) -> FilesResult<LoadedFile> {
        let bytes = fs::read(&self.path).map_err(|source| FilesError::Unreadable {
            path: self.path.clone(),
            source,
        })?;
        let digest = content_digest(&bytes);
        tracing::debug!(
            "read {} bytes from {} (sha256 {})",
            bytes.len(),
            self.path.display(),
            digest
        );
        Ok(LoadedFile { bytes, digest })
    }

    /// Replaces the registry contents with `bytes`.
    ///
    /// `expected` is the digest returned by [`RegistryFile::read`]. If the file on disk no
    /// longer matches it, nothing is written.
    ///
    /// # Returns
    ///
    /// The digest of the newly written contents.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if the file changed since it was read, or if creating, writing,
    /// syncing or renaming the temporary file fails. On failure the temporary file is removed
    /// and the registry is left as it was.
    pub fn write_atomic(&self, bytes: &[u8], expected: &ContentDigest) -> FilesResult<ContentDigest> {
        let current = fs::read(&self.path).map_err(|source| FilesError::Unreadable {
            path: self.path.clone(),
            source,
        })?;
        let found = content_digest(&current);
        if &found != expected {
            return Err(FilesError::ConcurrentModification {
                path: self.path.clone(),
                expected: expected.clone(),
                found,
            });
        }

        let temp_path = sibling_path(&self.path, TEMP_SUFFIX);
        if let Err(e) = write_and_sync(&temp_path, bytes) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if let Err(source) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(FilesError::AtomicRenameFailed {
                temp_path,
                target_path: self.path.clone(),
                source,
            });
        }

        let digest = content_digest(bytes);
        tracing::info!(
            "wrote {} bytes to {} (sha256 {})",
            bytes.len(),
            self.path.display(),
            digest
        );
        Ok(digest)
    }
}

fn write_and_sync(temp_path: &Path, bytes: &[u8]) -> FilesResult<()> {
    let failed = |operation: &'static str, source: std::io::Error| FilesError::WriteFailed {
        operation,
        path: temp_path.to_path_buf(),
        source,
    };

    let mut file = File::create(temp_path).map_err(|e| failed("create", e))?;
    file.write_all(bytes).map_err(|e| failed("write", e))?;
    file.sync_all().map_err(|e| failed("sync", e))?;
    Ok(())
}

/// `dir/registry.json` + `.lock` -> `dir/registry.json.lock`
fn sibling_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}
