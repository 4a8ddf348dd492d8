//! Transient upload storage.
//!
//! Uploads live in a fixed scratch directory only for the duration of one
//! request. Storage hands back an RAII guard; dropping the guard removes
//! the file, so every terminal state of the request pipeline, success or
//! failure, releases the file without per-path cleanup code.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Scratch directory for in-flight uploads.
pub struct UploadStore {
    dir: PathBuf,
}

impl UploadStore {
    /// Opens the store, creating the directory if absent.
    pub fn new(dir: impl Into<PathBuf>) -> io::Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Persists `bytes` under a per-request unique key derived from the
    /// sanitized client filename. The UUID prefix means concurrent uploads
    /// of the same filename never touch each other's file.
    pub fn store(&self, filename: &str, bytes: &[u8]) -> io::Result<StoredUpload> {
        let name = format!("{}_{}", Uuid::new_v4(), sanitize_filename(filename));
        let path = self.dir.join(name);
        fs::write(&path, bytes)?;
        Ok(StoredUpload { path })
    }
}

/// A stored upload that removes its file when dropped.
#[derive(Debug)]
pub struct StoredUpload {
    path: PathBuf,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoredUpload {
    fn drop(&mut self) {
        if let Err(err) = fs::remove_file(&self.path) {
            tracing::warn!(
                path = %self.path.display(),
                error = %err,
                "failed to remove stored upload"
            );
        }
    }
}

/// Strips path components and unsafe characters from a client filename.
///
/// Only the final path component survives, reduced to ASCII alphanumerics,
/// dots, dashes and underscores; leading and trailing dots are trimmed so a
/// name can never resolve outside the store.
pub fn sanitize_filename(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        "upload".to_string()
    } else {
        trimmed.to_string()
    }
}
