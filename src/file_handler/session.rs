//! Indexed per-file session state.
//!
//! A `Session` pairs a finished [`LineIndex`] with the fingerprint of the file it
//! was built from. Sessions never hold an open file handle: every read or search
//! opens its own. Once the file changes underneath (an edit rewrite or an external
//! modification) the session becomes stale and refuses further I/O.

use crate::error::{LineviewError, Result};
use crate::file_handler::line_index::{build_line_index, LineIndex};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::SystemTime;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Size and modification time of a file at a point in time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileFingerprint {
    pub len: u64,
    pub modified: Option<SystemTime>,
}

impl FileFingerprint {
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            len: metadata.len(),
            modified: metadata.modified().ok(),
        }
    }

    pub async fn probe(path: &Path) -> Result<Self> {
        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            LineviewError::file_error(format!("Failed to stat {}", path.display()), e)
        })?;
        Ok(Self::from_metadata(&metadata))
    }
}

/// Summary handed to callers that only need the shape of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionInfo {
    pub total_lines: u64,
    pub file_size: u64,
}

/// One indexed file
#[derive(Debug)]
pub struct Session {
    path: PathBuf,
    index: LineIndex,
    fingerprint: FileFingerprint,

    /// Set once the offsets no longer describe the file on disk
    stale: AtomicBool,

    /// Readers and searches share this; the edit writer takes it exclusively
    gate: RwLock<()>,
}

impl Session {
    /// Stream `path` once and build a session from it
    pub async fn index<F>(path: &Path, chunk_size: usize, on_progress: F) -> Result<Self>
    where
        F: FnMut(u8),
    {
        let fingerprint = FileFingerprint::probe(path).await?;
        let index = build_line_index(path, chunk_size, on_progress).await?;
        Ok(Self::from_parts(path, index, fingerprint))
    }

    pub fn from_parts(path: &Path, index: LineIndex, fingerprint: FileFingerprint) -> Self {
        Self {
            path: path.to_path_buf(),
            index,
            fingerprint,
            stale: AtomicBool::new(false),
            gate: RwLock::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.index
    }

    pub fn line_offsets(&self) -> &[u64] {
        self.index.line_offsets()
    }

    pub fn total_lines(&self) -> u64 {
        self.index.total_lines()
    }

    pub fn file_size(&self) -> u64 {
        self.index.file_size()
    }

    pub fn fingerprint(&self) -> FileFingerprint {
        self.fingerprint
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            total_lines: self.total_lines(),
            file_size: self.file_size(),
        }
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }

    pub(crate) fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    /// Fail with `StaleSession` unless the file still matches the indexed fingerprint
    ///
    /// A mismatch marks the session stale permanently.
    pub async fn check_current(&self) -> Result<()> {
        if self.is_stale() {
            return Err(LineviewError::stale(&self.path));
        }

        let current = FileFingerprint::probe(&self.path).await?;
        if current != self.fingerprint {
            log::warn!(
                "{} changed on disk since indexing ({} -> {} bytes)",
                self.path.display(),
                self.fingerprint.len,
                current.len
            );
            self.mark_stale();
            return Err(LineviewError::stale(&self.path));
        }
        Ok(())
    }

    pub(crate) async fn read_gate(&self) -> RwLockReadGuard<'_, ()> {
        self.gate.read().await
    }

    pub(crate) async fn write_gate(&self) -> RwLockWriteGuard<'_, ()> {
        self.gate.write().await
    }
}
