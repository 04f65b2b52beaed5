//! Streaming whole-file rewrite for sparse line edits.
//!
//! Lines have variable byte length, so replacing one shifts every byte after it.
//! Instead of patching in place the original is streamed line by line into a
//! temporary file next to it, with edited lines substituted, and the temporary
//! file is renamed over the original. Readers that open the path see either the
//! old file or the new one, never a mix.
//!
//! Save strategy:
//! 1. Empty edit set: return immediately, the file is not touched
//! 2. Write to a temporary file in the target's directory
//! 3. Sync to disk and copy the original permissions
//! 4. Rename over the original (atomic on the same filesystem)

use crate::error::{LineviewError, Result};
use crate::file_handler::session::Session;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tempfile::NamedTempFile;

/// Buffer size for the streaming copy (4MB)
const COPY_BUFFER_SIZE: usize = 4 * 1024 * 1024;

/// Replacement text keyed by 1-based line number
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EditSet {
    edits: BTreeMap<u64, String>,
}

impl EditSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the replacement for `line`, returning any previous replacement
    pub fn insert(&mut self, line: u64, text: impl Into<String>) -> Option<String> {
        self.edits.insert(line, text.into())
    }

    pub fn get(&self, line: u64) -> Option<&str> {
        self.edits.get(&line).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.edits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &str)> {
        self.edits.iter().map(|(line, text)| (*line, text.as_str()))
    }

    /// Reject line numbers outside `[1, total_lines]` and replacements spanning lines
    pub fn validate(&self, total_lines: u64) -> Result<()> {
        if let Some((line, _)) = self
            .edits
            .iter()
            .find(|(_, text)| text.contains(['\n', '\r']))
        {
            return Err(LineviewError::invalid_edit(format!(
                "replacement for line {} contains a line break",
                line
            )));
        }
        if let Some((&first, _)) = self.edits.first_key_value() {
            if first == 0 {
                return Err(LineviewError::invalid_edit("line numbers start at 1"));
            }
        }
        if let Some((&last, _)) = self.edits.last_key_value() {
            if last > total_lines {
                return Err(LineviewError::invalid_edit(format!(
                    "line {} is past the end of the file ({} lines)",
                    last, total_lines
                )));
            }
        }
        Ok(())
    }
}

impl FromIterator<(u64, String)> for EditSet {
    fn from_iter<I: IntoIterator<Item = (u64, String)>>(iter: I) -> Self {
        Self {
            edits: iter.into_iter().collect(),
        }
    }
}

/// What a write did to the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// Nothing to apply; the file was not opened for writing
    Unchanged,
    Rewritten {
        lines_replaced: usize,
        bytes_written: u64,
    },
}

/// Apply `edits` to the session's file as one atomic rewrite
///
/// Waits for in-flight reads and searches on the session to finish, then holds
/// them off until the rewrite is done. On success the session is marked stale:
/// its offsets describe the old file. On failure the original file is untouched
/// and the temporary file is removed.
pub async fn write_edits(session: &Session, edits: &EditSet) -> Result<WriteOutcome> {
    if edits.is_empty() {
        return Ok(WriteOutcome::Unchanged);
    }
    edits.validate(session.total_lines())?;

    let _gate = session.write_gate().await;
    session.check_current().await?;

    let path = session.path().to_path_buf();
    let owned_edits = edits.clone();
    let outcome = tokio::task::spawn_blocking(move || rewrite_with_edits(&path, &owned_edits))
        .await
        .map_err(|e| LineviewError::other(format!("Edit writer task failed: {}", e)))??;

    session.mark_stale();
    log::info!(
        "rewrote {} with {} edited lines",
        session.path().display(),
        edits.len()
    );
    Ok(outcome)
}

/// Blocking rewrite: stream `path` into a sibling temp file, then rename over it
fn rewrite_with_edits(path: &Path, edits: &EditSet) -> Result<WriteOutcome> {
    let target_dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let temp_file = NamedTempFile::new_in(target_dir)
        .map_err(|e| LineviewError::file_error("Failed to create temporary file", e))?;

    let original = File::open(path).map_err(|e| {
        LineviewError::file_error(format!("Failed to open original file: {}", path.display()), e)
    })?;

    let (lines_replaced, bytes_written) = copy_with_edits(original, temp_file.as_file(), edits)?;

    temp_file
        .as_file()
        .sync_data()
        .map_err(|e| LineviewError::file_error("Failed to sync temporary file", e))?;

    match fs::metadata(path) {
        Ok(metadata) => {
            if let Err(err) = fs::set_permissions(temp_file.path(), metadata.permissions()) {
                log::warn!("could not copy permissions of {}: {}", path.display(), err);
            }
        }
        Err(err) => log::warn!("could not read permissions of {}: {}", path.display(), err),
    }

    temp_file.persist(path).map_err(|e| {
        LineviewError::file_error(
            format!("Failed to replace {} (rename failed)", path.display()),
            e.error,
        )
    })?;

    Ok(WriteOutcome::Rewritten {
        lines_replaced,
        bytes_written,
    })
}

/// Copy every line from `original` to `output`, substituting edited lines
///
/// Each edited line keeps the terminator it had (`\n`, `\r\n`, or none for a
/// final unterminated line).
fn copy_with_edits(original: File, output: &File, edits: &EditSet) -> Result<(usize, u64)> {
    let mut reader = BufReader::with_capacity(COPY_BUFFER_SIZE, original);
    let mut writer = BufWriter::with_capacity(COPY_BUFFER_SIZE, output);

    let mut line = Vec::new();
    let mut line_number = 0u64;
    let mut lines_replaced = 0usize;
    let mut bytes_written = 0u64;

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| LineviewError::file_error("Failed to read original file", e))?;
        if read == 0 {
            break;
        }
        line_number += 1;

        let written = match edits.get(line_number) {
            Some(replacement) => {
                let terminator = line_terminator(&line);
                writer.write_all(replacement.as_bytes())?;
                writer.write_all(terminator)?;
                lines_replaced += 1;
                replacement.len() + terminator.len()
            }
            None => {
                writer.write_all(&line)?;
                line.len()
            }
        };
        bytes_written += written as u64;
    }

    writer
        .flush()
        .map_err(|e| LineviewError::file_error("Failed to flush temporary file", e))?;
    Ok((lines_replaced, bytes_written))
}

fn line_terminator(line: &[u8]) -> &'static [u8] {
    if line.ends_with(b"\r\n") {
        b"\r\n"
    } else if line.ends_with(b"\n") {
        b"\n"
    } else {
        b""
    }
}
