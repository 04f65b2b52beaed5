//! Streaming line boundary index
//!
//! This module builds the byte-offset-per-line index that makes random access into
//! a large file possible. The file is streamed once in fixed-size chunks and each
//! chunk is scanned with SIMD-optimized `memchr` for newlines, so memory stays
//! bounded by the chunk size plus one `u64` per line regardless of file size.

use crate::error::{LineviewError, Result};
use memchr::memchr_iter;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncReadExt;

/// A `[start, end)` request in 0-based line numbers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineRange {
    pub start: u64,
    pub end: u64,
}

impl LineRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    /// Clamp both bounds into `[0, total_lines]`
    ///
    /// The result may be empty (`start >= end`); that is a valid request that
    /// yields no lines.
    pub fn clamp(self, total_lines: u64) -> Self {
        Self {
            start: self.start.min(total_lines),
            end: self.end.min(total_lines),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.start >= self.end
    }

    /// Number of lines covered (0 when empty)
    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn contains(&self, line: u64) -> bool {
        line >= self.start && line < self.end
    }
}

/// Converts bytes consumed into integer percentages
///
/// Intermediate values are strictly increasing and capped at 99 so that the only
/// 100 a caller ever sees is the one from [`ProgressTracker::finish`].
#[derive(Debug)]
pub struct ProgressTracker {
    total_bytes: u64,
    last_reported: Option<u8>,
}

impl ProgressTracker {
    pub fn new(total_bytes: u64) -> Self {
        Self {
            total_bytes,
            last_reported: None,
        }
    }

    /// Returns a percentage to report, or None if it has not advanced
    pub fn update(&mut self, consumed: u64) -> Option<u8> {
        if self.total_bytes == 0 {
            return None;
        }

        let percent = ((consumed as u128 * 100) / self.total_bytes as u128).min(99) as u8;
        match self.last_reported {
            Some(last) if percent <= last => None,
            _ => {
                self.last_reported = Some(percent);
                Some(percent)
            }
        }
    }

    /// The terminal progress value
    pub fn finish(&mut self) -> u8 {
        self.last_reported = Some(100);
        100
    }
}

/// Incremental newline scanner fed one chunk at a time
#[derive(Debug)]
pub struct LineIndexBuilder {
    /// line_offsets[n] = byte position after the nth newline (line_offsets[0] = 0)
    line_offsets: Vec<u64>,

    /// Bytes fed so far; the absolute position of the next chunk
    consumed: u64,
}

impl LineIndexBuilder {
    pub fn new() -> Self {
        Self {
            line_offsets: vec![0],
            consumed: 0,
        }
    }

    /// Scan the next chunk of the file for line starts
    pub fn feed(&mut self, chunk: &[u8]) {
        let base = self.consumed;
        self.line_offsets
            .extend(memchr_iter(b'\n', chunk).map(|pos| base + pos as u64 + 1));
        self.consumed += chunk.len() as u64;
    }

    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Seal the index once the stream has ended
    ///
    /// A final offset equal to the file size starts no real line (the file ended on
    /// a terminator, or is empty) and is dropped.
    pub fn finish(mut self) -> LineIndex {
        if self.line_offsets.last() == Some(&self.consumed) {
            self.line_offsets.pop();
        }
        self.line_offsets.shrink_to_fit();

        LineIndex {
            line_offsets: self.line_offsets,
            file_size: self.consumed,
        }
    }
}

impl Default for LineIndexBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Immutable line offset index for one file
///
/// Invariants: offsets are strictly increasing, start at 0 for a non-empty file,
/// and every offset is below `file_size`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineIndex {
    line_offsets: Vec<u64>,
    file_size: u64,
}

impl LineIndex {
    /// Index an in-memory buffer (tests and small inputs)
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut builder = LineIndexBuilder::new();
        builder.feed(data);
        builder.finish()
    }

    pub fn total_lines(&self) -> u64 {
        self.line_offsets.len() as u64
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn line_offsets(&self) -> &[u64] {
        &self.line_offsets
    }

    /// Byte offset where `line` begins
    pub fn line_start(&self, line: u64) -> Option<u64> {
        self.line_offsets.get(line as usize).copied()
    }

    /// Byte span `[byte_start, byte_end)` covering a line range
    ///
    /// The range is clamped first; None means there is nothing to read.
    pub fn byte_range(&self, range: LineRange) -> Option<(u64, u64)> {
        let range = range.clamp(self.total_lines());
        if range.is_empty() {
            return None;
        }

        let byte_start = self.line_offsets[range.start as usize];
        let byte_end = if range.end < self.total_lines() {
            self.line_offsets[range.end as usize]
        } else {
            self.file_size
        };
        Some((byte_start, byte_end))
    }
}

/// Build the line index for `path` in a single streaming pass
///
/// `on_progress` receives non-decreasing percentages of bytes consumed and always
/// a final 100. Any read error aborts the pass and no index is produced.
pub async fn build_line_index<F>(path: &Path, chunk_size: usize, mut on_progress: F) -> Result<LineIndex>
where
    F: FnMut(u8),
{
    let mut file = File::open(path).await.map_err(|e| {
        LineviewError::file_error(format!("Failed to open file: {}", path.display()), e)
    })?;
    let expected_size = file
        .metadata()
        .await
        .map_err(|e| LineviewError::file_error("Failed to get file metadata", e))?
        .len();

    log::debug!(
        "indexing {} ({} bytes, chunk {})",
        path.display(),
        expected_size,
        chunk_size
    );

    let mut tracker = ProgressTracker::new(expected_size);
    let mut builder = LineIndexBuilder::new();
    let mut buffer = vec![0u8; chunk_size.max(1)];

    loop {
        let read = file.read(&mut buffer).await.map_err(|e| {
            LineviewError::file_error(format!("Failed to read {}", path.display()), e)
        })?;
        if read == 0 {
            break;
        }

        builder.feed(&buffer[..read]);
        if let Some(percent) = tracker.update(builder.consumed()) {
            on_progress(percent);
        }
    }

    on_progress(tracker.finish());

    let index = builder.finish();
    log::info!(
        "indexed {}: {} lines, {} bytes",
        path.display(),
        index.total_lines(),
        index.file_size()
    );
    Ok(index)
}
