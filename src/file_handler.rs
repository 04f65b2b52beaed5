//! Indexed file access for files too large to load.
//!
//! This module provides the core file access functionality for lineview:
//! size classification, the streaming line index, per-file sessions and their
//! registry, random-access line reads and atomic line edits.

pub mod accessor;
pub mod classify;
pub mod line_index;
pub mod reader;
pub mod registry;
pub mod session;
pub mod writer;

// Re-export the main types for convenience
pub use accessor::FileAccessor;
pub use classify::{classify, validate_file_path};
pub use line_index::{build_line_index, LineIndex, LineIndexBuilder, LineRange};
pub use reader::read_lines;
pub use registry::{SessionRegistry, SessionState};
pub use session::{FileFingerprint, Session, SessionInfo};
pub use writer::{write_edits, EditSet, WriteOutcome};
