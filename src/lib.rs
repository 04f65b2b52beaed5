//! # lineview - virtual access to text files too large to load
//!
//! lineview opens multi-gigabyte text files without reading them into memory.
//! A single streaming pass builds a byte offset for every line; after that any
//! line range is one positioned read, searches re-stream the raw file, and sparse
//! line edits are written as one atomic whole-file rewrite.
//!
//! ## Architecture
//!
//! - [`error`] - Centralized error types and handling
//! - [`config`] - Engine and window configuration
//! - [`file_handler`] - Classification, line index, sessions, reads and edits
//! - [`search`] - Pattern compilation and streaming search
//! - [`render`] - Viewport window cache and its background worker
//! - [`engine`] - Path-level facade over the session registry
//! - [`ui`] - Terminal pager built on the engine
//! - [`app`] - Wiring for the interactive pager

// Core modules
pub mod config;
pub mod error;
pub mod file_handler;

// Core components
pub mod engine;
pub mod render;
pub mod search;

// Consumers
pub mod app;
pub mod ui;

// Re-export commonly used types for convenience
pub use config::{EngineConfig, WindowConfig};
pub use engine::{LargeFileEngine, SearchResults};
pub use error::{LineviewError, Result};

// Public API surface for external usage
pub use app::Application;
pub use file_handler::{EditSet, FileAccessor, LineRange, SessionInfo, WriteOutcome};
pub use search::{SearchMatch, SearchOptions};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
