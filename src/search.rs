//! Pattern search over indexed files.
//!
//! [`matcher`] compiles patterns with the ripgrep regex engine; [`stream`] runs
//! them over the raw file in chunks and reports matches to a sink or a stream.

pub mod matcher;
pub mod stream;

pub use matcher::{LineMatcher, SearchOptions};
pub use stream::{
    search_session, spawn_search, CollectSink, SearchEvent, SearchHandle, SearchLimits,
    SearchMatch, SearchSink, SearchStatus, SearchSummary,
};
