//! Engine configuration.
//!
//! Every tunable has a compiled-in default. With the `config` feature enabled the
//! values can also be read from a TOML file; keys that are absent keep their default.

use crate::error::{LineviewError, Result};
#[cfg(feature = "config")]
use std::path::Path;

/// Files at or above this size route through the engine (50MB)
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 50 * 1024 * 1024;

/// Read size for streaming passes (1MB)
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;

/// Cap on matches returned by a single collected search
pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 1000;

/// Characters of line text kept in a search match
pub const DEFAULT_MATCH_TEXT_LIMIT: usize = 200;

/// Lines fetched beyond each edge of the visible range
pub const DEFAULT_BUFFER_LINES: u64 = 20;

/// Eviction radius around the most recently fetched range
pub const DEFAULT_KEEP_DISTANCE: u64 = 500;

/// Viewport window tuning
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize), serde(default))]
pub struct WindowConfig {
    /// Lines fetched above and below the visible range
    pub buffer_lines: u64,
    /// Cached lines farther than this from the last fetch are dropped
    pub keep_distance: u64,
    /// Height of one line in scroll units (1 for terminals, pixels for GUIs)
    pub line_height: u64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            buffer_lines: DEFAULT_BUFFER_LINES,
            keep_distance: DEFAULT_KEEP_DISTANCE,
            line_height: 1,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "config", derive(serde::Deserialize), serde(default))]
pub struct EngineConfig {
    pub large_file_threshold: u64,
    pub chunk_size: usize,
    pub max_search_results: usize,
    pub match_text_limit: usize,
    pub window: WindowConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            match_text_limit: DEFAULT_MATCH_TEXT_LIMIT,
            window: WindowConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Reject values that would make streaming or windowing meaningless
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(LineviewError::config("chunk_size must be greater than zero"));
        }
        if self.match_text_limit == 0 {
            return Err(LineviewError::config(
                "match_text_limit must be greater than zero",
            ));
        }
        if self.window.line_height == 0 {
            return Err(LineviewError::config(
                "window.line_height must be greater than zero",
            ));
        }
        Ok(())
    }

    /// Parse a configuration from TOML text
    #[cfg(feature = "config")]
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| LineviewError::config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from an explicit file
    #[cfg(feature = "config")]
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LineviewError::file_error(format!("Failed to read config: {}", path.display()), e)
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `<config dir>/lineview/config.toml`, falling back to defaults when absent
    #[cfg(feature = "config")]
    pub fn load_default() -> Result<Self> {
        let Some(path) = dirs::config_dir().map(|dir| dir.join("lineview").join("config.toml"))
        else {
            return Ok(Self::default());
        };

        if path.is_file() {
            log::debug!("loading config from {}", path.display());
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }
}
