//! Application wiring for the interactive pager
//!
//! Connects the engine, the crossterm input thread and the ratatui terminal,
//! then hands control to [`run_pager`].

use crate::config::EngineConfig;
use crate::engine::LargeFileEngine;
use crate::error::{LineviewError, Result};
use crate::ui::{run_pager, spawn_input_thread, PagerOptions, TerminalUI};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// How often the input thread re-checks its shutdown flag
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct Application {
    engine: LargeFileEngine,
}

impl Application {
    pub fn new(config: EngineConfig) -> Result<Self> {
        Ok(Self {
            engine: LargeFileEngine::new(config)?,
        })
    }

    pub fn engine(&self) -> &LargeFileEngine {
        &self.engine
    }

    /// Page through `path` in the terminal until the user quits
    pub async fn view(&self, path: &Path, options: PagerOptions) -> Result<()> {
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = Arc::new(AtomicBool::new(false));
        let input = spawn_input_thread(tx, Arc::clone(&shutdown), INPUT_POLL_INTERVAL);

        let mut terminal = TerminalUI::new();
        let result = run_pager(&self.engine, path, options, &mut terminal, rx).await;

        shutdown.store(true, Ordering::SeqCst);
        tokio::task::spawn_blocking(move || input.join())
            .await
            .map_err(|e| LineviewError::ui(format!("input thread did not stop: {}", e)))?
            .map_err(|_| LineviewError::ui("input thread panicked"))?;

        self.engine.close(path);
        result
    }
}
