//! Path-keyed registry of indexed sessions.
//!
//! Opening a path that is already indexed returns the existing session.
//! Concurrent opens of the same path while indexing is in flight share a single
//! indexing pass; every caller receives the same `Arc<Session>` (or the same
//! failure). Paths are used as given, without canonicalization.

use crate::error::{LineviewError, Result};
use crate::file_handler::classify::validate_file_path;
use crate::file_handler::session::Session;
use crate::file_handler::writer::{self, EditSet};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, OnceCell};

/// A freshly built session is re-checked against the disk before being handed out;
/// a file that keeps changing while it is indexed gives up after this many passes.
const MAX_INDEX_ATTEMPTS: usize = 3;

/// Observable state of a registered path
#[derive(Debug, Clone)]
pub enum SessionState {
    Indexing { percent: u8 },
    Ready(Arc<Session>),
}

/// One registry entry: the shared indexing result plus its progress channel
#[derive(Debug)]
struct SessionSlot {
    cell: OnceCell<Arc<Session>>,
    progress: watch::Sender<u8>,
    /// Set once an `open` has claimed the slot; before that it only holds subscribers
    opened: AtomicBool,
}

impl SessionSlot {
    fn new() -> Self {
        let (progress, _) = watch::channel(0);
        Self {
            cell: OnceCell::new(),
            progress,
            opened: AtomicBool::new(false),
        }
    }

    fn is_opened(&self) -> bool {
        self.opened.load(Ordering::Acquire)
    }

    /// Reserved by a progress subscriber that has since gone away without opening
    fn is_abandoned(&self) -> bool {
        !self.is_opened() && self.progress.receiver_count() == 0
    }

    fn holds(&self, session: &Arc<Session>) -> bool {
        self.cell
            .get()
            .is_some_and(|current| Arc::ptr_eq(current, session))
    }
}

#[derive(Debug)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<PathBuf, Arc<SessionSlot>>>,
    chunk_size: usize,
}

impl SessionRegistry {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            chunk_size,
        }
    }

    /// Return the session for `path`, indexing the file if needed
    ///
    /// A cached session whose file changed on disk is discarded and the file is
    /// indexed again. A failed indexing pass leaves nothing registered, so the
    /// next open starts over.
    pub async fn open(&self, path: &Path) -> Result<Arc<Session>> {
        validate_file_path(path)?;

        for _ in 0..MAX_INDEX_ATTEMPTS {
            let slot = self.slot(path, true);
            let indexed = slot
                .cell
                .get_or_try_init(|| async {
                    let session = Session::index(path, self.chunk_size, |percent| {
                        slot.progress.send_replace(percent);
                    })
                    .await?;
                    Ok::<_, LineviewError>(Arc::new(session))
                })
                .await;

            let session = match indexed {
                Ok(session) => Arc::clone(session),
                Err(error) => {
                    self.evict_slot(path, &slot);
                    return Err(error);
                }
            };

            match session.check_current().await {
                Ok(()) => return Ok(session),
                Err(error) if error.is_stale() => {
                    log::info!("re-indexing {} after it changed on disk", path.display());
                    self.evict_slot(path, &slot);
                }
                Err(error) => return Err(error),
            }
        }

        Err(LineviewError::stale(path))
    }

    /// Ready session for `path`, if any; never starts indexing
    pub fn get(&self, path: &Path) -> Option<Arc<Session>> {
        let sessions = self.sessions.lock();
        sessions.get(path).and_then(|slot| slot.cell.get().cloned())
    }

    /// Current state of `path`, or `None` if nobody has opened it
    pub fn state(&self, path: &Path) -> Option<SessionState> {
        let sessions = self.sessions.lock();
        let slot = sessions.get(path)?;
        match slot.cell.get() {
            Some(session) => Some(SessionState::Ready(Arc::clone(session))),
            None if slot.is_opened() => Some(SessionState::Indexing {
                percent: *slot.progress.borrow(),
            }),
            None => None,
        }
    }

    /// Watch indexing progress for `path`
    ///
    /// Subscribing before `open` reserves the entry, so the opener reports into
    /// this channel and no update is missed. A reservation that is never opened is
    /// dropped once its last receiver goes away.
    pub fn subscribe_progress(&self, path: &Path) -> watch::Receiver<u8> {
        self.slot(path, false).progress.subscribe()
    }

    /// Forget `path`; returns whether it had been opened
    ///
    /// Sessions already handed out stay usable until the file changes.
    pub fn close(&self, path: &Path) -> bool {
        let removed = self
            .sessions
            .lock()
            .remove(path)
            .is_some_and(|slot| slot.is_opened());
        if removed {
            log::debug!("closed session for {}", path.display());
        }
        removed
    }

    /// Apply `edits` to the session's file and return a session for the new content
    ///
    /// An empty edit set returns `session` unchanged. Otherwise the old session is
    /// stale once the rewrite lands, so it is dropped from the registry and the file
    /// is indexed again.
    pub async fn write_edits(&self, session: Arc<Session>, edits: &EditSet) -> Result<Arc<Session>> {
        if edits.is_empty() {
            return Ok(session);
        }

        writer::write_edits(&session, edits).await?;
        self.evict_session(&session);
        self.open(session.path()).await
    }

    /// Number of opened paths, indexing or ready
    pub fn len(&self) -> usize {
        self.sessions
            .lock()
            .values()
            .filter(|slot| slot.is_opened())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, path: &Path, open: bool) -> Arc<SessionSlot> {
        let mut sessions = self.sessions.lock();
        sessions.retain(|_, slot| !slot.is_abandoned());

        let slot = sessions
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(SessionSlot::new()));
        if open {
            slot.opened.store(true, Ordering::Release);
        }
        Arc::clone(slot)
    }

    #[cfg(test)]
    fn slot_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Remove the entry for `path` only if it is still `slot`
    fn evict_slot(&self, path: &Path, slot: &Arc<SessionSlot>) {
        let mut sessions = self.sessions.lock();
        if sessions
            .get(path)
            .is_some_and(|current| Arc::ptr_eq(current, slot))
        {
            sessions.remove(path);
        }
    }

    fn evict_session(&self, session: &Arc<Session>) {
        let mut sessions = self.sessions.lock();
        if sessions
            .get(session.path())
            .is_some_and(|slot| slot.holds(session))
        {
            sessions.remove(session.path());
        }
    }
}
