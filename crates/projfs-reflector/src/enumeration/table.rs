//! Concurrent table of enumeration sessions.

use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use uuid::Uuid;

use crate::engine::{DirEntrySink, SinkOutcome};
use crate::enumeration::session::EnumerationSession;
use crate::error::{ProviderError, Result, Status};
use crate::layer::{FileRecord, LayerStore};
use crate::options::FilterCapture;
use crate::util::path::join;

/// Engine-assigned enumeration session id.
pub type SessionId = Uuid;

/// Outcome of one `GetDirectoryEnumeration` round.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnumerationBatch {
    /// Every remaining entry was delivered.
    Complete {
        /// Entries delivered this round.
        delivered: usize,
    },
    /// The sink filled after at least one entry; call again for the rest.
    More {
        /// Entries delivered this round.
        delivered: usize,
    },
    /// The sink rejected the first entry of the round.
    BufferTooSmall,
}

impl EnumerationBatch {
    /// Status reported to the engine for this round.
    pub fn status(&self) -> Status {
        match self {
            EnumerationBatch::BufferTooSmall => Status::InsufficientBuffer,
            _ => Status::Ok,
        }
    }

    /// Entries delivered this round.
    pub fn delivered(&self) -> usize {
        match self {
            EnumerationBatch::Complete { delivered } | EnumerationBatch::More { delivered } => {
                *delivered
            }
            EnumerationBatch::BufferTooSmall => 0,
        }
    }
}

struct SessionSlot {
    /// Directory being listed, relative to the layer root.
    path: String,
    state: Mutex<EnumerationSession>,
}

/// All active enumeration sessions, keyed by session id.
///
/// Distinct session ids never contend beyond a DashMap shard lookup; the
/// per-session mutex only serializes calls that race on the same id.
pub struct EnumerationSessionTable {
    sessions: DashMap<SessionId, Arc<SessionSlot>>,
    filter_capture: FilterCapture,
}

impl EnumerationSessionTable {
    /// Create an empty table.
    ///
    /// # Arguments
    /// * `filter_capture` - Filter adoption rule for non-restart calls
    pub fn new(filter_capture: FilterCapture) -> Self {
        Self {
            sessions: DashMap::new(),
            filter_capture,
        }
    }

    /// Start a session over the layer directory at `relative_path`.
    ///
    /// # Arguments
    /// * `id` - Session id
    /// * `relative_path` - Directory relative to the layer root
    /// * `layer` - Layer to list
    ///
    /// # Returns
    /// `NotFound` if the directory is absent, `DuplicateSession` if `id` is
    /// already active.
    pub fn start(&self, id: SessionId, relative_path: &str, layer: &dyn LayerStore) -> Result<()> {
        if self.sessions.contains_key(&id) {
            return Err(ProviderError::DuplicateSession(id));
        }

        let records: Vec<FileRecord> = layer.list_directory(relative_path)?;
        let slot = Arc::new(SessionSlot {
            path: relative_path.to_string(),
            state: Mutex::new(EnumerationSession::new(records)),
        });

        match self.sessions.entry(id) {
            Entry::Occupied(_) => Err(ProviderError::DuplicateSession(id)),
            Entry::Vacant(vacant) => {
                vacant.insert(slot);
                Ok(())
            }
        }
    }

    /// Deliver entries from the session's cursor into `sink`.
    ///
    /// # Arguments
    /// * `id` - Session id
    /// * `filter` - Search expression from the engine
    /// * `restart` - Reset the cursor and replace the saved filter
    /// * `sink` - Engine result buffer
    /// * `resolve` - Symlink target lookup, called with the entry's
    ///   layer-relative path for every reparse point offered to the sink
    ///
    /// # Returns
    /// The round outcome, or `UnknownSession`.
    pub fn get(
        &self,
        id: SessionId,
        filter: Option<&str>,
        restart: bool,
        sink: &mut dyn DirEntrySink,
        resolve: &dyn Fn(&str) -> Result<String>,
    ) -> Result<EnumerationBatch> {
        let slot: Arc<SessionSlot> = self
            .sessions
            .get(&id)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or(ProviderError::UnknownSession(id))?;

        let mut session = slot.state.lock();
        let filter: Option<String> = filter.map(str::to_string);

        if restart {
            session.rewind(filter);
        } else if self.filter_capture == FilterCapture::FirstCall {
            session.adopt_filter(filter);
        }

        let mut delivered: usize = 0;
        while let Some(record) = session.peek() {
            let target: Option<String> = if record.is_reparse_point() {
                Some(resolve(&join(&slot.path, &record.name))?)
            } else {
                None
            };

            match sink.add(record, target.as_deref())? {
                SinkOutcome::Accepted => {
                    delivered += 1;
                    session.advance();
                }
                SinkOutcome::Full if delivered == 0 => {
                    return Ok(EnumerationBatch::BufferTooSmall);
                }
                SinkOutcome::Full => {
                    return Ok(EnumerationBatch::More { delivered });
                }
            }
        }

        Ok(EnumerationBatch::Complete { delivered })
    }

    /// Remove a session.
    ///
    /// # Arguments
    /// * `id` - Session id
    pub fn end(&self, id: SessionId) -> Result<()> {
        self.sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(ProviderError::UnknownSession(id))
    }

    /// Number of active sessions.
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Check if no session is active.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for EnumerationSessionTable {
    fn default() -> Self {
        Self::new(FilterCapture::default())
    }
}
