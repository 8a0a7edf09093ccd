//! Persisted conversation history.
//!
//! The whole conversation lives under a single key as a JSON array. The public
//! operations never fail: a missing or corrupt value reads as an empty
//! history, and a failed write is logged and dropped. `try_load` and
//! `try_save` expose the underlying errors.

use thiserror::Error;
use tracing::{debug, warn};

use crate::session::history::{MessageRecord, Role, HISTORY_KEY};
use crate::session::render::Renderer;
use crate::session::storage::{KeyValueStorage, StorageError};

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("stored history is corrupt: {0}")]
    Corrupt(#[source] serde_json::Error),
    #[error("failed to serialize history: {0}")]
    Serialize(#[source] serde_json::Error),
}

pub struct HistoryStore<S> {
    storage: S,
    key: String,
}

impl<S: KeyValueStorage> HistoryStore<S> {
    pub fn new(storage: S) -> Self {
        Self::with_key(storage, HISTORY_KEY)
    }

    pub fn with_key(storage: S, key: impl Into<String>) -> Self {
        Self { storage, key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn storage_mut(&mut self) -> &mut S {
        &mut self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// `Ok(empty)` when nothing has been stored yet.
    pub fn try_load(&self) -> Result<Vec<MessageRecord>, HistoryError> {
        match self.storage.get_item(&self.key)? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(HistoryError::Corrupt),
        }
    }

    pub fn try_save(&mut self, history: &[MessageRecord]) -> Result<(), HistoryError> {
        let raw = serde_json::to_string(history).map_err(HistoryError::Serialize)?;
        self.storage.set_item(&self.key, &raw)?;
        Ok(())
    }

    pub fn load(&self) -> Vec<MessageRecord> {
        self.try_load().unwrap_or_else(|e| {
            warn!(key = %self.key, error = %e, "discarding unreadable chat history");
            Vec::new()
        })
    }

    pub fn save(&mut self, history: &[MessageRecord]) {
        if let Err(e) = self.try_save(history) {
            warn!(key = %self.key, error = %e, records = history.len(), "chat history not saved");
        }
    }

    pub fn append(&mut self, role: Role, text: &str) {
        self.append_record(MessageRecord::now(role, text));
    }

    pub fn append_record(&mut self, record: MessageRecord) {
        let mut history = self.load();
        history.push(record);
        self.save(&history);
    }

    /// Renders stored turns without writing anything back.
    pub fn replay<R: Renderer + ?Sized>(&self, renderer: &mut R) -> usize {
        let history = self.load();
        for record in &history {
            renderer.render(record);
        }
        debug!(key = %self.key, count = history.len(), "replayed chat history");
        history.len()
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.storage.remove_item(&self.key) {
            warn!(key = %self.key, error = %e, "chat history not cleared");
        }
    }
}
