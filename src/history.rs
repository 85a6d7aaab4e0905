//! Connection history.
//!
//! A bounded, deduplicated, most-recent-first list of serials that
//! connected successfully. The list is stored as a JSON array of strings
//! under the `connectionHistory` key and re-read on every access, so a
//! change made by another running instance shows up on the next `list()`.

use crate::error::{Error, Result};
use crate::serial::SerialCode;
use crate::storage::Storage;
use std::sync::Arc;

/// Storage key holding the serialized history.
pub const HISTORY_KEY: &str = "connectionHistory";

/// Maximum number of serials kept.
pub const MAX_HISTORY: usize = 5;

/// History of successfully connected serials.
///
/// Unreadable stored data is treated as an empty history and logged; it is
/// never surfaced as an error. Write failures are propagated.
#[derive(Clone)]
pub struct HistoryStore {
    storage: Arc<dyn Storage>,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Current history, most recent first.
    pub fn list(&self) -> Vec<SerialCode> {
        let raw = match self.storage.get_item(HISTORY_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                tracing::warn!("Failed to read connection history, treating as empty: {}", e);
                return Vec::new();
            }
        };

        let entries: Vec<String> = match serde_json::from_str(&raw) {
            Ok(entries) => entries,
            Err(e) => {
                let err = Error::StorageCorrupt {
                    key: HISTORY_KEY.to_string(),
                    reason: e.to_string(),
                };
                tracing::warn!("{}; treating connection history as empty", err);
                return Vec::new();
            }
        };

        sanitize(entries)
    }

    /// Move `serial` to the front, dropping the oldest entry past the limit.
    pub fn record(&self, serial: &SerialCode) -> Result<Vec<SerialCode>> {
        let mut history = self.list();
        history.retain(|s| s != serial);
        history.insert(0, serial.clone());
        history.truncate(MAX_HISTORY);
        self.save(&history)?;
        tracing::debug!(serial = %serial, "Recorded connection history entry");
        Ok(history)
    }

    /// Remove `serial`. Leaves the history unchanged when absent.
    pub fn remove(&self, serial: &SerialCode) -> Result<Vec<SerialCode>> {
        let mut history = self.list();
        let before = history.len();
        history.retain(|s| s != serial);
        if history.len() != before {
            self.save(&history)?;
        }
        Ok(history)
    }

    /// Forget every entry.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove_item(HISTORY_KEY)
    }

    fn save(&self, history: &[SerialCode]) -> Result<()> {
        let contents = serde_json::to_string(history)?;
        self.storage.set_item(HISTORY_KEY, &contents)
    }
}

/// Enforce the history invariants on data read from storage.
///
/// Entries that are not complete serials are dropped, duplicates keep their
/// first (most recent) position, and the list is capped at [`MAX_HISTORY`].
fn sanitize(entries: Vec<String>) -> Vec<SerialCode> {
    let mut history: Vec<SerialCode> = Vec::with_capacity(MAX_HISTORY);
    for entry in entries {
        match SerialCode::parse(&entry) {
            Ok(serial) if !history.contains(&serial) => history.push(serial),
            Ok(_) => {}
            Err(_) => tracing::warn!("Dropping malformed history entry {:?}", entry),
        }
        if history.len() == MAX_HISTORY {
            break;
        }
    }
    history
}
