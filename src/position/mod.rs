//! Resumable reading positions, keyed by document path.
//!
//! [`JsonPositionStore`] keeps every document's cursor in one JSON object
//! (`{"<path>": {"sentence": n, "word": n}}`) and rewrites the whole file on
//! each save. A missing or malformed file reads as an empty mapping.
//! Tests use the in-process `MemoryPositionStore`.

use std::{
    collections::HashMap,
    fs,
    path::{Path, PathBuf},
};

use log::{debug, warn};
#[cfg(test)]
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default backing file, relative to the working directory.
pub const DEFAULT_POSITIONS_FILE: &str = "last_read_position.json";

/// The next word-chunk to speak: `(sentence, word)`, both zero-based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    #[serde(default)]
    pub sentence: usize,
    #[serde(default)]
    pub word: usize,
}

impl Position {
    pub const START: Position = Position { sentence: 0, word: 0 };

    pub fn new(sentence: usize, word: usize) -> Self {
        Self { sentence, word }
    }
}

#[derive(Debug, Error)]
pub enum PositionStoreError {
    #[error("failed to write positions file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),
    #[error("failed to serialise positions: {0}")]
    Serialise(#[from] serde_json::Error),
}

pub trait PositionStore: Send + Sync {
    /// Records `position` for `document_id`. An empty id is ignored.
    fn save(&self, document_id: &str, position: Position) -> Result<(), PositionStoreError>;

    /// Returns the saved position, or [`Position::START`] when there is none.
    fn load(&self, document_id: &str) -> Position;
}

type PositionMap = HashMap<String, Position>;

pub struct JsonPositionStore {
    path: PathBuf,
}

impl JsonPositionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> PositionMap {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(err) => {
                if err.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read positions file {}: {err}", self.path.display());
                }
                return PositionMap::new();
            }
        };
        match serde_json::from_str::<serde_json::Value>(&data) {
            Ok(serde_json::Value::Object(entries)) => entries
                .into_iter()
                .filter_map(|(id, value)| {
                    serde_json::from_value::<Position>(value)
                        .ok()
                        .map(|position| (id, position))
                })
                .collect(),
            Ok(_) | Err(_) => {
                debug!(
                    "Positions file {} is malformed, starting from an empty mapping",
                    self.path.display()
                );
                PositionMap::new()
            }
        }
    }
}

impl PositionStore for JsonPositionStore {
    fn save(&self, document_id: &str, position: Position) -> Result<(), PositionStoreError> {
        if document_id.is_empty() {
            return Ok(());
        }
        let mut entries = self.read_all();
        entries.insert(document_id.to_string(), position);
        let json = serde_json::to_string(&entries)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|err| PositionStoreError::Io(parent.to_path_buf(), err))?;
        }
        fs::write(&self.path, json).map_err(|err| PositionStoreError::Io(self.path.clone(), err))
    }

    fn load(&self, document_id: &str) -> Position {
        self.read_all()
            .get(document_id)
            .copied()
            .unwrap_or(Position::START)
    }
}

#[cfg(test)]
#[derive(Default)]
pub struct MemoryPositionStore {
    entries: Mutex<PositionMap>,
}

#[cfg(test)]
impl MemoryPositionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl PositionStore for MemoryPositionStore {
    fn save(&self, document_id: &str, position: Position) -> Result<(), PositionStoreError> {
        if !document_id.is_empty() {
            self.entries.lock().insert(document_id.to_string(), position);
        }
        Ok(())
    }

    fn load(&self, document_id: &str) -> Position {
        self.entries
            .lock()
            .get(document_id)
            .copied()
            .unwrap_or(Position::START)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    fn store_in(temp: &assert_fs::TempDir) -> JsonPositionStore {
        JsonPositionStore::new(temp.path().join(DEFAULT_POSITIONS_FILE))
    }

    #[test]
    fn save_then_load_round_trips() {
        let temp = assert_fs::TempDir::new().unwrap();
        let store = store_in(&temp);
        store.save("book.txt", Position::new(2, 3)).unwrap();
        assert_eq!(store.load("book.txt"), Position::new(2, 3));
    }

    #[test]
    fn unknown_document_loads_start() {
        let temp = assert_fs::TempDir::new().unwrap();
        let store = store_in(&temp);
        assert_eq!(store.load("never-saved.pdf"), Position::START);
        store.save("other.txt", Position::new(4, 1)).unwrap();
        assert_eq!(store.load("never-saved.pdf"), Position::START);
    }

    #[test]
    fn corrupt_file_loads_start_and_is_replaced_on_save() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child(DEFAULT_POSITIONS_FILE);
        file.write_str("{not json").unwrap();
        let store = JsonPositionStore::new(file.path());
        assert_eq!(store.load("book.txt"), Position::START);

        store.save("book.txt", Position::new(1, 0)).unwrap();
        assert_eq!(store.load("book.txt"), Position::new(1, 0));
    }

    #[test]
    fn non_object_json_is_treated_as_empty() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child(DEFAULT_POSITIONS_FILE);
        file.write_str("[1, 2, 3]").unwrap();
        let store = JsonPositionStore::new(file.path());
        assert_eq!(store.load("book.txt"), Position::START);
    }

    #[test]
    fn keeps_entries_for_other_documents() {
        let temp = assert_fs::TempDir::new().unwrap();
        let store = store_in(&temp);
        store.save("a.txt", Position::new(1, 2)).unwrap();
        store.save("b.pdf", Position::new(3, 4)).unwrap();
        store.save("a.txt", Position::new(5, 0)).unwrap();
        assert_eq!(store.load("a.txt"), Position::new(5, 0));
        assert_eq!(store.load("b.pdf"), Position::new(3, 4));
    }

    #[test]
    fn writes_expected_json_shape() {
        let temp = assert_fs::TempDir::new().unwrap();
        let store = store_in(&temp);
        store.save("book.txt", Position::new(2, 3)).unwrap();
        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["book.txt"]["sentence"], 2);
        assert_eq!(value["book.txt"]["word"], 3);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child(DEFAULT_POSITIONS_FILE);
        file.write_str(r#"{"book.txt": {"sentence": 7}}"#).unwrap();
        let store = JsonPositionStore::new(file.path());
        assert_eq!(store.load("book.txt"), Position::new(7, 0));
    }

    #[test]
    fn empty_id_is_ignored() {
        let temp = assert_fs::TempDir::new().unwrap();
        let store = store_in(&temp);
        store.save("", Position::new(9, 9)).unwrap();
        assert!(!store.path().exists());

        let memory = MemoryPositionStore::new();
        memory.save("", Position::new(9, 9)).unwrap();
        assert_eq!(memory.load(""), Position::START);
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryPositionStore::new();
        store.save("book.txt", Position::new(2, 3)).unwrap();
        assert_eq!(store.load("book.txt"), Position::new(2, 3));
        assert_eq!(store.load("other.txt"), Position::START);
    }
}
