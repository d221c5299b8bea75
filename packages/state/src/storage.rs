use crate::history::{History, Moment};
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum StateError {
    #[error("save slot '{0}' is empty")]
    MissingSlot(String),

    #[error("could not serialize game state: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// The opaque persistence boundary: get/set of a serialized blob by key.
pub trait Storage {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, blob: String);
}

/// In-memory storage, used by tests and as a reference implementation.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slots: std::collections::HashMap<String, String>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Option<String> {
        self.slots.get(key).cloned()
    }

    fn set(&mut self, key: &str, blob: String) {
        self.slots.insert(key.to_string(), blob);
    }
}

/// What gets persisted. The future (the redo cache) is deliberately not
/// recorded: a loaded game starts with nothing to fast-forward into.
#[derive(serde::Serialize, serde::Deserialize)]
struct SaveData {
    past: Vec<Moment>,
    present: Moment,
}

impl History {
    pub fn save(&self, storage: &mut dyn Storage, key: &str) -> Result<(), StateError> {
        let data = SaveData {
            past: self.past().to_vec(),
            present: self.present().clone(),
        };
        storage.set(key, serde_json::to_string(&data)?);
        info!(key, turns = data.past.len(), "saved game state");
        Ok(())
    }

    pub fn load(storage: &dyn Storage, key: &str) -> Result<History, StateError> {
        let blob = storage
            .get(key)
            .ok_or_else(|| StateError::MissingSlot(key.to_string()))?;
        let data: SaveData = serde_json::from_str(&blob)?;
        info!(key, turns = data.past.len(), "loaded game state");
        Ok(History::from_parts(data.past, data.present))
    }
}
