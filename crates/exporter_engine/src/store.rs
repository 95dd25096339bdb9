//! Persistent job record.
//!
//! The controller keeps nothing it cannot rebuild from these keys: a full
//! page reload is treated as a cold restart, and the next initialization
//! reads the queue, results, run flag and total back from here.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use engine_logging::engine_warn;
use exporter_core::{ConversationRef, ExportItem, RunState, Settings};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::persist::AtomicFileWriter;

pub const QUEUE_KEY: &str = "queue";
pub const RESULTS_KEY: &str = "results";
pub const RUNNING_KEY: &str = "isRunning";
pub const TOTAL_KEY: &str = "total";
pub const SETTINGS_KEY: &str = "settings";

/// Keys owned by a run; cleared together on cancel and after finalize.
pub const RUN_KEYS: [&str; 4] = [QUEUE_KEY, RESULTS_KEY, RUNNING_KEY, TOTAL_KEY];

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store io error for key {key}: {message}")]
    Io { key: String, message: String },
    #[error("failed to encode {key}: {message}")]
    Encode { key: String, message: String },
    #[error("failed to decode {key}: {message}")]
    Decode { key: String, message: String },
}

/// Narrow string key-value interface over whatever survives a reload.
pub trait KvStore: Send + Sync {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store; survives a controller restart but not the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.values.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl KvStore for MemoryStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.lock().get(key).cloned())
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.lock().remove(key);
        Ok(())
    }
}

/// One `{key}.ron` file per key inside a state directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    writer: AtomicFileWriter,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self {
            writer: AtomicFileWriter::new(dir),
        }
    }

    fn filename(key: &str) -> String {
        format!("{key}.ron")
    }
}

impl KvStore for FileStore {
    fn get_raw(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.writer.dir().join(Self::filename(key));
        match fs::read_to_string(&path) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StoreError::Io {
                key: key.to_string(),
                message: err.to_string(),
            }),
        }
    }

    fn set_raw(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.writer
            .write(&Self::filename(key), value.as_bytes())
            .map(|_| ())
            .map_err(|err| StoreError::Io {
                key: key.to_string(),
                message: err.to_string(),
            })
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.writer
            .remove(&Self::filename(key))
            .map_err(|err| StoreError::Io {
                key: key.to_string(),
                message: err.to_string(),
            })
    }
}

/// Typed view of the job record. Values are stored as RON text.
#[derive(Clone)]
pub struct JobStore {
    backend: Arc<dyn KvStore>,
}

impl JobStore {
    pub fn new(backend: Arc<dyn KvStore>) -> Self {
        Self { backend }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str, default: T) -> Result<T, StoreError> {
        match self.backend.get_raw(key)? {
            None => Ok(default),
            Some(text) => ron::from_str(&text).map_err(|err| StoreError::Decode {
                key: key.to_string(),
                message: err.to_string(),
            }),
        }
    }

    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StoreError> {
        let text = ron::ser::to_string_pretty(value, ron::ser::PrettyConfig::new()).map_err(
            |err| StoreError::Encode {
                key: key.to_string(),
                message: err.to_string(),
            },
        )?;
        self.backend.set_raw(key, text)
    }

    pub fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.backend.delete(key)
    }

    pub fn queue(&self) -> Result<Vec<ConversationRef>, StoreError> {
        self.get(QUEUE_KEY, Vec::new())
    }

    pub fn set_queue(&self, queue: &[ConversationRef]) -> Result<(), StoreError> {
        self.set(QUEUE_KEY, queue)
    }

    pub fn results(&self) -> Result<Vec<ExportItem>, StoreError> {
        self.get(RESULTS_KEY, Vec::new())
    }

    pub fn set_results(&self, results: &[ExportItem]) -> Result<(), StoreError> {
        self.set(RESULTS_KEY, results)
    }

    pub fn is_running(&self) -> Result<bool, StoreError> {
        self.get(RUNNING_KEY, false)
    }

    pub fn set_running(&self, running: bool) -> Result<(), StoreError> {
        self.set(RUNNING_KEY, &running)
    }

    pub fn total(&self) -> Result<usize, StoreError> {
        self.get(TOTAL_KEY, 0)
    }

    pub fn set_total(&self, total: usize) -> Result<(), StoreError> {
        self.set(TOTAL_KEY, &total)
    }

    pub fn run_state(&self) -> Result<RunState, StoreError> {
        Ok(RunState {
            is_running: self.is_running()?,
            total: self.total()?,
        })
    }

    /// Settings are read leniently: a record that no longer decodes falls
    /// back to defaults instead of blocking every command.
    pub fn settings(&self) -> Result<Settings, StoreError> {
        match self.get(SETTINGS_KEY, Settings::default()) {
            Ok(settings) => Ok(settings),
            Err(StoreError::Decode { message, .. }) => {
                engine_warn!("Ignoring unreadable settings: {}", message);
                Ok(Settings::default())
            }
            Err(err) => Err(err),
        }
    }

    pub fn set_settings(&self, settings: &Settings) -> Result<(), StoreError> {
        self.set(SETTINGS_KEY, settings)
    }

    /// Deletes queue, results, run flag and total. Settings are kept.
    pub fn clear_run(&self) -> Result<(), StoreError> {
        for key in RUN_KEYS {
            self.backend.delete(key)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_yield_defaults() {
        let store = JobStore::new(Arc::new(MemoryStore::new()));
        assert!(store.queue().unwrap().is_empty());
        assert!(!store.is_running().unwrap());
        assert_eq!(store.total().unwrap(), 0);
        assert_eq!(store.settings().unwrap(), Settings::default());
    }

    #[test]
    fn corrupt_settings_fall_back_to_defaults() {
        let backend = Arc::new(MemoryStore::new());
        backend.set_raw(SETTINGS_KEY, "not ron at all (".to_string()).unwrap();
        let store = JobStore::new(backend);
        assert_eq!(store.settings().unwrap(), Settings::default());
    }

    #[test]
    fn corrupt_queue_is_an_error() {
        let backend = Arc::new(MemoryStore::new());
        backend.set_raw(QUEUE_KEY, "[(".to_string()).unwrap();
        let store = JobStore::new(backend);
        assert!(matches!(store.queue(), Err(StoreError::Decode { .. })));
    }
}
