//! Settings-store collaborators for crop preferences
//!
//! The on-disk format is a single JSON object keyed by document id, where
//! every value is a serialized [`DocumentCropSettings`].

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::{debug, warn};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::crop_store::{DocumentCropSettings, DocumentId};

/// Errors from a settings store
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("settings io: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings format: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to replace {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{detail}")]
    Backend { detail: String },
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend { detail: msg.into() }
    }
}

/// Key-value persistence for per-document crop settings
pub trait SettingsStore: Send {
    fn load(&self, id: &DocumentId) -> Result<Option<DocumentCropSettings>, StoreError>;

    fn save(&self, id: &DocumentId, settings: &DocumentCropSettings) -> Result<(), StoreError>;
}

/// Stores every document in one JSON file, replaced atomically on save
#[derive(Debug)]
pub struct JsonFileStore {
    file_path: PathBuf,
}

impl JsonFileStore {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    /// Raw document entries, each still undecoded so one bad entry
    /// cannot hide or erase the others
    fn read_all(&self) -> Result<Map<String, Value>, StoreError> {
        if !self.file_path.exists() {
            return Ok(Map::new());
        }
        let content = fs::read_to_string(&self.file_path)?;
        if content.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    fn write_all(&self, documents: &Map<String, Value>) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(documents)?;

        let dir = match self.file_path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(content.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.file_path)
            .map_err(|e| StoreError::Persist {
                path: self.file_path.clone(),
                source: e.error,
            })?;

        debug!("Saved crop settings to {:?}", self.file_path);
        Ok(())
    }
}

impl SettingsStore for JsonFileStore {
    fn load(&self, id: &DocumentId) -> Result<Option<DocumentCropSettings>, StoreError> {
        let Some(raw) = self.read_all()?.remove(id.as_str()) else {
            return Ok(None);
        };
        match serde_json::from_value(raw) {
            Ok(doc) => Ok(Some(doc)),
            Err(e) => {
                warn!("Ignoring unreadable crop settings for {id}: {e}");
                Ok(None)
            }
        }
    }

    fn save(&self, id: &DocumentId, settings: &DocumentCropSettings) -> Result<(), StoreError> {
        // Only a file that is not a JSON object at all is replaced wholesale
        let mut documents = self.read_all().unwrap_or_else(|e| {
            warn!(
                "Discarding unreadable crop settings file {:?}: {e}",
                self.file_path
            );
            Map::new()
        });
        documents.insert(id.as_str().to_string(), serde_json::to_value(settings)?);
        self.write_all(&documents)
    }
}

/// Ephemeral store that keeps everything in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, DocumentCropSettings>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SettingsStore for MemoryStore {
    fn load(&self, id: &DocumentId) -> Result<Option<DocumentCropSettings>, StoreError> {
        Ok(self
            .documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(id.as_str())
            .cloned())
    }

    fn save(&self, id: &DocumentId, settings: &DocumentCropSettings) -> Result<(), StoreError> {
        self.documents
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .insert(id.as_str().to_string(), settings.clone());
        Ok(())
    }
}
