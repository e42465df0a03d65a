//! Per-document, per-page crop storage with default fallback

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, error};
use serde::{Deserialize, Serialize};

use crate::paths::document_slug;
use crate::region::CropSettings;
use crate::store::{SettingsStore, StoreError};

/// Stable identity of a document, derived from its source location
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    /// Wrap an already computed identifier
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Derive the identifier from a path or URL
    pub fn from_location(location: &str) -> Self {
        Self(document_slug(location))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Crop preferences for one document
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentCropSettings {
    pub document_id: DocumentId,
    #[serde(default)]
    pub page_settings: BTreeMap<usize, CropSettings>,
    #[serde(default)]
    pub default_settings: CropSettings,
}

impl DocumentCropSettings {
    pub fn new(document_id: DocumentId) -> Self {
        Self {
            document_id,
            page_settings: BTreeMap::new(),
            default_settings: CropSettings::full(),
        }
    }

    /// Settings for a page, falling back to the document default
    pub fn settings_for(&self, page: usize) -> CropSettings {
        self.page_settings
            .get(&page)
            .copied()
            .unwrap_or(self.default_settings)
    }

    /// Replace every invalid region with the full page
    fn sanitize(&mut self) {
        self.default_settings = self.default_settings.sanitized();
        for settings in self.page_settings.values_mut() {
            *settings = settings.sanitized();
        }
    }
}

/// In-memory crop repository backed by a [`SettingsStore`].
///
/// Memory is authoritative for the session: a failed write is reported to
/// the caller but the new value stays visible to subsequent reads.
pub struct CropStore {
    backend: Box<dyn SettingsStore>,
    /// `None` marks a document the backend has no entry for
    documents: HashMap<DocumentId, Option<DocumentCropSettings>>,
}

impl fmt::Debug for CropStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CropStore")
            .field("documents", &self.documents.len())
            .finish_non_exhaustive()
    }
}

impl CropStore {
    pub fn new(backend: Box<dyn SettingsStore>) -> Self {
        Self {
            backend,
            documents: HashMap::new(),
        }
    }

    /// Crop settings for a page: page override, then document default,
    /// then the full page.
    pub fn get(&mut self, id: &DocumentId, page: usize) -> CropSettings {
        self.cached(id)
            .map(|doc| doc.settings_for(page))
            .unwrap_or_default()
    }

    /// Returns true if the page has its own override
    pub fn has_override(&mut self, id: &DocumentId, page: usize) -> bool {
        self.cached(id)
            .is_some_and(|doc| doc.page_settings.contains_key(&page))
    }

    /// The document's settings, if any exist
    pub fn document(&mut self, id: &DocumentId) -> Option<&DocumentCropSettings> {
        self.cached(id)
    }

    pub fn set_for_page(
        &mut self,
        id: &DocumentId,
        page: usize,
        settings: CropSettings,
    ) -> Result<(), StoreError> {
        let doc = self.entry(id);
        doc.page_settings.insert(page, settings.sanitized());
        debug!("Crop for {id} page {page} set to {:?}", settings.region);
        self.flush(id)
    }

    /// Set the document default; this supersedes every page override
    pub fn set_default(&mut self, id: &DocumentId, settings: CropSettings) -> Result<(), StoreError> {
        let doc = self.entry(id);
        doc.default_settings = settings.sanitized();
        doc.page_settings.clear();
        debug!("Default crop for {id} set to {:?}", settings.region);
        self.flush(id)
    }

    /// Remove a page override so the page follows the document default
    pub fn reset(&mut self, id: &DocumentId, page: usize) -> Result<(), StoreError> {
        let removed = match self.cached_mut(id) {
            Some(doc) => doc.page_settings.remove(&page).is_some(),
            None => false,
        };
        if !removed {
            return Ok(());
        }
        debug!("Crop override for {id} page {page} removed");
        self.flush(id)
    }

    fn cached(&mut self, id: &DocumentId) -> Option<&DocumentCropSettings> {
        self.ensure_loaded(id);
        self.documents.get(id).and_then(Option::as_ref)
    }

    fn cached_mut(&mut self, id: &DocumentId) -> Option<&mut DocumentCropSettings> {
        self.ensure_loaded(id);
        self.documents.get_mut(id).and_then(Option::as_mut)
    }

    fn entry(&mut self, id: &DocumentId) -> &mut DocumentCropSettings {
        self.ensure_loaded(id);
        self.documents
            .entry(id.clone())
            .or_insert(None)
            .get_or_insert_with(|| DocumentCropSettings::new(id.clone()))
    }

    fn ensure_loaded(&mut self, id: &DocumentId) {
        if self.documents.contains_key(id) {
            return;
        }

        let loaded = match self.backend.load(id) {
            Ok(Some(mut doc)) => {
                doc.sanitize();
                // The map key is authoritative over whatever the file says
                doc.document_id = id.clone();
                Some(doc)
            }
            Ok(None) => None,
            Err(e) => {
                error!("Failed to load crop settings for {id}: {e}");
                None
            }
        };
        self.documents.insert(id.clone(), loaded);
    }

    fn flush(&self, id: &DocumentId) -> Result<(), StoreError> {
        match self.documents.get(id).and_then(Option::as_ref) {
            Some(doc) => self.backend.save(id, doc),
            None => Ok(()),
        }
    }
}
