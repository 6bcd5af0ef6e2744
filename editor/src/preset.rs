//! Named style presets captured from a document and persisted in the host store.

#[cfg(test)]
#[path = "preset_test.rs"]
mod preset_test;

use std::sync::Arc;

use host::store::{self, KeyValueStore, PRESETS_KEY, StoreError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::doc::{ElementDocument, ElementKind};
use crate::style::StylePatch;

#[derive(Debug, thiserror::Error)]
pub enum PresetError {
    #[error("preset store: {0}")]
    Store(#[from] StoreError),
    #[error("preset {0} not found")]
    NotFound(Uuid),
    #[error("cannot capture a preset from an empty document")]
    EmptyDocument,
}

/// Style captured from one element kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateElement {
    pub kind: ElementKind,
    pub style: StylePatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    pub id: Uuid,
    pub name: String,
    pub templates: Vec<TemplateElement>,
}

impl Preset {
    /// Capture one template per element kind present in `doc`. When several
    /// elements share a kind the top-most one wins.
    ///
    /// # Errors
    ///
    /// Returns [`PresetError::EmptyDocument`] if `doc` has no elements.
    pub fn capture(name: &str, doc: &ElementDocument) -> Result<Self, PresetError> {
        if doc.is_empty() {
            return Err(PresetError::EmptyDocument);
        }
        let mut templates: Vec<TemplateElement> = Vec::new();
        for el in doc.layers() {
            if templates.iter().any(|t| t.kind == el.kind()) {
                continue;
            }
            templates.push(TemplateElement { kind: el.kind(), style: StylePatch::from_element(el) });
        }
        Ok(Self { id: Uuid::new_v4(), name: name.to_owned(), templates })
    }

    #[must_use]
    pub fn template_for(&self, kind: ElementKind) -> Option<&StylePatch> {
        self.templates.iter().find(|t| t.kind == kind).map(|t| &t.style)
    }

    /// Restyle every element whose kind has a template. Returns how many changed.
    pub fn apply_to_document(&self, doc: &mut ElementDocument) -> usize {
        let ids: Vec<_> = doc.elements().iter().map(|e| e.id).collect();
        let mut changed = 0;
        for id in ids {
            let Some(el) = doc.get_mut(&id) else {
                continue;
            };
            if let Some(template) = self.template_for(el.kind()) {
                if template.apply_to(el) {
                    changed += 1;
                }
            }
        }
        changed
    }
}

/// Persisted preset list. Every mutation is written through to the store.
pub struct PresetLibrary {
    store: Arc<dyn KeyValueStore>,
    presets: Vec<Preset>,
}

impl PresetLibrary {
    /// Load the saved list, starting empty if nothing was saved yet.
    ///
    /// # Errors
    ///
    /// Returns [`PresetError::Store`] if the store fails or holds malformed JSON.
    pub fn load(store: Arc<dyn KeyValueStore>) -> Result<Self, PresetError> {
        let presets: Vec<Preset> = store::get_json(store.as_ref(), PRESETS_KEY)?.unwrap_or_default();
        debug!(count = presets.len(), "presets loaded");
        Ok(Self { store, presets })
    }

    #[must_use]
    pub fn list(&self) -> &[Preset] {
        &self.presets
    }

    #[must_use]
    pub fn get(&self, id: &Uuid) -> Option<&Preset> {
        self.presets.iter().find(|p| p.id == *id)
    }

    /// Capture `doc` as a new preset.
    ///
    /// # Errors
    ///
    /// Fails on an empty document or a store write failure.
    pub fn save(&mut self, name: &str, doc: &ElementDocument) -> Result<Preset, PresetError> {
        let preset = Preset::capture(name, doc)?;
        self.presets.push(preset.clone());
        self.persist()?;
        info!(preset_id = %preset.id, templates = preset.templates.len(), "preset saved");
        Ok(preset)
    }

    /// Re-capture an existing preset from `doc`, keeping its id and name.
    ///
    /// # Errors
    ///
    /// Fails if the preset is unknown, the document is empty, or the store fails.
    pub fn update(&mut self, id: &Uuid, doc: &ElementDocument) -> Result<Preset, PresetError> {
        let idx = self.index_of(id)?;
        let captured = Preset::capture(&self.presets[idx].name, doc)?;
        self.presets[idx].templates = captured.templates;
        self.persist()?;
        Ok(self.presets[idx].clone())
    }

    /// # Errors
    ///
    /// Fails if the preset is unknown or the store fails.
    pub fn rename(&mut self, id: &Uuid, name: &str) -> Result<(), PresetError> {
        let idx = self.index_of(id)?;
        name.clone_into(&mut self.presets[idx].name);
        self.persist()
    }

    /// # Errors
    ///
    /// Fails if the preset is unknown or the store fails.
    pub fn delete(&mut self, id: &Uuid) -> Result<Preset, PresetError> {
        let idx = self.index_of(id)?;
        let removed = self.presets.remove(idx);
        self.persist()?;
        info!(preset_id = %removed.id, "preset deleted");
        Ok(removed)
    }

    fn index_of(&self, id: &Uuid) -> Result<usize, PresetError> {
        self.presets.iter().position(|p| p.id == *id).ok_or(PresetError::NotFound(*id))
    }

    fn persist(&self) -> Result<(), PresetError> {
        store::set_json(self.store.as_ref(), PRESETS_KEY, &self.presets)?;
        Ok(())
    }
}
