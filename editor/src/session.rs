//! Editing session bootstrap and preset management.
//!
//! A session starts from the most recent capture in the key-value store.
//! A missing or undecodable bitmap is terminal: the host shows its error
//! screen and the user retries by capturing again.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use host::store::LATEST_CAPTURE_KEY;
use host::KeyValueStore;
use tracing::{info, warn};
use uuid::Uuid;

use crate::engine::{Action, EditorCore, EditorError};
use crate::preset::{Preset, PresetError, PresetLibrary};
use crate::text;

pub struct EditorSession {
    core: EditorCore,
    presets: PresetLibrary,
}

impl EditorSession {
    /// Load the latest capture and the saved presets.
    ///
    /// `font_bytes` is the TrueType/OpenType font used for text elements;
    /// without one, text renders as its background box only.
    ///
    /// # Errors
    ///
    /// [`EditorError::MissingCapture`] when nothing was captured yet,
    /// [`EditorError::ImageDecode`] when the stored bytes are not an image,
    /// and store, preset or font errors otherwise.
    pub fn open(store: Arc<dyn KeyValueStore>, font_bytes: Option<Vec<u8>>) -> Result<Self, EditorError> {
        let Some(bytes) = store.get(LATEST_CAPTURE_KEY)? else {
            warn!("editor opened without a stored capture");
            return Err(EditorError::MissingCapture);
        };
        let base = image::load_from_memory(&bytes)?.to_rgba8();
        let font = font_bytes.map(text::load_font).transpose()?;
        let presets = PresetLibrary::load(store)?;
        info!(
            width = base.width(),
            height = base.height(),
            presets = presets.list().len(),
            has_font = font.is_some(),
            "editor session opened"
        );
        Ok(Self { core: EditorCore::new(base, font), presets })
    }

    #[must_use]
    pub fn core(&self) -> &EditorCore {
        &self.core
    }

    pub fn core_mut(&mut self) -> &mut EditorCore {
        &mut self.core
    }

    #[must_use]
    pub fn presets(&self) -> &[Preset] {
        self.presets.list()
    }

    /// Save the current document's styles as a new preset.
    ///
    /// # Errors
    ///
    /// Fails on an empty document or a store write failure.
    pub fn save_preset(&mut self, name: &str) -> Result<Preset, EditorError> {
        Ok(self.presets.save(name, self.core.doc())?)
    }

    /// Re-capture an existing preset from the current document.
    ///
    /// # Errors
    ///
    /// Fails if the preset is unknown, the document is empty, or the store fails.
    pub fn update_preset(&mut self, id: &Uuid) -> Result<Preset, EditorError> {
        Ok(self.presets.update(id, self.core.doc())?)
    }

    /// # Errors
    ///
    /// Fails if the preset is unknown or the store fails.
    pub fn rename_preset(&mut self, id: &Uuid, name: &str) -> Result<(), EditorError> {
        Ok(self.presets.rename(id, name)?)
    }

    /// Delete a preset. If it was the active template, new elements go back
    /// to the toolbar style.
    ///
    /// # Errors
    ///
    /// Fails if the preset is unknown or the store fails.
    pub fn delete_preset(&mut self, id: &Uuid) -> Result<Preset, EditorError> {
        let removed = self.presets.delete(id)?;
        if self.core.style().active_template().is_some_and(|p| p.id == *id) {
            self.core.clear_active_template();
        }
        Ok(removed)
    }

    /// Apply a saved preset to the document.
    ///
    /// # Errors
    ///
    /// Returns [`PresetError::NotFound`] for an unknown id.
    pub fn apply_preset(&mut self, id: &Uuid) -> Result<Vec<Action>, EditorError> {
        let preset = self.presets.get(id).cloned().ok_or(PresetError::NotFound(*id))?;
        Ok(self.core.apply_preset(&preset))
    }
}
