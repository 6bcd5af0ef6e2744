//! Editing engine: turns pointer, wheel and key events into document
//! mutations, history snapshots and host actions.
//!
//! `EditorCore` owns everything an editing session needs (the base bitmap,
//! the document, its history, the camera, the active style and the renderer)
//! and has no host dependencies, so the whole interaction model is testable
//! headless. Every public handler returns the [`Action`]s the host should react
//! to; a committed user action records exactly one history snapshot.

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::sync::Arc;

use ab_glyph::FontArc;
use image::{imageops, RgbaImage};
use tracing::{debug, info};

use crate::camera::{Camera, Point};
use crate::consts::{FREEHAND_MIN_STEP_PX, MIN_EXTENT_PX, WHEEL_ZOOM_STEP};
use crate::doc::{
    BoxShape, DrawingElement, ElementDocument, ElementId, ElementKind, ElementPatch, ElementStyle, ImageData,
    LayerMove, Shape, TextBody,
};
use crate::export::{self, ClipboardPayload, ExportError, ExportFormat};
use crate::geom::Bounds;
use crate::history::HistoryStack;
use crate::hit::{self, HitPart};
use crate::input::{Button, InputState, Key, Modifiers, TextEntry, Tool, UiState, WheelDelta};
use crate::preset::{Preset, PresetError};
use crate::render::{CompositeRenderer, RenderError};
use crate::style::{self, StyleContext, StylePatch};
use crate::text::{self, FontError};

/// Actions returned from input handlers for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    None,
    ElementCreated(ElementId),
    ElementUpdated(ElementId),
    ElementDeleted(ElementId),
    SelectionChanged(Option<ElementId>),
    ToolChanged(Tool),
    /// Open the host's text box at `at` (document space).
    EditTextRequested { id: Option<ElementId>, at: Point, text: String },
    TextEditClosed,
    CropApplied { width: u32, height: u32 },
    HistoryChanged { can_undo: bool, can_redo: bool },
    SetCursor(String),
    RenderNeeded,
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error("no captured image is available")]
    MissingCapture,
    #[error("captured image could not be decoded: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error(transparent)]
    Store(#[from] host::StoreError),
    #[error(transparent)]
    Render(#[from] RenderError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error(transparent)]
    Preset(#[from] PresetError),
    #[error(transparent)]
    Font(#[from] FontError),
    #[error("no crop region selected")]
    NoCropRegion,
    #[error("crop region does not overlap the image")]
    EmptyCropRegion,
}

/// Core editor state, independent of any host surface.
pub struct EditorCore {
    base: Arc<RgbaImage>,
    doc: ElementDocument,
    history: HistoryStack<ElementDocument>,
    pub camera: Camera,
    pub ui: UiState,
    pub input: InputState,
    style: StyleContext,
    renderer: CompositeRenderer,
}

impl EditorCore {
    /// Start editing `base` with an empty document.
    #[must_use]
    pub fn new(base: RgbaImage, font: Option<FontArc>) -> Self {
        let doc = ElementDocument::new();
        Self {
            base: Arc::new(base),
            history: HistoryStack::new(doc.clone()),
            doc,
            camera: Camera::default(),
            ui: UiState::default(),
            input: InputState::default(),
            style: StyleContext::default(),
            renderer: CompositeRenderer::new(font),
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn base(&self) -> &RgbaImage {
        &self.base
    }

    #[must_use]
    pub fn doc(&self) -> &ElementDocument {
        &self.doc
    }

    #[must_use]
    pub fn history(&self) -> &HistoryStack<ElementDocument> {
        &self.history
    }

    #[must_use]
    pub fn style(&self) -> &StyleContext {
        &self.style
    }

    #[must_use]
    pub fn selection(&self) -> Option<ElementId> {
        self.doc.selected()
    }

    #[must_use]
    pub fn tool(&self) -> Tool {
        self.ui.tool
    }

    /// The element currently being drawn, not yet in the document.
    #[must_use]
    pub fn pending(&self) -> Option<&DrawingElement> {
        match &self.input {
            InputState::Drawing { element, .. } => Some(element),
            _ => None,
        }
    }

    // --- Tool / selection ---

    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        if self.ui.tool == tool {
            return vec![Action::None];
        }
        if self.ui.tool == Tool::Crop {
            self.ui.crop = None;
        }
        self.input = InputState::Idle;
        self.ui.tool = tool;
        vec![Action::ToolChanged(tool), Action::RenderNeeded]
    }

    /// Select an element (or clear with `None`). Selecting surfaces the
    /// element's style into the toolbar and switches to its tool.
    pub fn select(&mut self, id: Option<ElementId>) -> Vec<Action> {
        if !self.doc.select(id) {
            return vec![Action::SelectionChanged(None), Action::RenderNeeded];
        }
        let mut actions = vec![Action::SelectionChanged(id)];
        if let Some(el) = self.doc.selected_element() {
            self.style.adopt(el);
            let tool = Tool::for_kind(el.kind());
            if tool != self.ui.tool {
                self.ui.tool = tool;
                actions.push(Action::ToolChanged(tool));
            }
        }
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Pointer input ---

    pub fn on_pointer_down(&mut self, screen_pt: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        match button {
            Button::Middle => {
                self.input = InputState::Panning { last_screen: screen_pt };
                return vec![Action::SetCursor("grabbing".into())];
            }
            Button::Secondary => return vec![Action::None],
            Button::Primary => {}
        }
        if self.ui.text_entry.is_some() {
            // A click outside an open text box commits it first.
            let content = self.ui.text_entry.as_ref().map(|e| e.content.clone()).unwrap_or_default();
            let mut actions = self.commit_text(&content);
            actions.extend(self.on_pointer_down(screen_pt, button, modifiers));
            return actions;
        }

        let world = self.camera.screen_to_world(screen_pt);

        if self.ui.tool == Tool::Crop {
            let anchor = self.clamp_to_base(snap(world));
            self.ui.crop = Some(Bounds::new(anchor.x, anchor.y, 0.0, 0.0));
            self.input = InputState::Cropping { anchor };
            return vec![Action::RenderNeeded];
        }

        if let Some(h) = hit::hit_test(world, &self.doc, &self.camera, self.doc.selected()) {
            return self.begin_transform(h, world);
        }

        match self.ui.tool {
            Tool::Select => {
                let mut actions = self.deselect();
                self.input = InputState::Panning { last_screen: screen_pt };
                actions.push(Action::SetCursor("grabbing".into()));
                actions
            }
            Tool::Text => {
                let mut actions = self.deselect();
                let at = snap(world);
                self.ui.text_entry = Some(TextEntry { id: None, at, content: String::new() });
                actions.push(Action::EditTextRequested { id: None, at, text: String::new() });
                actions
            }
            Tool::Image | Tool::Crop => vec![Action::None],
            tool => {
                let Some(kind) = tool.drawn_kind() else {
                    return vec![Action::None];
                };
                let mut actions = self.deselect();
                let anchor = snap(world);
                let element = self.new_element(kind, anchor);
                self.input = InputState::Drawing { element: Box::new(element), anchor };
                actions.push(Action::RenderNeeded);
                actions
            }
        }
    }

    pub fn on_pointer_move(&mut self, screen_pt: Point, _modifiers: Modifiers) -> Vec<Action> {
        let world = self.camera.screen_to_world(screen_pt);
        match &mut self.input {
            InputState::Idle => vec![Action::SetCursor(self.cursor_at(world))],
            InputState::Panning { last_screen } => {
                let (dx, dy) = (screen_pt.x - last_screen.x, screen_pt.y - last_screen.y);
                *last_screen = screen_pt;
                self.camera.pan_by(dx, dy);
                vec![Action::RenderNeeded]
            }
            InputState::Drawing { element, anchor } => {
                extend_pending(element, *anchor, world);
                vec![Action::RenderNeeded]
            }
            InputState::Dragging { id, last_world, moved } => {
                let (dx, dy) = (world.x - last_world.x, world.y - last_world.y);
                *last_world = world;
                *moved |= dx != 0.0 || dy != 0.0;
                let id = *id;
                if let Some(el) = self.doc.get_mut(&id) {
                    el.translate(dx, dy);
                }
                vec![Action::ElementUpdated(id), Action::RenderNeeded]
            }
            InputState::Resizing { id, anchor, start_world, orig_bounds, rotation } => {
                let id = *id;
                let delta = Point::new(world.x - start_world.x, world.y - start_world.y)
                    .rotated_around(Point::default(), -*rotation);
                let target = anchor.resize(*orig_bounds, delta.x, delta.y);
                let font = self.renderer.font().cloned();
                if let Some(el) = self.doc.get_mut(&id) {
                    el.set_bounds(target);
                    remeasure(el, font.as_ref());
                }
                vec![Action::ElementUpdated(id), Action::RenderNeeded]
            }
            InputState::Rotating { id, center, start_angle, orig_rotation } => {
                let id = *id;
                let angle = angle_deg(*center, world);
                let rotation = (*orig_rotation + angle - *start_angle).rem_euclid(360.0);
                if let Some(el) = self.doc.get_mut(&id) {
                    el.rotation = rotation;
                }
                vec![Action::ElementUpdated(id), Action::RenderNeeded]
            }
            InputState::Cropping { anchor } => {
                let corner = snap(world);
                let region = Bounds::from_corners(*anchor, corner);
                self.ui.crop = Some(self.clip_to_base(region));
                vec![Action::RenderNeeded]
            }
        }
    }

    pub fn on_pointer_up(&mut self, screen_pt: Point, _button: Button, modifiers: Modifiers) -> Vec<Action> {
        if !self.input.is_idle() {
            self.on_pointer_move(screen_pt, modifiers);
        }
        match std::mem::take(&mut self.input) {
            InputState::Idle => vec![Action::None],
            InputState::Panning { .. } => vec![Action::SetCursor("default".into())],
            InputState::Drawing { element, .. } => {
                if !meets_min_extent(&element) {
                    debug!(kind = ?element.kind(), "gesture below minimum extent discarded");
                    return vec![Action::RenderNeeded];
                }
                let id = self.doc.add(*element);
                let mut actions = vec![Action::ElementCreated(id)];
                self.record(&mut actions);
                actions
            }
            InputState::Dragging { moved: false, .. } => vec![Action::None],
            InputState::Dragging { id, .. } | InputState::Resizing { id, .. } | InputState::Rotating { id, .. } => {
                if self.doc.elements() == self.history.current().elements() {
                    return vec![Action::None];
                }
                let mut actions = vec![Action::ElementUpdated(id)];
                self.record(&mut actions);
                actions
            }
            InputState::Cropping { .. } => {
                if self.ui.crop.is_some_and(|c| c.width < MIN_EXTENT_PX || c.height < MIN_EXTENT_PX) {
                    self.ui.crop = None;
                }
                vec![Action::RenderNeeded]
            }
        }
    }

    /// Plain wheel pans; with Ctrl/Cmd held it zooms about the pointer.
    pub fn on_wheel(&mut self, screen_pt: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.command() {
            self.camera.zoom_about(screen_pt, WHEEL_ZOOM_STEP.powf(-delta.dy / 100.0));
        } else {
            self.camera.pan_by(-delta.dx, -delta.dy);
        }
        vec![Action::RenderNeeded]
    }

    pub fn on_key_down(&mut self, key: &Key, modifiers: Modifiers) -> Vec<Action> {
        if self.ui.text_entry.is_some() {
            if key.is("Escape") {
                return self.cancel_text();
            }
            if key.is("Enter") && !modifiers.shift {
                let content = self.ui.text_entry.as_ref().map(|e| e.content.clone()).unwrap_or_default();
                return self.commit_text(&content);
            }
            return vec![Action::None];
        }

        if modifiers.command() {
            if key.is("z") {
                return if modifiers.shift { self.redo() } else { self.undo() };
            }
            if key.is("y") {
                return self.redo();
            }
            return vec![Action::None];
        }

        if key.is("Escape") {
            return self.escape();
        }
        if key.is("Delete") || key.is("Backspace") {
            return self.delete_selected();
        }
        if key.is("Enter") && self.ui.crop.is_some() {
            return self.apply_crop().unwrap_or_else(|err| {
                debug!(error = %err, "crop via Enter not applied");
                vec![Action::None]
            });
        }
        vec![Action::None]
    }

    // --- Text ---

    /// Track what the user has typed so far into the open text box.
    pub fn update_text_draft(&mut self, content: &str) {
        if let Some(entry) = &mut self.ui.text_entry {
            content.clone_into(&mut entry.content);
        }
    }

    /// Close the open text box, creating, updating or deleting its element.
    pub fn commit_text(&mut self, content: &str) -> Vec<Action> {
        let Some(entry) = self.ui.text_entry.take() else {
            return vec![Action::None];
        };
        let mut actions = vec![Action::TextEditClosed];
        let empty = content.trim().is_empty();

        match entry.id {
            Some(id) if empty => {
                if self.doc.remove(&id).is_some() {
                    actions.push(Action::ElementDeleted(id));
                    self.record(&mut actions);
                }
            }
            Some(id) => {
                let font = self.renderer.font().cloned();
                let Some(el) = self.doc.get_mut(&id) else {
                    return actions;
                };
                let changed = el.shape.text().is_some_and(|t| t.content != content);
                if let Some(t) = el.shape.text_mut() {
                    content.clone_into(&mut t.content);
                }
                remeasure(el, font.as_ref());
                if changed {
                    actions.push(Action::ElementUpdated(id));
                    self.record(&mut actions);
                }
            }
            None if empty => {}
            None => {
                let mut el = self.new_element(ElementKind::Text, entry.at);
                if let Some(t) = el.shape.text_mut() {
                    content.clone_into(&mut t.content);
                }
                remeasure(&mut el, self.renderer.font());
                let id = self.doc.add(el);
                actions.push(Action::ElementCreated(id));
                self.record(&mut actions);
            }
        }
        actions
    }

    /// Close the open text box without touching the document.
    pub fn cancel_text(&mut self) -> Vec<Action> {
        if self.ui.text_entry.take().is_none() {
            return vec![Action::None];
        }
        vec![Action::TextEditClosed, Action::RenderNeeded]
    }

    // --- Crop ---

    /// Rasterize the composited view inside the crop region into a new base
    /// bitmap. The document and history start over.
    ///
    /// # Errors
    ///
    /// [`EditorError::NoCropRegion`] without a region,
    /// [`EditorError::EmptyCropRegion`] if it misses the image, or a render error.
    pub fn apply_crop(&mut self) -> Result<Vec<Action>, EditorError> {
        let region = self.ui.crop.ok_or(EditorError::NoCropRegion)?;
        let rect = region
            .to_pixel_rect(self.base.width(), self.base.height())
            .ok_or(EditorError::EmptyCropRegion)?;

        let composited = self.renderer.render(&self.base, &self.doc, None, 1.0)?;
        let cropped = imageops::crop_imm(&composited, rect.x, rect.y, rect.width, rect.height).to_image();

        self.base = Arc::new(cropped);
        self.doc = ElementDocument::new();
        self.history.reset(self.doc.clone());
        self.renderer.clear_cache();
        self.ui.crop = None;
        self.ui.tool = Tool::Select;
        self.input = InputState::Idle;
        info!(width = rect.width, height = rect.height, "crop applied");

        Ok(vec![
            Action::CropApplied { width: rect.width, height: rect.height },
            Action::SelectionChanged(None),
            Action::ToolChanged(Tool::Select),
            self.history_changed(),
            Action::RenderNeeded,
        ])
    }

    pub fn cancel_crop(&mut self) -> Vec<Action> {
        self.ui.crop = None;
        if matches!(self.input, InputState::Cropping { .. }) {
            self.input = InputState::Idle;
        }
        vec![Action::RenderNeeded]
    }

    // --- History ---

    pub fn undo(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        let Some(snapshot) = self.history.undo() else {
            return vec![Action::None];
        };
        self.doc = snapshot.clone();
        vec![Action::SelectionChanged(self.doc.selected()), self.history_changed(), Action::RenderNeeded]
    }

    pub fn redo(&mut self) -> Vec<Action> {
        self.input = InputState::Idle;
        let Some(snapshot) = self.history.redo() else {
            return vec![Action::None];
        };
        self.doc = snapshot.clone();
        vec![Action::SelectionChanged(self.doc.selected()), self.history_changed(), Action::RenderNeeded]
    }

    // --- Property edits ---

    /// Apply a toolbar edit to the active style and the selected element.
    pub fn apply_style(&mut self, patch: &StylePatch) -> Vec<Action> {
        style::apply_style(&mut self.style, patch);
        let font = self.renderer.font().cloned();
        let Some(id) = self.doc.selected() else {
            return vec![Action::None];
        };
        let Some(el) = self.doc.get_mut(&id) else {
            return vec![Action::None];
        };
        if !patch.apply_to(el) {
            return vec![Action::None];
        }
        remeasure(el, font.as_ref());
        let mut actions = vec![Action::ElementUpdated(id)];
        self.record(&mut actions);
        actions
    }

    /// Restyle matching elements and seed new elements from `preset`.
    pub fn apply_preset(&mut self, preset: &Preset) -> Vec<Action> {
        let changed = preset.apply_to_document(&mut self.doc);
        let font = self.renderer.font().cloned();
        let ids: Vec<ElementId> = self.doc.elements().iter().map(|e| e.id).collect();
        for id in ids {
            if let Some(el) = self.doc.get_mut(&id) {
                remeasure(el, font.as_ref());
            }
        }
        self.style.set_active_template(Some(preset.clone()));
        info!(preset_id = %preset.id, changed, "preset applied");
        let mut actions = vec![Action::RenderNeeded];
        if changed > 0 {
            self.record(&mut actions);
        }
        actions
    }

    /// New elements stop following the last applied preset.
    pub fn clear_active_template(&mut self) {
        self.style.set_active_template(None);
    }

    pub fn delete_selected(&mut self) -> Vec<Action> {
        let Some(id) = self.doc.selected() else {
            return vec![Action::None];
        };
        self.doc.remove(&id);
        let mut actions = vec![Action::ElementDeleted(id), Action::SelectionChanged(None)];
        self.record(&mut actions);
        actions
    }

    /// Apply a property-panel edit (position, rotation, size, points, text)
    /// to one element. Records a snapshot only if the element changed.
    pub fn update_element(&mut self, id: &ElementId, patch: &ElementPatch) -> Vec<Action> {
        let Some(before) = self.doc.get(id).cloned() else {
            return vec![Action::None];
        };
        if !self.doc.apply_patch(id, patch) {
            debug!(%id, "element update rejected");
            return vec![Action::None];
        }
        let font = self.renderer.font().cloned();
        let Some(el) = self.doc.get_mut(id) else {
            return vec![Action::None];
        };
        remeasure(el, font.as_ref());
        if *el == before {
            return vec![Action::None];
        }
        let mut actions = vec![Action::ElementUpdated(*id)];
        self.record(&mut actions);
        actions
    }

    pub fn set_visibility(&mut self, id: &ElementId, visible: bool) -> Vec<Action> {
        if self.doc.get(id).is_none_or(|el| el.visible == visible) || !self.doc.set_visible(id, visible) {
            return vec![Action::None];
        }
        let mut actions = vec![Action::ElementUpdated(*id)];
        self.record(&mut actions);
        actions
    }

    pub fn rename(&mut self, id: &ElementId, name: &str) -> Vec<Action> {
        if self.doc.get(id).is_none_or(|el| el.name == name) || !self.doc.rename(id, name) {
            return vec![Action::None];
        }
        let mut actions = vec![Action::ElementUpdated(*id)];
        self.record(&mut actions);
        actions
    }

    pub fn move_layer(&mut self, id: &ElementId, mv: LayerMove) -> Vec<Action> {
        if !self.doc.move_layer(id, mv) {
            return vec![Action::None];
        }
        let mut actions = vec![Action::ElementUpdated(*id)];
        self.record(&mut actions);
        actions
    }

    /// Insert a raster image centered on `at`, scaled down to fit the base
    /// bitmap if needed and kept inside it.
    pub fn insert_image(&mut self, bitmap: RgbaImage, at: Point) -> Vec<Action> {
        let (iw, ih) = (f64::from(bitmap.width()), f64::from(bitmap.height()));
        if iw == 0.0 || ih == 0.0 {
            return vec![Action::None];
        }
        let (bw, bh) = (f64::from(self.base.width()), f64::from(self.base.height()));
        let fit = (bw / iw).min(bh / ih).min(1.0);
        let (w, h) = (iw * fit, ih * fit);
        let x = (at.x - w / 2.0).clamp(0.0, (bw - w).max(0.0));
        let y = (at.y - h / 2.0).clamp(0.0, (bh - h).max(0.0));

        let image = ImageData { bitmap: Arc::new(bitmap), width: w, height: h };
        let mut el = DrawingElement::new(x, y, ElementStyle::default(), Shape::Image(image));
        self.style.seed_for(ElementKind::Image).apply_to(&mut el);
        let id = self.doc.add(el);
        self.doc.select(Some(id));
        let mut actions = vec![Action::ElementCreated(id), Action::SelectionChanged(Some(id))];
        self.record(&mut actions);
        actions
    }

    // --- Output ---

    /// The editor view at the current zoom, including any pending element.
    ///
    /// # Errors
    ///
    /// Propagates [`RenderError`] (e.g. surface too large at high zoom).
    pub fn render_view(&mut self) -> Result<RgbaImage, EditorError> {
        let pending = match &self.input {
            InputState::Drawing { element, .. } => Some(element.as_ref()),
            _ => None,
        };
        Ok(self.renderer.render(&self.base, &self.doc, pending, self.camera.zoom)?)
    }

    /// The document composited 1:1 over the base bitmap.
    ///
    /// # Errors
    ///
    /// Propagates [`RenderError`].
    pub fn render_export(&mut self) -> Result<RgbaImage, EditorError> {
        Ok(self.renderer.render(&self.base, &self.doc, None, 1.0)?)
    }

    /// # Errors
    ///
    /// Propagates render and encode failures.
    pub fn export_image(&mut self, format: ExportFormat) -> Result<Vec<u8>, EditorError> {
        let img = self.render_export()?;
        Ok(export::encode(&img, format)?)
    }

    /// # Errors
    ///
    /// Propagates render and encode failures.
    pub fn clipboard(&mut self) -> Result<ClipboardPayload, EditorError> {
        let img = self.render_export()?;
        Ok(export::clipboard_payload(&img)?)
    }

    // --- Internals ---

    fn begin_transform(&mut self, h: hit::Hit, world: Point) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.doc.selected() != Some(h.element_id) {
            actions.extend(self.select(Some(h.element_id)));
        }
        let Some(el) = self.doc.get(&h.element_id) else {
            return actions;
        };

        if self.ui.tool == Tool::Text && h.part == HitPart::Body {
            if let Some(t) = el.shape.text() {
                let entry = TextEntry { id: Some(el.id), at: el.origin(), content: t.content.clone() };
                actions.push(Action::EditTextRequested { id: entry.id, at: entry.at, text: entry.content.clone() });
                self.ui.text_entry = Some(entry);
                return actions;
            }
        }

        let bounds = el.bounds();
        self.input = match h.part {
            HitPart::Body => InputState::Dragging { id: el.id, last_world: world, moved: false },
            HitPart::ResizeHandle(anchor) => InputState::Resizing {
                id: el.id,
                anchor,
                start_world: world,
                orig_bounds: bounds,
                rotation: el.rotation,
            },
            HitPart::RotateHandle => {
                let center = bounds.center();
                InputState::Rotating { id: el.id, center, start_angle: angle_deg(center, world), orig_rotation: el.rotation }
            }
        };
        actions.push(Action::RenderNeeded);
        actions
    }

    fn escape(&mut self) -> Vec<Action> {
        match std::mem::take(&mut self.input) {
            InputState::Idle | InputState::Panning { .. } => {}
            InputState::Drawing { .. } => return vec![Action::RenderNeeded],
            InputState::Cropping { .. } => return self.cancel_crop(),
            InputState::Dragging { .. } | InputState::Resizing { .. } | InputState::Rotating { .. } => {
                // Live edits are only in the working document; roll back to the last snapshot.
                let selected = self.doc.selected();
                self.doc = self.history.current().clone();
                self.doc.select(selected);
                return vec![Action::RenderNeeded];
            }
        }
        if self.ui.crop.is_some() {
            return self.cancel_crop();
        }
        self.deselect()
    }

    fn deselect(&mut self) -> Vec<Action> {
        if self.doc.selected().is_none() {
            return Vec::new();
        }
        self.doc.select(None);
        vec![Action::SelectionChanged(None), Action::RenderNeeded]
    }

    fn new_element(&self, kind: ElementKind, at: Point) -> DrawingElement {
        let shape = match kind {
            ElementKind::Path => Shape::Path { points: vec![0.0, 0.0] },
            ElementKind::Line => Shape::Line { points: vec![0.0, 0.0, 0.0, 0.0] },
            ElementKind::Arrow => Shape::Arrow { points: vec![0.0, 0.0, 0.0, 0.0] },
            ElementKind::Rect => Shape::Rect(BoxShape::default()),
            ElementKind::Ellipse => Shape::Ellipse(BoxShape::default()),
            ElementKind::Blur => Shape::Blur(BoxShape::default()),
            ElementKind::Text => Shape::Text(TextBody::default()),
            ElementKind::Image => Shape::Image(ImageData {
                bitmap: Arc::new(RgbaImage::new(1, 1)),
                width: 0.0,
                height: 0.0,
            }),
        };
        let mut el = DrawingElement::new(at.x, at.y, ElementStyle::default(), shape);
        self.style.seed_for(kind).apply_to(&mut el);
        el
    }

    fn record(&mut self, actions: &mut Vec<Action>) {
        self.history.record(self.doc.clone());
        actions.push(self.history_changed());
        actions.push(Action::RenderNeeded);
    }

    fn history_changed(&self) -> Action {
        Action::HistoryChanged { can_undo: self.history.can_undo(), can_redo: self.history.can_redo() }
    }

    fn cursor_at(&self, world: Point) -> String {
        if self.ui.tool == Tool::Crop {
            return "crosshair".into();
        }
        let cursor = match hit::hit_test(world, &self.doc, &self.camera, self.doc.selected()).map(|h| h.part) {
            Some(HitPart::Body) => "move",
            Some(HitPart::ResizeHandle(_)) => "nwse-resize",
            Some(HitPart::RotateHandle) => "grab",
            None if self.ui.tool == Tool::Select => "default",
            None if self.ui.tool == Tool::Text => "text",
            None => "crosshair",
        };
        cursor.into()
    }

    fn clamp_to_base(&self, p: Point) -> Point {
        Point::new(
            p.x.clamp(0.0, f64::from(self.base.width())),
            p.y.clamp(0.0, f64::from(self.base.height())),
        )
    }

    fn clip_to_base(&self, b: Bounds) -> Bounds {
        let tl = self.clamp_to_base(Point::new(b.x, b.y));
        let br = self.clamp_to_base(Point::new(b.right(), b.bottom()));
        Bounds::from_corners(tl, br)
    }
}

fn snap(p: Point) -> Point {
    Point::new(p.x.round(), p.y.round())
}

/// Pointer angle around `center`, in degrees clockwise from +x.
fn angle_deg(center: Point, p: Point) -> f64 {
    (p.y - center.y).atan2(p.x - center.x).to_degrees()
}

/// Grow the pending element toward `world`.
fn extend_pending(element: &mut DrawingElement, anchor: Point, world: Point) {
    match &mut element.shape {
        Shape::Path { points } => {
            let rel_x = world.x.round() - element.x;
            let rel_y = world.y.round() - element.y;
            let fresh = match points.as_slice() {
                [.., x, y] => (rel_x - x).abs() >= FREEHAND_MIN_STEP_PX || (rel_y - y).abs() >= FREEHAND_MIN_STEP_PX,
                _ => true,
            };
            if fresh {
                points.extend([rel_x, rel_y]);
            }
        }
        Shape::Line { points } | Shape::Arrow { points } => {
            let end = snap(world);
            *points = vec![0.0, 0.0, end.x - anchor.x, end.y - anchor.y];
        }
        Shape::Rect(b) | Shape::Ellipse(b) | Shape::Blur(b) => {
            let r = Bounds::from_corners(anchor, snap(world));
            element.x = r.x;
            element.y = r.y;
            b.width = r.width;
            b.height = r.height;
        }
        Shape::Text(_) | Shape::Image(_) => {}
    }
}

/// Boxes need both sides at the minimum; point kinds need their larger side there.
fn meets_min_extent(el: &DrawingElement) -> bool {
    let b = el.bounds();
    if el.kind().is_polyline() {
        b.extent() >= MIN_EXTENT_PX
    } else {
        b.width >= MIN_EXTENT_PX && b.height >= MIN_EXTENT_PX
    }
}

/// Refresh a text element's measured box after content or typography changed.
fn remeasure(el: &mut DrawingElement, font: Option<&FontArc>) {
    if let Some(t) = el.shape.text_mut() {
        let (w, h) = text::measure(t, font);
        t.width = w;
        t.height = h;
    }
}
