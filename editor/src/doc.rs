//! Document model: drawing elements, their kinds, and the ordered store.
//!
//! An [`ElementDocument`] is the whole editable state layered over the base
//! bitmap: an ordered list of [`DrawingElement`]s (later entries draw on top),
//! the current selection, and the counter used to hand out default names.
//! The editor engine mutates it through the methods here and snapshots it into
//! the history stack after every committed action; the renderer and the
//! hit-tester only read it.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::fmt;
use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Point;
use crate::consts::{MIN_FONT_SIZE, MIN_RESIZE_PX};
use crate::geom::Bounds;

/// Unique identifier for a drawing element.
pub type ElementId = Uuid;

/// The kind of a drawing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// Freehand pencil stroke.
    Path,
    /// Straight segment.
    Line,
    /// Straight segment with an arrowhead at the last point.
    Arrow,
    /// Axis-aligned rectangle (before rotation).
    Rect,
    /// Ellipse inscribed in its bounding box.
    Ellipse,
    /// Block of text.
    Text,
    /// Pixelated redaction region.
    Blur,
    /// Embedded raster image.
    Image,
}

impl ElementKind {
    /// Human label used for default names and the layers panel.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Path => "Pencil",
            Self::Line => "Line",
            Self::Arrow => "Arrow",
            Self::Rect => "Rectangle",
            Self::Ellipse => "Ellipse",
            Self::Text => "Text",
            Self::Blur => "Blur",
            Self::Image => "Image",
        }
    }

    /// Kinds whose geometry is a point list rather than a box.
    #[must_use]
    pub fn is_polyline(self) -> bool {
        matches!(self, Self::Path | Self::Line | Self::Arrow)
    }
}

/// Stroke and opacity attributes shared by every kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStyle {
    pub stroke_color: String,
    pub stroke_width: f64,
    /// 0.0 (invisible) to 1.0 (opaque).
    pub opacity: f64,
    /// Alternating dash/gap lengths; `None` draws solid.
    pub dash: Option<Vec<f64>>,
}

impl Default for ElementStyle {
    fn default() -> Self {
        Self { stroke_color: "#e53935".to_owned(), stroke_width: 4.0, opacity: 1.0, dash: None }
    }
}

/// Text case transform applied at layout time. Content is stored as typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCase {
    #[default]
    None,
    Upper,
    Lower,
    Capitalize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextStroke {
    pub color: String,
    pub width: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextShadow {
    pub color: String,
    pub blur: f64,
    pub offset_x: f64,
    pub offset_y: f64,
}

/// Width/height geometry for box-shaped kinds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxShape {
    pub width: f64,
    pub height: f64,
    pub filled: bool,
}

/// Text content plus typography. `width`/`height` hold the measured layout box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBody {
    pub content: String,
    pub font_family: String,
    pub font_size: f64,
    pub background: Option<String>,
    pub stroke: Option<TextStroke>,
    pub shadow: Option<TextShadow>,
    pub letter_spacing: f64,
    /// Multiple of `font_size`.
    pub line_height: f64,
    pub case: TextCase,
    pub align: TextAlign,
    pub width: f64,
    pub height: f64,
}

impl Default for TextBody {
    fn default() -> Self {
        Self {
            content: String::new(),
            font_family: "sans-serif".to_owned(),
            font_size: 24.0,
            background: None,
            stroke: None,
            shadow: None,
            letter_spacing: 0.0,
            line_height: 1.2,
            case: TextCase::None,
            align: TextAlign::Left,
            width: 0.0,
            height: 0.0,
        }
    }
}

/// Embedded bitmap. Shared between history snapshots, so cloning is cheap.
#[derive(Clone)]
pub struct ImageData {
    pub bitmap: Arc<RgbaImage>,
    pub width: f64,
    pub height: f64,
}

impl PartialEq for ImageData {
    fn eq(&self, other: &Self) -> bool {
        self.width == other.width
            && self.height == other.height
            && (Arc::ptr_eq(&self.bitmap, &other.bitmap)
                || (self.bitmap.dimensions() == other.bitmap.dimensions()
                    && self.bitmap.as_raw() == other.bitmap.as_raw()))
    }
}

impl fmt::Debug for ImageData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (w, h) = self.bitmap.dimensions();
        f.debug_struct("ImageData")
            .field("bitmap", &format_args!("{w}x{h}"))
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

/// Kind-specific geometry and content.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Flat `[x0, y0, x1, y1, ...]` offsets relative to the element origin.
    Path { points: Vec<f64> },
    Line { points: Vec<f64> },
    Arrow { points: Vec<f64> },
    Rect(BoxShape),
    Ellipse(BoxShape),
    Blur(BoxShape),
    Text(TextBody),
    Image(ImageData),
}

impl Shape {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Path { .. } => ElementKind::Path,
            Self::Line { .. } => ElementKind::Line,
            Self::Arrow { .. } => ElementKind::Arrow,
            Self::Rect(_) => ElementKind::Rect,
            Self::Ellipse(_) => ElementKind::Ellipse,
            Self::Blur(_) => ElementKind::Blur,
            Self::Text(_) => ElementKind::Text,
            Self::Image(_) => ElementKind::Image,
        }
    }

    /// Point list for polyline kinds.
    #[must_use]
    pub fn points(&self) -> Option<&[f64]> {
        match self {
            Self::Path { points } | Self::Line { points } | Self::Arrow { points } => Some(points),
            _ => None,
        }
    }

    pub fn points_mut(&mut self) -> Option<&mut Vec<f64>> {
        match self {
            Self::Path { points } | Self::Line { points } | Self::Arrow { points } => Some(points),
            _ => None,
        }
    }

    #[must_use]
    pub fn box_shape(&self) -> Option<&BoxShape> {
        match self {
            Self::Rect(b) | Self::Ellipse(b) | Self::Blur(b) => Some(b),
            _ => None,
        }
    }

    pub fn box_shape_mut(&mut self) -> Option<&mut BoxShape> {
        match self {
            Self::Rect(b) | Self::Ellipse(b) | Self::Blur(b) => Some(b),
            _ => None,
        }
    }

    #[must_use]
    pub fn text(&self) -> Option<&TextBody> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }

    pub fn text_mut(&mut self) -> Option<&mut TextBody> {
        match self {
            Self::Text(t) => Some(t),
            _ => None,
        }
    }
}

/// A single annotation layered over the base bitmap.
///
/// For box kinds, text and images `(x, y)` is the top-left of the unrotated
/// bounding box. For polyline kinds it is the origin the point offsets are
/// relative to (the first point is usually `(0, 0)`).
#[derive(Debug, Clone, PartialEq)]
pub struct DrawingElement {
    pub id: ElementId,
    pub x: f64,
    pub y: f64,
    /// Clockwise degrees around the bounding-box center.
    pub rotation: f64,
    pub style: ElementStyle,
    pub visible: bool,
    /// Display name; assigned by the document when left empty.
    pub name: String,
    pub shape: Shape,
}

impl DrawingElement {
    /// New visible, unnamed, unrotated element with a fresh id.
    #[must_use]
    pub fn new(x: f64, y: f64, style: ElementStyle, shape: Shape) -> Self {
        Self { id: Uuid::new_v4(), x, y, rotation: 0.0, style, visible: true, name: String::new(), shape }
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.shape.kind()
    }

    #[must_use]
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Unrotated bounding box in document space.
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        match &self.shape {
            Shape::Path { points } | Shape::Line { points } | Shape::Arrow { points } => {
                Bounds::of_points(self.origin(), points)
            }
            Shape::Rect(b) | Shape::Ellipse(b) | Shape::Blur(b) => {
                Bounds::new(self.x, self.y, b.width, b.height)
            }
            Shape::Text(t) => Bounds::new(self.x, self.y, t.width, t.height),
            Shape::Image(img) => Bounds::new(self.x, self.y, img.width, img.height),
        }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    /// Fit the element into `target`.
    ///
    /// Box kinds and images take the new box directly. Polyline points are
    /// scaled about their bounding box. Text scales its font size by the
    /// height ratio; its measured box is refreshed by the caller.
    pub fn set_bounds(&mut self, target: Bounds) {
        let current = self.bounds();
        let width = target.width.max(MIN_RESIZE_PX);
        let height = target.height.max(MIN_RESIZE_PX);
        match &mut self.shape {
            Shape::Rect(b) | Shape::Ellipse(b) | Shape::Blur(b) => {
                self.x = target.x;
                self.y = target.y;
                b.width = width;
                b.height = height;
            }
            Shape::Image(img) => {
                self.x = target.x;
                self.y = target.y;
                img.width = width;
                img.height = height;
            }
            Shape::Text(t) => {
                if current.height > 0.0 {
                    t.font_size = (t.font_size * height / current.height).max(MIN_FONT_SIZE);
                }
                self.x = target.x;
                self.y = target.y;
            }
            Shape::Path { points } | Shape::Line { points } | Shape::Arrow { points } => {
                let sx = if current.width > 0.0 { target.width / current.width } else { 1.0 };
                let sy = if current.height > 0.0 { target.height / current.height } else { 1.0 };
                let min_x = current.x - self.x;
                let min_y = current.y - self.y;
                for pair in points.chunks_exact_mut(2) {
                    pair[0] = (pair[0] - min_x) * sx;
                    pair[1] = (pair[1] - min_y) * sy;
                }
                self.x = target.x;
                self.y = target.y;
            }
        }
    }
}

/// Sparse update for an element. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementPatch {
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub rotation: Option<f64>,
    pub visible: Option<bool>,
    pub name: Option<String>,
    /// Replacement point list (polyline kinds only).
    pub points: Option<Vec<f64>>,
    /// Replacement width/height (box kinds and images only).
    pub size: Option<(f64, f64)>,
    /// Replacement text content (text only).
    pub content: Option<String>,
}

impl ElementPatch {
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Self::default() }
    }
}

/// Layer reorder operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerMove {
    Forward,
    Backward,
    Front,
    Back,
}

/// Ordered elements plus selection and naming state.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ElementDocument {
    elements: Vec<DrawingElement>,
    selected: Option<ElementId>,
    name_counter: u64,
}

impl ElementDocument {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element on top. An empty name is replaced with the next
    /// default name (`"Rectangle 3"`). Returns the element id.
    pub fn add(&mut self, mut element: DrawingElement) -> ElementId {
        self.name_counter += 1;
        if element.name.is_empty() {
            element.name = format!("{} {}", element.kind().label(), self.name_counter);
        }
        let id = element.id;
        self.elements.push(element);
        id
    }

    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&DrawingElement> {
        self.elements.iter().find(|e| e.id == *id)
    }

    pub fn get_mut(&mut self, id: &ElementId) -> Option<&mut DrawingElement> {
        self.elements.iter_mut().find(|e| e.id == *id)
    }

    /// Apply a sparse patch. Returns false if the element does not exist or a
    /// field does not fit its kind (in which case nothing is applied).
    pub fn apply_patch(&mut self, id: &ElementId, patch: &ElementPatch) -> bool {
        let Some(el) = self.get_mut(id) else {
            return false;
        };
        if patch.points.is_some() && !el.kind().is_polyline() {
            return false;
        }
        if patch.size.is_some() && !matches!(el.shape, Shape::Rect(_) | Shape::Ellipse(_) | Shape::Blur(_) | Shape::Image(_)) {
            return false;
        }
        if patch.content.is_some() && el.kind() != ElementKind::Text {
            return false;
        }

        if let Some(x) = patch.x {
            el.x = x;
        }
        if let Some(y) = patch.y {
            el.y = y;
        }
        if let Some(r) = patch.rotation {
            el.rotation = r;
        }
        if let Some(v) = patch.visible {
            el.visible = v;
        }
        if let Some(ref name) = patch.name {
            el.name.clone_from(name);
        }
        if let (Some(points), Some(target)) = (&patch.points, el.shape.points_mut()) {
            target.clone_from(points);
        }
        if let Some((w, h)) = patch.size {
            match &mut el.shape {
                Shape::Image(img) => {
                    img.width = w;
                    img.height = h;
                }
                shape => {
                    if let Some(b) = shape.box_shape_mut() {
                        b.width = w;
                        b.height = h;
                    }
                }
            }
        }
        if let (Some(content), Some(text)) = (&patch.content, el.shape.text_mut()) {
            text.content.clone_from(content);
        }
        true
    }

    /// Remove an element, clearing the selection if it pointed at it.
    pub fn remove(&mut self, id: &ElementId) -> Option<DrawingElement> {
        let idx = self.index_of(id)?;
        if self.selected == Some(*id) {
            self.selected = None;
        }
        Some(self.elements.remove(idx))
    }

    /// Select an element, or clear the selection with `None`. Selecting an
    /// unknown id clears the selection and returns false.
    pub fn select(&mut self, id: Option<ElementId>) -> bool {
        match id {
            Some(id) if self.get(&id).is_some() => {
                self.selected = Some(id);
                true
            }
            Some(_) => {
                self.selected = None;
                false
            }
            None => {
                self.selected = None;
                true
            }
        }
    }

    #[must_use]
    pub fn selected(&self) -> Option<ElementId> {
        self.selected
    }

    #[must_use]
    pub fn selected_element(&self) -> Option<&DrawingElement> {
        self.selected.and_then(|id| self.get(&id))
    }

    pub fn set_visible(&mut self, id: &ElementId, visible: bool) -> bool {
        self.apply_patch(id, &ElementPatch { visible: Some(visible), ..ElementPatch::default() })
    }

    pub fn rename(&mut self, id: &ElementId, name: &str) -> bool {
        self.apply_patch(id, &ElementPatch { name: Some(name.to_owned()), ..ElementPatch::default() })
    }

    /// Reorder an element. Returns false if the element is missing or already
    /// at the requested end.
    pub fn move_layer(&mut self, id: &ElementId, mv: LayerMove) -> bool {
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        let last = self.elements.len() - 1;
        let target = match mv {
            LayerMove::Forward => (idx + 1).min(last),
            LayerMove::Backward => idx.saturating_sub(1),
            LayerMove::Front => last,
            LayerMove::Back => 0,
        };
        if target == idx {
            return false;
        }
        let el = self.elements.remove(idx);
        self.elements.insert(target, el);
        true
    }

    /// Elements in draw order (bottom first).
    #[must_use]
    pub fn elements(&self) -> &[DrawingElement] {
        &self.elements
    }

    /// Elements as listed in the layers panel (top first).
    #[must_use]
    pub fn layers(&self) -> Vec<&DrawingElement> {
        self.elements.iter().rev().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Drop every element and the selection. The naming counter keeps counting.
    pub fn clear(&mut self) {
        self.elements.clear();
        self.selected = None;
    }

    fn index_of(&self, id: &ElementId) -> Option<usize> {
        self.elements.iter().position(|e| e.id == *id)
    }
}
