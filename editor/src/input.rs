//! Input model: tools, modifier keys, mouse buttons, and the gesture state machine.
//!
//! `Tool` and `Modifiers` capture the user's intent at the time of a pointer
//! event. `InputState` is the gesture tracked between pointer-down and
//! pointer-up; it carries what the engine needs to update the pending element
//! on every move and to commit exactly one history entry on release.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::doc::{DrawingElement, ElementId, ElementKind};
use crate::geom::Bounds;
use crate::hit::ResizeAnchor;

/// Which tool is currently active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tool {
    /// Pointer / selection tool (default).
    #[default]
    Select,
    Pencil,
    Line,
    Arrow,
    Rect,
    Ellipse,
    Text,
    /// Pixelated redaction region.
    Blur,
    Crop,
    Image,
}

impl Tool {
    /// The tool that creates elements of `kind`.
    #[must_use]
    pub fn for_kind(kind: ElementKind) -> Self {
        match kind {
            ElementKind::Path => Self::Pencil,
            ElementKind::Line => Self::Line,
            ElementKind::Arrow => Self::Arrow,
            ElementKind::Rect => Self::Rect,
            ElementKind::Ellipse => Self::Ellipse,
            ElementKind::Text => Self::Text,
            ElementKind::Blur => Self::Blur,
            ElementKind::Image => Self::Image,
        }
    }

    /// Element kind produced by a drag with this tool, if it draws one.
    #[must_use]
    pub fn drawn_kind(self) -> Option<ElementKind> {
        match self {
            Self::Pencil => Some(ElementKind::Path),
            Self::Line => Some(ElementKind::Line),
            Self::Arrow => Some(ElementKind::Arrow),
            Self::Rect => Some(ElementKind::Rect),
            Self::Ellipse => Some(ElementKind::Ellipse),
            Self::Blur => Some(ElementKind::Blur),
            Self::Select | Self::Text | Self::Crop | Self::Image => None,
        }
    }
}

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    /// Command on macOS.
    pub meta: bool,
}

impl Modifiers {
    /// Ctrl or Cmd, whichever the platform uses for shortcuts.
    #[must_use]
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    Primary,
    Middle,
    Secondary,
}

/// A keyboard key as reported by the host (e.g. `"Delete"`, `"Escape"`, `"z"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0.eq_ignore_ascii_case(name)
    }
}

/// Wheel / trackpad scroll delta in pixels (positive `dy` = down).
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    pub dx: f64,
    pub dy: f64,
}

/// An open text entry box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEntry {
    /// Existing element being edited, or `None` for a new one.
    pub id: Option<ElementId>,
    /// Document-space top-left of the entry.
    pub at: Point,
    pub content: String,
}

/// Persistent UI state visible to the renderer.
#[derive(Debug, Clone, Default)]
pub struct UiState {
    pub tool: Tool,
    pub text_entry: Option<TextEntry>,
    /// Crop region awaiting apply/cancel.
    pub crop: Option<Bounds>,
}

/// The gesture in progress.
#[derive(Debug, Clone, Default)]
pub enum InputState {
    /// Waiting for the next pointer-down.
    #[default]
    Idle,
    Panning {
        last_screen: Point,
    },
    /// A new element is being sized. It lives here, not in the document,
    /// until release decides whether it is big enough to keep.
    Drawing {
        element: Box<DrawingElement>,
        anchor: Point,
    },
    Dragging {
        id: ElementId,
        last_world: Point,
        moved: bool,
    },
    Resizing {
        id: ElementId,
        anchor: ResizeAnchor,
        start_world: Point,
        orig_bounds: Bounds,
        rotation: f64,
    },
    Rotating {
        id: ElementId,
        center: Point,
        /// Pointer angle at the start of the gesture, in degrees.
        start_angle: f64,
        orig_rotation: f64,
    },
    Cropping {
        anchor: Point,
    },
}

impl InputState {
    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }
}
