//! Annotation editor core for captured page bitmaps.
//!
//! Everything here is host-agnostic: the host forwards pointer, wheel and key
//! events into [`EditorCore`], reacts to the returned [`Action`]s, and asks for
//! rendered or encoded output when it needs pixels.
//!
//! | Module | Role |
//! |--------|------|
//! | [`doc`] | Element types and the ordered document |
//! | [`history`] | Snapshot undo/redo |
//! | [`camera`] / [`geom`] | Pan/zoom transforms and bounding-box math |
//! | [`hit`] | Hit-testing bodies and transform handles |
//! | [`input`] | Tools, modifiers and gesture state |
//! | [`engine`] | Event handling, crop, text entry, property edits |
//! | [`style`] / [`preset`] | Active style and persisted presets |
//! | [`text`] | Text case, layout and measurement |
//! | [`render`] | Compositing onto the base bitmap, pixelated blur |
//! | [`export`] | PNG/JPEG encoding and clipboard payloads |
//! | [`session`] | Opening a session from the store |

pub mod camera;
pub mod color;
pub mod consts;
pub mod doc;
pub mod engine;
pub mod export;
pub mod geom;
pub mod hit;
pub mod history;
pub mod input;
pub mod preset;
pub mod render;
pub mod session;
pub mod style;
pub mod text;

pub use doc::{DrawingElement, ElementDocument, ElementId, ElementKind, ElementPatch};
pub use engine::{Action, EditorCore, EditorError};
pub use export::ExportFormat;
pub use input::Tool;
pub use session::EditorSession;
