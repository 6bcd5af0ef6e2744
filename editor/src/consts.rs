//! Shared numeric constants for the editor crate.

// ── Drawing ─────────────────────────────────────────────────────

/// Smallest committed extent, in document pixels. Gestures below this are
/// treated as accidental clicks and discarded on release.
pub const MIN_EXTENT_PX: f64 = 5.0;

/// A freehand point is appended only when it moves more than this far from
/// the previous one (after rounding to whole pixels).
pub const FREEHAND_MIN_STEP_PX: f64 = 1.0;

/// Smallest width/height a resize can shrink an element to.
pub const MIN_RESIZE_PX: f64 = 1.0;

/// Arrowhead length as a multiple of stroke width.
pub const ARROW_HEAD_PER_STROKE: f64 = 3.0;

/// Arrowhead length floor in document pixels.
pub const ARROW_HEAD_MIN_PX: f64 = 10.0;

// ── Hit-testing ─────────────────────────────────────────────────

/// Screen-space hit slop in pixels for handles and thin strokes.
pub const HANDLE_RADIUS_PX: f64 = 8.0;

/// Distance from the bounding box top edge to the rotate handle, in screen pixels.
pub const ROTATE_HANDLE_OFFSET_PX: f64 = 24.0;

// ── Camera ──────────────────────────────────────────────────────

/// Zoom floor.
pub const MIN_ZOOM: f64 = 0.1;

/// Zoom ceiling.
pub const MAX_ZOOM: f64 = 8.0;

/// Zoom multiplier per wheel notch (100 px of delta).
pub const WHEEL_ZOOM_STEP: f64 = 1.1;

// ── Rendering ───────────────────────────────────────────────────

/// Edge length of one redaction cell, in source pixels.
pub const PIXELATE_CELL_PX: u32 = 10;

/// Largest output surface edge the renderer will allocate.
pub const MAX_CANVAS_EDGE_PX: u32 = 32_767;

/// Largest output surface area the renderer will allocate.
pub const MAX_CANVAS_AREA_PX: u64 = 268_435_456;

// ── Text ────────────────────────────────────────────────────────

/// Advance estimate (in ems) used when no font is loaded.
pub const FALLBACK_ADVANCE_EM: f64 = 0.6;

/// Ascent estimate (in ems) used when no font is loaded.
pub const FALLBACK_ASCENT_EM: f64 = 0.8;

/// Smallest font size a text resize can produce.
pub const MIN_FONT_SIZE: f64 = 6.0;

// ── History ─────────────────────────────────────────────────────

/// Snapshots kept before the oldest is dropped.
pub const HISTORY_DEPTH: usize = 100;
