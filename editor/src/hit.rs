#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::consts::{HANDLE_RADIUS_PX, MIN_RESIZE_PX, ROTATE_HANDLE_OFFSET_PX};
use crate::doc::{DrawingElement, ElementDocument, ElementId, Shape};
use crate::geom::{Bounds, distance_to_polyline};

/// Which part of an element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(ResizeAnchor),
    RotateHandle,
}

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    pub const ALL: [ResizeAnchor; 8] = [Self::N, Self::Ne, Self::E, Self::Se, Self::S, Self::Sw, Self::W, Self::Nw];

    /// Handle location on an unrotated box.
    #[must_use]
    pub fn position(self, b: Bounds) -> Point {
        let cx = b.x + b.width / 2.0;
        let cy = b.y + b.height / 2.0;
        let (x, y) = match self {
            Self::N => (cx, b.y),
            Self::Ne => (b.right(), b.y),
            Self::E => (b.right(), cy),
            Self::Se => (b.right(), b.bottom()),
            Self::S => (cx, b.bottom()),
            Self::Sw => (b.x, b.bottom()),
            Self::W => (b.x, cy),
            Self::Nw => (b.x, b.y),
        };
        Point::new(x, y)
    }

    /// Drag this handle by `(dx, dy)` in the element's local (unrotated)
    /// frame. The opposite edges stay put; size never drops below
    /// [`MIN_RESIZE_PX`], and dragging past the opposite edge stops there.
    #[must_use]
    pub fn resize(self, orig: Bounds, dx: f64, dy: f64) -> Bounds {
        let (mut left, mut top, mut right, mut bottom) = (orig.x, orig.y, orig.right(), orig.bottom());
        let moves_left = matches!(self, Self::W | Self::Nw | Self::Sw);
        let moves_right = matches!(self, Self::E | Self::Ne | Self::Se);
        let moves_top = matches!(self, Self::N | Self::Ne | Self::Nw);
        let moves_bottom = matches!(self, Self::S | Self::Se | Self::Sw);
        if moves_left {
            left = (left + dx).min(right - MIN_RESIZE_PX);
        }
        if moves_right {
            right = (right + dx).max(left + MIN_RESIZE_PX);
        }
        if moves_top {
            top = (top + dy).min(bottom - MIN_RESIZE_PX);
        }
        if moves_bottom {
            bottom = (bottom + dy).max(top + MIN_RESIZE_PX);
        }
        Bounds::new(left, top, right - left, bottom - top)
    }
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub element_id: ElementId,
    pub part: HitPart,
}

/// Where the rotate handle sits for an element, in document space.
#[must_use]
pub fn rotate_handle_position(el: &DrawingElement, camera: &Camera) -> Point {
    let b = el.bounds();
    let offset = camera.screen_dist_to_world(ROTATE_HANDLE_OFFSET_PX);
    Point::new(b.x + b.width / 2.0, b.y - offset).rotated_around(b.center(), el.rotation)
}

/// Resize handle positions for an element, in document space, rotation applied.
#[must_use]
pub fn handle_positions(el: &DrawingElement) -> [(ResizeAnchor, Point); 8] {
    let b = el.bounds();
    let center = b.center();
    ResizeAnchor::ALL.map(|a| (a, a.position(b).rotated_around(center, el.rotation)))
}

/// Test which element (if any) is under `world_pt`.
///
/// The selected element's handles are checked first, then element bodies
/// from the top of the stack down. Hidden elements are never hit.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &ElementDocument, camera: &Camera, selected: Option<ElementId>) -> Option<Hit> {
    let slop = camera.screen_dist_to_world(HANDLE_RADIUS_PX);

    if let Some(el) = selected.and_then(|id| doc.get(&id)).filter(|el| el.visible) {
        if world_pt.distance(rotate_handle_position(el, camera)) <= slop {
            return Some(Hit { element_id: el.id, part: HitPart::RotateHandle });
        }
        for (anchor, pos) in handle_positions(el) {
            if world_pt.distance(pos) <= slop {
                return Some(Hit { element_id: el.id, part: HitPart::ResizeHandle(anchor) });
            }
        }
    }

    doc.elements()
        .iter()
        .rev()
        .filter(|el| el.visible)
        .find(|el| body_hit(el, world_pt, slop))
        .map(|el| Hit { element_id: el.id, part: HitPart::Body })
}

/// Whether `world_pt` lands on the element's visible body.
#[must_use]
pub fn body_hit(el: &DrawingElement, world_pt: Point, slop: f64) -> bool {
    let b = el.bounds();
    let p = world_pt.rotated_around(b.center(), -el.rotation);
    let reach = el.style.stroke_width / 2.0 + slop;

    match &el.shape {
        Shape::Path { points } | Shape::Line { points } | Shape::Arrow { points } => {
            distance_to_polyline(p, el.origin(), points) <= reach
        }
        Shape::Rect(r) => {
            if r.filled {
                b.contains(p)
            } else {
                b.expand(reach).contains(p) && !b.expand(-reach).contains(p)
            }
        }
        Shape::Ellipse(e) => {
            let rx = e.width / 2.0;
            let ry = e.height / 2.0;
            if rx <= 0.0 || ry <= 0.0 {
                return b.expand(reach).contains(p);
            }
            let c = b.center();
            let d = ((p.x - c.x) / rx).hypot((p.y - c.y) / ry);
            if e.filled {
                d <= 1.0 + reach / rx.min(ry)
            } else {
                (d - 1.0).abs() * rx.min(ry) <= reach
            }
        }
        Shape::Text(_) | Shape::Blur(_) | Shape::Image(_) => b.contains(p),
    }
}
