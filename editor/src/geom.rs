//! Axis-aligned bounds and the small amount of vector math shared by
//! hit-testing, transforms and rendering.

#[cfg(test)]
#[path = "geom_test.rs"]
mod geom_test;

use crate::camera::Point;

/// Axis-aligned rectangle in document space. Width and height are never negative.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width: width.max(0.0), height: height.max(0.0) }
    }

    /// The rectangle spanned by two opposite corners, in any order.
    #[must_use]
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x: a.x.min(b.x),
            y: a.y.min(b.y),
            width: (a.x - b.x).abs(),
            height: (a.y - b.y).abs(),
        }
    }

    /// Smallest bounds containing every `(x, y)` pair of a flat point list,
    /// offset by `origin`. Empty lists give a zero-size box at the origin.
    #[must_use]
    pub fn of_points(origin: Point, points: &[f64]) -> Self {
        let mut pairs = points.chunks_exact(2);
        let Some(first) = pairs.next() else {
            return Self::new(origin.x, origin.y, 0.0, 0.0);
        };
        let (mut min_x, mut min_y, mut max_x, mut max_y) = (first[0], first[1], first[0], first[1]);
        for pair in pairs {
            min_x = min_x.min(pair[0]);
            min_y = min_y.min(pair[1]);
            max_x = max_x.max(pair[0]);
            max_y = max_y.max(pair[1]);
        }
        Self { x: origin.x + min_x, y: origin.y + min_y, width: max_x - min_x, height: max_y - min_y }
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Larger of width and height.
    #[must_use]
    pub fn extent(&self) -> f64 {
        self.width.max(self.height)
    }

    #[must_use]
    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.x && p.x <= self.right() && p.y >= self.y && p.y <= self.bottom()
    }

    /// Grow (or shrink, for negative `d`) on every side.
    #[must_use]
    pub fn expand(&self, d: f64) -> Self {
        Self::new(self.x - d, self.y - d, self.width + 2.0 * d, self.height + 2.0 * d)
    }

    /// Round to whole pixels and clip to a `max_w × max_h` surface.
    /// Returns `None` when nothing of the rectangle remains.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn to_pixel_rect(&self, max_w: u32, max_h: u32) -> Option<PixelRect> {
        let x0 = self.x.round().clamp(0.0, f64::from(max_w));
        let y0 = self.y.round().clamp(0.0, f64::from(max_h));
        let x1 = self.right().round().clamp(0.0, f64::from(max_w));
        let y1 = self.bottom().round().clamp(0.0, f64::from(max_h));
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(PixelRect { x: x0 as u32, y: y0 as u32, width: (x1 - x0) as u32, height: (y1 - y0) as u32 })
    }
}

/// Integer rectangle on a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Distance from `p` to the segment `a`–`b`.
#[must_use]
pub fn distance_to_segment(p: Point, a: Point, b: Point) -> f64 {
    let dx = b.x - a.x;
    let dy = b.y - a.y;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return p.distance(a);
    }
    let t = (((p.x - a.x) * dx + (p.y - a.y) * dy) / len_sq).clamp(0.0, 1.0);
    p.distance(Point::new(a.x + t * dx, a.y + t * dy))
}

/// Distance from `p` to a polyline given as a flat `[x0, y0, x1, y1, ...]`
/// list offset by `origin`. A single point degenerates to point distance.
#[must_use]
pub fn distance_to_polyline(p: Point, origin: Point, points: &[f64]) -> f64 {
    let pts: Vec<Point> = points
        .chunks_exact(2)
        .map(|c| Point::new(origin.x + c[0], origin.y + c[1]))
        .collect();
    match pts.as_slice() {
        [] => f64::INFINITY,
        [only] => p.distance(*only),
        _ => pts
            .windows(2)
            .map(|w| distance_to_segment(p, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}
