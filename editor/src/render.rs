//! Rendering: composites the base bitmap and the element document into pixels.
//!
//! The renderer reads the document and never mutates it. Output is an
//! `RgbaImage` sized `base × scale`: the editor view uses the camera zoom, export
//! and crop use `1.0`. Vector work goes through `tiny-skia`, which wants
//! premultiplied pixels, so bitmaps are premultiplied on the way in and
//! demultiplied on the way out.
//!
//! Blur regions are pixelated from the *original* base bitmap. Each result is
//! cached per element and keyed by the pixel rectangle it covers, so moving
//! or resizing a region recomputes it and overlapping regions never feed on
//! each other.

#![allow(clippy::cast_possible_truncation, clippy::cast_precision_loss, clippy::cast_sign_loss)]

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::collections::HashMap;

use ab_glyph::{Font, FontArc, OutlineCurve, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::RgbaImage;
use tiny_skia::{
    ColorU8, FillRule, FilterQuality, LineCap, LineJoin, Paint, PathBuilder, Pattern, Pixmap, PixmapPaint, Rect,
    SpreadMode, Stroke, StrokeDash, Transform,
};
use tracing::{debug, warn};

use crate::camera::Point;
use crate::color::Rgba;
use crate::consts::{ARROW_HEAD_MIN_PX, ARROW_HEAD_PER_STROKE, MAX_CANVAS_AREA_PX, MAX_CANVAS_EDGE_PX, PIXELATE_CELL_PX};
use crate::doc::{BoxShape, DrawingElement, ElementDocument, ElementId, ImageData, Shape, TextBody};
use crate::geom::{Bounds, PixelRect};
use crate::text;

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("output surface {width}x{height} exceeds the canvas limit")]
    CanvasTooLarge { width: u64, height: u64 },
    #[error("bitmap buffer does not match its dimensions")]
    InvalidBitmap,
}

/// Composites documents onto base bitmaps. Holds the font and the blur cache.
#[derive(Default)]
pub struct CompositeRenderer {
    font: Option<FontArc>,
    blur_cache: HashMap<ElementId, (PixelRect, Pixmap)>,
    warned_no_font: bool,
}

impl CompositeRenderer {
    #[must_use]
    pub fn new(font: Option<FontArc>) -> Self {
        Self { font, blur_cache: HashMap::new(), warned_no_font: false }
    }

    #[must_use]
    pub fn font(&self) -> Option<&FontArc> {
        self.font.as_ref()
    }

    /// Forget cached blur regions. Required whenever the base bitmap changes.
    pub fn clear_cache(&mut self) {
        self.blur_cache.clear();
    }

    /// Number of cached blur regions.
    #[must_use]
    pub fn cached_blurs(&self) -> usize {
        self.blur_cache.len()
    }

    /// Draw `base`, then the visible elements bottom to top, then `pending`.
    ///
    /// # Errors
    ///
    /// [`RenderError::CanvasTooLarge`] if `base × scale` exceeds the surface
    /// limits, [`RenderError::InvalidBitmap`] if a bitmap cannot be converted.
    pub fn render(
        &mut self,
        base: &RgbaImage,
        doc: &ElementDocument,
        pending: Option<&DrawingElement>,
        scale: f64,
    ) -> Result<RgbaImage, RenderError> {
        let width = (f64::from(base.width()) * scale).round().max(1.0) as u64;
        let height = (f64::from(base.height()) * scale).round().max(1.0) as u64;
        if width > u64::from(MAX_CANVAS_EDGE_PX)
            || height > u64::from(MAX_CANVAS_EDGE_PX)
            || width * height > MAX_CANVAS_AREA_PX
        {
            return Err(RenderError::CanvasTooLarge { width, height });
        }
        let mut canvas = Pixmap::new(width as u32, height as u32).ok_or(RenderError::CanvasTooLarge { width, height })?;

        let view = Transform::from_scale(scale as f32, scale as f32);
        let base_pixmap = to_pixmap(base)?;
        let quality = if (scale - 1.0).abs() < f64::EPSILON { FilterQuality::Nearest } else { FilterQuality::Bilinear };
        canvas.draw_pixmap(0, 0, base_pixmap.as_ref(), &PixmapPaint { quality, ..PixmapPaint::default() }, view, None);

        let live: Vec<ElementId> = doc.elements().iter().map(|e| e.id).collect();
        self.blur_cache.retain(|id, _| live.contains(id) || pending.is_some_and(|p| p.id == *id));

        for el in doc.elements().iter().filter(|e| e.visible) {
            self.draw_element(&mut canvas, base, el, view)?;
        }
        if let Some(el) = pending {
            self.draw_element(&mut canvas, base, el, view)?;
        }

        from_pixmap(&canvas)
    }

    fn draw_element(
        &mut self,
        canvas: &mut Pixmap,
        base: &RgbaImage,
        el: &DrawingElement,
        view: Transform,
    ) -> Result<(), RenderError> {
        let bounds = el.bounds();
        let center = bounds.center();
        let ts = if el.rotation == 0.0 {
            view
        } else {
            view.pre_concat(Transform::from_rotate_at(el.rotation as f32, center.x as f32, center.y as f32))
        };
        let color = Rgba::parse_or(&el.style.stroke_color, Rgba::BLACK).with_opacity(el.style.opacity);

        match &el.shape {
            Shape::Path { points } | Shape::Line { points } => {
                draw_polyline(canvas, el, points, color, ts);
            }
            Shape::Arrow { points } => {
                draw_polyline(canvas, el, points, color, ts);
                draw_arrowhead(canvas, el, points, color, ts);
            }
            Shape::Rect(b) => draw_box(canvas, el, b, color, ts, false),
            Shape::Ellipse(b) => draw_box(canvas, el, b, color, ts, true),
            Shape::Blur(_) => self.draw_blur(canvas, base, el, view)?,
            Shape::Text(body) => self.draw_text(canvas, el, body, color, ts),
            Shape::Image(img) => draw_image(canvas, el, img, ts)?,
        }
        Ok(())
    }

    fn draw_blur(&mut self, canvas: &mut Pixmap, base: &RgbaImage, el: &DrawingElement, view: Transform) -> Result<(), RenderError> {
        let bounds = el.bounds();
        let center = bounds.center();
        let corners = [
            Point::new(bounds.x, bounds.y),
            Point::new(bounds.right(), bounds.y),
            Point::new(bounds.right(), bounds.bottom()),
            Point::new(bounds.x, bounds.bottom()),
        ]
        .map(|p| p.rotated_around(center, el.rotation));

        let flat: Vec<f64> = corners.iter().flat_map(|p| [p.x, p.y]).collect();
        let hull = Bounds::of_points(Point::default(), &flat);
        let Some(rect) = hull.to_pixel_rect(base.width(), base.height()) else {
            return Ok(());
        };

        let stale = self.blur_cache.get(&el.id).is_none_or(|(cached, _)| *cached != rect);
        if stale {
            debug!(element_id = %el.id, x = rect.x, y = rect.y, w = rect.width, h = rect.height, "pixelating blur region");
            let pixelated = pixelate(base, rect, PIXELATE_CELL_PX);
            self.blur_cache.insert(el.id, (rect, to_pixmap(&pixelated)?));
        }
        let Some((_, region)) = self.blur_cache.get(&el.id) else {
            return Ok(());
        };

        let mut pb = PathBuilder::new();
        pb.move_to(corners[0].x as f32, corners[0].y as f32);
        for p in &corners[1..] {
            pb.line_to(p.x as f32, p.y as f32);
        }
        pb.close();
        let Some(path) = pb.finish() else {
            return Ok(());
        };

        let paint = Paint {
            shader: Pattern::new(
                region.as_ref(),
                SpreadMode::Pad,
                FilterQuality::Nearest,
                el.style.opacity.clamp(0.0, 1.0) as f32,
                Transform::from_translate(rect.x as f32, rect.y as f32),
            ),
            anti_alias: false,
            ..Paint::default()
        };
        canvas.fill_path(&path, &paint, FillRule::Winding, view, None);
        Ok(())
    }

    fn draw_text(&mut self, canvas: &mut Pixmap, el: &DrawingElement, body: &TextBody, color: Rgba, ts: Transform) {
        let opacity = el.style.opacity;
        if let Some(bg) = body.background.as_deref().and_then(Rgba::parse) {
            if let Some(rect) = Rect::from_xywh(el.x as f32, el.y as f32, body.width as f32, body.height as f32) {
                canvas.fill_rect(rect, &solid(bg.with_opacity(opacity)), ts, None);
            }
        }

        let Some(font) = self.font.clone() else {
            if !self.warned_no_font {
                warn!("no font loaded; text renders as background only");
                self.warned_no_font = true;
            }
            return;
        };
        let Some(path) = glyph_path(&font, el, body) else {
            return;
        };

        if let Some(shadow) = &body.shadow {
            let shadow_color = Rgba::parse_or(&shadow.color, Rgba::BLACK).with_opacity(opacity);
            let offset = ts.pre_translate(shadow.offset_x as f32, shadow.offset_y as f32);
            canvas.fill_path(&path, &solid(shadow_color), FillRule::Winding, offset, None);
        }
        if let Some(stroke) = body.stroke.as_ref().filter(|s| s.width > 0.0) {
            let stroke_color = Rgba::parse_or(&stroke.color, Rgba::BLACK).with_opacity(opacity);
            let outline = Stroke { width: stroke.width as f32, line_join: LineJoin::Round, ..Stroke::default() };
            canvas.stroke_path(&path, &solid(stroke_color), &outline, ts, None);
        }
        canvas.fill_path(&path, &solid(color), FillRule::Winding, ts, None);
    }
}

/// Pixelate `rect` of `base`: average down to one pixel per `cell`, then
/// scale back up with nearest-neighbour.
#[must_use]
pub fn pixelate(base: &RgbaImage, rect: PixelRect, cell: u32) -> RgbaImage {
    let region = imageops::crop_imm(base, rect.x, rect.y, rect.width, rect.height).to_image();
    let cell = cell.max(1);
    let small_w = rect.width.div_ceil(cell).max(1);
    let small_h = rect.height.div_ceil(cell).max(1);
    let small = imageops::resize(&region, small_w, small_h, FilterType::Triangle);
    imageops::resize(&small, rect.width, rect.height, FilterType::Nearest)
}

fn solid(color: Rgba) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color(color.to_skia());
    paint.anti_alias = true;
    paint
}

/// Canvas-style dash: odd-length lists repeat to become even.
fn dash(pattern: Option<&Vec<f64>>) -> Option<StrokeDash> {
    let pattern = pattern.filter(|d| !d.is_empty() && d.iter().all(|v| *v >= 0.0))?;
    let mut values: Vec<f32> = pattern.iter().map(|v| *v as f32).collect();
    if values.len() % 2 == 1 {
        values.extend_from_within(..);
    }
    StrokeDash::new(values, 0.0)
}

fn stroke_for(el: &DrawingElement) -> Stroke {
    Stroke {
        width: el.style.stroke_width.max(0.0) as f32,
        line_cap: LineCap::Round,
        line_join: LineJoin::Round,
        dash: dash(el.style.dash.as_ref()),
        ..Stroke::default()
    }
}

fn draw_polyline(canvas: &mut Pixmap, el: &DrawingElement, points: &[f64], color: Rgba, ts: Transform) {
    let pts: Vec<(f32, f32)> = points
        .chunks_exact(2)
        .map(|c| ((el.x + c[0]) as f32, (el.y + c[1]) as f32))
        .collect();
    match pts.as_slice() {
        [] => {}
        [(x, y)] => {
            // A single tap still leaves a dot.
            if let Some(dot) = PathBuilder::from_circle(*x, *y, (el.style.stroke_width / 2.0).max(0.5) as f32) {
                canvas.fill_path(&dot, &solid(color), FillRule::Winding, ts, None);
            }
        }
        [(x0, y0), rest @ ..] => {
            let mut pb = PathBuilder::new();
            pb.move_to(*x0, *y0);
            for (x, y) in rest {
                pb.line_to(*x, *y);
            }
            if let Some(path) = pb.finish() {
                canvas.stroke_path(&path, &solid(color), &stroke_for(el), ts, None);
            }
        }
    }
}

fn draw_arrowhead(canvas: &mut Pixmap, el: &DrawingElement, points: &[f64], color: Rgba, ts: Transform) {
    let pts: Vec<Point> = points.chunks_exact(2).map(|c| Point::new(el.x + c[0], el.y + c[1])).collect();
    let Some(tip) = pts.last().copied() else {
        return;
    };
    let Some(tail) = pts.iter().rev().skip(1).find(|p| p.distance(tip) > 0.0).copied() else {
        return;
    };
    let len = (el.style.stroke_width * ARROW_HEAD_PER_STROKE).max(ARROW_HEAD_MIN_PX);
    let dist = tip.distance(tail);
    let (ux, uy) = ((tip.x - tail.x) / dist, (tip.y - tail.y) / dist);
    let back = Point::new(tip.x - ux * len, tip.y - uy * len);
    let half = len / 2.0;

    let mut pb = PathBuilder::new();
    pb.move_to(tip.x as f32, tip.y as f32);
    pb.line_to((back.x - uy * half) as f32, (back.y + ux * half) as f32);
    pb.line_to((back.x + uy * half) as f32, (back.y - ux * half) as f32);
    pb.close();
    if let Some(path) = pb.finish() {
        canvas.fill_path(&path, &solid(color), FillRule::Winding, ts, None);
    }
}

fn draw_box(canvas: &mut Pixmap, el: &DrawingElement, b: &BoxShape, color: Rgba, ts: Transform, oval: bool) {
    let Some(rect) = Rect::from_xywh(el.x as f32, el.y as f32, b.width as f32, b.height as f32) else {
        return;
    };
    let path = if oval { PathBuilder::from_oval(rect) } else { Some(PathBuilder::from_rect(rect)) };
    let Some(path) = path else {
        return;
    };
    if b.filled {
        canvas.fill_path(&path, &solid(color), FillRule::Winding, ts, None);
    } else {
        let mut stroke = stroke_for(el);
        stroke.line_cap = LineCap::Butt;
        stroke.line_join = LineJoin::Miter;
        canvas.stroke_path(&path, &solid(color), &stroke, ts, None);
    }
}

fn draw_image(canvas: &mut Pixmap, el: &DrawingElement, img: &ImageData, ts: Transform) -> Result<(), RenderError> {
    let (iw, ih) = img.bitmap.dimensions();
    if iw == 0 || ih == 0 {
        return Ok(());
    }
    let pixmap = to_pixmap(&img.bitmap)?;
    let place = ts
        .pre_translate(el.x as f32, el.y as f32)
        .pre_scale((img.width / f64::from(iw)) as f32, (img.height / f64::from(ih)) as f32);
    let paint = PixmapPaint {
        opacity: el.style.opacity.clamp(0.0, 1.0) as f32,
        quality: FilterQuality::Bilinear,
        ..PixmapPaint::default()
    };
    canvas.draw_pixmap(0, 0, pixmap.as_ref(), &paint, place, None);
    Ok(())
}

/// Outline every glyph of the laid-out text as one path in document space.
fn glyph_path(font: &FontArc, el: &DrawingElement, body: &TextBody) -> Option<tiny_skia::Path> {
    let layout = text::layout(body, Some(font));
    let scaled = font.as_scaled(PxScale::from(body.font_size as f32));
    let (hs, vs) = (f64::from(scaled.h_scale_factor()), f64::from(scaled.v_scale_factor()));

    let mut pb = PathBuilder::new();
    for line in &layout.lines {
        for glyph in &line.glyphs {
            let Some(outline) = font.outline(glyph.id) else {
                continue;
            };
            let ox = el.x + line.x + glyph.x;
            let oy = el.y + line.baseline;
            let map = |p: ab_glyph::Point| ((ox + f64::from(p.x) * hs) as f32, (oy - f64::from(p.y) * vs) as f32);

            let mut last: Option<(f32, f32)> = None;
            for curve in &outline.curves {
                let (start, end) = match curve {
                    OutlineCurve::Line(a, b) | OutlineCurve::Quad(a, _, b) | OutlineCurve::Cubic(a, _, _, b) => (map(*a), map(*b)),
                };
                if last != Some(start) {
                    if last.is_some() {
                        pb.close();
                    }
                    pb.move_to(start.0, start.1);
                }
                match curve {
                    OutlineCurve::Line(..) => pb.line_to(end.0, end.1),
                    OutlineCurve::Quad(_, c, _) => {
                        let c = map(*c);
                        pb.quad_to(c.0, c.1, end.0, end.1);
                    }
                    OutlineCurve::Cubic(_, c1, c2, _) => {
                        let (c1, c2) = (map(*c1), map(*c2));
                        pb.cubic_to(c1.0, c1.1, c2.0, c2.1, end.0, end.1);
                    }
                }
                last = Some(end);
            }
            if last.is_some() {
                pb.close();
            }
        }
    }
    pb.finish()
}

/// Straight RGBA image → premultiplied pixmap.
pub(crate) fn to_pixmap(img: &RgbaImage) -> Result<Pixmap, RenderError> {
    let size = tiny_skia::IntSize::from_wh(img.width(), img.height()).ok_or(RenderError::InvalidBitmap)?;
    let mut data = Vec::with_capacity(img.as_raw().len());
    for p in img.pixels() {
        let c = ColorU8::from_rgba(p[0], p[1], p[2], p[3]).premultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    Pixmap::from_vec(data, size).ok_or(RenderError::InvalidBitmap)
}

/// Premultiplied pixmap → straight RGBA image.
pub(crate) fn from_pixmap(pixmap: &Pixmap) -> Result<RgbaImage, RenderError> {
    let mut data = Vec::with_capacity(pixmap.data().len());
    for p in pixmap.pixels() {
        let c = p.demultiply();
        data.extend_from_slice(&[c.red(), c.green(), c.blue(), c.alpha()]);
    }
    RgbaImage::from_raw(pixmap.width(), pixmap.height(), data).ok_or(RenderError::InvalidBitmap)
}
