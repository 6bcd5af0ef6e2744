//! Frame stitching for full-page captures.
//!
//! DESIGN
//! ======
//! Frames are anchored to where the previous frame ended, never to their own
//! nominal offset, so rounding error cannot accumulate into gaps or doubled
//! rows. The browser clamps the last scroll near the bottom of the page, so
//! the last frame usually overlaps its predecessor; the overlap rows are
//! skipped from the top of the later frame.
//!
//! [`plan`] is pure arithmetic over offsets; [`stitch`] copies pixels
//! according to the plan.

#![allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]

#[cfg(test)]
#[path = "stitch_test.rs"]
mod tests;

use image::{imageops, RgbaImage};
use tracing::debug;

use crate::browser::PageMetrics;
use crate::error::CaptureError;

/// Largest surface the stitcher will allocate, matching browser canvas limits.
pub const MAX_CANVAS_AREA_PX: u64 = 268_435_456;

/// One viewport screenshot and the scroll offset it was actually taken at.
#[derive(Debug, Clone)]
pub struct CaptureFrame {
    pub bitmap: RgbaImage,
    /// CSS px, as read back from the page.
    pub offset: f64,
}

/// Where one frame's rows land in the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub frame: usize,
    /// First source row drawn (rows above duplicate earlier output).
    pub src_y: u32,
    pub dest_y: u32,
    pub rows: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StitchPlan {
    pub height: u32,
    pub placements: Vec<Placement>,
}

/// Compute placements for frames taken at `offsets` (CSS px).
///
/// `frame_heights` are the bitmaps' heights in device px. The output is
/// `min(round(total_height * dpr), max_height)` tall.
#[must_use]
pub fn plan(offsets: &[f64], frame_heights: &[u32], metrics: &PageMetrics, max_height: u32) -> StitchPlan {
    let dpr = metrics.device_pixel_ratio;
    let viewport_px = metrics.viewport_height * dpr;
    let height = round_px(metrics.scroll_height * dpr).min(i64::from(max_height)).max(0) as u32;

    let mut placements = Vec::new();
    for (i, (&offset, &frame_height)) in offsets.iter().zip(frame_heights).enumerate() {
        let (src_y, dest_y) = if i == 0 {
            (0, 0)
        } else {
            let prev_end = round_px(offsets[i - 1] * dpr + viewport_px);
            let overlap = (prev_end - round_px(offset * dpr)).max(0);
            (overlap, prev_end)
        };
        if dest_y >= i64::from(height) {
            debug!(frame = i, dest_y, height, "frame starts past the height cap");
            break;
        }
        let available = i64::from(frame_height) - src_y;
        let rows = available.min(i64::from(height) - dest_y);
        if rows <= 0 {
            continue;
        }
        placements.push(Placement { frame: i, src_y: src_y as u32, dest_y: dest_y as u32, rows: rows as u32 });
    }
    StitchPlan { height, placements }
}

/// Composite `frames` into one bitmap.
///
/// # Errors
///
/// [`CaptureError::NoFrames`] for an empty frame list,
/// [`CaptureError::CanvasTooLarge`] if the output surface cannot be allocated.
pub fn stitch(frames: &[CaptureFrame], metrics: &PageMetrics, max_height: u32) -> Result<RgbaImage, CaptureError> {
    let Some(first) = frames.first() else {
        return Err(CaptureError::NoFrames);
    };
    let width = first.bitmap.width();
    let offsets: Vec<f64> = frames.iter().map(|f| f.offset).collect();
    let heights: Vec<u32> = frames.iter().map(|f| f.bitmap.height()).collect();
    let layout = plan(&offsets, &heights, metrics, max_height);

    let mut out = allocate(width, layout.height)?;
    for p in &layout.placements {
        let frame = &frames[p.frame].bitmap;
        let rows = imageops::crop_imm(frame, 0, p.src_y, width.min(frame.width()), p.rows).to_image();
        imageops::replace(&mut out, &rows, 0, i64::from(p.dest_y));
    }
    debug!(frames = frames.len(), placed = layout.placements.len(), width, height = layout.height, "frames stitched");
    Ok(out)
}

/// Allocate a transparent surface, reporting failure instead of aborting.
pub(crate) fn allocate(width: u32, height: u32) -> Result<RgbaImage, CaptureError> {
    let too_large = || CaptureError::CanvasTooLarge { width: u64::from(width), height: u64::from(height) };
    if width == 0 || height == 0 {
        return Err(too_large());
    }
    let area = u64::from(width) * u64::from(height);
    if area > MAX_CANVAS_AREA_PX {
        return Err(too_large());
    }
    let len = usize::try_from(area * 4).map_err(|_| too_large())?;
    let mut buf: Vec<u8> = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| too_large())?;
    buf.resize(len, 0);
    RgbaImage::from_raw(width, height, buf).ok_or_else(too_large)
}

fn round_px(v: f64) -> i64 {
    v.round() as i64
}
