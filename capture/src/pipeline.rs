//! Full-page scroll-and-stitch capture.
//!
//! DESIGN
//! ======
//! One sequential async run per request:
//!
//! 1. read the page metrics, remembering where the user was scrolled;
//! 2. prime lazy-loaded content by scrolling down a viewport at a time until
//!    the scroll height stops changing (or a distance cap is hit), then
//!    return to the top;
//! 3. re-read the metrics and capture one frame per viewport, hiding
//!    floating chrome from the second frame on and letting the page repaint
//!    when something new was hidden;
//! 4. restore the page (unhide, scroll back) whatever happened in 2-3;
//! 5. stitch.
//!
//! Steps 2-3 are the only code that mutates the page, and step 4 runs after
//! them on every path. Restore failures are logged and never replace the
//! error that ended the run.

#[cfg(test)]
#[path = "pipeline_test.rs"]
mod tests;

use std::sync::Arc;

use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::browser::{Page, PageMetrics};
use crate::config::CaptureConfig;
use crate::error::CaptureError;
use crate::stitch::{self, CaptureFrame};
use crate::throttle::CaptureThrottle;

/// What the priming loop should do after an observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimeStep {
    Continue,
    /// Height unchanged for the configured number of steps.
    Stable,
    DistanceCap,
}

/// Tracks scroll-height observations during lazy-load priming.
#[derive(Debug, Clone)]
pub struct PrimingTracker {
    last_height: Option<f64>,
    unchanged: u32,
    travelled: f64,
    stable_steps: u32,
    max_distance: f64,
}

impl PrimingTracker {
    #[must_use]
    pub fn new(stable_steps: u32, max_distance: f64) -> Self {
        Self { last_height: None, unchanged: 0, travelled: 0.0, stable_steps: stable_steps.max(1), max_distance }
    }

    /// Record the scroll height reported after the latest step.
    pub fn observe(&mut self, height: f64) -> PrimeStep {
        if self.last_height.is_some_and(|last| (last - height).abs() < f64::EPSILON) {
            self.unchanged += 1;
        } else {
            self.unchanged = 0;
        }
        self.last_height = Some(height);
        if self.unchanged >= self.stable_steps {
            PrimeStep::Stable
        } else if self.travelled >= self.max_distance {
            PrimeStep::DistanceCap
        } else {
            PrimeStep::Continue
        }
    }

    pub fn advance(&mut self, distance: f64) {
        self.travelled += distance;
    }

    #[must_use]
    pub fn travelled(&self) -> f64 {
        self.travelled
    }
}

pub struct ScrollCapturePipeline {
    throttle: Arc<CaptureThrottle>,
    config: CaptureConfig,
}

impl ScrollCapturePipeline {
    #[must_use]
    pub fn new(throttle: Arc<CaptureThrottle>, config: CaptureConfig) -> Self {
        Self { throttle, config }
    }

    /// Capture the whole scrollable content of `page` as one bitmap.
    ///
    /// # Errors
    ///
    /// Any host, decode or stitch failure. The page is restored first.
    pub async fn capture_full_page(&self, page: &Page<'_>) -> Result<RgbaImage, CaptureError> {
        let initial = page.metrics().await?;
        if initial.viewport_height <= 0.0 {
            return Err(CaptureError::CaptureFailed("page reported an empty viewport".into()));
        }
        info!(
            target_id = %page.target().0,
            scroll_height = initial.scroll_height,
            viewport_height = initial.viewport_height,
            dpr = initial.device_pixel_ratio,
            "capture: full page started"
        );

        let outcome = self.prime_and_capture(page, initial.viewport_height).await;
        self.restore(page, initial.scroll_y).await;
        let (frames, metrics) = outcome?;

        let bitmap = stitch::stitch(&frames, &metrics, self.config.max_height_px)?;
        info!(frames = frames.len(), width = bitmap.width(), height = bitmap.height(), "capture: full page stitched");
        Ok(bitmap)
    }

    async fn prime_and_capture(
        &self,
        page: &Page<'_>,
        viewport_height: f64,
    ) -> Result<(Vec<CaptureFrame>, PageMetrics), CaptureError> {
        self.prime(page, viewport_height).await?;
        let metrics = page.metrics().await?;
        let frames = self.capture_frames(page, &metrics).await?;
        Ok((frames, metrics))
    }

    /// Scroll through the page so lazy content loads and the height settles.
    async fn prime(&self, page: &Page<'_>, step: f64) -> Result<(), CaptureError> {
        let mut tracker = PrimingTracker::new(self.config.prime_stable_steps, self.config.prime_max_distance_px);
        let mut y = 0.0;
        loop {
            let height = page.scroll_height().await?;
            match tracker.observe(height) {
                PrimeStep::Continue => {}
                outcome => {
                    debug!(?outcome, height, travelled = tracker.travelled(), "capture: priming finished");
                    break;
                }
            }
            y += step;
            page.scroll_to(y).await?;
            tracker.advance(step);
            tokio::time::sleep(self.config.prime_settle).await;
        }
        page.scroll_to(0.0).await?;
        Ok(())
    }

    async fn capture_frames(&self, page: &Page<'_>, metrics: &PageMetrics) -> Result<Vec<CaptureFrame>, CaptureError> {
        let mut frames: Vec<CaptureFrame> = Vec::new();
        let mut target = 0.0;
        while target < metrics.scroll_height && frames.len() < self.config.max_frames {
            let offset = page.scroll_to(target).await?;
            if frames.last().is_some_and(|prev| offset <= prev.offset) {
                debug!(target, offset, "capture: scroll offset stopped advancing");
                break;
            }
            tokio::time::sleep(self.config.frame_settle).await;
            if !frames.is_empty() {
                let hidden = page.hide_floating(self.config.hide).await?;
                if hidden > 0 {
                    debug!(hidden, "capture: floating elements hidden");
                    tokio::time::sleep(self.config.hide_settle).await;
                }
            }
            let bitmap = grab(page, &self.throttle).await?;
            debug!(frame = frames.len(), offset, "capture: frame captured");
            frames.push(CaptureFrame { bitmap, offset });
            target += metrics.viewport_height;
        }
        if frames.len() == self.config.max_frames && target < metrics.scroll_height {
            warn!(max_frames = self.config.max_frames, "capture: frame cap reached before page end");
        }
        Ok(frames)
    }

    async fn restore(&self, page: &Page<'_>, scroll_y: f64) {
        match page.restore_hidden().await {
            Ok(restored) => debug!(restored, "capture: hidden elements restored"),
            Err(e) => warn!(error = %e, "capture: restoring hidden elements failed"),
        }
        if let Err(e) = page.scroll_to(scroll_y).await {
            warn!(error = %e, scroll_y, "capture: restoring scroll position failed");
        }
    }
}

/// One throttled viewport capture, decoded.
pub(crate) async fn grab(page: &Page<'_>, throttle: &CaptureThrottle) -> Result<RgbaImage, CaptureError> {
    throttle.acquire().await;
    let bytes = page.capture().await?;
    Ok(image::load_from_memory(&bytes)?.to_rgba8())
}
