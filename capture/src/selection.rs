//! Rectangle selection hand-off.
//!
//! DESIGN
//! ======
//! The in-page selection agent reports back over the message channel, so a
//! selection capture is a rendezvous: the coordinator registers a one-shot
//! listener, injects the agent, then waits for `selection:complete` or
//! `selection:cancel`. The listener belongs to a [`ListenerGuard`]; dropping
//! the guard releases it, so no exit path can leave a stale listener that a
//! later selection would be delivered to.

#[cfg(test)]
#[path = "selection_test.rs"]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use image::{RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::debug;

use crate::error::CaptureError;

fn default_dpr() -> f64 {
    1.0
}

/// Rectangle drawn by the user, in CSS px relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SelectionRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    #[serde(default = "default_dpr")]
    pub device_pixel_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SelectionOutcome {
    Complete(SelectionRect),
    Canceled,
}

type Slot = Arc<Mutex<Option<(u64, oneshot::Sender<SelectionOutcome>)>>>;

/// Single-slot rendezvous between the coordinator and the selection agent.
#[derive(Clone, Default)]
pub struct SelectionWaiter {
    slot: Slot,
    generation: Arc<Mutex<u64>>,
}

/// Holds a registered listener; dropping it unregisters.
pub struct ListenerGuard {
    slot: Slot,
    generation: u64,
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if slot.as_ref().is_some_and(|(generation, _)| *generation == self.generation) {
            *slot = None;
            debug!(generation = self.generation, "selection: listener released");
        }
    }
}

impl SelectionWaiter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener, replacing (and thereby canceling) any earlier one.
    #[must_use]
    pub fn register(&self) -> (ListenerGuard, oneshot::Receiver<SelectionOutcome>) {
        let generation = {
            let mut counter = self.generation.lock().unwrap_or_else(PoisonError::into_inner);
            *counter += 1;
            *counter
        };
        let (tx, rx) = oneshot::channel();
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some((generation, tx));
        (ListenerGuard { slot: Arc::clone(&self.slot), generation }, rx)
    }

    /// Hand `outcome` to the registered listener. Returns `false` if nobody
    /// was waiting.
    pub fn deliver(&self, outcome: SelectionOutcome) -> bool {
        let pending = self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        match pending {
            Some((_, tx)) => tx.send(outcome).is_ok(),
            None => false,
        }
    }

    #[must_use]
    pub fn is_waiting(&self) -> bool {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).is_some()
    }
}

/// Wait for the agent's answer.
///
/// # Errors
///
/// [`CaptureError::SelectionTimeout`] when nothing arrives in time;
/// [`CaptureError::SelectionCanceled`] on cancel or if the listener was
/// replaced.
pub async fn wait(rx: oneshot::Receiver<SelectionOutcome>, timeout: Duration) -> Result<SelectionRect, CaptureError> {
    match tokio::time::timeout(timeout, rx).await {
        Err(_) => Err(CaptureError::SelectionTimeout { secs: timeout.as_secs() }),
        Ok(Ok(SelectionOutcome::Complete(rect))) => Ok(rect),
        Ok(Ok(SelectionOutcome::Canceled) | Err(_)) => Err(CaptureError::SelectionCanceled),
    }
}

/// Crop a viewport capture to `rect`, scaled by the rectangle's DPR and
/// clamped to the bitmap.
///
/// # Errors
///
/// [`CaptureError::InvalidRequest`] if nothing of the rectangle lies inside
/// the bitmap.
pub fn crop_to_selection(bitmap: &RgbaImage, rect: &SelectionRect) -> Result<RgbaImage, CaptureError> {
    let dpr = if rect.device_pixel_ratio > 0.0 { rect.device_pixel_ratio } else { 1.0 };
    let (w, h) = bitmap.dimensions();
    let x0 = device_px(rect.x, dpr, w);
    let y0 = device_px(rect.y, dpr, h);
    let x1 = device_px(rect.x + rect.width, dpr, w);
    let y1 = device_px(rect.y + rect.height, dpr, h);
    if x1 <= x0 || y1 <= y0 {
        return Err(CaptureError::InvalidRequest(format!(
            "selection {}x{} at ({}, {}) is empty within the capture",
            rect.width, rect.height, rect.x, rect.y
        )));
    }
    Ok(imageops::crop_imm(bitmap, x0, y0, x1 - x0, y1 - y0).to_image())
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn device_px(css: f64, dpr: f64, max: u32) -> u32 {
    (css * dpr).round().clamp(0.0, f64::from(max)) as u32
}
