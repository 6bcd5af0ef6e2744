//! Browser host boundary.
//!
//! The browser owns the two primitives everything else is built on: a
//! viewport screenshot of the active page, and running a named script inside
//! that page. Both are async calls behind [`BrowserHost`]; [`Page`] wraps a
//! host and a target with typed helpers for the scripts the pipeline uses.

#[cfg(test)]
#[path = "browser_test.rs"]
mod tests;

#[cfg(test)]
#[path = "browser_helpers_test.rs"]
pub mod test_helpers;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::CaptureError;
use crate::hide::HideCriteria;

/// Opaque handle to a browser page (tab id, window handle, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TargetId(pub String);

/// Failure reported by the browser host. The text is whatever the host
/// said; [`CaptureError`] classifies it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    #[error("no active page")]
    NoTarget,
    #[error("script injection failed: {0}")]
    Injection(String),
    #[error("viewport capture failed: {0}")]
    Capture(String),
    #[error("page connection failed: {0}")]
    Channel(String),
}

/// Named in-page operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PageScript {
    /// Returns [`PageMetrics`].
    ReadMetrics,
    /// Returns `{"scroll_height": f64}`.
    ReadScrollHeight,
    /// Returns `{"y": f64}`, the offset actually reached.
    ScrollTo { y: f64 },
    /// Returns `{"hidden": usize}`, the count newly hidden.
    HideFloating { criteria: HideCriteria },
    /// Returns `{"restored": usize}`.
    RestoreHidden,
    /// Injects the rectangle-selection overlay.
    StartSelection,
    /// Removes the overlay if it is still present.
    CleanupSelection,
}

impl PageScript {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadMetrics => "read_metrics",
            Self::ReadScrollHeight => "read_scroll_height",
            Self::ScrollTo { .. } => "scroll_to",
            Self::HideFloating { .. } => "hide_floating",
            Self::RestoreHidden => "restore_hidden",
            Self::StartSelection => "start_selection",
            Self::CleanupSelection => "cleanup_selection",
        }
    }
}

/// Page geometry in CSS px, read once per full-page run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageMetrics {
    pub scroll_height: f64,
    pub viewport_height: f64,
    pub viewport_width: f64,
    pub device_pixel_ratio: f64,
    /// Scroll offset when the metrics were read.
    pub scroll_y: f64,
}

#[async_trait::async_trait]
pub trait BrowserHost: Send + Sync {
    /// The page the user is looking at.
    async fn active_target(&self) -> Result<TargetId, HostError>;

    /// Run `script` in the page and return its JSON result.
    async fn run_in_page(&self, target: &TargetId, script: &PageScript) -> Result<Value, HostError>;

    /// Screenshot the visible viewport as encoded image bytes.
    async fn capture_viewport(&self, target: &TargetId) -> Result<Vec<u8>, HostError>;
}

/// A host bound to one target, with typed script helpers.
pub struct Page<'a> {
    host: &'a dyn BrowserHost,
    target: TargetId,
}

#[derive(Deserialize)]
struct ScrollHeight {
    scroll_height: f64,
}

#[derive(Deserialize)]
struct ScrollPosition {
    y: f64,
}

#[derive(Deserialize)]
struct HideCount {
    hidden: usize,
}

#[derive(Deserialize)]
struct RestoreCount {
    restored: usize,
}

impl<'a> Page<'a> {
    #[must_use]
    pub fn new(host: &'a dyn BrowserHost, target: TargetId) -> Self {
        Self { host, target }
    }

    #[must_use]
    pub fn target(&self) -> &TargetId {
        &self.target
    }

    /// # Errors
    ///
    /// Host failures are classified; malformed results are [`CaptureError::Script`].
    pub async fn metrics(&self) -> Result<PageMetrics, CaptureError> {
        self.run(&PageScript::ReadMetrics).await
    }

    /// # Errors
    ///
    /// See [`Page::metrics`].
    pub async fn scroll_height(&self) -> Result<f64, CaptureError> {
        Ok(self.run::<ScrollHeight>(&PageScript::ReadScrollHeight).await?.scroll_height)
    }

    /// Scroll to `y` and return the offset the page actually settled on,
    /// which the browser clamps near the bottom.
    ///
    /// # Errors
    ///
    /// See [`Page::metrics`].
    pub async fn scroll_to(&self, y: f64) -> Result<f64, CaptureError> {
        Ok(self.run::<ScrollPosition>(&PageScript::ScrollTo { y }).await?.y)
    }

    /// # Errors
    ///
    /// See [`Page::metrics`].
    pub async fn hide_floating(&self, criteria: HideCriteria) -> Result<usize, CaptureError> {
        Ok(self.run::<HideCount>(&PageScript::HideFloating { criteria }).await?.hidden)
    }

    /// # Errors
    ///
    /// See [`Page::metrics`].
    pub async fn restore_hidden(&self) -> Result<usize, CaptureError> {
        Ok(self.run::<RestoreCount>(&PageScript::RestoreHidden).await?.restored)
    }

    /// # Errors
    ///
    /// Host failures, classified.
    pub async fn capture(&self) -> Result<Vec<u8>, CaptureError> {
        Ok(self.host.capture_viewport(&self.target).await?)
    }

    /// Run a script whose result is not needed.
    ///
    /// # Errors
    ///
    /// Host failures, classified.
    pub async fn exec(&self, script: &PageScript) -> Result<(), CaptureError> {
        self.host.run_in_page(&self.target, script).await?;
        Ok(())
    }

    async fn run<T: DeserializeOwned>(&self, script: &PageScript) -> Result<T, CaptureError> {
        let value = self.host.run_in_page(&self.target, script).await?;
        serde_json::from_value(value).map_err(|e| CaptureError::Script { script: script.name(), reason: e.to_string() })
    }
}
