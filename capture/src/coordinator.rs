//! Capture request dispatch.
//!
//! DESIGN
//! ======
//! The coordinator is the background side of the message channel. It
//! answers `capture:request` with exactly one `done` or `error` reply and
//! routes `selection:complete` / `selection:cancel` from the in-page agent
//! to whichever selection capture is waiting.
//!
//! Every successful capture is encoded as PNG and written under
//! [`LATEST_CAPTURE_KEY`], where the editor picks it up.
//!
//! Messages are handled concurrently (see [`spawn_coordinator`]) because a
//! selection capture is still in flight when the agent's answer arrives.
//! Captures themselves are serialized behind a gate: only one run scrolls,
//! hides and restores the page at a time. Selection results never take the
//! gate, so they reach the capture holding it.

#[cfg(test)]
#[path = "coordinator_test.rs"]
mod tests;

use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use host::message::{OP_CAPTURE_REQUEST, OP_SELECTION_CANCEL, OP_SELECTION_CLEANUP, OP_SELECTION_COMPLETE};
use host::store::LATEST_CAPTURE_KEY;
use host::{KeyValueStore, Message, Status};
use image::{ImageFormat, RgbaImage};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, error, info, warn};

use crate::browser::{BrowserHost, Page, PageScript};
use crate::config::CaptureConfig;
use crate::error::{CaptureError, ErrorCode};
use crate::pipeline::{self, ScrollCapturePipeline};
use crate::selection::{self, SelectionOutcome, SelectionRect, SelectionWaiter};
use crate::throttle::CaptureThrottle;

/// Capacity of the broadcast channel for cleanup notices.
const BROADCAST_CAPACITY: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureMode {
    /// The visible viewport.
    Visible,
    /// A user-drawn rectangle of the viewport.
    Selection,
    /// The whole scrollable page.
    Full,
}

impl CaptureMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Visible => "visible",
            Self::Selection => "selection",
            Self::Full => "full",
        }
    }
}

#[derive(Debug, Deserialize)]
struct CaptureRequest {
    mode: CaptureMode,
}

pub struct CaptureCoordinator {
    host: Arc<dyn BrowserHost>,
    store: Arc<dyn KeyValueStore>,
    throttle: Arc<CaptureThrottle>,
    pipeline: ScrollCapturePipeline,
    selection: SelectionWaiter,
    selection_timeout: Duration,
    broadcasts: broadcast::Sender<Message>,
    /// Held for the whole of one capture run.
    gate: Mutex<()>,
}

impl CaptureCoordinator {
    #[must_use]
    pub fn new(host: Arc<dyn BrowserHost>, store: Arc<dyn KeyValueStore>, config: CaptureConfig) -> Self {
        let throttle = Arc::new(CaptureThrottle::new(config.max_per_window, config.window));
        let selection_timeout = config.selection_timeout;
        let (broadcasts, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            host,
            store,
            pipeline: ScrollCapturePipeline::new(Arc::clone(&throttle), config),
            throttle,
            selection: SelectionWaiter::new(),
            selection_timeout,
            broadcasts,
            gate: Mutex::new(()),
        }
    }

    /// Receive broadcasts (the selection cleanup notice).
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Message> {
        self.broadcasts.subscribe()
    }

    /// Handle one inbound message, returning the reply if it expects one.
    pub async fn handle(&self, msg: &Message) -> Option<Message> {
        match msg.op.as_str() {
            OP_CAPTURE_REQUEST if msg.status == Status::Request => Some(self.handle_capture(msg).await),
            OP_SELECTION_COMPLETE => {
                let outcome = match msg.payload::<SelectionRect>() {
                    Ok(rect) => SelectionOutcome::Complete(rect),
                    Err(e) => {
                        warn!(error = %e, "capture: malformed selection; treating as cancel");
                        SelectionOutcome::Canceled
                    }
                };
                self.deliver(outcome);
                None
            }
            OP_SELECTION_CANCEL => {
                self.deliver(SelectionOutcome::Canceled);
                None
            }
            op => {
                debug!(op, status = ?msg.status, "capture: message ignored");
                None
            }
        }
    }

    fn deliver(&self, outcome: SelectionOutcome) {
        if !self.selection.deliver(outcome) {
            debug!(?outcome, "capture: selection result with no waiting capture");
        }
    }

    async fn handle_capture(&self, msg: &Message) -> Message {
        let _running = match self.gate.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(id = %msg.id, "capture: waiting for the capture in progress");
                self.gate.lock().await
            }
        };
        match self.capture(msg).await {
            Ok(data) => msg.done(data),
            Err(e) => {
                let category = e.category();
                if category.is_user_outcome() {
                    info!(code = e.error_code(), "capture: {e}");
                } else {
                    error!(code = e.error_code(), category = category.as_str(), error = %e, "capture failed");
                }
                msg.error(e.error_code(), category.as_str(), category.user_message(), e.retryable())
            }
        }
    }

    async fn capture(&self, msg: &Message) -> Result<Value, CaptureError> {
        let request: CaptureRequest = msg.payload().map_err(|e| CaptureError::InvalidRequest(e.to_string()))?;
        let target = self.host.active_target().await?;
        let page = Page::new(self.host.as_ref(), target);
        debug!(mode = request.mode.as_str(), "capture: request accepted");

        let bitmap = match request.mode {
            CaptureMode::Visible => pipeline::grab(&page, &self.throttle).await?,
            CaptureMode::Selection => self.capture_selection(&page).await?,
            CaptureMode::Full => self.pipeline.capture_full_page(&page).await?,
        };

        let png = encode_png(&bitmap)?;
        self.store.set(LATEST_CAPTURE_KEY, &png)?;
        info!(
            mode = request.mode.as_str(),
            width = bitmap.width(),
            height = bitmap.height(),
            bytes = png.len(),
            "capture: stored"
        );
        Ok(json!({
            "mode": request.mode,
            "width": bitmap.width(),
            "height": bitmap.height(),
            "key": LATEST_CAPTURE_KEY,
        }))
    }

    async fn capture_selection(&self, page: &Page<'_>) -> Result<RgbaImage, CaptureError> {
        let (listener, rx) = self.selection.register();
        let picked = self.pick_rect(page, rx).await;
        drop(listener);
        self.cleanup_selection(page).await;

        let rect = picked?;
        let bitmap = pipeline::grab(page, &self.throttle).await?;
        selection::crop_to_selection(&bitmap, &rect)
    }

    async fn pick_rect(
        &self,
        page: &Page<'_>,
        rx: tokio::sync::oneshot::Receiver<SelectionOutcome>,
    ) -> Result<SelectionRect, CaptureError> {
        page.exec(&PageScript::StartSelection).await?;
        selection::wait(rx, self.selection_timeout).await
    }

    /// Tear down the overlay on every path: broadcast to whoever listens,
    /// and remove it from the page directly in case nobody does.
    async fn cleanup_selection(&self, page: &Page<'_>) {
        if self.broadcasts.send(Message::broadcast(OP_SELECTION_CLEANUP)).is_err() {
            debug!("capture: no listeners for selection cleanup");
        }
        if let Err(e) = page.exec(&PageScript::CleanupSelection).await {
            warn!(error = %e, "capture: selection overlay cleanup failed");
        }
    }
}

fn encode_png(bitmap: &RgbaImage) -> Result<Vec<u8>, CaptureError> {
    let mut out = Cursor::new(Vec::new());
    bitmap.write_to(&mut out, ImageFormat::Png)?;
    Ok(out.into_inner())
}

/// Spawn the dispatch loop and return its inbox.
///
/// Each message is handled on its own task; replies are sent on `replies`.
#[must_use]
pub fn spawn_coordinator(
    coordinator: Arc<CaptureCoordinator>,
    replies: mpsc::Sender<Message>,
    capacity: usize,
) -> mpsc::Sender<Message> {
    let (tx, mut rx) = mpsc::channel::<Message>(capacity.max(1));
    tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let coordinator = Arc::clone(&coordinator);
            let replies = replies.clone();
            tokio::spawn(async move {
                let Some(reply) = coordinator.handle(&msg).await else {
                    return;
                };
                if replies.send(reply).await.is_err() {
                    warn!(op = %msg.op, "capture: reply channel closed; dropping reply");
                }
            });
        }
        info!("capture: coordinator inbox closed");
    });
    tx
}
