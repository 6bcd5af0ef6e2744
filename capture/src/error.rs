//! Capture failures and their user-facing categories.
//!
//! Every failure that reaches the messaging layer goes through [`ErrorCode`]:
//! a grepable code, a category the popup can branch on, and whether retrying
//! could help. Host errors arrive as free text and are classified here, the
//! one place that knows what browser error strings look like.

#[cfg(test)]
#[path = "error_test.rs"]
mod tests;

use host::StoreError;

use crate::browser::HostError;

/// Implemented by every error that can be sent back as an `error` reply.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn category(&self) -> ErrorCategory;

    fn retryable(&self) -> bool {
        false
    }
}

/// User-facing failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Protected or internal page; not retryable.
    EnvironmentRestricted,
    /// The page could not be reached; a reload usually helps.
    ConnectionFailed,
    SelectionTimeout,
    SelectionCanceled,
    CaptureFailed,
    CanvasTooLarge,
    NoFrames,
    InvalidRequest,
    Storage,
}

impl ErrorCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EnvironmentRestricted => "environment-restricted",
            Self::ConnectionFailed => "connection-failed",
            Self::SelectionTimeout => "selection-timeout",
            Self::SelectionCanceled => "selection-canceled",
            Self::CaptureFailed => "capture-failed",
            Self::CanvasTooLarge => "canvas-too-large",
            Self::NoFrames => "no-frames",
            Self::InvalidRequest => "invalid-request",
            Self::Storage => "storage",
        }
    }

    /// Message shown to the user for this category.
    #[must_use]
    pub fn user_message(self) -> &'static str {
        match self {
            Self::EnvironmentRestricted => "This page can't be captured. Browser and extension pages are protected.",
            Self::ConnectionFailed => "Couldn't reach the page. Reload it and try again.",
            Self::SelectionTimeout => "Selection timed out.",
            Self::SelectionCanceled => "Selection canceled.",
            Self::CaptureFailed => "The screenshot failed. Wait a moment and try again.",
            Self::CanvasTooLarge => "The image is too large. Try capturing a smaller region.",
            Self::NoFrames => "No frames were captured.",
            Self::InvalidRequest => "Unsupported capture request.",
            Self::Storage => "The capture couldn't be saved.",
        }
    }

    /// User-driven outcomes are normal results, not faults.
    #[must_use]
    pub fn is_user_outcome(self) -> bool {
        matches!(self, Self::SelectionTimeout | Self::SelectionCanceled)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("no active page to capture")]
    NoActiveTarget,
    #[error("page refuses script injection: {0}")]
    InjectionBlocked(String),
    #[error("could not reach the page: {0}")]
    ConnectionFailed(String),
    #[error("selection timed out after {secs}s")]
    SelectionTimeout { secs: u64 },
    #[error("selection canceled")]
    SelectionCanceled,
    #[error("capture rate limit hit: {0}")]
    RateLimited(String),
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("page script {script} returned an unexpected result: {reason}")]
    Script { script: &'static str, reason: String },
    #[error("image codec failed: {0}")]
    Image(#[from] image::ImageError),
    #[error("image too large: {width}x{height}")]
    CanvasTooLarge { width: u64, height: u64 },
    #[error("no frames received")]
    NoFrames,
    #[error("invalid capture request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ErrorCode for CaptureError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::NoActiveTarget => "E_NO_ACTIVE_TARGET",
            Self::InjectionBlocked(_) => "E_INJECTION_BLOCKED",
            Self::ConnectionFailed(_) => "E_CONNECTION_FAILED",
            Self::SelectionTimeout { .. } => "E_SELECTION_TIMEOUT",
            Self::SelectionCanceled => "E_SELECTION_CANCELED",
            Self::RateLimited(_) => "E_RATE_LIMITED",
            Self::CaptureFailed(_) => "E_CAPTURE_FAILED",
            Self::Script { .. } => "E_SCRIPT_RESULT",
            Self::Image(_) => "E_IMAGE_CODEC",
            Self::CanvasTooLarge { .. } => "E_CANVAS_TOO_LARGE",
            Self::NoFrames => "E_NO_FRAMES",
            Self::InvalidRequest(_) => "E_INVALID_REQUEST",
            Self::Store(_) => "E_STORE",
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::NoActiveTarget | Self::InjectionBlocked(_) => ErrorCategory::EnvironmentRestricted,
            Self::ConnectionFailed(_) => ErrorCategory::ConnectionFailed,
            Self::SelectionTimeout { .. } => ErrorCategory::SelectionTimeout,
            Self::SelectionCanceled => ErrorCategory::SelectionCanceled,
            Self::RateLimited(_) | Self::CaptureFailed(_) | Self::Script { .. } | Self::Image(_) => {
                ErrorCategory::CaptureFailed
            }
            Self::CanvasTooLarge { .. } => ErrorCategory::CanvasTooLarge,
            Self::NoFrames => ErrorCategory::NoFrames,
            Self::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            Self::Store(_) => ErrorCategory::Storage,
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::ConnectionFailed(_) | Self::RateLimited(_) | Self::CaptureFailed(_) | Self::SelectionTimeout { .. })
    }
}

/// Fragments browsers use when a page is off-limits to extensions.
const RESTRICTED_MARKERS: &[&str] = &[
    "cannot access",
    "cannot be scripted",
    "chrome://",
    "edge://",
    "about:",
    "extensions gallery",
    "chrome-extension://",
    "content security policy",
    "missing host permission",
];

/// Fragments for a page that has no listener (not loaded yet, or navigated).
const CONNECTION_MARKERS: &[&str] = &["receiving end does not exist", "could not establish connection", "disconnected"];

/// Fragments for the capture quota.
const RATE_LIMIT_MARKERS: &[&str] = &["max_capture_visible_tab_calls_per_second", "rate limit", "quota"];

fn mentions(text: &str, markers: &[&str]) -> bool {
    let lower = text.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

impl From<HostError> for CaptureError {
    fn from(err: HostError) -> Self {
        match err {
            HostError::NoTarget => Self::NoActiveTarget,
            HostError::Injection(text) | HostError::Capture(text) | HostError::Channel(text)
                if mentions(&text, RESTRICTED_MARKERS) =>
            {
                Self::InjectionBlocked(text)
            }
            HostError::Capture(text) if mentions(&text, RATE_LIMIT_MARKERS) => Self::RateLimited(text),
            HostError::Channel(text) => Self::ConnectionFailed(text),
            HostError::Injection(text) | HostError::Capture(text) if mentions(&text, CONNECTION_MARKERS) => {
                Self::ConnectionFailed(text)
            }
            HostError::Injection(text) | HostError::Capture(text) => Self::CaptureFailed(text),
        }
    }
}
