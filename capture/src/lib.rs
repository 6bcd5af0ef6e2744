//! Page capture: visible viewport, user-drawn selection, and full-page
//! scroll-and-stitch.
//!
//! The browser is reached only through [`browser::BrowserHost`]; everything
//! else is plain async Rust that can run against a simulated page.
//!
//! | Module | Role |
//! |--------|------|
//! | [`browser`] | Host trait, page scripts, typed page helpers |
//! | [`coordinator`] | Message dispatch, storing the latest capture |
//! | [`pipeline`] | Lazy-load priming and the frame loop |
//! | [`stitch`] | Frame placement and compositing |
//! | [`selection`] | Selection rendezvous and cropping |
//! | [`hide`] | Floating-chrome heuristic |
//! | [`throttle`] | Capture rate limiting |
//! | [`config`] / [`error`] | Environment tuning, error codes and categories |

pub mod browser;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod hide;
pub mod pipeline;
pub mod selection;
pub mod stitch;
pub mod throttle;

pub use browser::{BrowserHost, HostError, Page, PageMetrics, PageScript, TargetId};
pub use config::CaptureConfig;
pub use coordinator::{CaptureCoordinator, CaptureMode, spawn_coordinator};
pub use error::{CaptureError, ErrorCategory, ErrorCode};
pub use pipeline::ScrollCapturePipeline;
