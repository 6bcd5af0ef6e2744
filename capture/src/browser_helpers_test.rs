//! Simulated browser page for capture tests.
//!
//! [`FakeHost`] answers page scripts from an in-memory [`FakePage`] and
//! produces screenshots whose rows encode the absolute document row they
//! show: red is the high byte, green the low byte. Rows covered by a visible
//! fixed header get blue 255, so tests can tell whether hiding worked.

use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Mutex, MutexGuard, PoisonError};

use image::{ImageFormat, Rgba, RgbaImage};
use serde_json::{Value, json};
use tokio::time::Instant;

use super::*;
use crate::hide::{self, ElementBox, Positioning};

pub struct FakePage {
    /// Scroll heights reported by successive `ReadScrollHeight` calls, to
    /// simulate lazy loading. Once drained, `scroll_height` is reported.
    pub heights: VecDeque<f64>,
    pub scroll_height: f64,
    pub viewport_height: f64,
    pub viewport_width: f64,
    pub dpr: f64,
    pub scroll_y: f64,
    /// Furthest offset the page lets itself be scrolled to, if lower than
    /// the geometric maximum.
    pub scroll_limit: Option<f64>,
    pub elements: Vec<ElementBox>,
    /// Script names and `capture@{y}` entries, in call order.
    pub log: Vec<String>,
    pub capture_times: Vec<Instant>,
    /// Fail the n-th capture (1-based) with this error.
    pub fail_capture_at: Option<(usize, HostError)>,
    /// Fail every run of the named script with this error.
    pub fail_script: Option<(&'static str, HostError)>,
    pub selection_active: bool,
}

impl FakePage {
    #[must_use]
    pub fn new(scroll_height: f64, viewport_height: f64) -> Self {
        Self {
            heights: VecDeque::new(),
            scroll_height,
            viewport_height,
            viewport_width: 20.0,
            dpr: 1.0,
            scroll_y: 0.0,
            scroll_limit: None,
            elements: Vec::new(),
            log: Vec::new(),
            capture_times: Vec::new(),
            fail_capture_at: None,
            fail_script: None,
            selection_active: false,
        }
    }

    /// Add a full-width fixed header `height` CSS px tall.
    #[must_use]
    pub fn with_fixed_header(mut self, height: f64) -> Self {
        self.elements.push(ElementBox {
            position: Positioning::Fixed,
            z_index: Some(100),
            top: 0.0,
            width: self.viewport_width,
            height,
            marked: false,
        });
        self
    }

    #[must_use]
    pub fn captures(&self) -> usize {
        self.capture_times.len()
    }

    #[must_use]
    pub fn calls(&self, name: &str) -> usize {
        self.log.iter().filter(|entry| entry.as_str() == name).count()
    }

    fn max_scroll(&self) -> f64 {
        let max = (self.scroll_height - self.viewport_height).max(0.0);
        self.scroll_limit.map_or(max, |limit| limit.min(max))
    }

    fn header_rows(&self) -> u32 {
        self.elements
            .iter()
            .filter(|el| !el.marked && matches!(el.position, Positioning::Fixed | Positioning::Sticky))
            .map(|el| (el.height * self.dpr).round() as u32)
            .max()
            .unwrap_or(0)
    }

    fn screenshot(&self) -> RgbaImage {
        let width = (self.viewport_width * self.dpr).round() as u32;
        let height = (self.viewport_height * self.dpr).round() as u32;
        let start = (self.scroll_y * self.dpr).round() as u32;
        let header = self.header_rows();
        RgbaImage::from_fn(width, height, |_, y| {
            let row = start + y;
            let blue = if y < header { 255 } else { 0 };
            Rgba([(row >> 8) as u8, (row & 0xff) as u8, blue, 255])
        })
    }

    fn run(&mut self, script: &PageScript) -> Result<Value, HostError> {
        self.log.push(script.name().to_string());
        if let Some((name, err)) = &self.fail_script {
            if *name == script.name() {
                return Err(err.clone());
            }
        }
        let value = match script {
            PageScript::ReadMetrics => json!({
                "scroll_height": self.scroll_height,
                "viewport_height": self.viewport_height,
                "viewport_width": self.viewport_width,
                "device_pixel_ratio": self.dpr,
                "scroll_y": self.scroll_y,
            }),
            PageScript::ReadScrollHeight => {
                if let Some(h) = self.heights.pop_front() {
                    self.scroll_height = h;
                }
                json!({ "scroll_height": self.scroll_height })
            }
            PageScript::ScrollTo { y } => {
                self.scroll_y = y.clamp(0.0, self.max_scroll());
                json!({ "y": self.scroll_y })
            }
            PageScript::HideFloating { criteria } => {
                let vw = self.viewport_width;
                json!({ "hidden": hide::hide_matching(&mut self.elements, criteria, vw) })
            }
            PageScript::RestoreHidden => json!({ "restored": hide::restore_all(&mut self.elements) }),
            PageScript::StartSelection => {
                self.selection_active = true;
                Value::Null
            }
            PageScript::CleanupSelection => {
                self.selection_active = false;
                Value::Null
            }
        };
        Ok(value)
    }

    fn capture(&mut self) -> Result<Vec<u8>, HostError> {
        self.capture_times.push(Instant::now());
        self.log.push(format!("capture@{}", self.scroll_y));
        if let Some((n, err)) = &self.fail_capture_at {
            if *n == self.capture_times.len() {
                return Err(err.clone());
            }
        }
        Ok(encode_png(&self.screenshot()))
    }
}

pub struct FakeHost {
    page: Mutex<FakePage>,
    target: Option<TargetId>,
}

impl FakeHost {
    #[must_use]
    pub fn new(page: FakePage) -> Self {
        Self { page: Mutex::new(page), target: Some(TargetId("tab-1".into())) }
    }

    /// A host with no capturable page.
    #[must_use]
    pub fn without_target() -> Self {
        Self { page: Mutex::new(FakePage::new(0.0, 0.0)), target: None }
    }

    pub fn page(&self) -> MutexGuard<'_, FakePage> {
        self.page.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait::async_trait]
impl BrowserHost for FakeHost {
    async fn active_target(&self) -> Result<TargetId, HostError> {
        self.target.clone().ok_or(HostError::NoTarget)
    }

    async fn run_in_page(&self, _target: &TargetId, script: &PageScript) -> Result<Value, HostError> {
        self.page().run(script)
    }

    async fn capture_viewport(&self, _target: &TargetId) -> Result<Vec<u8>, HostError> {
        self.page().capture()
    }
}

#[must_use]
pub fn encode_png(img: &RgbaImage) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

/// Absolute document row encoded in pixel `(0, y)`.
#[must_use]
pub fn row_tag(img: &RgbaImage, y: u32) -> u32 {
    let px = img.get_pixel(0, y);
    (u32::from(px[0]) << 8) | u32::from(px[1])
}

/// Whether pixel row `y` shows the fixed header.
#[must_use]
pub fn is_header(img: &RgbaImage, y: u32) -> bool {
    img.get_pixel(0, y)[2] == 255
}
