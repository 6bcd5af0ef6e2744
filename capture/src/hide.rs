//! Floating-chrome suppression policy.
//!
//! DESIGN
//! ======
//! Fixed and sticky headers would be re-captured in every frame of a
//! full-page run. From the second frame on the pipeline asks the page to hide
//! them. The page side evaluates [`HideCriteria`] against each element's
//! computed box and tags what it hides with [`MARKER_CLASS`], which makes
//! repeated hides no-ops and lets restore find everything it touched.
//!
//! [`hide_matching`] / [`restore_all`] are the host-side half of
//! [`PageScript::HideFloating`](crate::browser::PageScript::HideFloating) and
//! [`PageScript::RestoreHidden`](crate::browser::PageScript::RestoreHidden).
//! A [`BrowserHost`](crate::browser::BrowserHost) that keeps element boxes
//! calls them directly and returns the counts as the script result; a host
//! that injects into a live page runs the same rules there.

#[cfg(test)]
#[path = "hide_test.rs"]
mod tests;

use serde::{Deserialize, Serialize};

/// Class added to every element hidden during a capture run.
pub const MARKER_CLASS: &str = "__page-capture-hidden";

/// Thresholds for the floating-banner heuristic. Approximate by nature:
/// may over-hide real content or miss custom headers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HideCriteria {
    /// Minimum z-index for an absolutely positioned element to count as floating.
    pub min_z_index: i32,
    /// Minimum width as a fraction of the viewport width.
    pub min_width_ratio: f64,
    /// How close to the viewport top (CSS px) counts as pinned.
    pub max_top_px: f64,
}

/// CSS `position` of an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Positioning {
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

/// Computed layout of one page element, in CSS px relative to the viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementBox {
    pub position: Positioning,
    /// `None` for `z-index: auto`.
    pub z_index: Option<i32>,
    pub top: f64,
    pub width: f64,
    pub height: f64,
    /// Whether the element already carries [`MARKER_CLASS`].
    #[serde(default)]
    pub marked: bool,
}

impl HideCriteria {
    /// Whether `el` behaves like page chrome that would repeat in every frame.
    ///
    /// Fixed and sticky elements always match once they are visible. Absolute
    /// elements match only when they look like a banner: raised above the
    /// page, pinned to the top and spanning most of the viewport.
    #[must_use]
    pub fn matches(&self, el: &ElementBox, viewport_width: f64) -> bool {
        if el.width <= 0.0 || el.height <= 0.0 {
            return false;
        }
        match el.position {
            Positioning::Fixed | Positioning::Sticky => true,
            Positioning::Absolute => {
                el.z_index.is_some_and(|z| z >= self.min_z_index)
                    && el.top <= self.max_top_px
                    && el.width > viewport_width * self.min_width_ratio
            }
            Positioning::Static | Positioning::Relative => false,
        }
    }
}

/// Mark every matching element that is not marked yet. Returns how many
/// were newly hidden; a second call with the same page returns 0.
///
/// Hosts answer `HideFloating` with this count.
pub fn hide_matching(elements: &mut [ElementBox], criteria: &HideCriteria, viewport_width: f64) -> usize {
    let mut hidden = 0;
    for el in elements.iter_mut().filter(|el| !el.marked) {
        if criteria.matches(el, viewport_width) {
            el.marked = true;
            hidden += 1;
        }
    }
    hidden
}

/// Unmark everything. Returns how many elements were restored; hosts answer
/// `RestoreHidden` with this count.
pub fn restore_all(elements: &mut [ElementBox]) -> usize {
    let mut restored = 0;
    for el in elements.iter_mut().filter(|el| el.marked) {
        el.marked = false;
        restored += 1;
    }
    restored
}
