//! Active drawing style and sparse style patches.
//!
//! The toolbar edits a [`StyleContext`]; new elements are seeded from it and
//! the selected element is updated with the same [`StylePatch`]. Manual edits
//! go through [`apply_style`], which drops any active preset template so the
//! user's explicit choice wins from then on.

#[cfg(test)]
#[path = "style_test.rs"]
mod style_test;

use serde::{Deserialize, Deserializer, Serialize};

use crate::doc::{DrawingElement, ElementKind, Shape, TextAlign, TextCase, TextShadow, TextStroke};
use crate::preset::Preset;

/// Keeps `Some(None)` (explicit null) distinct from an absent field.
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

/// Sparse style update. `None` leaves a field alone; for the nullable
/// attributes `Some(None)` clears them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StylePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub dash: Option<Option<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filled: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub background: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub text_stroke: Option<Option<TextStroke>>,
    #[serde(default, skip_serializing_if = "Option::is_none", deserialize_with = "double_option")]
    pub text_shadow: Option<Option<TextShadow>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub letter_spacing: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_case: Option<TextCase>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_align: Option<TextAlign>,
}

fn set<T: PartialEq + Clone>(slot: &mut T, value: Option<&T>) -> bool {
    match value {
        Some(v) if slot != v => {
            slot.clone_from(v);
            true
        }
        _ => false,
    }
}

impl StylePatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Every style attribute the element carries, as a patch.
    #[must_use]
    pub fn from_element(el: &DrawingElement) -> Self {
        let mut patch = Self {
            stroke_color: Some(el.style.stroke_color.clone()),
            stroke_width: Some(el.style.stroke_width),
            opacity: Some(el.style.opacity),
            dash: Some(el.style.dash.clone()),
            ..Self::default()
        };
        match &el.shape {
            Shape::Rect(b) | Shape::Ellipse(b) => patch.filled = Some(b.filled),
            Shape::Text(t) => {
                patch.font_family = Some(t.font_family.clone());
                patch.font_size = Some(t.font_size);
                patch.background = Some(t.background.clone());
                patch.text_stroke = Some(t.stroke.clone());
                patch.text_shadow = Some(t.shadow.clone());
                patch.letter_spacing = Some(t.letter_spacing);
                patch.line_height = Some(t.line_height);
                patch.text_case = Some(t.case);
                patch.text_align = Some(t.align);
            }
            _ => {}
        }
        patch
    }

    /// Overlay `other` on top of `self`; fields present in `other` win.
    #[must_use]
    pub fn merged(mut self, other: &StylePatch) -> Self {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() { self.$field.clone_from(&other.$field); })*
            };
        }
        overlay!(
            stroke_color, stroke_width, opacity, dash, filled, font_family, font_size,
            background, text_stroke, text_shadow, letter_spacing, line_height, text_case, text_align
        );
        self
    }

    /// Write the fields that apply to the element's kind. Returns true if
    /// anything changed.
    pub fn apply_to(&self, el: &mut DrawingElement) -> bool {
        let mut changed = false;
        changed |= set(&mut el.style.stroke_color, self.stroke_color.as_ref());
        changed |= set(&mut el.style.stroke_width, self.stroke_width.as_ref());
        changed |= set(&mut el.style.opacity, self.opacity.map(|o| o.clamp(0.0, 1.0)).as_ref());
        changed |= set(&mut el.style.dash, self.dash.as_ref());
        match &mut el.shape {
            Shape::Rect(b) | Shape::Ellipse(b) => {
                changed |= set(&mut b.filled, self.filled.as_ref());
            }
            Shape::Text(t) => {
                changed |= set(&mut t.font_family, self.font_family.as_ref());
                changed |= set(&mut t.font_size, self.font_size.as_ref());
                changed |= set(&mut t.background, self.background.as_ref());
                changed |= set(&mut t.stroke, self.text_stroke.as_ref());
                changed |= set(&mut t.shadow, self.text_shadow.as_ref());
                changed |= set(&mut t.letter_spacing, self.letter_spacing.as_ref());
                changed |= set(&mut t.line_height, self.line_height.as_ref());
                changed |= set(&mut t.case, self.text_case.as_ref());
                changed |= set(&mut t.align, self.text_align.as_ref());
            }
            _ => {}
        }
        changed
    }
}

/// The style new elements are created with.
#[derive(Debug, Clone, PartialEq)]
pub struct StyleContext {
    current: StylePatch,
    active_template: Option<Preset>,
}

impl Default for StyleContext {
    fn default() -> Self {
        let current = StylePatch {
            stroke_color: Some("#e53935".to_owned()),
            stroke_width: Some(4.0),
            opacity: Some(1.0),
            dash: Some(None),
            filled: Some(false),
            font_family: Some("sans-serif".to_owned()),
            font_size: Some(24.0),
            background: Some(None),
            text_stroke: Some(None),
            text_shadow: Some(None),
            letter_spacing: Some(0.0),
            line_height: Some(1.2),
            text_case: Some(TextCase::None),
            text_align: Some(TextAlign::Left),
        };
        Self { current, active_template: None }
    }
}

impl StyleContext {
    /// The toolbar's current values.
    #[must_use]
    pub fn current(&self) -> &StylePatch {
        &self.current
    }

    #[must_use]
    pub fn active_template(&self) -> Option<&Preset> {
        self.active_template.as_ref()
    }

    pub fn set_active_template(&mut self, preset: Option<Preset>) {
        self.active_template = preset;
    }

    /// Surface a selected element's attributes into the toolbar. Leaves the
    /// active template in place.
    pub fn adopt(&mut self, el: &DrawingElement) {
        self.current = std::mem::take(&mut self.current).merged(&StylePatch::from_element(el));
    }

    /// Full patch to seed a new element of `kind`: the current values with
    /// the active template's entry for that kind layered on top.
    #[must_use]
    pub fn seed_for(&self, kind: ElementKind) -> StylePatch {
        let base = self.current.clone();
        match self.active_template.as_ref().and_then(|p| p.template_for(kind)) {
            Some(template) => base.merged(template),
            None => base,
        }
    }
}

/// Merge a manual style edit into the context and clear the active template.
pub fn apply_style(ctx: &mut StyleContext, patch: &StylePatch) {
    ctx.current = std::mem::take(&mut ctx.current).merged(patch);
    ctx.active_template = None;
}
