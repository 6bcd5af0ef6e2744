//! Text case transforms, measurement and line layout.
//!
//! Layout works with or without a font. With a font, advances and kerning
//! come from `ab_glyph`; without one every character is assumed to be
//! [`FALLBACK_ADVANCE_EM`] wide so boxes still have a sensible size.

#[cfg(test)]
#[path = "text_test.rs"]
mod text_test;

use ab_glyph::{Font, FontArc, GlyphId, PxScale, ScaleFont};

use crate::consts::{FALLBACK_ADVANCE_EM, FALLBACK_ASCENT_EM};
use crate::doc::{TextAlign, TextBody, TextCase};

#[derive(Debug, thiserror::Error)]
#[error("font data could not be parsed: {0}")]
pub struct FontError(#[from] ab_glyph::InvalidFont);

/// Parse font bytes supplied by the host.
///
/// # Errors
///
/// Returns [`FontError`] if the bytes are not a usable TrueType/OpenType font.
pub fn load_font(bytes: Vec<u8>) -> Result<FontArc, FontError> {
    Ok(FontArc::try_from_vec(bytes)?)
}

/// Apply a case transform the way CSS `text-transform` does.
#[must_use]
pub fn apply_case(content: &str, case: TextCase) -> String {
    match case {
        TextCase::None => content.to_owned(),
        TextCase::Upper => content.to_uppercase(),
        TextCase::Lower => content.to_lowercase(),
        TextCase::Capitalize => {
            let mut out = String::with_capacity(content.len());
            let mut at_word_start = true;
            for ch in content.chars() {
                if at_word_start && ch.is_alphanumeric() {
                    out.extend(ch.to_uppercase());
                    at_word_start = false;
                } else {
                    out.push(ch);
                    if ch.is_whitespace() {
                        at_word_start = true;
                    }
                }
            }
            out
        }
    }
}

/// A glyph placed on a line, `x` relative to the line start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    pub id: GlyphId,
    pub x: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LaidLine {
    pub text: String,
    /// Horizontal offset from the layout box's left edge (alignment).
    pub x: f64,
    /// Baseline, from the layout box's top edge.
    pub baseline: f64,
    pub width: f64,
    /// Empty when laid out without a font.
    pub glyphs: Vec<PlacedGlyph>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextLayout {
    pub lines: Vec<LaidLine>,
    pub width: f64,
    pub height: f64,
}

/// Lay out `body` line by line. Width is the widest line; height is
/// `lines × font_size × line_height`.
#[must_use]
pub fn layout(body: &TextBody, font: Option<&FontArc>) -> TextLayout {
    let shown = apply_case(&body.content, body.case);
    let line_px = body.font_size * body.line_height;
    #[allow(clippy::cast_possible_truncation)]
    let scale = PxScale::from(body.font_size as f32);

    let ascent = match font {
        Some(f) => f64::from(f.as_scaled(scale).ascent()),
        None => body.font_size * FALLBACK_ASCENT_EM,
    };
    // Center the glyph box within the line box.
    let lead = (line_px - body.font_size).max(0.0) / 2.0;

    let mut lines: Vec<LaidLine> = Vec::new();
    for (i, text) in shown.split('\n').enumerate() {
        let (width, glyphs) = measure_line(text, body, font, scale);
        #[allow(clippy::cast_precision_loss)]
        let baseline = i as f64 * line_px + lead + ascent;
        lines.push(LaidLine { text: text.to_owned(), x: 0.0, baseline, width, glyphs });
    }

    let width = lines.iter().map(|l| l.width).fold(0.0, f64::max);
    for line in &mut lines {
        line.x = match body.align {
            TextAlign::Left => 0.0,
            TextAlign::Center => (width - line.width) / 2.0,
            TextAlign::Right => width - line.width,
        };
    }
    #[allow(clippy::cast_precision_loss)]
    let height = lines.len() as f64 * line_px;
    TextLayout { lines, width, height }
}

/// Measured `(width, height)` of `body`.
#[must_use]
pub fn measure(body: &TextBody, font: Option<&FontArc>) -> (f64, f64) {
    let l = layout(body, font);
    (l.width, l.height)
}

fn measure_line(text: &str, body: &TextBody, font: Option<&FontArc>, scale: PxScale) -> (f64, Vec<PlacedGlyph>) {
    let count = text.chars().count();
    if count == 0 {
        return (0.0, Vec::new());
    }
    #[allow(clippy::cast_precision_loss)]
    let spacing = body.letter_spacing * (count - 1) as f64;

    let Some(font) = font else {
        #[allow(clippy::cast_precision_loss)]
        let width = count as f64 * body.font_size * FALLBACK_ADVANCE_EM + spacing;
        return (width, Vec::new());
    };

    let scaled = font.as_scaled(scale);
    let mut glyphs = Vec::with_capacity(count);
    let mut x = 0.0_f64;
    let mut prev: Option<GlyphId> = None;
    for ch in text.chars() {
        let id = scaled.glyph_id(ch);
        if let Some(p) = prev {
            x += f64::from(scaled.kern(p, id));
        }
        glyphs.push(PlacedGlyph { id, x });
        x += f64::from(scaled.h_advance(id)) + body.letter_spacing;
        prev = Some(id);
    }
    (x - body.letter_spacing, glyphs)
}
