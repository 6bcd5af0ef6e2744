//! CSS-style color strings as stored on elements.

#[cfg(test)]
#[path = "color_test.rs"]
mod color_test;

/// Straight (non-premultiplied) 8-bit RGBA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba { r: 0, g: 0, b: 0, a: 255 };
    pub const WHITE: Rgba = Rgba { r: 255, g: 255, b: 255, a: 255 };
    pub const TRANSPARENT: Rgba = Rgba { r: 0, g: 0, b: 0, a: 0 };

    /// Parse `#rgb`, `#rrggbb`, `#rrggbbaa` or `transparent`.
    #[must_use]
    pub fn parse(input: &str) -> Option<Rgba> {
        let s = input.trim();
        if s.eq_ignore_ascii_case("transparent") {
            return Some(Self::TRANSPARENT);
        }
        let hex = s.strip_prefix('#')?;
        let digits = hex.as_bytes();
        match digits.len() {
            3 => {
                let short = |i: usize| nibble(digits[i]).map(|v| v * 17);
                Some(Rgba { r: short(0)?, g: short(1)?, b: short(2)?, a: 255 })
            }
            6 | 8 => {
                let byte = |i: usize| Some((nibble(digits[i])? << 4) | nibble(digits[i + 1])?);
                let a = if digits.len() == 8 { byte(6)? } else { 255 };
                Some(Rgba { r: byte(0)?, g: byte(2)?, b: byte(4)?, a })
            }
            _ => None,
        }
    }

    /// Parse, falling back to `fallback` for anything unrecognized.
    #[must_use]
    pub fn parse_or(input: &str, fallback: Rgba) -> Rgba {
        Self::parse(input).unwrap_or(fallback)
    }

    /// Scale alpha by `opacity` in `[0, 1]`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn with_opacity(self, opacity: f64) -> Rgba {
        let a = (f64::from(self.a) * opacity.clamp(0.0, 1.0)).round() as u8;
        Rgba { a, ..self }
    }

    #[must_use]
    pub fn to_skia(self) -> tiny_skia::Color {
        tiny_skia::Color::from_rgba8(self.r, self.g, self.b, self.a)
    }

    #[must_use]
    pub fn to_hex(self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}
