//! RGBA color

use serde::{Deserialize, Serialize};

/// Linear RGBA color with components in `[0, 1]`.
///
/// Deserialized colors are clamped like [`Color::rgba`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "ColorData")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

#[derive(Deserialize)]
struct ColorData {
    r: f32,
    g: f32,
    b: f32,
    #[serde(default = "opaque")]
    a: f32,
}

fn opaque() -> f32 {
    1.0
}

impl From<ColorData> for Color {
    fn from(data: ColorData) -> Self {
        Color::rgba(data.r, data.g, data.b, data.a)
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::WHITE
    }
}

impl Color {
    pub const WHITE: Color = Color::rgba_const(1.0, 1.0, 1.0, 1.0);
    pub const BLACK: Color = Color::rgba_const(0.0, 0.0, 0.0, 1.0);
    pub const TRANSPARENT: Color = Color::rgba_const(0.0, 0.0, 0.0, 0.0);
    pub const RED: Color = Color::rgba_const(1.0, 0.0, 0.0, 1.0);
    pub const GREEN: Color = Color::rgba_const(0.0, 1.0, 0.0, 1.0);
    pub const BLUE: Color = Color::rgba_const(0.0, 0.0, 1.0, 1.0);

    const fn rgba_const(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Creates a color, clamping every component into `[0, 1]`.
    pub fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self {
            r: clamp_unit(r),
            g: clamp_unit(g),
            b: clamp_unit(b),
            a: clamp_unit(a),
        }
    }

    pub fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Returns the same color with every component clamped into `[0, 1]`.
    pub fn clamped(self) -> Self {
        Self::rgba(self.r, self.g, self.b, self.a)
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: clamp_unit(a),
            ..self
        }
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Relative luminance with Rec. 709 weights.
    pub fn luminance(self) -> f32 {
        0.2126 * self.r + 0.7152 * self.g + 0.0722 * self.b
    }

    /// Background derived from this color when used as a text foreground.
    ///
    /// Dark foregrounds get white, light ones black; the foreground alpha is
    /// kept. The result depends on nothing but `self`.
    pub fn contrasting_background(self) -> Color {
        let base = if self.luminance() < 0.5 {
            Color::WHITE
        } else {
            Color::BLACK
        };
        base.with_alpha(self.a)
    }

    /// Parses `#rrggbb` or `#rrggbbaa`.
    pub fn from_hex(hex: &str) -> Option<Color> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !(digits.len() == 6 || digits.len() == 8) || !digits.is_ascii() {
            return None;
        }
        let channel = |i: usize| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .ok()
                .map(|v| v as f32 / 255.0)
        };
        let a = if digits.len() == 8 { channel(6)? } else { 1.0 };
        Some(Color::rgba(channel(0)?, channel(2)?, channel(4)?, a))
    }
}

fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) }
}

impl From<[f32; 4]> for Color {
    fn from(c: [f32; 4]) -> Self {
        Color::rgba(c[0], c[1], c[2], c[3])
    }
}

impl From<Color> for [f32; 4] {
    fn from(c: Color) -> Self {
        c.to_array()
    }
}
