//! Glyph rasterizers.

use std::path::Path;

use crate::error::FontError;

/// Vertical metrics of a font at one pixel size. `descent` is negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineMetrics {
    pub ascent: f32,
    pub descent: f32,
    pub line_gap: f32,
}

impl LineMetrics {
    pub fn line_height(&self) -> f32 {
        self.ascent - self.descent + self.line_gap
    }
}

/// Coverage bitmap of one glyph, rows top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterizedGlyph {
    pub width: u32,
    pub height: u32,
    pub bitmap: Vec<u8>,
    pub advance_width: f32,
    /// Offset of the bitmap's left edge from the pen position.
    pub xmin: f32,
    /// Offset of the bitmap's bottom edge from the baseline, y up.
    pub ymin: f32,
}

pub trait GlyphRasterizer: Send {
    fn line_metrics(&self, px: f32) -> LineMetrics;

    /// Returns `None` for characters the font cannot draw.
    fn rasterize(&self, character: char, px: f32) -> Option<RasterizedGlyph>;
}

/// TrueType/OpenType rasterizer backed by fontdue.
pub struct FontdueRasterizer {
    font: fontdue::Font,
}

impl FontdueRasterizer {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FontError> {
        let font = fontdue::Font::from_bytes(bytes, fontdue::FontSettings::default())
            .map_err(|e| FontError::Parse(e.to_string()))?;
        Ok(Self { font })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FontError> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

impl GlyphRasterizer for FontdueRasterizer {
    fn line_metrics(&self, px: f32) -> LineMetrics {
        match self.font.horizontal_line_metrics(px) {
            Some(m) => LineMetrics {
                ascent: m.ascent,
                descent: m.descent,
                line_gap: m.line_gap,
            },
            None => LineMetrics {
                ascent: px * 0.8,
                descent: -px * 0.2,
                line_gap: 0.0,
            },
        }
    }

    fn rasterize(&self, character: char, px: f32) -> Option<RasterizedGlyph> {
        if self.font.lookup_glyph_index(character) == 0 {
            return None;
        }
        let (metrics, bitmap) = self.font.rasterize(character, px);
        Some(RasterizedGlyph {
            width: metrics.width as u32,
            height: metrics.height as u32,
            bitmap,
            advance_width: metrics.advance_width,
            xmin: metrics.xmin as f32,
            ymin: metrics.ymin as f32,
        })
    }
}

/// Built-in font with no external data: every printable character is an
/// outlined box on a monospace grid, whitespace is blank.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxRasterizer;

impl BoxRasterizer {
    const ADVANCE: f32 = 0.6;
    const BOX_WIDTH: f32 = 0.45;
    const BOX_HEIGHT: f32 = 0.7;
}

impl GlyphRasterizer for BoxRasterizer {
    fn line_metrics(&self, px: f32) -> LineMetrics {
        LineMetrics {
            ascent: px * 0.8,
            descent: -px * 0.2,
            line_gap: 0.0,
        }
    }

    fn rasterize(&self, character: char, px: f32) -> Option<RasterizedGlyph> {
        if character.is_control() {
            return None;
        }
        let advance_width = (px * Self::ADVANCE).round();
        if character.is_whitespace() {
            return Some(RasterizedGlyph {
                width: 0,
                height: 0,
                bitmap: Vec::new(),
                advance_width,
                xmin: 0.0,
                ymin: 0.0,
            });
        }

        let width = (px * Self::BOX_WIDTH).round().max(2.0) as u32;
        let height = (px * Self::BOX_HEIGHT).round().max(2.0) as u32;
        let stroke = (px / 12.0).round().max(1.0) as u32;

        let (w, h, stroke) = (width as usize, height as usize, stroke as usize);
        let mut bitmap = vec![0u8; w.checked_mul(h)?];
        for y in 0..h {
            for x in 0..w {
                let edge = x < stroke || y < stroke || x + stroke >= w || y + stroke >= h;
                if edge {
                    bitmap[y * w + x] = 255;
                }
            }
        }

        Some(RasterizedGlyph {
            width,
            height,
            bitmap,
            advance_width,
            xmin: ((advance_width - width as f32) / 2.0).round(),
            ymin: 0.0,
        })
    }
}
