//! Label layout.

use std::sync::Arc;

use glam::Vec2;

use super::atlas::{GlyphAtlas, GlyphEntry};
use super::rasterizer::GlyphRasterizer;

/// One character of a label, in label units with y up.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphQuad {
    /// Background cell: advance wide, one line tall.
    pub cell_min: Vec2,
    pub cell_max: Vec2,
    /// Bitmap rect inside the cell. Empty for blank glyphs.
    pub glyph_min: Vec2,
    pub glyph_max: Vec2,
    pub entry: Arc<GlyphEntry>,
}

/// Number of quads [`layout_label`] produces for `text`.
pub fn glyph_count(text: &str) -> usize {
    text.chars().filter(|&c| c != '\n').count()
}

/// Lays out `text` as left-aligned lines centered on the origin.
///
/// Lines break on `\n`. One label unit spans `resolution` atlas pixels.
pub fn layout_label(
    text: &str,
    atlas: &mut GlyphAtlas,
    rasterizer: &dyn GlyphRasterizer,
    resolution: f32,
) -> Vec<GlyphQuad> {
    let metrics = atlas.line_metrics();
    let line_height = metrics.line_height();
    let mut quads = Vec::with_capacity(glyph_count(text));
    let mut block_width: f32 = 0.0;
    let mut lines = 0;

    for (index, line) in text.split('\n').enumerate() {
        lines += 1;
        let top = -(index as f32) * line_height;
        let baseline = top - metrics.ascent;
        let mut pen = 0.0;

        for character in line.chars() {
            let entry = atlas.glyph(character, rasterizer);
            let glyph_min = Vec2::new(pen + entry.bearing.x, baseline + entry.bearing.y);
            quads.push(GlyphQuad {
                cell_min: Vec2::new(pen, top - line_height),
                cell_max: Vec2::new(pen + entry.advance_width, top),
                glyph_min,
                glyph_max: glyph_min + entry.size,
                entry: entry.clone(),
            });
            pen += entry.advance_width;
        }
        block_width = block_width.max(pen);
    }

    let offset = Vec2::new(-block_width / 2.0, lines as f32 * line_height / 2.0);
    let scale = 1.0 / resolution.max(1.0);
    for quad in &mut quads {
        quad.cell_min = (quad.cell_min + offset) * scale;
        quad.cell_max = (quad.cell_max + offset) * scale;
        quad.glyph_min = (quad.glyph_min + offset) * scale;
        quad.glyph_max = (quad.glyph_max + offset) * scale;
    }
    quads
}
