//! Text rendering support: glyph rasterizers, atlases and label layout.

mod atlas;
mod layout;
mod rasterizer;

pub use atlas::{AtlasKey, FALLBACK_FONT, GlyphAtlas, GlyphCache, GlyphEntry, SharedGlyphCache, UvRect};
pub use layout::{GlyphQuad, glyph_count, layout_label};
pub use rasterizer::{BoxRasterizer, FontdueRasterizer, GlyphRasterizer, LineMetrics, RasterizedGlyph};
