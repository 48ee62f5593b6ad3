//! Glyph atlases and the per-context glyph cache.

use std::collections::HashMap;
use std::sync::Arc;

use glam::Vec2;
use parking_lot::Mutex;

use super::rasterizer::{BoxRasterizer, GlyphRasterizer, LineMetrics};
use crate::backend::TextureSource;

/// Pixels between glyphs in the atlas.
const GLYPH_PADDING: u32 = 1;

/// Name the built-in box font is registered under.
pub const FALLBACK_FONT: &str = "builtin-box";

/// Atlas rect of a glyph bitmap in normalized texture coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct UvRect {
    pub min: Vec2,
    pub max: Vec2,
}

/// A rasterized (or placeholder) glyph, in pixels of the atlas font size.
#[derive(Debug, Clone, PartialEq)]
pub struct GlyphEntry {
    pub character: char,
    pub uv_rect: UvRect,
    pub advance_width: f32,
    /// Bitmap size; zero for blank glyphs.
    pub size: Vec2,
    /// Offset of the bitmap's bottom-left corner from the pen on the baseline.
    pub bearing: Vec2,
}

impl GlyphEntry {
    fn blank(character: char, advance_width: f32) -> Self {
        Self {
            character,
            uv_rect: UvRect::default(),
            advance_width,
            size: Vec2::ZERO,
            bearing: Vec2::ZERO,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.size.x <= 0.0 || self.size.y <= 0.0
    }
}

/// Identifies one atlas: a font at one pixel size.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AtlasKey {
    pub font: String,
    pub px: u32,
}

/// Shelf-packed R8 glyph atlas for one [`AtlasKey`].
pub struct GlyphAtlas {
    id: u64,
    key: AtlasKey,
    size: u32,
    pixels: Vec<u8>,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    full: bool,
    generation: u64,
    snapshot: Option<(u64, Arc<[u8]>)>,
    line_metrics: LineMetrics,
    entries: HashMap<char, Arc<GlyphEntry>>,
}

impl GlyphAtlas {
    fn new(id: u64, key: AtlasKey, size: u32, line_metrics: LineMetrics) -> Self {
        Self {
            id,
            key,
            size,
            pixels: vec![0; size as usize * size as usize],
            cursor_x: GLYPH_PADDING,
            cursor_y: GLYPH_PADDING,
            row_height: 0,
            full: false,
            generation: 0,
            snapshot: None,
            line_metrics,
            entries: HashMap::new(),
        }
    }

    pub fn key(&self) -> &AtlasKey {
        &self.key
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn line_metrics(&self) -> LineMetrics {
        self.line_metrics
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    /// Returns the cached entry, rasterizing the glyph on first use.
    ///
    /// Unsupported characters, and glyphs that no longer fit, get a blank
    /// entry with a plain advance so the label layout stays intact.
    pub fn glyph(&mut self, character: char, rasterizer: &dyn GlyphRasterizer) -> Arc<GlyphEntry> {
        if let Some(entry) = self.entries.get(&character) {
            return entry.clone();
        }

        let px = self.key.px as f32;
        let entry = match rasterizer.rasterize(character, px) {
            None => {
                tracing::debug!(?character, font = %self.key.font, "unsupported character");
                GlyphEntry::blank(character, px * 0.5)
            }
            Some(glyph) if glyph.width == 0 || glyph.height == 0 => {
                GlyphEntry::blank(character, glyph.advance_width)
            }
            Some(glyph) => match self.place(&glyph.bitmap, glyph.width, glyph.height) {
                Some(uv_rect) => GlyphEntry {
                    character,
                    uv_rect,
                    advance_width: glyph.advance_width,
                    size: Vec2::new(glyph.width as f32, glyph.height as f32),
                    bearing: Vec2::new(glyph.xmin, glyph.ymin),
                },
                None => GlyphEntry::blank(character, glyph.advance_width),
            },
        };

        let entry = Arc::new(entry);
        self.entries.insert(character, entry.clone());
        entry
    }

    /// Copies a bitmap into the next free shelf slot.
    fn place(&mut self, bitmap: &[u8], w: u32, h: u32) -> Option<UvRect> {
        if self.full || bitmap.len() != w as usize * h as usize {
            return None;
        }

        // Advance to a new shelf row when the glyph doesn't fit horizontally.
        if self.cursor_x + w + GLYPH_PADDING > self.size {
            self.cursor_y += self.row_height + GLYPH_PADDING;
            self.cursor_x = GLYPH_PADDING;
            self.row_height = 0;
        }

        if self.cursor_x + w + GLYPH_PADDING > self.size || self.cursor_y + h + GLYPH_PADDING > self.size {
            tracing::warn!(
                font = %self.key.font,
                px = self.key.px,
                size = self.size,
                "glyph atlas is full; some glyphs will not be rendered"
            );
            self.full = true;
            return None;
        }

        let (gx, gy) = (self.cursor_x, self.cursor_y);
        let stride = self.size as usize;
        for row in 0..h as usize {
            let src = &bitmap[row * w as usize..(row + 1) * w as usize];
            let dst = (gy as usize + row) * stride + gx as usize;
            self.pixels[dst..dst + w as usize].copy_from_slice(src);
        }

        self.cursor_x += w + GLYPH_PADDING;
        self.row_height = self.row_height.max(h);
        self.generation += 1;

        let atlas = self.size as f32;
        Some(UvRect {
            min: Vec2::new(gx as f32 / atlas, gy as f32 / atlas),
            max: Vec2::new((gx + w) as f32 / atlas, (gy + h) as f32 / atlas),
        })
    }

    /// Current pixels, shared until the next change.
    pub fn texture(&mut self) -> TextureSource {
        let pixels = match &self.snapshot {
            Some((generation, pixels)) if *generation == self.generation => pixels.clone(),
            _ => {
                let pixels: Arc<[u8]> = Arc::from(self.pixels.as_slice());
                self.snapshot = Some((self.generation, pixels.clone()));
                pixels
            }
        };
        TextureSource {
            key: self.id,
            generation: self.generation,
            width: self.size,
            height: self.size,
            pixels,
        }
    }
}

/// Glyph atlases of every font and size in use by one rendering context.
pub struct GlyphCache {
    atlas_size: u32,
    next_id: u64,
    fonts: HashMap<String, Box<dyn GlyphRasterizer>>,
    atlases: HashMap<AtlasKey, GlyphAtlas>,
}

/// Glyph cache shared by every text command of a context.
pub type SharedGlyphCache = Arc<Mutex<GlyphCache>>;

impl GlyphCache {
    /// Creates an empty cache with only the built-in box font registered.
    pub fn new(atlas_size: u32) -> Self {
        let mut fonts: HashMap<String, Box<dyn GlyphRasterizer>> = HashMap::new();
        fonts.insert(FALLBACK_FONT.to_string(), Box::new(BoxRasterizer));
        Self {
            atlas_size: atlas_size.max(64),
            next_id: 0,
            fonts,
            atlases: HashMap::new(),
        }
    }

    pub fn shared(self) -> SharedGlyphCache {
        Arc::new(Mutex::new(self))
    }

    pub fn atlas_size(&self) -> u32 {
        self.atlas_size
    }

    /// Registers a font, dropping atlases built from an earlier font of the
    /// same name.
    pub fn register_font(&mut self, name: impl Into<String>, rasterizer: Box<dyn GlyphRasterizer>) {
        let name = name.into();
        self.atlases.retain(|key, _| key.font != name);
        tracing::debug!(font = %name, "registered font");
        self.fonts.insert(name, rasterizer);
    }

    pub fn has_font(&self, name: &str) -> bool {
        self.fonts.contains_key(name)
    }

    /// `name` if registered, otherwise the built-in font.
    pub fn resolve_font<'a>(&self, name: &'a str) -> &'a str {
        if self.has_font(name) { name } else { FALLBACK_FONT }
    }

    /// Atlas for `key`, if it has been built.
    pub fn atlas(&self, key: &AtlasKey) -> Option<&GlyphAtlas> {
        self.atlases.get(key)
    }

    /// Number of atlases built so far.
    pub fn len(&self) -> usize {
        self.atlases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.atlases.is_empty()
    }

    /// Atlas and rasterizer for `font` at `px`, building the atlas on first
    /// use. Unknown fonts resolve to the built-in one; `px` is clamped to
    /// the atlas size.
    pub fn atlas_mut(&mut self, font: &str, px: u32) -> (&mut GlyphAtlas, &dyn GlyphRasterizer) {
        let font = self.resolve_font(font);
        let key = AtlasKey {
            font: font.to_string(),
            px: px.clamp(1, self.atlas_size),
        };

        let rasterizer: &dyn GlyphRasterizer = match self.fonts.get(font) {
            Some(r) => r.as_ref(),
            None => &BoxRasterizer,
        };

        let atlas_size = self.atlas_size;
        let next_id = &mut self.next_id;
        let atlas = self.atlases.entry(key).or_insert_with_key(|key| {
            let id = *next_id;
            *next_id += 1;
            tracing::debug!(font = %key.font, px = key.px, size = atlas_size, "created glyph atlas");
            GlyphAtlas::new(id, key.clone(), atlas_size, rasterizer.line_metrics(key.px as f32))
        });
        (atlas, rasterizer)
    }

    /// Looks up (or rasterizes) one glyph.
    pub fn glyph(&mut self, font: &str, px: u32, character: char) -> Arc<GlyphEntry> {
        let (atlas, rasterizer) = self.atlas_mut(font, px);
        atlas.glyph(character, rasterizer)
    }

    /// Drops every atlas. Registered fonts are kept.
    pub fn clear(&mut self) {
        self.atlases.clear();
    }
}
