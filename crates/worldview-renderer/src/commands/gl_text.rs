//! Text labels drawn from a shared glyph atlas.
//!
//! Every character of every label becomes one instanced quad: the cell is
//! filled with the background color and the glyph coverage from the atlas
//! blends in the foreground. All labels of a frame share one draw call.

use bytemuck::{Pod, Zeroable};
use worldview_core::{TextMarker, text_colors};

use crate::backend::GpuBackend;
use crate::command::{Batch, Command, CommandSpec, Geometry};
use crate::config::TextConfig;
use crate::error::RenderError;
use crate::shader::{ShaderProgram, TEXT_SHADER};
use crate::text::{SharedGlyphCache, glyph_count, layout_label};
use crate::vertex::{PoseInstance, QuadVertex, VertexLayout, unit_quad};

#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub font_name: String,
    /// Rasterization size in pixels; also pixels per label unit.
    pub resolution: u32,
    pub auto_background_color: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self::from(&TextConfig::default())
    }
}

impl From<&TextConfig> for TextOptions {
    fn from(config: &TextConfig) -> Self {
        Self {
            font_name: config.font_name.clone(),
            resolution: config.resolution,
            auto_background_color: config.auto_background_color,
        }
    }
}

/// One character quad (128 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct TextInstance {
    /// `pose.flag` is set for billboards.
    pub pose: PoseInstance,
    pub cell: [f32; 4],
    pub glyph: [f32; 4],
    pub uv: [f32; 4],
    pub foreground: [f32; 4],
    pub background: [f32; 4],
}

impl TextInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 8] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
        7 => Float32x4,
        8 => Float32x4,
        9 => Float32x4,
    ];

    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

pub fn gl_text(
    backend: &mut dyn GpuBackend,
    glyphs: SharedGlyphCache,
    options: TextOptions,
) -> Result<Command<TextMarker>, RenderError> {
    Command::new("gl_text", backend, move |caps| {
        let atlas_size = glyphs.lock().atlas_size();
        caps.require_texture_size(atlas_size)?;

        // A glyph taller than the atlas could never be placed.
        let resolution = options.resolution.clamp(1, atlas_size);
        let font = options.font_name;
        let auto_background = options.auto_background_color;

        Ok(CommandSpec {
            shader: ShaderProgram::assemble("gl_text", TEXT_SHADER)?,
            topology: wgpu::PrimitiveTopology::TriangleList,
            geometry: Geometry::new(QuadVertex::layout(), &unit_quad()),
            instance_layout: TextInstance::layout(),
            textured: true,
            depth_write: false,
            attributes: Box::new(move |markers: &[&TextMarker], batch: &mut Batch| {
                let mut cache = glyphs.lock();
                let (atlas, rasterizer) = cache.atlas_mut(&font, resolution);

                for marker in markers {
                    let Some(text) = marker.text.as_deref() else {
                        continue;
                    };
                    let colors = text_colors(marker, auto_background);
                    let pose = PoseInstance::new(&marker.pose, marker.scale).with_flag(marker.billboard);

                    for quad in layout_label(text, atlas, rasterizer, resolution as f32) {
                        let uv = quad.entry.uv_rect;
                        batch.push(TextInstance {
                            pose,
                            cell: [quad.cell_min.x, quad.cell_min.y, quad.cell_max.x, quad.cell_max.y],
                            glyph: [quad.glyph_min.x, quad.glyph_min.y, quad.glyph_max.x, quad.glyph_max.y],
                            uv: [uv.min.x, uv.min.y, uv.max.x, uv.max.y],
                            foreground: colors.foreground.to_array(),
                            background: colors.background.to_array(),
                        });
                    }
                }

                batch.set_texture(atlas.texture());
            }),
            count: Box::new(|markers: &[&TextMarker]| {
                markers
                    .iter()
                    .filter_map(|m| m.text.as_deref())
                    .map(glyph_count)
                    .sum::<usize>() as u32
            }),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::capabilities::Capabilities;
    use crate::error::CapabilityError;
    use crate::text::GlyphCache;
    use glam::Vec3;
    use worldview_core::{Color, Marker, Pose};

    fn label(text: &str, colors: Vec<Color>) -> Marker {
        TextMarker {
            colors,
            ..TextMarker::new(text, Pose::IDENTITY)
        }
        .into()
    }

    fn draw_with(options: TextOptions, markers: &[Marker]) -> (RecordingBackend, Vec<TextInstance>) {
        let mut backend = RecordingBackend::new();
        let glyphs = GlyphCache::new(256).shared();
        let mut command = gl_text(&mut backend, glyphs, options).unwrap();
        command.draw(&mut backend, markers).unwrap();
        let instances = backend.draws().last().map(|d| d.instances()).unwrap_or_default();
        (backend, instances)
    }

    #[test]
    fn test_one_quad_per_character() {
        let (backend, instances) = draw_with(
            TextOptions::default(),
            &[label("ab\nc", vec![]), label("xyz", vec![])],
        );
        assert_eq!(instances.len(), 6);
        assert_eq!(backend.draws().count(), 1);
        let draw = backend.draws().next().unwrap();
        assert!(draw.texture.is_some());
    }

    #[test]
    fn test_auto_background_ignores_second_color() {
        let options = TextOptions {
            auto_background_color: true,
            ..Default::default()
        };
        let grey = Color::rgb(0.6, 0.6, 0.6);
        let (_, with_red) = draw_with(options.clone(), &[label("a", vec![grey, Color::RED])]);
        let (_, with_blue) = draw_with(options, &[label("a", vec![grey, Color::BLUE])]);

        assert_eq!(with_red[0].background, with_blue[0].background);
        assert_eq!(with_red[0].background, grey.contrasting_background().to_array());
        assert_eq!(with_red[0].foreground, grey.to_array());
    }

    #[test]
    fn test_explicit_background_without_auto() {
        let (_, instances) = draw_with(
            TextOptions::default(),
            &[label("a", vec![Color::WHITE, Color::RED])],
        );
        assert_eq!(instances[0].background, Color::RED.to_array());
    }

    #[test]
    fn test_billboard_flag_and_pose() {
        let marker = TextMarker {
            billboard: true,
            scale: Vec3::splat(2.0),
            ..TextMarker::new("hi", Pose::from_position(Vec3::new(1.0, 2.0, 3.0)))
        };
        let (_, instances) = draw_with(TextOptions::default(), &[marker.into()]);
        assert!(instances.iter().all(|i| i.pose.flag == 1.0));
        assert!(instances.iter().all(|i| i.pose.position == [1.0, 2.0, 3.0]));
        assert!(instances.iter().all(|i| i.pose.scale == [2.0, 2.0, 2.0]));
    }

    #[test]
    fn test_missing_text_is_skipped() {
        let (backend, instances) = draw_with(
            TextOptions::default(),
            &[TextMarker::default().into(), label("ok", vec![])],
        );
        assert_eq!(instances.len(), 2);
        assert_eq!(backend.draws().count(), 1);
    }

    #[test]
    fn test_atlas_built_on_first_draw() {
        let mut backend = RecordingBackend::new();
        let glyphs = GlyphCache::new(256).shared();
        let mut command = gl_text(&mut backend, glyphs.clone(), TextOptions::default()).unwrap();
        assert!(glyphs.lock().is_empty());

        command.draw(&mut backend, &[label("a", vec![])]).unwrap();
        assert_eq!(glyphs.lock().len(), 1);

        // Same glyph again: the atlas does not change, so neither does its generation.
        command.draw(&mut backend, &[label("a", vec![])]).unwrap();
        let generations: Vec<_> = backend.draws().map(|d| d.texture).collect();
        assert_eq!(generations[0], generations[1]);
    }

    #[test]
    fn test_resolution_clamped_to_atlas_size() {
        let options = TextOptions {
            resolution: 200_000,
            ..Default::default()
        };
        let mut backend = RecordingBackend::new();
        let glyphs = GlyphCache::new(256).shared();
        let mut command = gl_text(&mut backend, glyphs.clone(), options).unwrap();
        command.draw(&mut backend, &[label("A", vec![])]).unwrap();

        let instances: Vec<TextInstance> = backend.draws().next().unwrap().instances();
        assert_eq!(instances.len(), 1);
        let key = crate::text::AtlasKey {
            font: crate::text::FALLBACK_FONT.to_string(),
            px: 256,
        };
        let cache = glyphs.lock();
        let atlas = cache.atlas(&key).unwrap();
        assert_eq!(atlas.len(), 1);
        assert!(!atlas.is_full());
    }

    #[test]
    fn test_atlas_larger_than_texture_limit() {
        let mut backend = RecordingBackend::with_capabilities(Capabilities {
            max_texture_size: 128,
            ..Default::default()
        });
        let result = gl_text(&mut backend, GlyphCache::new(256).shared(), TextOptions::default());
        assert!(matches!(
            result,
            Err(RenderError::Capability(CapabilityError::TextureSize {
                required: 256,
                limit: 128
            }))
        ));
    }
}
