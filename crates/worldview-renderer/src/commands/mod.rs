//! Built-in draw commands, one per marker kind.

mod arrows;
mod axes;
mod cubes;
mod gl_text;
mod points;

pub use arrows::{ARROW_SEGMENTS, ArrowInstance, arrows};
pub use axes::axes;
pub use cubes::cubes;
pub use gl_text::{TextInstance, TextOptions, gl_text};
pub use points::{PointInstance, points};

use bytemuck::{Pod, Zeroable};
use worldview_core::{HasColors, HasPose, HasScale, MarkerKind, primary_color};

use crate::backend::GpuBackend;
use crate::command::DrawCommand;
use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::text::SharedGlyphCache;
use crate::vertex::{PoseInstance, VertexLayout};

/// Pose and a single color (64 bytes), used by cubes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SolidInstance {
    pub pose: PoseInstance,
    pub color: [f32; 4],
}

impl SolidInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 4] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
    ];

    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: &Self::ATTRIBUTES,
        }
    }

    pub fn from_marker<M: HasPose + HasScale + HasColors>(marker: &M) -> Self {
        Self {
            pose: PoseInstance::new(marker.pose(), marker.scale()),
            color: primary_color(marker).to_array(),
        }
    }
}

/// Creates the built-in command for `kind`.
pub fn builtin(
    kind: MarkerKind,
    backend: &mut dyn GpuBackend,
    glyphs: &SharedGlyphCache,
    config: &RendererConfig,
) -> Result<Box<dyn DrawCommand>, RenderError> {
    Ok(match kind {
        MarkerKind::Points => Box::new(points(backend)?),
        MarkerKind::Cube => Box::new(cubes(backend)?),
        MarkerKind::Arrow => Box::new(arrows(backend)?),
        MarkerKind::Axes => Box::new(axes(backend)?),
        MarkerKind::Text => Box::new(gl_text(backend, glyphs.clone(), TextOptions::from(&config.text))?),
    })
}
