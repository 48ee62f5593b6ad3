//! Arrows along each marker's +X axis.

use bytemuck::{Pod, Zeroable};
use worldview_core::{ArrowMarker, primary_color};

use crate::backend::GpuBackend;
use crate::command::{Batch, Command, CommandSpec, Geometry};
use crate::error::RenderError;
use crate::shader::{ARROW_SHADER, ShaderProgram};
use crate::vertex::{ArrowVertex, PoseInstance, VertexLayout, unit_arrow};

/// Radial segments of the shaft and head.
pub const ARROW_SEGMENTS: u32 = 16;

/// One arrow (80 bytes).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct ArrowInstance {
    pub pose: PoseInstance,
    pub color: [f32; 4],
    pub head_length: f32,
    pub _pad: [f32; 3],
}

impl ArrowInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 5] = wgpu::vertex_attr_array![
        2 => Float32x4,
        3 => Float32x4,
        4 => Float32x4,
        5 => Float32x4,
        6 => Float32x4,
    ];

    pub fn layout() -> VertexLayout {
        VertexLayout {
            stride: std::mem::size_of::<Self>() as u64,
            attributes: &Self::ATTRIBUTES,
        }
    }

    pub fn from_marker(marker: &ArrowMarker) -> Self {
        Self {
            pose: PoseInstance::new(&marker.pose, marker.scale),
            color: primary_color(marker).to_array(),
            head_length: marker.effective_head_length(),
            _pad: [0.0; 3],
        }
    }
}

/// Arrow markers. The shader reads `scale` as (length, shaft diameter,
/// head diameter) rather than a plain per-axis scale.
pub fn arrows(backend: &mut dyn GpuBackend) -> Result<Command<ArrowMarker>, RenderError> {
    Command::new("arrows", backend, |_caps| {
        Ok(CommandSpec {
            shader: ShaderProgram::assemble("arrows", ARROW_SHADER)?,
            topology: wgpu::PrimitiveTopology::TriangleList,
            geometry: Geometry::new(ArrowVertex::layout(), &unit_arrow(ARROW_SEGMENTS)),
            instance_layout: ArrowInstance::layout(),
            textured: false,
            depth_write: true,
            attributes: Box::new(|markers: &[&ArrowMarker], batch: &mut Batch| {
                for marker in markers {
                    batch.push(ArrowInstance::from_marker(marker));
                }
            }),
            count: Box::new(|markers: &[&ArrowMarker]| markers.len() as u32),
        })
    })
}
