//! Coordinate frames: red X, green Y, blue Z line segments.

use worldview_core::AxesMarker;

use crate::backend::GpuBackend;
use crate::command::{Batch, Command, CommandSpec, Geometry};
use crate::error::RenderError;
use crate::shader::{AXES_SHADER, ShaderProgram};
use crate::vertex::{PoseInstance, PositionColorVertex, VertexLayout, axis_lines};

const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
    wgpu::vertex_attr_array![2 => Float32x4, 3 => Float32x4, 4 => Float32x4];

pub fn axes(backend: &mut dyn GpuBackend) -> Result<Command<AxesMarker>, RenderError> {
    Command::new("axes", backend, |_caps| {
        Ok(CommandSpec {
            shader: ShaderProgram::assemble("axes", AXES_SHADER)?,
            topology: wgpu::PrimitiveTopology::LineList,
            geometry: Geometry::new(PositionColorVertex::layout(), &axis_lines()),
            instance_layout: VertexLayout {
                stride: std::mem::size_of::<PoseInstance>() as u64,
                attributes: &ATTRIBUTES,
            },
            textured: false,
            depth_write: true,
            attributes: Box::new(|markers: &[&AxesMarker], batch: &mut Batch| {
                for marker in markers {
                    batch.push(PoseInstance::new(&marker.pose, marker.scale));
                }
            }),
            count: Box::new(|markers: &[&AxesMarker]| markers.len() as u32),
        })
    })
}
