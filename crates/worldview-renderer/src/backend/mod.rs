//! GPU backend seam.
//!
//! Commands never talk to wgpu directly. They compile programs and submit
//! draw calls through [`GpuBackend`], which the wgpu implementation replays
//! into a render pass and the recording implementation logs for tests.

mod gpu;
mod recording;

pub use gpu::{WgpuBackend, create_depth_texture};
pub use recording::{RecordedDraw, RecordedEvent, RecordedProgram, RecordingBackend};

use std::sync::Arc;

use worldview_core::Color;

use crate::camera::CameraUniform;
use crate::capabilities::Capabilities;
use crate::error::RenderError;
use crate::vertex::VertexLayout;

/// Handle of a compiled program, valid for the backend that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramId(pub(crate) usize);

impl ProgramId {
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Stores `value` in the first free slot, growing `slots` only when full.
pub(crate) fn insert_slot<T>(slots: &mut Vec<Option<T>>, value: T) -> ProgramId {
    match slots.iter().position(Option::is_none) {
        Some(index) => {
            slots[index] = Some(value);
            ProgramId(index)
        }
        None => {
            slots.push(Some(value));
            ProgramId(slots.len() - 1)
        }
    }
}

/// Everything needed to build one render pipeline.
#[derive(Debug, Clone)]
pub struct ProgramDescriptor<'a> {
    pub label: &'a str,
    /// Assembled WGSL with `vs_main` and `fs_main` entry points.
    pub source: &'a str,
    pub topology: wgpu::PrimitiveTopology,
    pub vertex_layout: VertexLayout,
    /// Static per-vertex geometry, uploaded once.
    pub vertices: &'a [u8],
    pub vertex_count: u32,
    pub instance_layout: VertexLayout,
    /// Binds an R8 texture and sampler at group 1.
    pub textured: bool,
    pub depth_write: bool,
}

/// Single-channel (R8) image sampled by textured programs.
///
/// `generation` changes whenever the pixels do; backends re-upload on change
/// and otherwise reuse the texture cached under `key`.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureSource {
    pub key: u64,
    pub generation: u64,
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<[u8]>,
}

/// One instanced draw of a compiled program.
#[derive(Debug, Clone, Copy)]
pub struct DrawCall<'a> {
    /// Name of the submitting command, for diagnostics.
    pub command: &'a str,
    pub program: ProgramId,
    pub vertex_count: u32,
    pub instance_count: u32,
    /// Tightly packed instance data, `instance_count * stride` bytes.
    pub instances: &'a [u8],
    pub texture: Option<&'a TextureSource>,
}

/// A rendering context.
///
/// Frames are bracketed by [`GpuBackend::begin_frame`] and
/// [`GpuBackend::end_frame`]; draws are executed in submission order.
pub trait GpuBackend: Send {
    fn capabilities(&self) -> &Capabilities;

    fn create_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<ProgramId, RenderError>;

    /// Frees a program. Its id may be handed out again by a later
    /// [`GpuBackend::create_program`]; unknown ids are ignored.
    fn destroy_program(&mut self, program: ProgramId);

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError>;

    fn begin_frame(&mut self, camera: &CameraUniform) -> Result<(), RenderError>;

    fn clear(&mut self, color: Color) -> Result<(), RenderError>;

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), RenderError>;

    fn end_frame(&mut self) -> Result<(), RenderError>;

    /// Drops every GPU resource; programs must be recreated afterwards.
    fn release(&mut self) {}
}
