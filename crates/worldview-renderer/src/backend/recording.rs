//! In-memory backend that records every call, for GPU-free tests.

use bytemuck::Pod;
use worldview_core::Color;

use super::{DrawCall, GpuBackend, ProgramDescriptor, ProgramId, insert_slot};
use crate::camera::CameraUniform;
use crate::capabilities::Capabilities;
use crate::error::RenderError;

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedProgram {
    pub label: String,
    pub source: String,
    pub topology: wgpu::PrimitiveTopology,
    pub vertex_count: u32,
    pub instance_stride: u64,
    pub textured: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedDraw {
    pub command: String,
    pub program: ProgramId,
    pub vertex_count: u32,
    pub instance_count: u32,
    pub instance_bytes: Vec<u8>,
    /// `(key, generation)` of the bound texture.
    pub texture: Option<(u64, u64)>,
}

impl RecordedDraw {
    /// Decodes the instance data as `I` values.
    pub fn instances<I: Pod>(&self) -> Vec<I> {
        self.instance_bytes
            .chunks_exact(std::mem::size_of::<I>())
            .map(bytemuck::pod_read_unaligned)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Resize { width: u32, height: u32 },
    BeginFrame(CameraUniform),
    Clear(Color),
    Draw(RecordedDraw),
    EndFrame,
}

#[derive(Debug, Default)]
pub struct RecordingBackend {
    capabilities: Capabilities,
    programs: Vec<Option<RecordedProgram>>,
    events: Vec<RecordedEvent>,
    lose_surface_after: Option<usize>,
    draws_in_frame: usize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            ..Default::default()
        }
    }

    /// Makes every frame lose its surface after `draws` successful draws.
    pub fn lose_surface_after(&mut self, draws: Option<usize>) {
        self.lose_surface_after = draws;
    }

    /// Live programs, in slot order.
    pub fn programs(&self) -> Vec<&RecordedProgram> {
        self.programs.iter().flatten().collect()
    }

    pub fn program(&self, id: ProgramId) -> Option<&RecordedProgram> {
        self.programs.get(id.0).and_then(Option::as_ref)
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    pub fn draws(&self) -> impl Iterator<Item = &RecordedDraw> {
        self.events.iter().filter_map(|event| match event {
            RecordedEvent::Draw(draw) => Some(draw),
            _ => None,
        })
    }

    pub fn take_events(&mut self) -> Vec<RecordedEvent> {
        std::mem::take(&mut self.events)
    }
}

impl GpuBackend for RecordingBackend {
    fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    fn create_program(&mut self, desc: &ProgramDescriptor<'_>) -> Result<ProgramId, RenderError> {
        let program = RecordedProgram {
            label: desc.label.to_string(),
            source: desc.source.to_string(),
            topology: desc.topology,
            vertex_count: desc.vertex_count,
            instance_stride: desc.instance_layout.stride,
            textured: desc.textured,
        };
        Ok(insert_slot(&mut self.programs, program))
    }

    fn destroy_program(&mut self, program: ProgramId) {
        if let Some(slot) = self.programs.get_mut(program.0) {
            *slot = None;
        }
    }

    fn resize(&mut self, width: u32, height: u32) -> Result<(), RenderError> {
        self.events.push(RecordedEvent::Resize { width, height });
        Ok(())
    }

    fn begin_frame(&mut self, camera: &CameraUniform) -> Result<(), RenderError> {
        self.draws_in_frame = 0;
        self.events.push(RecordedEvent::BeginFrame(*camera));
        Ok(())
    }

    fn clear(&mut self, color: Color) -> Result<(), RenderError> {
        self.events.push(RecordedEvent::Clear(color));
        Ok(())
    }

    fn draw(&mut self, call: &DrawCall<'_>) -> Result<(), RenderError> {
        if self.lose_surface_after.is_some_and(|n| self.draws_in_frame >= n) {
            return Err(RenderError::SurfaceLost);
        }
        if self.program(call.program).is_none() {
            return Err(RenderError::Backend(format!(
                "unknown program {}",
                call.program.0
            )));
        }
        self.draws_in_frame += 1;
        self.events.push(RecordedEvent::Draw(RecordedDraw {
            command: call.command.to_string(),
            program: call.program,
            vertex_count: call.vertex_count,
            instance_count: call.instance_count,
            instance_bytes: call.instances.to_vec(),
            texture: call.texture.map(|t| (t.key, t.generation)),
        }));
        Ok(())
    }

    fn end_frame(&mut self) -> Result<(), RenderError> {
        self.events.push(RecordedEvent::EndFrame);
        Ok(())
    }

    fn release(&mut self) {
        self.programs.clear();
    }
}
