//! Reusable draw commands.
//!
//! A [`Command`] is created once from a [`CommandSpec`] and then invoked
//! every frame with the current marker slice. It owns no marker state: all
//! per-frame data flows through the attribute and count closures.

use bytemuck::Pod;
use worldview_core::{Marker, MarkerKind, MarkerType};

use crate::backend::{DrawCall, GpuBackend, ProgramDescriptor, ProgramId, TextureSource};
use crate::capabilities::Capabilities;
use crate::error::RenderError;
use crate::shader::ShaderProgram;
use crate::vertex::VertexLayout;

/// Fills the instance batch for the selected markers.
pub type AttributeFn<M> = Box<dyn FnMut(&[&M], &mut Batch) + Send>;

/// Number of instances the selected markers produce.
pub type CountFn<M> = Box<dyn Fn(&[&M]) -> u32 + Send>;

/// Static per-vertex geometry shared by every instance.
#[derive(Debug, Clone)]
pub struct Geometry {
    pub layout: VertexLayout,
    pub bytes: Vec<u8>,
    pub vertex_count: u32,
}

impl Geometry {
    pub fn new<V: Pod>(layout: VertexLayout, vertices: &[V]) -> Self {
        debug_assert_eq!(std::mem::size_of::<V>() as u64, layout.stride);
        Self {
            layout,
            bytes: bytemuck::cast_slice(vertices).to_vec(),
            vertex_count: vertices.len() as u32,
        }
    }
}

/// Everything a command is built from.
pub struct CommandSpec<M> {
    pub shader: ShaderProgram,
    pub topology: wgpu::PrimitiveTopology,
    pub geometry: Geometry,
    pub instance_layout: VertexLayout,
    pub textured: bool,
    pub depth_write: bool,
    pub attributes: AttributeFn<M>,
    pub count: CountFn<M>,
}

/// Instance data of one draw call.
#[derive(Debug)]
pub struct Batch {
    stride: usize,
    bytes: Vec<u8>,
    texture: Option<TextureSource>,
}

impl Batch {
    pub fn with_capacity(stride: u64, instances: u32) -> Self {
        let stride = stride as usize;
        Self {
            stride,
            bytes: Vec::with_capacity(stride * instances as usize),
            texture: None,
        }
    }

    pub fn push<I: Pod>(&mut self, instance: I) {
        debug_assert_eq!(std::mem::size_of::<I>(), self.stride);
        self.bytes.extend_from_slice(bytemuck::bytes_of(&instance));
    }

    pub fn set_texture(&mut self, texture: TextureSource) {
        self.texture = Some(texture);
    }

    pub fn len(&self) -> u32 {
        if self.stride == 0 {
            0
        } else {
            (self.bytes.len() / self.stride) as u32
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn texture(&self) -> Option<&TextureSource> {
        self.texture.as_ref()
    }
}

/// Outcome of one command invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrawStats {
    /// Markers of this command's kind that passed validation.
    pub markers: usize,
    /// Markers skipped as malformed.
    pub skipped: usize,
    pub instances: u32,
    /// Whether a draw call was submitted.
    pub submitted: bool,
}

/// Object-safe view of a command, as mounted in a
/// [`Worldview`](crate::worldview::Worldview).
pub trait DrawCommand: Send {
    fn name(&self) -> &str;

    fn kind(&self) -> MarkerKind;

    /// Draws `markers` with at most one draw call.
    fn draw(&mut self, backend: &mut dyn GpuBackend, markers: &[Marker]) -> Result<DrawStats, RenderError>;

    /// Frees the command's program. The command must not draw afterwards.
    fn destroy(&mut self, backend: &mut dyn GpuBackend);
}

pub struct Command<M: MarkerType> {
    name: String,
    program: ProgramId,
    vertex_count: u32,
    instance_stride: u64,
    attributes: AttributeFn<M>,
    count: CountFn<M>,
}

impl<M: MarkerType> Command<M> {
    /// Creates a command.
    ///
    /// `spec_fn` runs exactly once, with the backend's capabilities, and may
    /// reject them with a [`CapabilityError`](crate::CapabilityError). The
    /// program is compiled before this returns, so a context that cannot
    /// run the command fails here rather than at draw time.
    pub fn new<F>(name: impl Into<String>, backend: &mut dyn GpuBackend, spec_fn: F) -> Result<Self, RenderError>
    where
        F: FnOnce(&Capabilities) -> Result<CommandSpec<M>, RenderError>,
    {
        let name = name.into();
        let capabilities = backend.capabilities().clone();
        capabilities.require_instancing()?;
        let spec = spec_fn(&capabilities)?;

        let program = backend.create_program(&ProgramDescriptor {
            label: &name,
            source: spec.shader.source(),
            topology: spec.topology,
            vertex_layout: spec.geometry.layout,
            vertices: &spec.geometry.bytes,
            vertex_count: spec.geometry.vertex_count,
            instance_layout: spec.instance_layout,
            textured: spec.textured,
            depth_write: spec.depth_write,
        })?;

        tracing::debug!(command = %name, kind = %M::KIND, "created draw command");

        Ok(Self {
            name,
            program,
            vertex_count: spec.geometry.vertex_count,
            instance_stride: spec.instance_layout.stride,
            attributes: spec.attributes,
            count: spec.count,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn program(&self) -> ProgramId {
        self.program
    }

    /// Selects the valid markers of this command's kind, in input order.
    ///
    /// Everything else is logged and counted as skipped.
    fn select<'m>(&self, markers: &'m [Marker]) -> (Vec<&'m M>, usize) {
        let mut skipped = 0;
        let selected = markers
            .iter()
            .enumerate()
            .filter_map(|(index, marker)| match M::select(marker).and_then(|m| m.validate().map(|_| m)) {
                Ok(m) => Some(m),
                Err(error) => {
                    tracing::warn!(command = %self.name, index, %error, "skipping malformed marker");
                    skipped += 1;
                    None
                }
            })
            .collect();
        (selected, skipped)
    }

    /// Draws every valid marker with one draw call.
    ///
    /// Nothing is submitted when the markers produce no instances.
    pub fn draw(&mut self, backend: &mut dyn GpuBackend, markers: &[Marker]) -> Result<DrawStats, RenderError> {
        let (selected, skipped) = self.select(markers);
        let count = (self.count)(&selected);
        let mut stats = DrawStats {
            markers: selected.len(),
            skipped,
            instances: count,
            submitted: false,
        };
        if count == 0 {
            return Ok(stats);
        }

        let mut batch = Batch::with_capacity(self.instance_stride, count);
        (self.attributes)(&selected, &mut batch);
        if batch.len() != count {
            tracing::warn!(
                command = %self.name,
                expected = count,
                actual = batch.len(),
                "instance count mismatch"
            );
            stats.instances = batch.len();
            if batch.is_empty() {
                return Ok(stats);
            }
        }

        backend.draw(&DrawCall {
            command: &self.name,
            program: self.program,
            vertex_count: self.vertex_count,
            instance_count: batch.len(),
            instances: batch.bytes(),
            texture: batch.texture(),
        })?;
        stats.submitted = true;
        Ok(stats)
    }
}

impl<M: MarkerType> DrawCommand for Command<M> {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> MarkerKind {
        M::KIND
    }

    fn draw(&mut self, backend: &mut dyn GpuBackend, markers: &[Marker]) -> Result<DrawStats, RenderError> {
        Command::draw(self, backend, markers)
    }

    fn destroy(&mut self, backend: &mut dyn GpuBackend) {
        backend.destroy_program(self.program);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use crate::error::CapabilityError;
    use crate::shader::CUBE_SHADER;
    use crate::vertex::{PoseInstance, PositionNormalVertex, unit_cube};
    use glam::Vec3;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use worldview_core::{CubeMarker, Pose, TextMarker};

    const POSE_ONLY: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![2 => Float32x4, 3 => Float32x4, 4 => Float32x4];

    fn cube_spec() -> CommandSpec<CubeMarker> {
        CommandSpec {
            shader: ShaderProgram::assemble("test", CUBE_SHADER).unwrap(),
            topology: wgpu::PrimitiveTopology::TriangleList,
            geometry: Geometry::new(PositionNormalVertex::layout(), &unit_cube()),
            instance_layout: VertexLayout {
                stride: 48,
                attributes: &POSE_ONLY,
            },
            textured: false,
            depth_write: true,
            attributes: Box::new(|markers, batch| {
                for m in markers {
                    batch.push(PoseInstance::new(&m.pose, m.scale));
                }
            }),
            count: Box::new(|markers| markers.len() as u32),
        }
    }

    fn cube_at(x: f32) -> Marker {
        CubeMarker {
            pose: Pose::from_position(Vec3::new(x, 0.0, 0.0)),
            ..Default::default()
        }
        .into()
    }

    #[test]
    fn test_spec_fn_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut backend = RecordingBackend::new();
        let counter = calls.clone();
        let mut command = Command::new("cubes", &mut backend, move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(cube_spec())
        })
        .unwrap();

        for _ in 0..3 {
            command.draw(&mut backend, &[cube_at(0.0)]).unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(backend.programs().len(), 1);
        assert_eq!(backend.draws().count(), 3);
    }

    #[test]
    fn test_capability_error_fails_creation() {
        let mut backend = RecordingBackend::new();
        let result = Command::<CubeMarker>::new("needs-points", &mut backend, |caps| {
            caps.require_texture_size(1 << 20)?;
            Ok(cube_spec())
        });
        assert!(matches!(
            result,
            Err(RenderError::Capability(CapabilityError::TextureSize { .. }))
        ));
        assert!(backend.programs().is_empty());

        let mut backend = RecordingBackend::with_capabilities(Capabilities {
            instancing: false,
            ..Default::default()
        });
        let result = Command::<CubeMarker>::new("cubes", &mut backend, |_| Ok(cube_spec()));
        assert!(matches!(
            result,
            Err(RenderError::Capability(CapabilityError::Instancing))
        ));
    }

    #[test]
    fn test_count_is_reevaluated_each_draw() {
        let mut backend = RecordingBackend::new();
        let mut command = Command::new("cubes", &mut backend, |_| Ok(cube_spec())).unwrap();

        command.draw(&mut backend, &[cube_at(0.0)]).unwrap();
        command
            .draw(&mut backend, &[cube_at(0.0), cube_at(1.0), cube_at(2.0)])
            .unwrap();

        let counts: Vec<u32> = backend.draws().map(|d| d.instance_count).collect();
        assert_eq!(counts, vec![1, 3]);
    }

    #[test]
    fn test_empty_draw_submits_nothing() {
        let mut backend = RecordingBackend::new();
        let mut command = Command::new("cubes", &mut backend, |_| Ok(cube_spec())).unwrap();
        let stats = command.draw(&mut backend, &[]).unwrap();
        assert!(!stats.submitted);
        assert_eq!(backend.draws().count(), 0);
    }

    #[test]
    fn test_destroy_frees_program_slot() {
        let mut backend = RecordingBackend::new();
        let mut first = Command::new("cubes", &mut backend, |_| Ok(cube_spec())).unwrap();
        let first_program = first.program();
        DrawCommand::destroy(&mut first, &mut backend);
        assert!(backend.programs().is_empty());
        assert!(backend.program(first_program).is_none());

        let second = Command::new("cubes", &mut backend, |_| Ok(cube_spec())).unwrap();
        assert_eq!(second.program(), first_program);
        assert_eq!(backend.programs().len(), 1);
    }

    #[test]
    fn test_malformed_markers_are_skipped_in_order() {
        let mut backend = RecordingBackend::new();
        let mut command = Command::new("cubes", &mut backend, |_| Ok(cube_spec())).unwrap();

        let mut bad_scale = CubeMarker::default();
        bad_scale.scale = Vec3::new(f32::NAN, 1.0, 1.0);
        let markers = vec![
            cube_at(1.0),
            bad_scale.into(),
            TextMarker::new("wrong kind", Pose::IDENTITY).into(),
            cube_at(2.0),
        ];

        let stats = command.draw(&mut backend, &markers).unwrap();
        assert_eq!(stats.markers, 2);
        assert_eq!(stats.skipped, 2);

        let draw = backend.draws().next().unwrap();
        let instances: Vec<PoseInstance> = draw.instances();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].position[0], 1.0);
        assert_eq!(instances[1].position[0], 2.0);
    }
}
