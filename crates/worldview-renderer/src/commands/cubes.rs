//! Solid boxes.

use worldview_core::CubeMarker;

use super::SolidInstance;
use crate::backend::GpuBackend;
use crate::command::{Batch, Command, CommandSpec, Geometry};
use crate::error::RenderError;
use crate::shader::{CUBE_SHADER, ShaderProgram};
use crate::vertex::{PositionNormalVertex, unit_cube};

pub fn cubes(backend: &mut dyn GpuBackend) -> Result<Command<CubeMarker>, RenderError> {
    Command::new("cubes", backend, |_caps| {
        Ok(CommandSpec {
            shader: ShaderProgram::assemble("cubes", CUBE_SHADER)?,
            topology: wgpu::PrimitiveTopology::TriangleList,
            geometry: Geometry::new(PositionNormalVertex::layout(), &unit_cube()),
            instance_layout: SolidInstance::layout(),
            textured: false,
            depth_write: true,
            attributes: Box::new(|markers: &[&CubeMarker], batch: &mut Batch| {
                for marker in markers {
                    batch.push(SolidInstance::from_marker(*marker));
                }
            }),
            count: Box::new(|markers: &[&CubeMarker]| markers.len() as u32),
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::RecordingBackend;
    use glam::{Quat, Vec3};
    use worldview_core::{Color, Marker, Pose};

    #[test]
    fn test_cube_instances() {
        let mut backend = RecordingBackend::new();
        let mut command = cubes(&mut backend).unwrap();

        let rotated = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_z(1.0)).unwrap();
        let markers: Vec<Marker> = vec![
            CubeMarker {
                pose: rotated,
                scale: Vec3::new(2.0, 3.0, 4.0),
                color: Some(Color::RED),
                colors: vec![],
            }
            .into(),
            CubeMarker {
                colors: vec![Color::BLUE, Color::GREEN],
                ..Default::default()
            }
            .into(),
        ];
        let stats = command.draw(&mut backend, &markers).unwrap();
        assert_eq!(stats.instances, 2);

        let draw = backend.draws().next().unwrap();
        assert_eq!(draw.vertex_count, 36);
        let instances: Vec<SolidInstance> = draw.instances();
        assert_eq!(instances[0].pose.position, [1.0, 2.0, 3.0]);
        assert_eq!(instances[0].pose.scale, [2.0, 3.0, 4.0]);
        assert_eq!(instances[0].pose.orientation, rotated.orientation().to_array());
        assert_eq!(instances[0].color, Color::RED.to_array());
        // First per-vertex color wins over the fallback.
        assert_eq!(instances[1].color, Color::BLUE.to_array());
    }
}
