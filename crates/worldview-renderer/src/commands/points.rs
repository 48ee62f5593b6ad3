//! Point clouds, drawn as screen-space squares.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;
use worldview_core::{PointsMarker, build_point_attributes};

use crate::backend::GpuBackend;
use crate::command::{Batch, Command, CommandSpec, Geometry};
use crate::error::RenderError;
use crate::shader::{POINTS_SHADER, ShaderProgram, clamp_point_size};
use crate::vertex::{PoseInstance, QuadVertex, VertexLayout, unit_quad};

/// One point (80 bytes). The marker pose rides along on every point so a
/// whole list of markers is a single draw.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct PointInstance {
    pub pose: PoseInstance,
    pub point: [f32; 3],
    /// Clamped size in pixels.
    pub size: f32,
    pub color: [f32; 4],
}

impl PointInstance {
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
}

pub fn points(backend: &mut dyn GpuBackend) -> Result<Command<PointsMarker>, RenderError> {
    Command::new("points", backend, |caps| {
        let [min_size, max_size] = caps.require_point_size_range()?;

        Ok(CommandSpec {
            shader: ShaderProgram::assemble("points", POINTS_SHADER)?,
            topology: wgpu::PrimitiveTopology::TriangleList,
            geometry: Geometry::new(QuadVertex::layout(), &unit_quad()),
            instance_layout: PointInstance::layout(),
            textured: false,
            depth_write: false,
            attributes: Box::new(move |markers: &[&PointsMarker], batch: &mut Batch| {
                let attributes = build_point_attributes(markers.iter().copied());
                for (marker, range) in markers.iter().zip(&attributes.marker_ranges) {
                    let pose = PoseInstance::new(&marker.pose, Vec3::ONE);
                    let size = clamp_point_size(marker.scale.x, min_size, max_size);
                    for i in range.clone() {
                        batch.push(PointInstance {
                            pose,
                            point: attributes.positions[i].to_array(),
                            size,
                            color: attributes.colors[i].to_array(),
                        });
                    }
                }
            }),
            count: Box::new(|markers: &[&PointsMarker]| {
                markers.iter().map(|m| m.points.len() as u32).sum()
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
    use worldview_core::{Color, Marker, Pose};

    fn cloud(x: f32, size: f32, colors: Vec<Color>, n: usize) -> Marker {
        PointsMarker {
            pose: Pose::from_position(Vec3::new(x, 0.0, 0.0)),
            scale: Vec3::new(size, size, size),
            colors,
            points: (0..n).map(|i| Vec3::new(0.0, i as f32, 0.0)).collect(),
            ..Default::default()
        }
        .into()
    }

    fn draw(backend: &mut RecordingBackend, markers: &[Marker]) -> Vec<PointInstance> {
        let mut command = points(backend).unwrap();
        command.draw(backend, markers).unwrap();
        backend.draws().last().map(|d| d.instances()).unwrap_or_default()
    }

    #[test]
    fn test_one_instance_per_point_in_order() {
        let mut backend = RecordingBackend::new();
        let instances = draw(
            &mut backend,
            &[
                cloud(1.0, 4.0, vec![Color::RED], 2),
                cloud(2.0, 4.0, vec![Color::GREEN, Color::BLUE], 3),
            ],
        );
        assert_eq!(instances.len(), 5);
        assert_eq!(backend.draws().count(), 1);

        assert_eq!(instances[0].pose.position[0], 1.0);
        assert_eq!(instances[2].pose.position[0], 2.0);
        assert_eq!(instances[1].point, [0.0, 1.0, 0.0]);
        // Last supplied color repeats.
        assert_eq!(instances[2].color, Color::GREEN.to_array());
        assert_eq!(instances[3].color, Color::BLUE.to_array());
        assert_eq!(instances[4].color, Color::BLUE.to_array());
    }

    #[test]
    fn test_point_size_is_clamped() {
        let mut backend = RecordingBackend::with_capabilities(Capabilities {
            point_size_range: Some([2.0, 8.0]),
            ..Default::default()
        });
        let instances = draw(
            &mut backend,
            &[
                cloud(0.0, 4.0, vec![], 1),
                cloud(0.0, 100.0, vec![], 1),
                cloud(0.0, 0.0, vec![], 1),
                cloud(0.0, -5.0, vec![], 1),
            ],
        );
        let sizes: Vec<f32> = instances.iter().map(|i| i.size).collect();
        assert_eq!(sizes, vec![4.0, 8.0, 2.0, 2.0]);
    }

    #[test]
    fn test_degenerate_range_uses_min() {
        let mut backend = RecordingBackend::with_capabilities(Capabilities {
            point_size_range: Some([6.0, 3.0]),
            ..Default::default()
        });
        let instances = draw(&mut backend, &[cloud(0.0, 4.0, vec![], 1)]);
        assert_eq!(instances[0].size, 6.0);
    }

    #[test]
    fn test_nan_limit_from_config_does_not_panic() {
        let config = crate::config::RendererConfig::from_ron_str("(point_size_limits: (NaN, 64.0))").unwrap();
        let limits = wgpu::Limits::downlevel_webgl2_defaults();
        let mut backend =
            RecordingBackend::with_capabilities(Capabilities::from_wgpu_limits(&limits, config.point_size_limits));
        let instances = draw(&mut backend, &[cloud(0.0, 4.0, vec![], 1), cloud(0.0, 0.0, vec![], 1)]);
        let sizes: Vec<f32> = instances.iter().map(|i| i.size).collect();
        assert_eq!(sizes, vec![4.0, 1.0]);
    }

    #[test]
    fn test_missing_point_size_range() {
        let mut backend = RecordingBackend::with_capabilities(Capabilities {
            point_size_range: None,
            ..Default::default()
        });
        assert!(matches!(
            points(&mut backend),
            Err(RenderError::Capability(CapabilityError::PointSizeRange))
        ));
    }

    #[test]
    fn test_empty_clouds_draw_nothing() {
        let mut backend = RecordingBackend::new();
        let instances = draw(&mut backend, &[cloud(0.0, 4.0, vec![], 0)]);
        assert!(instances.is_empty());
        assert_eq!(backend.draws().count(), 0);
    }
}
