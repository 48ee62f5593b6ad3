//! Demo scene: the helix of labels and a settings-driven pose marker.

use std::f32::consts::PI;

use glam::Vec3;
use worldview_core::{
    ArrowMarker, AxesMarker, CameraState, Color, Marker, Pose, PoseModelType, PoseSettings, TextMarker,
};

/// Default pose color when the settings carry no override.
const POSE_COLOR: Color = Color {
    r: 124.0 / 255.0,
    g: 107.0 / 255.0,
    b: 1.0,
    a: 1.0,
};

/// `count` labels on a two-turn helix of `radius`, alternating grey and white.
pub fn helix_labels(count: usize, radius: f32) -> Vec<Marker> {
    let grey = Color::rgb(0.5, 0.5, 0.5);
    (0..count)
        .map(|i| {
            let t = i as f32 / count.max(1) as f32;
            let angle = 4.0 * PI * t;
            let position = Vec3::new(radius * angle.sin(), radius * angle.cos(), 20.0 * t);
            let color = if i % 2 == 0 { grey } else { Color::WHITE };
            TextMarker {
                colors: vec![color],
                ..TextMarker::new(i.to_string(), Pose::from_position(position))
            }
            .into()
        })
        .collect()
}

pub fn helix_camera() -> CameraState {
    CameraState {
        target_offset: Vec3::new(2.0, 1.5, 0.0),
        phi: 0.0,
        ..Default::default()
    }
}

/// Marker for a pose drawn with `settings`.
///
/// Arrows start at `tail_point` and end at `tip_point` along the pose's X
/// axis, with the configured shaft and head dimensions. No vehicle models ship with the demo, so the model and outline
/// types draw a coordinate frame instead.
pub fn pose_marker(pose: Pose, settings: &PoseSettings) -> Marker {
    let settings = settings.sanitized();
    match settings.model_type {
        PoseModelType::Arrow => {
            let size = settings.size;
            let tail = Pose::from_position(Vec3::new(size.tail_point, 0.0, 0.0));
            let color = settings.override_color.unwrap_or(POSE_COLOR);
            ArrowMarker {
                pose: pose.compose(&tail),
                scale: Vec3::new(size.length(), size.shaft_width, size.head_width),
                color: Some(color.with_alpha(color.a * settings.alpha())),
                colors: Vec::new(),
                head_length: Some(size.head_length),
            }
            .into()
        }
        PoseModelType::Model | PoseModelType::Outline => {
            tracing::debug!(model = settings.model_type.as_str(), "no model available, drawing axes");
            AxesMarker {
                pose,
                scale: Vec3::ONE,
            }
            .into()
        }
    }
}
