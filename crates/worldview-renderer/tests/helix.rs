//! End-to-end: a helix of 5000 text labels plus a coordinate frame.

use std::f32::consts::PI;

use glam::Vec3;
use worldview_core::{AxesMarker, CameraState, Color, Marker, MarkerKind, Pose, TextMarker};
use worldview_renderer::backend::RecordedEvent;
use worldview_renderer::commands::TextInstance;
use worldview_renderer::{Layer, RecordingBackend, RendererConfig, Worldview};

const COUNT: usize = 5000;
const RADIUS: f32 = 20.0;

fn helix() -> Vec<Marker> {
    (0..COUNT)
        .map(|i| {
            let t = i as f32 / COUNT as f32;
            let angle = 4.0 * PI * t;
            let position = Vec3::new(RADIUS * angle.sin(), RADIUS * angle.cos(), 20.0 * t);
            let colors = if i % 2 == 0 {
                vec![Color::WHITE]
            } else {
                vec![Color::rgb(0.3, 0.3, 0.3)]
            };
            TextMarker {
                colors,
                ..TextMarker::new(i.to_string(), Pose::from_position(position))
            }
            .into()
        })
        .collect()
}

fn auto_background_config() -> RendererConfig {
    let mut config = RendererConfig::default();
    config.text.auto_background_color = true;
    config
}

#[test]
fn helix_renders_with_one_draw_per_command() {
    let mut worldview = Worldview::new(RecordingBackend::new(), auto_background_config());
    let text = worldview.mount(MarkerKind::Text).unwrap();
    let axes = worldview.mount(MarkerKind::Axes).unwrap();
    worldview.resize(1280, 720);

    let labels = helix();
    let frames: Vec<Marker> = vec![AxesMarker::default().into()];
    let camera = CameraState {
        target_offset: Vec3::new(2.0, 1.5, 0.0),
        phi: 0.0,
        ..Default::default()
    };

    let report = worldview
        .render_frame(&camera, &[Layer::new(text, &labels), Layer::new(axes, &frames)])
        .unwrap();

    assert_eq!(report.draw_calls, 2);
    assert_eq!(report.skipped_markers(), 0);

    let draws: Vec<_> = worldview.backend().draws().collect();
    assert_eq!(draws.len(), 2);

    let expected_glyphs: usize = (0..COUNT).map(|i| i.to_string().len()).sum();
    assert_eq!(draws[0].command, "gl_text");
    assert_eq!(draws[0].instance_count as usize, expected_glyphs);
    assert_eq!(draws[1].command, "axes");
    assert_eq!(draws[1].instance_count, 1);

    // Label i's first glyph sits at label i's pose; input order is kept.
    let instances: Vec<TextInstance> = draws[0].instances();
    for (i, marker) in labels.iter().enumerate().step_by(997) {
        let first_glyph: usize = (0..i).map(|j| j.to_string().len()).sum();
        assert_eq!(
            instances[first_glyph].pose.position,
            marker.pose().position().to_array()
        );
    }

    // Auto background: white labels get black cells, grey labels white ones.
    assert_eq!(instances[0].background, Color::BLACK.to_array());
    assert_eq!(instances[1].background, Color::WHITE.to_array());
}

#[test]
fn helix_glyphs_are_rasterized_once() {
    let mut worldview = Worldview::new(RecordingBackend::new(), auto_background_config());
    let text = worldview.mount(MarkerKind::Text).unwrap();
    let labels = helix();

    for _ in 0..3 {
        worldview
            .render_frame(&CameraState::default(), &[Layer::new(text, &labels)])
            .unwrap();
    }

    let cache = worldview.glyph_cache().lock();
    assert_eq!(cache.len(), 1);

    // Ten digits, uploaded once: the texture generation never moves after
    // the first frame.
    let generations: Vec<_> = worldview
        .backend()
        .events()
        .iter()
        .filter_map(|e| match e {
            RecordedEvent::Draw(draw) => draw.texture,
            _ => None,
        })
        .collect();
    assert_eq!(generations.len(), 3);
    assert!(generations.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(generations[0].1, 10);
}
