//! Worldview demo: renders the helix of text labels headless through wgpu.
//!
//! Usage: `worldview-demo [renderer.ron] [pose-settings.json]`. The renderer
//! config may also be given through `WORLDVIEW_CONFIG`.

mod scene;

use std::path::PathBuf;
use std::time::Instant;

use worldview_core::{Marker, MarkerKind, Pose, PoseSettings};
use worldview_renderer::{Layer, RendererConfig, WgpuBackend, Worldview};

const LABEL_COUNT: usize = 5000;
const HELIX_RADIUS: f32 = 20.0;
const FRAMES: usize = 3;

fn load_pose_settings(path: Option<PathBuf>) -> PoseSettings {
    let Some(path) = path else {
        return PoseSettings::default();
    };
    let parsed = std::fs::read_to_string(&path)
        .map_err(|e| e.to_string())
        .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));
    match parsed {
        Ok(settings) => {
            tracing::info!("Loaded pose settings from {:?}", path);
            settings
        }
        Err(e) => {
            tracing::warn!("Failed to load pose settings {:?}: {}", path, e);
            PoseSettings::default()
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "worldview_demo=debug,worldview_renderer=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting worldview demo");

    let mut args = std::env::args().skip(1);
    let config_path = args
        .next()
        .map(PathBuf::from)
        .or_else(|| std::env::var_os("WORLDVIEW_CONFIG").map(PathBuf::from));
    let settings = load_pose_settings(args.next().map(PathBuf::from));

    let (mut config, camera) = match &config_path {
        Some(path) => {
            let config = RendererConfig::load_or_default(path);
            let camera = config.camera;
            (config, camera)
        }
        None => (RendererConfig::default(), scene::helix_camera()),
    };
    config.text.auto_background_color = true;

    let backend = pollster::block_on(WgpuBackend::headless(
        wgpu::TextureFormat::Rgba8UnormSrgb,
        &config,
    ))?;
    let mut worldview = Worldview::new(backend, config);
    worldview.resize(1280, 720);

    let text = worldview.mount(MarkerKind::Text)?;
    let axes = worldview.mount(MarkerKind::Axes)?;
    let arrows = worldview.mount(MarkerKind::Arrow)?;

    let labels = scene::helix_labels(LABEL_COUNT, HELIX_RADIUS);
    let mut frames: Vec<Marker> = vec![worldview_core::AxesMarker::default().into()];
    let mut poses: Vec<Marker> = Vec::new();
    let pose = Pose::from_xyz_rpy([0.0, 0.0, 25.0], [0.0, 0.0, std::f32::consts::FRAC_PI_4]);
    match scene::pose_marker(pose, &settings) {
        marker if marker.kind() == MarkerKind::Arrow => poses.push(marker),
        marker => frames.push(marker),
    }

    for frame in 0..FRAMES {
        let start = Instant::now();
        let report = worldview.render_frame(
            &camera,
            &[
                Layer::new(text, &labels),
                Layer::new(axes, &frames),
                Layer::new(arrows, &poses),
            ],
        )?;
        tracing::info!(
            frame,
            draw_calls = report.draw_calls,
            skipped = report.skipped_markers(),
            elapsed_ms = start.elapsed().as_secs_f64() * 1000.0,
            "rendered frame"
        );
        for command in &report.commands {
            tracing::debug!(
                command = %command.name,
                instances = command.stats.instances,
                submitted = command.stats.submitted,
                "command stats"
            );
        }
    }

    let _ = worldview.backend().device().poll(wgpu::Maintain::Wait);
    worldview.teardown();
    tracing::info!("Done");
    Ok(())
}
