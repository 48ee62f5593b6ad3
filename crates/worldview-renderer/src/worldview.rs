//! Frame dispatcher.
//!
//! [`Worldview`] owns the backend, the mounted commands and the glyph cache.
//! Each [`Worldview::render_frame`] walks
//! `Idle -> Resizing (if needed) -> Clearing -> Drawing(i)... -> Idle`,
//! invoking the mounted commands in mount order.

use std::fmt;

use uuid::Uuid;
use worldview_core::{CameraState, Marker, MarkerKind};

use crate::backend::GpuBackend;
use crate::camera::CameraUniform;
use crate::command::{DrawCommand, DrawStats};
use crate::commands;
use crate::config::RendererConfig;
use crate::error::RenderError;
use crate::text::{FontdueRasterizer, GlyphCache, SharedGlyphCache};

/// Handle of a mounted command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(Uuid);

impl CommandId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Markers for one mounted command in one frame.
#[derive(Debug, Clone, Copy)]
pub struct Layer<'a> {
    pub command: CommandId,
    pub markers: &'a [Marker],
}

impl<'a> Layer<'a> {
    pub fn new(command: CommandId, markers: &'a [Marker]) -> Self {
        Self { command, markers }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FramePhase {
    #[default]
    Idle,
    Resizing,
    Clearing,
    /// Invoking the mounted command at this index.
    Drawing(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub id: CommandId,
    pub name: String,
    pub stats: DrawStats,
}

/// What one frame drew.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameReport {
    pub draw_calls: usize,
    pub commands: Vec<CommandReport>,
}

impl FrameReport {
    pub fn skipped_markers(&self) -> usize {
        self.commands.iter().map(|c| c.stats.skipped).sum()
    }
}

/// What a command factory gets to build with.
pub struct MountContext<'a> {
    pub backend: &'a mut dyn GpuBackend,
    pub glyphs: &'a SharedGlyphCache,
    pub config: &'a RendererConfig,
}

struct MountedCommand {
    id: CommandId,
    command: Box<dyn DrawCommand>,
}

pub struct Worldview<B: GpuBackend> {
    backend: B,
    config: RendererConfig,
    glyphs: SharedGlyphCache,
    commands: Vec<MountedCommand>,
    size: (u32, u32),
    applied_size: Option<(u32, u32)>,
    phase: FramePhase,
}

impl<B: GpuBackend> Worldview<B> {
    /// Creates a dispatcher. The configured font is loaded here; if it
    /// cannot be read, labels fall back to the built-in font.
    pub fn new(backend: B, config: RendererConfig) -> Self {
        let mut glyphs = GlyphCache::new(config.text.atlas_size);
        if let Some(path) = &config.text.font_path {
            match FontdueRasterizer::from_file(path) {
                Ok(font) => glyphs.register_font(config.text.font_name.clone(), Box::new(font)),
                Err(e) => tracing::warn!("Failed to load font {:?}: {}", path, e),
            }
        }

        Self {
            backend,
            config,
            glyphs: glyphs.shared(),
            commands: Vec::new(),
            size: (1, 1),
            applied_size: None,
            phase: FramePhase::Idle,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn glyph_cache(&self) -> &SharedGlyphCache {
        &self.glyphs
    }

    pub fn phase(&self) -> FramePhase {
        self.phase
    }

    pub fn size(&self) -> (u32, u32) {
        self.size
    }

    /// Number of mounted commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Mounts the built-in command for `kind`.
    pub fn mount(&mut self, kind: MarkerKind) -> Result<CommandId, RenderError> {
        self.mount_with(|ctx| commands::builtin(kind, ctx.backend, ctx.glyphs, ctx.config))
    }

    /// Mounts a command built by `factory`. Commands draw in mount order.
    pub fn mount_with<F>(&mut self, factory: F) -> Result<CommandId, RenderError>
    where
        F: FnOnce(&mut MountContext<'_>) -> Result<Box<dyn DrawCommand>, RenderError>,
    {
        let command = factory(&mut MountContext {
            backend: &mut self.backend,
            glyphs: &self.glyphs,
            config: &self.config,
        })?;
        let id = CommandId::new();
        tracing::debug!(command = command.name(), %id, "mounted command");
        self.commands.push(MountedCommand { id, command });
        Ok(id)
    }

    /// Unmounts a command. Returns false if `id` is not mounted.
    pub fn unmount(&mut self, id: CommandId) -> bool {
        let Some(index) = self.commands.iter().position(|c| c.id == id) else {
            return false;
        };
        let mut mounted = self.commands.remove(index);
        mounted.command.destroy(&mut self.backend);
        tracing::debug!(command = mounted.command.name(), %id, "unmounted command");
        true
    }

    /// Sets the surface size; applied at the start of the next frame.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.size = (width.max(1), height.max(1));
    }

    /// Renders one frame.
    ///
    /// Each mounted command receives the markers of the first layer naming
    /// it, or an empty slice. A lost surface abandons the frame: the error is
    /// returned and nothing drawn so far is rolled back.
    pub fn render_frame(&mut self, camera: &CameraState, layers: &[Layer<'_>]) -> Result<FrameReport, RenderError> {
        let result = self.run_frame(camera, layers);
        self.phase = FramePhase::Idle;
        if let Err(RenderError::SurfaceLost) = &result {
            tracing::warn!("surface lost; frame abandoned");
            self.applied_size = None;
        }
        result
    }

    fn run_frame(&mut self, camera: &CameraState, layers: &[Layer<'_>]) -> Result<FrameReport, RenderError> {
        for layer in layers {
            if !self.commands.iter().any(|c| c.id == layer.command) {
                tracing::warn!(command = %layer.command, "layer names a command that is not mounted");
            }
        }

        if self.applied_size != Some(self.size) {
            self.phase = FramePhase::Resizing;
            let (width, height) = self.size;
            self.backend.resize(width, height)?;
            self.applied_size = Some(self.size);
        }

        self.phase = FramePhase::Clearing;
        let (width, height) = self.size;
        self.backend
            .begin_frame(&CameraUniform::new(camera, width, height))?;
        self.backend.clear(self.config.clear_color)?;

        let mut report = FrameReport::default();
        for (index, mounted) in self.commands.iter_mut().enumerate() {
            self.phase = FramePhase::Drawing(index);
            let markers = layers
                .iter()
                .find(|layer| layer.command == mounted.id)
                .map(|layer| layer.markers)
                .unwrap_or(&[]);

            let stats = mounted.command.draw(&mut self.backend, markers)?;
            if stats.submitted {
                report.draw_calls += 1;
            }
            report.commands.push(CommandReport {
                id: mounted.id,
                name: mounted.command.name().to_string(),
                stats,
            });
        }

        self.backend.end_frame()?;
        Ok(report)
    }

    /// Drops every command and glyph atlas, as after a context loss.
    ///
    /// Commands must be mounted again before the next frame draws anything.
    pub fn teardown(&mut self) {
        self.commands.clear();
        self.glyphs.lock().clear();
        self.backend.release();
        self.applied_size = None;
        self.phase = FramePhase::Idle;
        tracing::info!("worldview torn down");
    }

    /// Consumes the dispatcher, returning the backend.
    pub fn into_backend(mut self) -> B {
        self.teardown();
        self.backend
    }
}
