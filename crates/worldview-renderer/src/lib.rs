//! Worldview Renderer
//!
//! Batched GPU draw commands for worldview markers.
//!
//! # Architecture
//!
//! - [`backend::GpuBackend`] - seam between commands and the GPU API
//!   ([`backend::WgpuBackend`] for wgpu, [`backend::RecordingBackend`] for tests)
//! - [`capabilities::Capabilities`] - limits queried once at command creation
//! - [`shader::ShaderProgram`] - WGSL bodies assembled from shared fragments
//! - [`command::Command`] - reusable draw command built from a [`command::CommandSpec`]
//! - [`commands`] - built-in points, cubes, arrows, axes and text commands
//! - [`text::GlyphCache`] - lazily built glyph atlases shared by text commands
//! - [`worldview::Worldview`] - mounts commands and renders frames
//!
//! # Example
//!
//! ```ignore
//! use worldview_core::{CameraState, MarkerKind};
//! use worldview_renderer::{Layer, RendererConfig, Worldview};
//!
//! let mut worldview = Worldview::new(backend, RendererConfig::default());
//! let text = worldview.mount(MarkerKind::Text)?;
//! let axes = worldview.mount(MarkerKind::Axes)?;
//!
//! worldview.resize(1280, 720);
//! worldview.render_frame(
//!     &CameraState::default(),
//!     &[Layer::new(text, &labels), Layer::new(axes, &frames)],
//! )?;
//! ```

pub mod backend;
pub mod camera;
pub mod capabilities;
pub mod command;
pub mod commands;
pub mod config;
pub mod error;
pub mod shader;
pub mod text;
pub mod vertex;
pub mod worldview;

pub use backend::{GpuBackend, ProgramId, RecordingBackend, WgpuBackend};
pub use camera::CameraUniform;
pub use capabilities::Capabilities;
pub use command::{Command, CommandSpec, DrawCommand, DrawStats};
pub use config::{ConfigError, RendererConfig, TextConfig};
pub use error::{CapabilityError, FontError, RenderError, ShaderError};
pub use text::{GlyphCache, GlyphEntry, SharedGlyphCache};
pub use worldview::{CommandId, CommandReport, FramePhase, FrameReport, Layer, MountContext, Worldview};
