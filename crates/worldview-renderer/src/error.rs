//! Renderer error types.

use thiserror::Error;

/// The GPU context lacks something a command needs.
///
/// Raised while a command is being created; the command is not created.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CapabilityError {
    #[error("instanced drawing is not supported by this context")]
    Instancing,

    #[error("context does not report a point size range")]
    PointSizeRange,

    #[error("texture of {required}px exceeds the maximum of {limit}px")]
    TextureSize { required: u32, limit: u32 },
}

/// Shader assembly errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShaderError {
    #[error("unknown shader fragment `{0}`")]
    UnknownFragment(String),

    #[error("shader fragment `{0}` is included more than once")]
    DuplicateFragment(String),

    #[error("malformed include directive: {0}")]
    MalformedInclude(String),
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    #[error(transparent)]
    Shader(#[from] ShaderError),

    /// The surface went away mid-frame. The frame is abandoned.
    #[error("rendering surface was lost")]
    SurfaceLost,

    #[error("backend error: {0}")]
    Backend(String),
}

#[derive(Debug, Error)]
pub enum FontError {
    #[error("failed to read font file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid font data: {0}")]
    Parse(String),
}
