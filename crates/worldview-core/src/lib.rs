//! Worldview Core Data Structures
//!
//! This crate contains the GPU-independent half of the worldview renderer:
//! - Pose: position + unit quaternion, composition and vertex transforms
//! - Color: RGBA with the auto-background transform used by text
//! - Marker: tagged marker variants consumed by draw commands
//! - CameraState: orbit camera with derived view/projection matrices
//! - Attribute builders: flatten marker arrays into per-vertex buffers
//! - Settings: sanitized snapshots produced by external settings editors

pub mod attributes;
pub mod camera;
pub mod color;
pub mod error;
pub mod marker;
pub mod pose;
pub mod settings;

pub use attributes::*;
pub use camera::*;
pub use color::*;
pub use error::*;
pub use marker::*;
pub use pose::*;
pub use settings::*;
