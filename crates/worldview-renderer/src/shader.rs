//! WGSL program assembly.
//!
//! Snippets shared by every command (the camera uniform and the pose
//! transform) are authored once under `shaders/` and pulled into command
//! bodies with `#include <name>` lines.

use std::collections::HashSet;

use crate::capabilities::sanitize_point_size_range;
use crate::error::ShaderError;

const CAMERA_FRAGMENT: &str = include_str!("shaders/camera.wgsl");
const POSE_FRAGMENT: &str = include_str!("shaders/pose.wgsl");

pub const POINTS_SHADER: &str = include_str!("shaders/points.wgsl");
pub const CUBE_SHADER: &str = include_str!("shaders/cube.wgsl");
pub const ARROW_SHADER: &str = include_str!("shaders/arrow.wgsl");
pub const AXES_SHADER: &str = include_str!("shaders/axes.wgsl");
pub const TEXT_SHADER: &str = include_str!("shaders/text.wgsl");

const INCLUDE_DIRECTIVE: &str = "#include";

/// Looks up a shared fragment by name.
pub fn fragment(name: &str) -> Option<&'static str> {
    match name {
        "camera" => Some(CAMERA_FRAGMENT),
        "pose" => Some(POSE_FRAGMENT),
        _ => None,
    }
}

/// A fully assembled WGSL module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderProgram {
    label: String,
    source: String,
}

impl ShaderProgram {
    /// Expands every `#include <name>` line of `body`.
    ///
    /// Each fragment may be included at most once; WGSL has no include
    /// guards, so a second copy would redeclare its items.
    pub fn assemble(label: impl Into<String>, body: &str) -> Result<Self, ShaderError> {
        let mut included = HashSet::new();
        let mut source = String::with_capacity(body.len() + CAMERA_FRAGMENT.len() + POSE_FRAGMENT.len());

        for line in body.lines() {
            let trimmed = line.trim();
            let Some(rest) = trimmed.strip_prefix(INCLUDE_DIRECTIVE) else {
                source.push_str(line);
                source.push('\n');
                continue;
            };

            let name = rest
                .trim()
                .strip_prefix('<')
                .and_then(|r| r.strip_suffix('>'))
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .ok_or_else(|| ShaderError::MalformedInclude(trimmed.to_string()))?;

            let text = fragment(name).ok_or_else(|| ShaderError::UnknownFragment(name.to_string()))?;
            if !included.insert(name) {
                return Err(ShaderError::DuplicateFragment(name.to_string()));
            }
            source.push_str(text);
            if !text.ends_with('\n') {
                source.push('\n');
            }
        }

        Ok(Self {
            label: label.into(),
            source,
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

/// Clamps a requested point size into the range reported by the context.
///
/// Zero, negative and non-finite requests give `min`. If the reported range
/// is degenerate (`min > max`), `min` wins. Non-finite bounds fall back to
/// [`DEFAULT_POINT_SIZE_RANGE`](crate::capabilities::DEFAULT_POINT_SIZE_RANGE).
pub fn clamp_point_size(requested: f32, min: f32, max: f32) -> f32 {
    let [min, max] = sanitize_point_size_range([min, max]);
    if !requested.is_finite() || requested <= 0.0 {
        return min;
    }
    if min > max {
        return min;
    }
    requested.clamp(min, max)
}
