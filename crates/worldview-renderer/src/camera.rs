//! Camera uniform shared by every command.

use bytemuck::{Pod, Zeroable};
use worldview_core::CameraState;

/// Camera uniform buffer data (144 bytes), bound at group 0.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct CameraUniform {
    /// Projection * view.
    pub view_proj: [[f32; 4]; 4],
    /// View matrix alone; billboards read the camera basis from it.
    pub view: [[f32; 4]; 4],
    /// Width, height, 1 / width, 1 / height in pixels.
    pub viewport: [f32; 4],
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new(&CameraState::default(), 1, 1)
    }
}

impl CameraUniform {
    /// Builds the uniform for a viewport of `width` x `height` pixels.
    ///
    /// The camera state is sanitized first, so invalid input never produces
    /// a singular projection.
    pub fn new(camera: &CameraState, width: u32, height: u32) -> Self {
        let camera = camera.sanitized();
        let width = width.max(1) as f32;
        let height = height.max(1) as f32;
        let aspect = width / height;
        Self {
            view_proj: camera.view_projection(aspect).to_cols_array_2d(),
            view: camera.view_matrix().to_cols_array_2d(),
            viewport: [width, height, 1.0 / width, 1.0 / height],
        }
    }

    pub fn width(&self) -> f32 {
        self.viewport[0]
    }

    pub fn height(&self) -> f32 {
        self.viewport[1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Mat4;

    #[test]
    fn test_uniform_size() {
        assert_eq!(std::mem::size_of::<CameraUniform>(), 144);
    }

    #[test]
    fn test_aspect_follows_viewport() {
        let camera = CameraState::default();
        let uniform = CameraUniform::new(&camera, 1600, 900);
        let expected = camera.view_projection(1600.0 / 900.0);
        assert!(Mat4::from_cols_array_2d(&uniform.view_proj).abs_diff_eq(expected, 1e-5));
        assert_eq!(uniform.viewport, [1600.0, 900.0, 1.0 / 1600.0, 1.0 / 900.0]);
    }

    #[test]
    fn test_zero_sized_viewport_is_clamped() {
        let uniform = CameraUniform::new(&CameraState::default(), 0, 0);
        assert_eq!(uniform.width(), 1.0);
        assert_eq!(uniform.height(), 1.0);
    }
}
