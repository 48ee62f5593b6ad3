//! GPU capabilities queried once when a command is created.

use crate::error::CapabilityError;

/// Point size range used when none, or a non-finite one, is configured.
pub const DEFAULT_POINT_SIZE_RANGE: [f32; 2] = [1.0, 64.0];

/// Replaces non-finite bounds with the defaults. The order of the bounds is
/// kept; a degenerate range is resolved by [`crate::shader::clamp_point_size`].
pub fn sanitize_point_size_range([min, max]: [f32; 2]) -> [f32; 2] {
    let [default_min, default_max] = DEFAULT_POINT_SIZE_RANGE;
    [
        if min.is_finite() { min } else { default_min },
        if max.is_finite() { max } else { default_max },
    ]
}

/// Limits reported by a rendering context.
#[derive(Debug, Clone, PartialEq)]
pub struct Capabilities {
    /// Whether per-instance vertex attributes are supported.
    pub instancing: bool,
    /// Supported point size range in pixels, `[min, max]`.
    pub point_size_range: Option<[f32; 2]>,
    /// Largest 2D texture edge in pixels.
    pub max_texture_size: u32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            instancing: true,
            point_size_range: Some(DEFAULT_POINT_SIZE_RANGE),
            max_texture_size: 2048,
        }
    }
}

impl Capabilities {
    /// Derives capabilities from wgpu device limits.
    ///
    /// wgpu has no sized point primitive; points are drawn as screen-space
    /// quads, so the range comes from configuration, capped by the largest
    /// texture edge.
    pub fn from_wgpu_limits(limits: &wgpu::Limits, point_size_limits: [f32; 2]) -> Self {
        let max_texture_size = limits.max_texture_dimension_2d;
        let [min, max] = sanitize_point_size_range(point_size_limits);
        Self {
            instancing: limits.max_vertex_buffers >= 2,
            point_size_range: Some([min, max.min(max_texture_size as f32)]),
            max_texture_size,
        }
    }

    pub fn require_instancing(&self) -> Result<(), CapabilityError> {
        if self.instancing {
            Ok(())
        } else {
            Err(CapabilityError::Instancing)
        }
    }

    pub fn require_point_size_range(&self) -> Result<[f32; 2], CapabilityError> {
        self.point_size_range.ok_or(CapabilityError::PointSizeRange)
    }

    pub fn require_texture_size(&self, required: u32) -> Result<(), CapabilityError> {
        if required <= self.max_texture_size {
            Ok(())
        } else {
            Err(CapabilityError::TextureSize {
                required,
                limit: self.max_texture_size,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wgpu_limits() {
        let limits = wgpu::Limits::downlevel_webgl2_defaults();
        let caps = Capabilities::from_wgpu_limits(&limits, [1.0, 64.0]);
        assert!(caps.instancing);
        assert_eq!(caps.point_size_range, Some([1.0, 64.0]));
        assert_eq!(caps.max_texture_size, limits.max_texture_dimension_2d);
    }

    #[test]
    fn test_non_finite_point_limits_use_defaults() {
        let limits = wgpu::Limits::downlevel_webgl2_defaults();
        let caps = Capabilities::from_wgpu_limits(&limits, [f32::NAN, 32.0]);
        assert_eq!(caps.point_size_range, Some([1.0, 32.0]));

        let caps = Capabilities::from_wgpu_limits(&limits, [2.0, f32::INFINITY]);
        assert_eq!(caps.point_size_range, Some([2.0, 64.0]));

        // A degenerate range keeps its order.
        let caps = Capabilities::from_wgpu_limits(&limits, [8.0, 3.0]);
        assert_eq!(caps.point_size_range, Some([8.0, 3.0]));
    }

    #[test]
    fn test_requirements() {
        let caps = Capabilities {
            instancing: false,
            point_size_range: None,
            max_texture_size: 512,
        };
        assert_eq!(caps.require_instancing(), Err(CapabilityError::Instancing));
        assert_eq!(
            caps.require_point_size_range(),
            Err(CapabilityError::PointSizeRange)
        );
        assert_eq!(
            caps.require_texture_size(1024),
            Err(CapabilityError::TextureSize {
                required: 1024,
                limit: 512
            })
        );
        assert!(caps.require_texture_size(512).is_ok());
    }
}
