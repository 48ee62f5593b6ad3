//! Orbit camera state and its derived matrices.
//!
//! The camera looks at `target + target_offset` from `distance` away. `phi`
//! is the polar angle away from straight down, `theta_offset` the heading
//! around the world Z axis. Input handling that mutates this state lives
//! outside the rendering core; the renderer only reads a snapshot per frame.

use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

const MIN_DISTANCE: f32 = 1e-3;
const MIN_NEAR: f32 = 1e-4;
const MIN_DEPTH_RANGE: f32 = 1e-3;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraState {
    pub target: Vec3,
    pub target_offset: Vec3,
    pub distance: f32,
    pub phi: f32,
    pub theta_offset: f32,
    pub perspective: bool,
    /// Vertical field of view in radians.
    pub fovy: f32,
    pub near: f32,
    pub far: f32,
}

impl Default for CameraState {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO,
            target_offset: Vec3::ZERO,
            distance: 75.0,
            phi: FRAC_PI_4,
            theta_offset: FRAC_PI_2,
            perspective: true,
            fovy: FRAC_PI_4,
            near: 0.01,
            far: 5000.0,
        }
    }
}

impl CameraState {
    /// Returns a copy with `distance > 0` and `0 < near < far` enforced.
    ///
    /// Out-of-range values are clamped rather than rejected; non-finite
    /// angles and targets are reset to their defaults.
    pub fn sanitized(&self) -> CameraState {
        let defaults = CameraState::default();
        let mut state = *self;
        if !state.target.is_finite() {
            state.target = defaults.target;
        }
        if !state.target_offset.is_finite() {
            state.target_offset = defaults.target_offset;
        }
        if !state.phi.is_finite() {
            state.phi = defaults.phi;
        }
        if !state.theta_offset.is_finite() {
            state.theta_offset = defaults.theta_offset;
        }
        if !state.distance.is_finite() || state.distance < MIN_DISTANCE {
            state.distance = MIN_DISTANCE;
        }
        if !state.near.is_finite() || state.near < MIN_NEAR {
            state.near = MIN_NEAR;
        }
        if !state.far.is_finite() || state.far < state.near + MIN_DEPTH_RANGE {
            state.far = state.near + MIN_DEPTH_RANGE;
        }
        if !state.fovy.is_finite() {
            state.fovy = defaults.fovy;
        }
        state.fovy = state.fovy.clamp(0.01, std::f32::consts::PI - 0.01);
        state
    }

    /// Camera rotation: heading about Z, then tilt about the rotated X axis.
    pub fn orientation(&self) -> Quat {
        (Quat::from_rotation_z(-self.theta_offset) * Quat::from_rotation_x(self.phi)).normalize()
    }

    /// Point the camera orbits around.
    pub fn focus(&self) -> Vec3 {
        self.target + self.target_offset
    }

    /// World-space eye position.
    pub fn eye(&self) -> Vec3 {
        self.focus() + self.orientation() * Vec3::new(0.0, 0.0, self.distance)
    }

    pub fn view_matrix(&self) -> Mat4 {
        let mut view = Mat4::IDENTITY;
        if self.perspective {
            view *= Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance));
        }
        view *= Mat4::from_quat(self.orientation().conjugate());
        view * Mat4::from_translation(-self.focus())
    }

    /// Projection for a viewport with the given aspect ratio (width / height).
    ///
    /// Uses a `[0, 1]` depth range. The orthographic variant frames a square
    /// of side `distance` so zooming keeps working without perspective.
    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        let aspect = if aspect.is_finite() && aspect > 0.0 {
            aspect
        } else {
            1.0
        };
        if self.perspective {
            Mat4::perspective_rh(self.fovy, aspect, self.near, self.far)
        } else {
            let half_height = self.distance / 2.0;
            let half_width = half_height * aspect;
            Mat4::orthographic_rh(
                -half_width,
                half_width,
                -half_height,
                half_height,
                -self.far,
                self.far,
            )
        }
    }

    pub fn view_projection(&self, aspect: f32) -> Mat4 {
        self.projection_matrix(aspect) * self.view_matrix()
    }
}
