//! Pose type and transform math
//!
//! All rotations use the right-handed, column-vector convention. [`rotate`]
//! is written out with the same formula as `rotate` in the renderer's
//! `pose.wgsl` fragment, so CPU-side and GPU-side transforms agree exactly.

use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::error::MalformedMarkerError;

/// Pose (position and unit-quaternion orientation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PoseRepr", into = "PoseRepr")]
pub struct Pose {
    position: Vec3,
    orientation: Quat,
}

#[derive(Serialize, Deserialize)]
struct PoseRepr {
    #[serde(default)]
    position: Vec3,
    #[serde(default = "identity_orientation")]
    orientation: Quat,
}

fn identity_orientation() -> Quat {
    Quat::IDENTITY
}

impl TryFrom<PoseRepr> for Pose {
    type Error = MalformedMarkerError;

    fn try_from(repr: PoseRepr) -> Result<Self, Self::Error> {
        Pose::new(repr.position, repr.orientation)
    }
}

impl From<Pose> for PoseRepr {
    fn from(pose: Pose) -> Self {
        Self {
            position: pose.position,
            orientation: pose.orientation,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    /// Creates a pose, normalizing the orientation.
    ///
    /// Fails for zero-length or non-finite quaternions, which have no
    /// meaningful normalization.
    pub fn new(position: Vec3, orientation: Quat) -> Result<Self, MalformedMarkerError> {
        Ok(Self {
            position,
            orientation: normalize_orientation(orientation)?,
        })
    }

    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            orientation: Quat::IDENTITY,
        }
    }

    /// Builds a pose from xyz and roll, pitch, yaw in radians.
    pub fn from_xyz_rpy(xyz: [f32; 3], rpy: [f32; 3]) -> Self {
        Self {
            position: Vec3::from(xyz),
            orientation: Quat::from_euler(EulerRot::XYZ, rpy[0], rpy[1], rpy[2]).normalize(),
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orientation(&self) -> Quat {
        self.orientation
    }

    pub fn set_position(&mut self, position: Vec3) {
        self.position = position;
    }

    /// Replaces the orientation, normalizing it on write.
    pub fn set_orientation(&mut self, orientation: Quat) -> Result<(), MalformedMarkerError> {
        self.orientation = normalize_orientation(orientation)?;
        Ok(())
    }

    pub fn to_mat4(&self) -> Mat4 {
        Mat4::from_rotation_translation(self.orientation, self.position)
    }

    /// Pose that undoes this one: `compose_pose(p.inverse(), p) == IDENTITY`.
    pub fn inverse(&self) -> Pose {
        let orientation = self.orientation.conjugate();
        Pose {
            position: -rotate(orientation, self.position),
            orientation,
        }
    }

    /// `local` expressed in this pose's frame.
    pub fn compose(&self, local: &Pose) -> Pose {
        compose_pose(self, local)
    }

    /// Transforms a local-space vertex, scaling it before rotation.
    pub fn apply(&self, scale: Vec3, vertex: Vec3) -> Vec3 {
        apply_pose(self, scale, vertex)
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.orientation.is_finite()
    }
}

fn normalize_orientation(q: Quat) -> Result<Quat, MalformedMarkerError> {
    let length = q.length();
    if !q.is_finite() || !length.is_finite() || length <= f32::EPSILON {
        return Err(MalformedMarkerError::DegenerateOrientation);
    }
    Ok(q / length)
}

/// Rotates `v` by the unit quaternion `q`.
pub fn rotate(q: Quat, v: Vec3) -> Vec3 {
    let axis = Vec3::new(q.x, q.y, q.z);
    let t = 2.0 * axis.cross(v);
    v + q.w * t + axis.cross(t)
}

/// Returns `local` expressed in `parent`'s frame.
///
/// The parent rotation is applied first: the result orientation is
/// `parent.orientation * local.orientation`.
pub fn compose_pose(parent: &Pose, local: &Pose) -> Pose {
    Pose {
        position: parent.position + rotate(parent.orientation, local.position),
        orientation: (parent.orientation * local.orientation).normalize(),
    }
}

/// `pose.position + rotate(pose.orientation, vertex * scale)`
pub fn apply_pose(pose: &Pose, scale: Vec3, vertex: Vec3) -> Vec3 {
    pose.position + rotate(pose.orientation, vertex * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_3};

    fn sample_poses() -> Vec<Pose> {
        vec![
            Pose::from_xyz_rpy([1.0, 2.0, 3.0], [0.1, 0.2, 0.3]),
            Pose::from_xyz_rpy([-4.0, 0.5, 2.0], [FRAC_PI_2, 0.0, -0.7]),
            Pose::from_xyz_rpy([0.0, -3.0, 1.5], [0.0, FRAC_PI_3, 1.1]),
        ]
    }

    fn assert_pose_eq(a: &Pose, b: &Pose) {
        assert!(
            a.position().abs_diff_eq(b.position(), 1e-4),
            "{:?} != {:?}",
            a.position(),
            b.position()
        );
        // q and -q are the same rotation
        let dot = a.orientation().dot(b.orientation()).abs();
        approx::assert_abs_diff_eq!(dot, 1.0, epsilon = 1e-4);
    }

    #[test]
    fn test_rotate_matches_glam() {
        let v = Vec3::new(0.3, -1.2, 2.5);
        for pose in sample_poses() {
            let q = pose.orientation();
            assert!(rotate(q, v).abs_diff_eq(q * v, 1e-5));
        }
    }

    #[test]
    fn test_compose_identity() {
        for pose in sample_poses() {
            assert_pose_eq(&compose_pose(&Pose::IDENTITY, &pose), &pose);
            assert_pose_eq(&compose_pose(&pose, &Pose::IDENTITY), &pose);
        }
    }

    #[test]
    fn test_compose_associative() {
        let poses = sample_poses();
        let (a, b, c) = (&poses[0], &poses[1], &poses[2]);
        let left = compose_pose(&compose_pose(a, b), c);
        let right = compose_pose(a, &compose_pose(b, c));
        assert_pose_eq(&left, &right);
    }

    #[test]
    fn test_compose_matches_matrix_product() {
        let poses = sample_poses();
        let composed = compose_pose(&poses[0], &poses[1]);
        let expected = poses[0].to_mat4() * poses[1].to_mat4();
        assert!(composed.to_mat4().abs_diff_eq(expected, 1e-4));
    }

    #[test]
    fn test_compose_is_not_commutative() {
        let a = Pose::from_xyz_rpy([1.0, 0.0, 0.0], [0.0, 0.0, FRAC_PI_2]);
        let b = Pose::from_xyz_rpy([0.0, 2.0, 0.0], [FRAC_PI_2, 0.0, 0.0]);
        let ab = compose_pose(&a, &b);
        let ba = compose_pose(&b, &a);
        assert!(!ab.position().abs_diff_eq(ba.position(), 1e-3));
    }

    #[test]
    fn test_apply_pose_scales_before_rotating() {
        let pose = Pose::from_xyz_rpy([1.0, 1.0, 1.0], [0.0, 0.0, FRAC_PI_2]);
        let out = apply_pose(&pose, Vec3::new(2.0, 1.0, 1.0), Vec3::X);
        // x scaled to 2, then rotated onto +y
        assert!(out.abs_diff_eq(Vec3::new(1.0, 3.0, 1.0), 1e-5));
    }

    #[test]
    fn test_inverse() {
        for pose in sample_poses() {
            assert_pose_eq(&compose_pose(&pose.inverse(), &pose), &Pose::IDENTITY);
        }
    }

    #[test]
    fn test_orientation_normalized_on_write() {
        let pose = Pose::new(Vec3::ZERO, Quat::from_xyzw(0.0, 0.0, 2.0, 2.0)).unwrap();
        approx::assert_abs_diff_eq!(pose.orientation().length(), 1.0, epsilon = 1e-6);

        let mut pose = Pose::IDENTITY;
        pose.set_orientation(Quat::from_xyzw(0.0, 3.0, 0.0, 0.0)).unwrap();
        approx::assert_abs_diff_eq!(pose.orientation().y, 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_degenerate_orientation_rejected() {
        let zero = Quat::from_xyzw(0.0, 0.0, 0.0, 0.0);
        assert_eq!(
            Pose::new(Vec3::ZERO, zero),
            Err(MalformedMarkerError::DegenerateOrientation)
        );
        let nan = Quat::from_xyzw(f32::NAN, 0.0, 0.0, 1.0);
        assert!(Pose::new(Vec3::ZERO, nan).is_err());
    }

    #[test]
    fn test_deserialize_normalizes() {
        let pose: Pose =
            serde_json::from_str(r#"{"position":[1,2,3],"orientation":[0,0,0,2]}"#).unwrap();
        assert_eq!(pose.position(), Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.orientation(), Quat::IDENTITY);

        let missing: Pose = serde_json::from_str(r#"{"position":[0,0,1]}"#).unwrap();
        assert_eq!(missing.orientation(), Quat::IDENTITY);

        assert!(serde_json::from_str::<Pose>(r#"{"orientation":[0,0,0,0]}"#).is_err());
    }
}
