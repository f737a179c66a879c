//! Rigid transform and URDF-style pose types

use std::ops::Mul;

use glam::{DMat4, DQuat, DVec3, EulerRot, Mat4};
use serde::{Deserialize, Serialize};

/// Rigid transform (rotation followed by translation)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RigidTransform {
    pub rotation: DQuat,
    pub translation: DVec3,
}

impl RigidTransform {
    pub const IDENTITY: Self = Self {
        rotation: DQuat::IDENTITY,
        translation: DVec3::ZERO,
    };

    pub fn new(rotation: DQuat, translation: DVec3) -> Self {
        Self {
            rotation,
            translation,
        }
    }

    pub fn from_translation(translation: DVec3) -> Self {
        Self {
            rotation: DQuat::IDENTITY,
            translation,
        }
    }

    pub fn from_rotation(rotation: DQuat) -> Self {
        Self {
            rotation,
            translation: DVec3::ZERO,
        }
    }

    /// Rotation of `angle` radians about `axis` (normalized here)
    pub fn from_axis_angle(axis: DVec3, angle: f64) -> Self {
        Self::from_rotation(DQuat::from_axis_angle(axis.normalize_or_zero(), angle))
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    pub fn transform_point(&self, point: DVec3) -> DVec3 {
        self.rotation * point + self.translation
    }

    pub fn transform_vector(&self, vector: DVec3) -> DVec3 {
        self.rotation * vector
    }

    pub fn to_mat4(&self) -> DMat4 {
        DMat4::from_rotation_translation(self.rotation, self.translation)
    }

    /// Single precision matrix for GPU upload
    pub fn to_mat4_f32(&self) -> Mat4 {
        Mat4::from_cols_array(&self.to_mat4().to_cols_array().map(|v| v as f32))
    }

    /// Column-major 4x4 array, used for export
    pub fn to_cols_array_2d(&self) -> [[f64; 4]; 4] {
        self.to_mat4().to_cols_array_2d()
    }
}

impl Default for RigidTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for RigidTransform {
    type Output = RigidTransform;

    fn mul(self, rhs: RigidTransform) -> RigidTransform {
        RigidTransform {
            rotation: self.rotation * rhs.rotation,
            translation: self.rotation * rhs.translation + self.translation,
        }
    }
}

/// Pose (position and orientation) as written in URDF
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub xyz: [f64; 3],
    pub rpy: [f64; 3], // roll, pitch, yaw in radians
}

impl Pose {
    pub fn new(xyz: [f64; 3], rpy: [f64; 3]) -> Self {
        Self { xyz, rpy }
    }

    pub fn from_position(xyz: [f64; 3]) -> Self {
        Self { xyz, rpy: [0.0; 3] }
    }

    /// URDF rpy is fixed-axis XYZ, i.e. R = Rz(yaw) * Ry(pitch) * Rx(roll)
    pub fn to_quat(&self) -> DQuat {
        DQuat::from_euler(EulerRot::ZYX, self.rpy[2], self.rpy[1], self.rpy[0])
    }

    pub fn to_transform(&self) -> RigidTransform {
        RigidTransform::new(self.to_quat(), DVec3::from(self.xyz))
    }
}

impl From<&urdf_rs::Pose> for Pose {
    fn from(urdf_pose: &urdf_rs::Pose) -> Self {
        Self {
            xyz: urdf_pose.xyz.0,
            rpy: urdf_pose.rpy.0,
        }
    }
}

impl From<Pose> for RigidTransform {
    fn from(pose: Pose) -> Self {
        pose.to_transform()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_compose_and_inverse() {
        let a = RigidTransform::new(DQuat::from_rotation_z(0.3), DVec3::new(1.0, 2.0, 3.0));
        let b = RigidTransform::new(DQuat::from_rotation_x(-1.1), DVec3::new(-0.5, 0.0, 0.25));
        let p = DVec3::new(0.1, -0.2, 0.7);

        let composed = (a * b).transform_point(p);
        let stepwise = a.transform_point(b.transform_point(p));
        assert_abs_diff_eq!(composed.x, stepwise.x, epsilon = 1e-12);
        assert_abs_diff_eq!(composed.y, stepwise.y, epsilon = 1e-12);
        assert_abs_diff_eq!(composed.z, stepwise.z, epsilon = 1e-12);

        let back = (a * a.inverse()).transform_point(p);
        assert_abs_diff_eq!(back.distance(p), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rpy_yaw_only() {
        let pose = Pose::new([0.0; 3], [0.0, 0.0, FRAC_PI_2]);
        let v = pose.to_transform().transform_vector(DVec3::X);
        assert_abs_diff_eq!(v.x, 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(v.y, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rpy_fixed_axis_order() {
        // Roll is applied first about the fixed X axis, then yaw about Z
        let pose = Pose::new([0.0; 3], [FRAC_PI_2, 0.0, FRAC_PI_2]);
        let v = pose.to_transform().transform_vector(DVec3::Y);
        // Y --roll--> Z --yaw--> Z
        assert_abs_diff_eq!(v.z, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_to_mat4_f32_translation() {
        let t = RigidTransform::from_translation(DVec3::new(1.0, 2.0, 3.0));
        let m = t.to_mat4_f32();
        assert_eq!(m.w_axis.truncate().to_array(), [1.0, 2.0, 3.0]);
    }
}
