//! SE3 rigid transforms used for camera poses and incremental motion.

use nalgebra::{Matrix4, UnitQuaternion, Vector3, Vector6};

use super::so3::exp_so3;

/// Rigid transformation: rotation + translation.
///
/// Transforms points as: p' = R * p + t
///
/// Camera poses are stored as T_wc (camera to world). The incremental
/// transform between two frames is T_prev_curr.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SE3 {
    pub rotation: UnitQuaternion<f64>,
    pub translation: Vector3<f64>,
}

impl SE3 {
    pub fn identity() -> Self {
        Self {
            rotation: UnitQuaternion::identity(),
            translation: Vector3::zeros(),
        }
    }

    /// Convert to homogeneous 4x4 matrix.
    pub fn to_matrix(&self) -> Matrix4<f64> {
        let mut mat = Matrix4::identity();
        mat.fixed_view_mut::<3, 3>(0, 0)
            .copy_from(self.rotation.to_rotation_matrix().matrix());
        mat.fixed_view_mut::<3, 1>(0, 3).copy_from(&self.translation);
        mat
    }

    /// Small-motion update from a twist ξ = [t; ω].
    ///
    /// Rotation is exp(ω) and translation is applied as-is, matching the
    /// linearization p' ≈ p + ω × p + t used by point-to-plane ICP.
    pub fn from_increment(xi: &Vector6<f64>) -> Self {
        let t = Vector3::new(xi[0], xi[1], xi[2]);
        let omega = Vector3::new(xi[3], xi[4], xi[5]);
        Self {
            rotation: exp_so3(&omega),
            translation: t,
        }
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            rotation,
            translation: -(rotation * self.translation),
        }
    }

    /// self * other
    pub fn compose(&self, other: &SE3) -> Self {
        Self {
            rotation: self.rotation * other.rotation,
            translation: self.rotation * other.translation + self.translation,
        }
    }

    pub fn transform_point(&self, p: &Vector3<f64>) -> Vector3<f64> {
        self.rotation * p + self.translation
    }
}
