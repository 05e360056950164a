//! SO(3) helpers for the ICP linearization.

use nalgebra::{Matrix3, Quaternion, UnitQuaternion, Vector3};

/// Small angle threshold for numerical stability.
const SMALL_ANGLE_THRESHOLD: f64 = 1e-6;

/// Constructs the skew-symmetric matrix [v]× such that [v]× u = v × u.
///
/// ```text
/// [v]× = |  0   -v_z   v_y |
///        |  v_z   0   -v_x |
///        | -v_y  v_x    0  |
/// ```
#[inline]
pub fn skew(v: &Vector3<f64>) -> Matrix3<f64> {
    Matrix3::new(
        0.0, -v.z, v.y,
        v.z, 0.0, -v.x,
        -v.y, v.x, 0.0,
    )
}

/// Exponential map from a rotation vector ω to a unit quaternion.
///
/// For |ω| below the threshold the first-order quaternion (1, ω/2) is
/// renormalized instead of dividing by the angle.
pub fn exp_so3(omega: &Vector3<f64>) -> UnitQuaternion<f64> {
    let theta = omega.norm();

    if theta < SMALL_ANGLE_THRESHOLD {
        let half = 0.5 * omega;
        return UnitQuaternion::new_normalize(Quaternion::new(1.0, half.x, half.y, half.z));
    }

    UnitQuaternion::from_scaled_axis(*omega)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_skew_cross_product() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let u = Vector3::new(4.0, 5.0, 6.0);

        let cross_direct = v.cross(&u);
        let cross_skew = skew(&v) * u;

        assert_relative_eq!(cross_direct, cross_skew, epsilon = 1e-12);
    }

    #[test]
    fn test_skew_antisymmetric() {
        let v = Vector3::new(1.0, 2.0, 3.0);
        let skew_v = skew(&v);

        assert_relative_eq!(skew_v, -skew_v.transpose(), epsilon = 1e-12);
    }

    #[test]
    fn test_exp_zero_is_identity() {
        let q = exp_so3(&Vector3::zeros());
        assert_relative_eq!(q.angle(), 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_exp_matches_axis_angle() {
        let omega = Vector3::new(0.0, 0.0, 0.3);
        let q = exp_so3(&omega);

        assert_relative_eq!(q.angle(), 0.3, epsilon = 1e-12);
        assert_relative_eq!(q.axis().unwrap().into_inner(), Vector3::z(), epsilon = 1e-12);
    }

    #[test]
    fn test_exp_small_angle_consistency() {
        // Both branches should agree near the threshold
        let below = exp_so3(&Vector3::new(5e-7, 0.0, 0.0));
        let above = exp_so3(&Vector3::new(2e-6, 0.0, 0.0));

        assert_relative_eq!(below.imag(), Vector3::new(2.5e-7, 0.0, 0.0), epsilon = 1e-15);
        assert_relative_eq!(above.imag(), Vector3::new(1e-6, 0.0, 0.0), epsilon = 1e-15);
    }
}
