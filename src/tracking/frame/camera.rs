use nalgebra::Vector3;
use serde::Deserialize;

/// Pinhole depth camera. Intrinsics are fixed per deployment.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct CameraModel {
    pub width: usize,
    pub height: usize,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl CameraModel {
    pub fn new(width: usize, height: usize, fx: f64, fy: f64, cx: f64, cy: f64) -> Self {
        Self {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
        }
    }

    /// Back-project pixel (u, v) at metric depth `z` into the camera frame.
    #[inline]
    pub fn back_project(&self, u: usize, v: usize, z: f64) -> Vector3<f64> {
        Vector3::new(
            (u as f64 - self.cx) * z / self.fx,
            (v as f64 - self.cy) * z / self.fy,
            z,
        )
    }

    /// Project a camera-frame point to the nearest pixel, if it lands in the image.
    #[inline]
    pub fn project(&self, p: &Vector3<f64>) -> Option<(usize, usize)> {
        if p.z <= 0.0 {
            return None;
        }
        let u = (self.fx * p.x / p.z + self.cx).round();
        let v = (self.fy * p.y / p.z + self.cy).round();
        if u < 0.0 || v < 0.0 || u >= self.width as f64 || v >= self.height as f64 {
            return None;
        }
        Some((u as usize, v as usize))
    }
}

impl Default for CameraModel {
    /// 1280x720 depth stream of the reference deployment.
    fn default() -> Self {
        Self::new(
            1280,
            720,
            608.6896362304688,
            608.6896362304688,
            640.839599609375,
            369.6243591308594,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_project_inverts_back_project() {
        let cam = CameraModel::default();
        let p = cam.back_project(100, 200, 1.5);

        assert_eq!(cam.project(&p), Some((100, 200)));
        assert_relative_eq!(p.z, 1.5);
    }

    #[test]
    fn test_project_rejects_behind_and_outside() {
        let cam = CameraModel::new(64, 48, 50.0, 50.0, 32.0, 24.0);

        assert_eq!(cam.project(&Vector3::new(0.0, 0.0, -1.0)), None);
        assert_eq!(cam.project(&Vector3::new(10.0, 0.0, 1.0)), None);
    }
}
