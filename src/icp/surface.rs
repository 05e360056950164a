use nalgebra::Vector3;

use crate::tracking::frame::{CameraModel, DepthFrame};

/// Depth samples are millimetres.
const DEPTH_SCALE: f64 = 1e-3;

/// Minimum |cross| before a normal is considered degenerate.
const MIN_NORMAL_NORM: f64 = 1e-12;

/// Vertex and normal maps of one depth frame, in that frame's camera coordinates.
///
/// Storage is reused across frames; `build` refills it in place.
#[derive(Debug, Default)]
pub(crate) struct SurfaceMap {
    pub width: usize,
    pub height: usize,
    pub vertices: Vec<Vector3<f64>>,
    pub normals: Vec<Vector3<f64>>,
    /// Vertex and normal both usable.
    pub valid: Vec<bool>,
}

impl SurfaceMap {
    pub fn build(&mut self, frame: &DepthFrame, camera: &CameraModel, max_depth: f64) {
        let (w, h) = (frame.width, frame.height);
        let n = w * h;
        self.width = w;
        self.height = h;
        self.vertices.resize(n, Vector3::zeros());
        self.normals.resize(n, Vector3::zeros());
        self.valid.resize(n, false);

        let mut has_vertex = vec![false; n];
        for v in 0..h {
            let row = frame.row(v);
            for (u, &d) in row.iter().enumerate() {
                let idx = v * w + u;
                let z = d as f64 * DEPTH_SCALE;
                if d > 0 && z <= max_depth {
                    self.vertices[idx] = camera.back_project(u, v, z);
                    has_vertex[idx] = true;
                } else {
                    self.vertices[idx] = Vector3::zeros();
                }
            }
        }

        for v in 0..h {
            for u in 0..w {
                let idx = v * w + u;
                self.valid[idx] = false;
                self.normals[idx] = Vector3::zeros();

                if u + 1 >= w || v + 1 >= h {
                    continue;
                }
                let right = idx + 1;
                let down = idx + w;
                if !(has_vertex[idx] && has_vertex[right] && has_vertex[down]) {
                    continue;
                }

                let p = self.vertices[idx];
                let n = (self.vertices[right] - p).cross(&(self.vertices[down] - p));
                let norm = n.norm();
                if norm > MIN_NORMAL_NORM {
                    self.normals[idx] = n / norm;
                    self.valid[idx] = true;
                }
            }
        }
    }

    pub fn num_valid(&self) -> usize {
        self.valid.iter().filter(|&&b| b).count()
    }
}
