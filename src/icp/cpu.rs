//! CPU reference implementation of projective point-to-plane ICP.
//!
//! Each observation vertex is moved into the model frame with the current
//! estimate of T_prev_curr and projected into the model image; the model
//! vertex/normal at that pixel is its correspondence. Pairs that are too far
//! apart or whose normals disagree are rejected. The remaining residuals
//!
//! ```text
//! r = n · (q - T p)
//! ```
//!
//! are linearized around the current estimate with the twist ξ = [t; ω],
//! giving the Jacobian row [n, p × n]. The 6x6 normal equations are solved
//! with Cholesky and the increment is left-composed onto the estimate.
//!
//! Coarse-to-fine: observation pixels are sampled with strides 4, 2, 1.

use nalgebra::Vector6;
use serde::Deserialize;
use tracing::debug;

use super::reduction::{tiled_reduce, LinearSystem};
use super::surface::SurfaceMap;
use super::{AlignError, AlignmentPrimitive, Convergence, LaunchConfig};
use crate::geometry::{skew, SE3};
use crate::tracking::frame::{CameraModel, DepthFrame};

/// Pixel stride per pyramid level, finest first.
const LEVEL_STRIDES: [usize; 3] = [1, 2, 4];

/// Stop iterating a level once the update is this small.
const CONVERGENCE_EPS: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IcpParams {
    /// Maximum point-to-point distance for a correspondence (metres).
    pub dist_threshold: f64,
    /// Maximum angle between correspondence normals (degrees).
    pub angle_threshold_deg: f64,
    /// Iterations per level, finest first.
    pub iterations: [usize; 3],
    /// Fewer correspondences than this fails the refinement.
    pub min_correspondences: usize,
    /// Depth beyond this is ignored (metres).
    pub max_depth: f64,
}

impl Default for IcpParams {
    fn default() -> Self {
        Self {
            dist_threshold: 0.10,
            angle_threshold_deg: 20.0,
            iterations: [10, 5, 4],
            min_correspondences: 100,
            max_depth: 10.0,
        }
    }
}

pub struct CpuIcp {
    camera: CameraModel,
    params: IcpParams,
    model: SurfaceMap,
    observation: SurfaceMap,
    model_ready: bool,
    observation_ready: bool,
}

impl CpuIcp {
    pub fn new(camera: CameraModel, params: IcpParams) -> Self {
        Self {
            camera,
            params,
            model: SurfaceMap::default(),
            observation: SurfaceMap::default(),
            model_ready: false,
            observation_ready: false,
        }
    }

    fn check_size(&self, surface: &SurfaceMap) -> Result<(), AlignError> {
        if surface.width != self.camera.width || surface.height != self.camera.height {
            return Err(AlignError::FrameSize {
                found_w: surface.width,
                found_h: surface.height,
                expected_w: self.camera.width,
                expected_h: self.camera.height,
            });
        }
        Ok(())
    }

    /// Linearize all correspondences on the `stride` sample grid around `estimate`.
    fn linearize(&self, estimate: &SE3, stride: usize, launch: LaunchConfig) -> LinearSystem {
        let width = self.observation.width;
        let cols = width.div_ceil(stride);
        let rows = self.observation.height.div_ceil(stride);
        let max_dist_sq = self.params.dist_threshold * self.params.dist_threshold;
        let max_sin = self.params.angle_threshold_deg.to_radians().sin();

        let model = &self.model;
        let observation = &self.observation;
        let camera = &self.camera;

        tiled_reduce(rows * cols, launch, |i, lane| {
            let u = (i % cols) * stride;
            let v = (i / cols) * stride;
            let idx = v * width + u;
            if !observation.valid[idx] {
                return;
            }

            let p = estimate.transform_point(&observation.vertices[idx]);
            let Some((mu, mv)) = camera.project(&p) else {
                return;
            };
            let midx = mv * model.width + mu;
            if !model.valid[midx] {
                return;
            }

            let q = model.vertices[midx];
            let n = model.normals[midx];
            if (q - p).norm_squared() > max_dist_sq {
                return;
            }
            let n_obs = estimate.rotation * observation.normals[idx];
            if n.cross(&n_obs).norm() > max_sin {
                return;
            }

            // Rotational part of the point-to-plane row: p × n
            let c = skew(&p) * n;
            let row = Vector6::new(n.x, n.y, n.z, c.x, c.y, c.z);
            lane.add(&row, n.dot(&(q - p)));
        })
    }
}

impl AlignmentPrimitive for CpuIcp {
    fn init_model(&mut self, frame: &DepthFrame) {
        self.model.build(frame, &self.camera, self.params.max_depth);
        self.model_ready = true;
    }

    fn init_observation(&mut self, frame: &DepthFrame) {
        self.observation
            .build(frame, &self.camera, self.params.max_depth);
        self.observation_ready = true;
    }

    fn refine(
        &mut self,
        transform: &mut SE3,
        launch: LaunchConfig,
    ) -> Result<Convergence, AlignError> {
        launch.validate()?;
        if !(self.model_ready && self.observation_ready) {
            return Err(AlignError::NotInitialized);
        }
        self.check_size(&self.model)?;
        self.check_size(&self.observation)?;

        let mut estimate = *transform;
        let mut convergence = Convergence::default();

        for level in (0..LEVEL_STRIDES.len()).rev() {
            let stride = LEVEL_STRIDES[level];
            for _ in 0..self.params.iterations[level] {
                let system = self.linearize(&estimate, stride, launch);
                if system.count < self.params.min_correspondences {
                    return Err(AlignError::InsufficientCorrespondences {
                        found: system.count,
                        required: self.params.min_correspondences,
                    });
                }
                let xi = system.solve().ok_or(AlignError::Degenerate)?;
                estimate = SE3::from_increment(&xi).compose(&estimate);

                convergence.iterations += 1;
                convergence.correspondences = system.count;
                convergence.rmse = system.rmse();

                if xi.norm() < CONVERGENCE_EPS {
                    break;
                }
            }
        }

        debug!(
            iterations = convergence.iterations,
            correspondences = convergence.correspondences,
            rmse = convergence.rmse,
            "ICP refined"
        );

        *transform = estimate;
        Ok(convergence)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use nalgebra::{UnitQuaternion, Vector3};

    /// Planes n·x = d forming a room corner: back wall, floor, left wall.
    const SCENE: [([f64; 3], f64); 3] = [
        ([0.0, 0.0, 1.0], 3.0),
        ([0.0, 1.0, 0.0], 0.8),
        ([1.0, 0.0, 0.0], -1.0),
    ];

    pub(crate) fn test_camera() -> CameraModel {
        CameraModel::new(160, 120, 150.0, 150.0, 79.5, 59.5)
    }

    /// Ray-cast the corner scene from camera pose `t_wc` into a depth frame (mm).
    pub(crate) fn render(camera: &CameraModel, t_wc: &SE3) -> DepthFrame {
        let mut frame = DepthFrame::new(camera.width, camera.height);
        for v in 0..camera.height {
            for u in 0..camera.width {
                let dir_c = Vector3::new(
                    (u as f64 - camera.cx) / camera.fx,
                    (v as f64 - camera.cy) / camera.fy,
                    1.0,
                );
                let dir_w = t_wc.rotation * dir_c;
                let origin = t_wc.translation;

                let mut best = f64::INFINITY;
                for (n, d) in SCENE {
                    let n = Vector3::from(n);
                    let denom = n.dot(&dir_w);
                    if denom.abs() < 1e-9 {
                        continue;
                    }
                    let s = (d - n.dot(&origin)) / denom;
                    if s > 0.05 && s < best {
                        best = s;
                    }
                }
                if best < 8.0 {
                    frame.data[v * camera.width + u] = (best * 1000.0).round() as u16;
                }
            }
        }
        frame
    }

    fn small_motion() -> SE3 {
        SE3 {
            rotation: UnitQuaternion::from_euler_angles(0.008, 0.015, -0.005),
            translation: Vector3::new(0.02, -0.01, 0.03),
        }
    }

    #[test]
    fn test_recovers_small_motion() {
        let camera = test_camera();
        let truth = small_motion();
        let model = render(&camera, &SE3::identity());
        let observation = render(&camera, &truth);

        let mut icp = CpuIcp::new(camera, IcpParams::default());
        icp.init_model(&model);
        icp.init_observation(&observation);

        let mut estimate = SE3::identity();
        let conv = icp
            .refine(&mut estimate, LaunchConfig::FALLBACK)
            .expect("refine should converge");

        let error = estimate.inverse().compose(&truth);
        assert!(error.translation.norm() < 5e-3, "translation error {:?}", error);
        assert!(error.rotation.angle() < 5e-3, "rotation error {}", error.rotation.angle());
        assert!(conv.iterations > 0);
        assert!(conv.rmse < 0.01);
    }

    #[test]
    fn test_identical_frames_stay_at_identity() {
        let camera = test_camera();
        let frame = render(&camera, &SE3::identity());

        let mut icp = CpuIcp::new(camera, IcpParams::default());
        icp.init_model(&frame);
        icp.init_observation(&frame);

        let mut estimate = SE3::identity();
        icp.refine(&mut estimate, LaunchConfig::new(16, 16)).unwrap();

        assert!(estimate.translation.norm() < 1e-6);
        assert!(estimate.rotation.angle() < 1e-5);
    }

    #[test]
    fn test_result_independent_of_launch_layout() {
        let camera = test_camera();
        let model = render(&camera, &SE3::identity());
        let observation = render(&camera, &small_motion());

        let mut icp = CpuIcp::new(camera, IcpParams::default());
        let mut results = Vec::new();
        for launch in [LaunchConfig::new(16, 16), LaunchConfig::new(512, 512)] {
            icp.init_model(&model);
            icp.init_observation(&observation);
            let mut estimate = SE3::identity();
            icp.refine(&mut estimate, launch).unwrap();
            results.push(estimate);
        }

        let diff = results[0].inverse().compose(&results[1]);
        assert!(diff.translation.norm() < 1e-6);
    }

    #[test]
    fn test_refine_before_init_fails() {
        let mut icp = CpuIcp::new(test_camera(), IcpParams::default());
        let mut estimate = SE3::identity();

        let err = icp.refine(&mut estimate, LaunchConfig::FALLBACK).unwrap_err();
        assert_eq!(err, AlignError::NotInitialized);
    }

    #[test]
    fn test_zero_launch_is_rejected() {
        let camera = test_camera();
        let frame = render(&camera, &SE3::identity());
        let mut icp = CpuIcp::new(camera, IcpParams::default());
        icp.init_model(&frame);
        icp.init_observation(&frame);

        let bad = LaunchConfig::new(0, 96);
        let mut estimate = SE3::identity();
        assert_eq!(
            icp.refine(&mut estimate, bad).unwrap_err(),
            AlignError::InvalidLaunch(bad)
        );
    }

    #[test]
    fn test_empty_depth_reports_insufficient_correspondences() {
        let camera = test_camera();
        let empty = DepthFrame::new(camera.width, camera.height);
        let mut icp = CpuIcp::new(camera, IcpParams::default());
        icp.init_model(&empty);
        icp.init_observation(&empty);

        let mut estimate = SE3::identity();
        let err = icp.refine(&mut estimate, LaunchConfig::FALLBACK).unwrap_err();

        assert!(matches!(
            err,
            AlignError::InsufficientCorrespondences { found: 0, .. }
        ));
        assert_eq!(estimate, SE3::identity());
    }

    #[test]
    fn test_wrong_frame_size_is_rejected() {
        let camera = test_camera();
        let small = DepthFrame::new(8, 8);
        let mut icp = CpuIcp::new(camera, IcpParams::default());
        icp.init_model(&small);
        icp.init_observation(&small);

        let mut estimate = SE3::identity();
        assert!(matches!(
            icp.refine(&mut estimate, LaunchConfig::FALLBACK),
            Err(AlignError::FrameSize { found_w: 8, .. })
        ));
    }
}
