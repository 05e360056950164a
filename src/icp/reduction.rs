//! Tiled accumulation of the point-to-plane normal equations.
//!
//! The sample range is cut into `blocks` contiguous chunks. Inside a chunk,
//! sample `i` is accumulated into lane `i % threads`; lanes are folded into
//! the chunk total, and chunks into the final system.

use nalgebra::{Matrix6, Vector6};
use rayon::prelude::*;

use super::launch::LaunchConfig;

/// Accumulated JᵀJ, Jᵀr and squared residual for one linearization.
#[derive(Debug, Clone, Copy)]
pub(crate) struct LinearSystem {
    pub jtj: Matrix6<f64>,
    pub jtr: Vector6<f64>,
    pub squared_error: f64,
    pub count: usize,
}

impl LinearSystem {
    pub fn zero() -> Self {
        Self {
            jtj: Matrix6::zeros(),
            jtr: Vector6::zeros(),
            squared_error: 0.0,
            count: 0,
        }
    }

    #[inline]
    pub fn add(&mut self, row: &Vector6<f64>, residual: f64) {
        self.jtj += row * row.transpose();
        self.jtr += row * residual;
        self.squared_error += residual * residual;
        self.count += 1;
    }

    pub fn merge(&mut self, other: &LinearSystem) {
        self.jtj += other.jtj;
        self.jtr += other.jtr;
        self.squared_error += other.squared_error;
        self.count += other.count;
    }

    /// Solve JᵀJ ξ = Jᵀr. None if the system is not positive definite.
    pub fn solve(&self) -> Option<Vector6<f64>> {
        let xi = self.jtj.cholesky()?.solve(&self.jtr);
        xi.iter().all(|x| x.is_finite()).then_some(xi)
    }

    pub fn rmse(&self) -> f64 {
        if self.count == 0 {
            return 0.0;
        }
        (self.squared_error / self.count as f64).sqrt()
    }
}

/// Reduce `num_samples` samples with the layout given by `launch`.
///
/// `sample(i, lane)` accumulates sample `i` into `lane`. Chunks are reduced
/// on the rayon pool and merged in chunk order, so the result only depends
/// on the launch configuration.
pub(crate) fn tiled_reduce<F>(num_samples: usize, launch: LaunchConfig, sample: F) -> LinearSystem
where
    F: Fn(usize, &mut LinearSystem) + Sync,
{
    let blocks = launch.blocks.max(1) as usize;
    let threads = launch.threads.max(1) as usize;
    let chunk_len = num_samples.div_ceil(blocks).max(1);
    let num_chunks = num_samples.div_ceil(chunk_len);

    let reduce_chunk = |chunk: usize| {
        let start = chunk * chunk_len;
        let end = (start + chunk_len).min(num_samples);
        let mut lanes = vec![LinearSystem::zero(); threads.min(end - start)];
        for i in start..end {
            let lane = (i - start) % lanes.len();
            sample(i, &mut lanes[lane]);
        }
        let mut total = LinearSystem::zero();
        for lane in &lanes {
            total.merge(lane);
        }
        total
    };

    let partials: Vec<LinearSystem> = (0..num_chunks)
        .into_par_iter()
        .map(reduce_chunk)
        .collect();

    let mut total = LinearSystem::zero();
    for p in &partials {
        total.merge(p);
    }
    total
}
