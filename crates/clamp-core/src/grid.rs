//! Experimental condition grid and static work partitioning.

use itertools::iproduct;
use serde::{Deserialize, Serialize};

/// One experimental condition. Identity is value equality; ordering is the
/// grid's insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Reference leak potential, mV.
    pub e_ref: f64,
    /// Intracellular chloride concentration, mM.
    pub cl_in: f64,
    /// Holding current, nA.
    pub i_hold: f64,
    /// Step current, nA.
    pub i_step: f64,
}

/// Ordered value lists for the four condition axes.
#[derive(Debug, Clone, PartialEq)]
pub struct GridAxes {
    pub e_ref: Vec<f64>,
    pub cl_in: Vec<f64>,
    pub i_hold: Vec<f64>,
    pub i_step: Vec<f64>,
}

impl Default for GridAxes {
    /// The standard comparison grid: one reference potential and chloride
    /// concentration against 51 holding currents and 9 step currents.
    fn default() -> Self {
        Self {
            e_ref: vec![-85.0],
            cl_in: vec![10.0],
            i_hold: linspace(-0.5, 2.0, 51),
            i_step: linspace(-0.06, 0.06, 9),
        }
    }
}

impl GridAxes {
    /// Full Cartesian product in nested-loop order, `e_ref` outermost and
    /// `i_step` innermost. Deterministic: downstream partitioning relies on
    /// stable global indices.
    pub fn conditions(&self) -> Vec<Condition> {
        iproduct!(&self.e_ref, &self.cl_in, &self.i_hold, &self.i_step)
            .map(|(&e_ref, &cl_in, &i_hold, &i_step)| Condition {
                e_ref,
                cl_in,
                i_hold,
                i_step,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.e_ref.len() * self.cl_in.len() * self.i_hold.len() * self.i_step.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Evenly spaced values over `[start, stop]`, both endpoints included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => (0..n)
            .map(|i| start + (stop - start) * i as f64 / (n - 1) as f64)
            .collect(),
    }
}

/// Indices of the conditions assigned to `worker_id` out of `worker_count`
/// cooperating workers, by static round robin. Every index in `0..n` lands
/// on exactly one worker; workers need no coordination.
pub fn partition(n: usize, worker_id: usize, worker_count: usize) -> Vec<usize> {
    assert!(worker_count > 0, "worker_count must be positive");
    assert!(
        worker_id < worker_count,
        "worker_id {} out of range for {} workers",
        worker_id,
        worker_count
    );
    (worker_id..n).step_by(worker_count).collect()
}
