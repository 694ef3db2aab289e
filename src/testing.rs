//! Test support shared by unit tests, integration suites and benches.
//!
//! The linear-scan functions are the correctness oracle: they answer the
//! same queries as the trees by brute force, using the same candidate
//! buffers, so tie handling and result shape match exactly.

use crate::dataset::{Dataset, Label};
use crate::kernel::Kernel;
use crate::tree::{KnnBuffer, Neighbors, RangeBuffer};

/// Default tolerance for floating-point distance comparisons.
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// Brute-force k-nearest: scan every sample, keep the top k.
pub fn linear_nearest<L: Label, K: Kernel>(
    samples: &[Vec<f64>],
    labels: &[L],
    kernel: &K,
    query: &[f64],
    k: usize,
) -> Neighbors<L> {
    let mut best = KnnBuffer::new(k);
    for (sample, label) in samples.iter().zip(labels) {
        best.push(kernel.distance(query, sample), label.clone());
    }
    best.into_neighbors()
}

/// Brute-force range query: scan every sample, keep those within
/// `radius`, in dataset order.
pub fn linear_range<L: Label, K: Kernel>(
    samples: &[Vec<f64>],
    labels: &[L],
    kernel: &K,
    query: &[f64],
    radius: f64,
) -> Neighbors<L> {
    let mut found = RangeBuffer::new(radius);
    for (sample, label) in samples.iter().zip(labels) {
        found.push(kernel.distance(query, sample), label.clone());
    }
    found.into_neighbors()
}

/// The four-corner fixture from the query contract: unit labels on the
/// corners of a 10x10 square.
pub fn four_corners() -> Dataset<&'static str> {
    Dataset::new(
        vec![
            vec![0.0, 0.0],
            vec![10.0, 0.0],
            vec![0.0, 10.0],
            vec![10.0, 10.0],
        ],
        vec!["origin", "east", "north", "far"],
    )
    .expect("fixture is well-formed")
}
