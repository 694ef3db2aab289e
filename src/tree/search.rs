//! Query result assembly shared by both tree variants.
//!
//! Two accumulation strategies: [`KnnBuffer`] keeps the k best candidates
//! sorted ascending with a shrinking pruning radius, [`RangeBuffer`]
//! collects everything inside a fixed radius in visitation order.

use crate::dataset::Label;

/// Result of a nearest or range query: parallel labels and distances.
///
/// For k-NN the pairs are sorted ascending by distance; for range queries
/// the order is traversal order and is not part of the contract.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbors<L: Label> {
    labels: Vec<L>,
    distances: Vec<f64>,
}

impl<L: Label> Neighbors<L> {
    pub(crate) fn new(labels: Vec<L>, distances: Vec<f64>) -> Self {
        debug_assert_eq!(labels.len(), distances.len());
        Self { labels, distances }
    }

    /// Number of result pairs.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Result labels.
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Kernel distances parallel to [`labels`](Self::labels).
    pub fn distances(&self) -> &[f64] {
        &self.distances
    }

    /// Label/distance pairs in result order.
    pub fn iter(&self) -> impl Iterator<Item = (&L, f64)> {
        self.labels.iter().zip(self.distances.iter().copied())
    }

    /// Consume into the parallel label and distance vectors.
    pub fn into_parts(self) -> (Vec<L>, Vec<f64>) {
        (self.labels, self.distances)
    }
}

/// Running top-k candidate list for nearest-neighbour search.
///
/// Entries stay sorted ascending by distance; on ties the earlier
/// insertion wins the earlier position. `radius()` is the pruning bound:
/// the k-th best distance once full, infinity before that.
#[derive(Debug, Clone)]
pub struct KnnBuffer<L: Label> {
    k: usize,
    entries: Vec<(f64, L)>,
}

impl<L: Label> KnnBuffer<L> {
    /// Create a buffer holding at most `k` candidates.
    pub fn new(k: usize) -> Self {
        debug_assert!(k >= 1);
        Self {
            k,
            entries: Vec::with_capacity(k + 1),
        }
    }

    /// Current pruning radius: the k-th best distance, or infinity while
    /// fewer than k candidates have been seen.
    #[inline]
    pub fn radius(&self) -> f64 {
        if self.entries.len() == self.k {
            self.entries[self.k - 1].0
        } else {
            f64::INFINITY
        }
    }

    /// Offer a candidate; it is kept only if it improves the top-k.
    pub fn push(&mut self, distance: f64, label: L) {
        if self.entries.len() == self.k && distance >= self.entries[self.k - 1].0 {
            return;
        }
        // `<=` places a tie after its equals, keeping insertion order
        // stable.
        let idx = self.entries.partition_point(|(d, _)| *d <= distance);
        self.entries.insert(idx, (distance, label));
        self.entries.truncate(self.k);
    }

    /// Number of candidates currently held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume into an ascending-sorted result.
    pub fn into_neighbors(self) -> Neighbors<L> {
        let mut labels = Vec::with_capacity(self.entries.len());
        let mut distances = Vec::with_capacity(self.entries.len());
        for (distance, label) in self.entries {
            labels.push(label);
            distances.push(distance);
        }
        Neighbors::new(labels, distances)
    }
}

/// Visitation-order accumulator for range queries.
#[derive(Debug, Clone)]
pub struct RangeBuffer<L: Label> {
    radius: f64,
    labels: Vec<L>,
    distances: Vec<f64>,
}

impl<L: Label> RangeBuffer<L> {
    /// Create a buffer collecting pairs within `radius`.
    pub fn new(radius: f64) -> Self {
        debug_assert!(radius > 0.0);
        Self {
            radius,
            labels: Vec::new(),
            distances: Vec::new(),
        }
    }

    /// Search radius the buffer filters against.
    #[inline]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    /// Keep the candidate if it lies within the radius.
    pub fn push(&mut self, distance: f64, label: L) {
        if distance <= self.radius {
            self.labels.push(label);
            self.distances.push(distance);
        }
    }

    /// Consume into a visitation-ordered result.
    pub fn into_neighbors(self) -> Neighbors<L> {
        Neighbors::new(self.labels, self.distances)
    }
}
