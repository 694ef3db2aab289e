//! Centroid-partitioning tree.
//!
//! Splits by proximity to two reference poles and bounds every subtree
//! with a kernel ball (per-column mean, max kernel distance). Because
//! both the partitioning rule and the bound are kernel-distance geometry,
//! this variant is restricted to continuous columns; unordered category
//! ids have no meaningful mean or distance and are rejected at `grow`.

use crate::dataset::{ColumnType, Dataset, Label};
use crate::kernel::{Euclidean, Kernel};

use super::node::{
    validate_tree, BallNode, Bound, BoundingBall, LeafNode, Node, PoleSplit, SplitNode,
    ValidationError,
};
use super::search::{KnnBuffer, Neighbors, RangeBuffer};
use super::{Spatial, TreeError, DEFAULT_MAX_LEAF_SIZE};

/// Exact nearest-neighbour and radius search via recursive two-pole
/// partitioning.
///
/// Immutable once grown; a second [`grow`](BallTree::grow) replaces the
/// whole structure. Queries from multiple threads are safe without
/// locking.
#[derive(Debug, Clone)]
pub struct BallTree<L: Label, K: Kernel = Euclidean> {
    max_leaf_size: usize,
    kernel: K,
    root: Option<BallNode<L>>,
}

/// Arena entry used during the iterative build; see the kd variant for
/// the slot-ordering invariant.
enum Slot<L: Label> {
    Pending,
    Leaf(LeafNode<BoundingBall, L>),
    Split {
        bound: BoundingBall,
        discriminant: PoleSplit,
        left: usize,
        right: usize,
    },
}

impl<L: Label, K: Kernel> BallTree<L, K> {
    /// Create a bare tree.
    ///
    /// Errors with [`TreeError::InvalidLeafSize`] when `max_leaf_size`
    /// is zero.
    pub fn new(max_leaf_size: usize, kernel: K) -> Result<Self, TreeError> {
        if max_leaf_size < 1 {
            return Err(TreeError::InvalidLeafSize { got: max_leaf_size });
        }
        Ok(Self {
            max_leaf_size,
            kernel,
            root: None,
        })
    }

    /// Leaf-size threshold the tree was configured with.
    pub fn max_leaf_size(&self) -> usize {
        self.max_leaf_size
    }

    /// Distance kernel used for both partitioning and search.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Root of the grown tree, if any; a plain parent-agnostic literal
    /// for external persistence (see [`KdTree::root`](super::KdTree::root)).
    pub fn root(&self) -> Option<&BallNode<L>> {
        self.root.as_ref()
    }

    /// Rebuild a tree around a previously exported node literal.
    pub fn from_root(max_leaf_size: usize, kernel: K, root: BallNode<L>) -> Result<Self, TreeError> {
        let mut tree = Self::new(max_leaf_size, kernel)?;
        tree.root = Some(root);
        Ok(tree)
    }

    /// Total number of samples stored in the tree.
    pub fn num_samples(&self) -> usize {
        self.root.as_ref().map_or(0, Node::num_samples)
    }

    /// Dimensionality the tree was grown with, if grown.
    pub fn dimension(&self) -> Option<usize> {
        self.root.as_ref().map(|root| root.bound().dimension())
    }

    /// Check the bounding invariant over the whole tree.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.root {
            Some(root) => validate_tree(root, &self.kernel),
            None => Ok(()),
        }
    }

    /// Build the tree from `dataset`, replacing any previous contents.
    ///
    /// Errors with [`TreeError::CategoricalNotSupported`] when any
    /// column is categorical.
    pub fn grow(&mut self, dataset: Dataset<L>) -> Result<(), TreeError> {
        if dataset.is_empty() {
            return Err(TreeError::EmptyDataset);
        }
        if let Some(column) = dataset
            .column_types()
            .iter()
            .position(|kind| *kind == ColumnType::Categorical)
        {
            return Err(TreeError::CategoricalNotSupported { column });
        }

        let mut slots: Vec<Slot<L>> = vec![Slot::Pending];
        let mut stack: Vec<(usize, Dataset<L>)> = vec![(0, dataset)];

        while let Some((slot, data)) = stack.pop() {
            let bound = BoundingBall::from_rows(data.samples(), &self.kernel);
            debug_assert!(
                data.samples().iter().all(|row| bound.contains(row, &self.kernel)),
                "computed bound must cover every assigned sample"
            );

            if data.n_rows() <= self.max_leaf_size {
                slots[slot] = Self::finish_leaf(bound, data);
                continue;
            }

            let discriminant = self.pick_poles(&data, &bound);
            let kernel = &self.kernel;
            let (left_data, right_data) =
                data.partition_by(|row| discriminant.goes_left(row, kernel));

            if left_data.n_rows() == 0 || right_data.n_rows() == 0 {
                // All rows tied to one pole (identical points); terminate
                // as an oversized leaf.
                let data = if left_data.n_rows() == 0 {
                    right_data
                } else {
                    left_data
                };
                slots[slot] = Self::finish_leaf(bound, data);
                continue;
            }

            let left = slots.len();
            slots.push(Slot::Pending);
            let right = slots.len();
            slots.push(Slot::Pending);
            slots[slot] = Slot::Split {
                bound,
                discriminant,
                left,
                right,
            };
            stack.push((right, right_data));
            stack.push((left, left_data));
        }

        self.root = Some(assemble(slots));
        Ok(())
    }

    fn finish_leaf(bound: BoundingBall, data: Dataset<L>) -> Slot<L> {
        let (samples, labels) = data.into_rows();
        Slot::Leaf(LeafNode::new(bound, samples, labels))
    }

    /// Select the two reference poles for a node: the sample farthest
    /// from the center, then the sample farthest from that one. First
    /// argmax wins on ties.
    fn pick_poles(&self, data: &Dataset<L>, bound: &BoundingBall) -> PoleSplit {
        let left = farthest_from(data, bound.center(), &self.kernel);
        let right = farthest_from(data, &left, &self.kernel);
        PoleSplit::new(left, right)
    }

    /// The `k` nearest samples to `query`, sorted ascending by distance.
    pub fn nearest(&self, query: &[f64], k: usize) -> Result<Neighbors<L>, TreeError> {
        if k < 1 {
            return Err(TreeError::InvalidK);
        }
        let root = self.root.as_ref().ok_or(TreeError::NotGrown)?;
        check_dimension(root.bound().dimension(), query)?;

        let mut best = KnnBuffer::new(k);
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.bound().min_distance(query, &self.kernel) > best.radius() {
                continue;
            }
            match node {
                Node::Leaf(leaf) => {
                    for (sample, label) in leaf.samples() {
                        best.push(self.kernel.distance(query, sample), label.clone());
                    }
                }
                Node::Split(split) => {
                    let (near, far) = self.promising_order(split, query);
                    stack.push(far);
                    stack.push(near);
                }
            }
        }
        Ok(best.into_neighbors())
    }

    /// All samples within `radius` of `query`, in visitation order.
    pub fn range(&self, query: &[f64], radius: f64) -> Result<Neighbors<L>, TreeError> {
        if radius <= 0.0 {
            return Err(TreeError::InvalidRadius { radius });
        }
        let root = self.root.as_ref().ok_or(TreeError::NotGrown)?;
        check_dimension(root.bound().dimension(), query)?;

        let mut found = RangeBuffer::new(radius);
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            if node.bound().min_distance(query, &self.kernel) > radius {
                continue;
            }
            match node {
                Node::Leaf(leaf) => {
                    for (sample, label) in leaf.samples() {
                        found.push(self.kernel.distance(query, sample), label.clone());
                    }
                }
                Node::Split(split) => {
                    let (near, far) = self.promising_order(split, query);
                    stack.push(far);
                    stack.push(near);
                }
            }
        }
        Ok(found.into_neighbors())
    }

    #[inline]
    fn promising_order<'a>(
        &self,
        split: &'a SplitNode<BoundingBall, PoleSplit, L>,
        query: &[f64],
    ) -> (&'a BallNode<L>, &'a BallNode<L>) {
        if split.discriminant().goes_left(query, &self.kernel) {
            (split.left(), split.right())
        } else {
            (split.right(), split.left())
        }
    }

    /// Height of the tree; 0 when bare, 1 for a lone leaf.
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, Node::height)
    }

    /// Right subtree height minus left subtree height at the root.
    pub fn balance(&self) -> i64 {
        match &self.root {
            Some(Node::Split(split)) => {
                split.right().height() as i64 - split.left().height() as i64
            }
            _ => 0,
        }
    }

    /// True until the first successful `grow`.
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Run [`nearest`](BallTree::nearest) for a batch of queries.
    pub fn nearest_batch(&self, queries: &[Vec<f64>], k: usize) -> Result<Vec<Neighbors<L>>, TreeError> {
        queries.iter().map(|query| self.nearest(query, k)).collect()
    }

    /// Parallel batch variant of [`nearest`](BallTree::nearest).
    pub fn par_nearest_batch(
        &self,
        queries: &[Vec<f64>],
        k: usize,
    ) -> Result<Vec<Neighbors<L>>, TreeError> {
        use rayon::prelude::*;

        queries
            .par_iter()
            .map(|query| self.nearest(query, k))
            .collect()
    }
}

impl<L: Label, K: Kernel + Default> Default for BallTree<L, K> {
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            kernel: K::default(),
            root: None,
        }
    }
}

impl<L: Label, K: Kernel> Spatial<L> for BallTree<L, K> {
    fn grow(&mut self, dataset: Dataset<L>) -> Result<(), TreeError> {
        BallTree::grow(self, dataset)
    }

    fn nearest(&self, query: &[f64], k: usize) -> Result<Neighbors<L>, TreeError> {
        BallTree::nearest(self, query, k)
    }

    fn range(&self, query: &[f64], radius: f64) -> Result<Neighbors<L>, TreeError> {
        BallTree::range(self, query, radius)
    }

    fn height(&self) -> usize {
        BallTree::height(self)
    }

    fn balance(&self) -> i64 {
        BallTree::balance(self)
    }

    fn is_empty(&self) -> bool {
        BallTree::is_empty(self)
    }
}

/// Link the slot arena into an owned node tree (children occupy strictly
/// higher slots than their parent).
fn assemble<L: Label>(mut slots: Vec<Slot<L>>) -> BallNode<L> {
    let mut nodes: Vec<Option<BallNode<L>>> = slots.iter().map(|_| None).collect();
    for idx in (0..slots.len()).rev() {
        let node = match std::mem::replace(&mut slots[idx], Slot::Pending) {
            Slot::Leaf(leaf) => Node::Leaf(leaf),
            Slot::Split {
                bound,
                discriminant,
                left,
                right,
            } => {
                let left = nodes[left].take().expect("child slot assembled before parent");
                let right = nodes[right].take().expect("child slot assembled before parent");
                Node::Split(SplitNode::new(bound, discriminant, left, right))
            }
            Slot::Pending => unreachable!("every slot receives a node during growth"),
        };
        nodes[idx] = Some(node);
    }
    nodes[0].take().expect("root slot assembled last")
}

/// Row with the maximum kernel distance from `reference`; the first
/// argmax wins on ties.
fn farthest_from<L: Label, K: Kernel>(data: &Dataset<L>, reference: &[f64], kernel: &K) -> Vec<f64> {
    let mut best = data.samples()[0].clone();
    let mut best_distance = kernel.distance(reference, &best);
    for row in &data.samples()[1..] {
        let distance = kernel.distance(reference, row);
        if distance > best_distance {
            best_distance = distance;
            best = row.clone();
        }
    }
    best
}

fn check_dimension(expected: usize, query: &[f64]) -> Result<(), TreeError> {
    if query.len() != expected {
        return Err(TreeError::DimensionMismatch {
            expected,
            got: query.len(),
        });
    }
    Ok(())
}
