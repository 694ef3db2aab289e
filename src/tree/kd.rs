//! Axis-partitioning tree.
//!
//! Splits on the median of the highest-variance column and bounds every
//! subtree with a tight axis-aligned box. Continuous columns compare with
//! `<`; categorical columns send every id different from the median id to
//! the left, so mixed-type datasets grow fine.

use crate::dataset::{ColumnType, Dataset, Label};
use crate::kernel::{Euclidean, Kernel};

use super::node::{
    validate_tree, AxisSplit, Bound, BoundingBox, KdNode, LeafNode, Node, SplitNode, SplitValue,
    ValidationError, GEOMETRY_EPSILON,
};
use super::search::{KnnBuffer, Neighbors, RangeBuffer};
use super::{Spatial, TreeError, DEFAULT_MAX_LEAF_SIZE};

/// Exact nearest-neighbour and radius search via recursive axis-aligned
/// median splits.
///
/// Immutable once grown; a second [`grow`](KdTree::grow) replaces the
/// whole structure. Queries from multiple threads are safe without
/// locking.
#[derive(Debug, Clone)]
pub struct KdTree<L: Label, K: Kernel = Euclidean> {
    max_leaf_size: usize,
    kernel: K,
    root: Option<KdNode<L>>,
}

/// Arena entry used during the iterative build.
///
/// Child slots are always allocated after their parent's, so a single
/// reverse pass can link boxed children without recursion.
enum Slot<L: Label> {
    Pending,
    Leaf(LeafNode<BoundingBox, L>),
    Split {
        bound: BoundingBox,
        discriminant: AxisSplit,
        left: usize,
        right: usize,
    },
}

impl<L: Label, K: Kernel> KdTree<L, K> {
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

    /// Distance kernel used for search.
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Root of the grown tree, if any.
    ///
    /// The node tree is a plain parent-agnostic literal (serde-
    /// serializable, no kernel or dataset handles); an external
    /// persistence layer can store it and rebuild the tree with
    /// [`from_root`](KdTree::from_root).
    pub fn root(&self) -> Option<&KdNode<L>> {
        self.root.as_ref()
    }

    /// Rebuild a tree around a previously exported node literal.
    pub fn from_root(max_leaf_size: usize, kernel: K, root: KdNode<L>) -> Result<Self, TreeError> {
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
    ///
    /// Intended for tests and debug checks, and for vetting trees
    /// reconstructed from external literals.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.root {
            Some(root) => validate_tree(root, &self.kernel),
            None => Ok(()),
        }
    }

    /// Build the tree from `dataset`, replacing any previous contents.
    pub fn grow(&mut self, dataset: Dataset<L>) -> Result<(), TreeError> {
        if dataset.is_empty() {
            return Err(TreeError::EmptyDataset);
        }

        let mut slots: Vec<Slot<L>> = vec![Slot::Pending];
        let mut stack: Vec<(usize, Dataset<L>)> = vec![(0, dataset)];

        while let Some((slot, data)) = stack.pop() {
            let bound = BoundingBox::from_rows(data.samples());
            debug_assert!(
                data.samples().iter().all(|row| bound.contains(row, &self.kernel)),
                "computed bound must cover every assigned sample"
            );

            if data.n_rows() <= self.max_leaf_size {
                slots[slot] = Self::finish_leaf(bound, data);
                continue;
            }

            let column = max_variance_column(&data);
            let value = column_median(&data, column);
            let discriminant = AxisSplit::new(column, value);

            // Partitioning consumes the parent's buffers; each row moves
            // into exactly one side, keeping construction memory bounded.
            let (left_data, right_data) = data.partition_by(|row| discriminant.goes_left(row));

            if left_data.n_rows() == 0 || right_data.n_rows() == 0 {
                // Every row fell on one side of the median (duplicate
                // values); terminate as an oversized leaf.
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

    fn finish_leaf(bound: BoundingBox, data: Dataset<L>) -> Slot<L> {
        let (samples, labels) = data.into_rows();
        Slot::Leaf(LeafNode::new(bound, samples, labels))
    }

    /// The `k` nearest samples to `query`, sorted ascending by distance.
    ///
    /// Returns exactly `min(k, n_samples)` label/distance pairs; ties
    /// keep insertion order.
    pub fn nearest(&self, query: &[f64], k: usize) -> Result<Neighbors<L>, TreeError> {
        if k < 1 {
            return Err(TreeError::InvalidK);
        }
        let root = self.root.as_ref().ok_or(TreeError::NotGrown)?;
        check_dimension(root.bound().dimension(), query)?;

        let mut best = KnnBuffer::new(k);
        let mut stack = vec![root];
        while let Some(node) = stack.pop() {
            // Re-checked at pop time so radius shrinkage from earlier
            // leaves prunes nodes that looked promising when pushed.
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
                    let (near, far) = promising_order(split, query);
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
                    let (near, far) = promising_order(split, query);
                    stack.push(far);
                    stack.push(near);
                }
            }
        }
        Ok(found.into_neighbors())
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

    /// Run [`nearest`](KdTree::nearest) for a batch of queries.
    pub fn nearest_batch(&self, queries: &[Vec<f64>], k: usize) -> Result<Vec<Neighbors<L>>, TreeError> {
        queries.iter().map(|query| self.nearest(query, k)).collect()
    }

    /// Parallel batch variant of [`nearest`](KdTree::nearest).
    ///
    /// The grown tree is read-only, so queries fan out across the rayon
    /// pool without locking.
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

impl<L: Label, K: Kernel + Default> Default for KdTree<L, K> {
    fn default() -> Self {
        Self {
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            kernel: K::default(),
            root: None,
        }
    }
}

impl<L: Label, K: Kernel> Spatial<L> for KdTree<L, K> {
    fn grow(&mut self, dataset: Dataset<L>) -> Result<(), TreeError> {
        KdTree::grow(self, dataset)
    }

    fn nearest(&self, query: &[f64], k: usize) -> Result<Neighbors<L>, TreeError> {
        KdTree::nearest(self, query, k)
    }

    fn range(&self, query: &[f64], radius: f64) -> Result<Neighbors<L>, TreeError> {
        KdTree::range(self, query, radius)
    }

    fn height(&self) -> usize {
        KdTree::height(self)
    }

    fn balance(&self) -> i64 {
        KdTree::balance(self)
    }

    fn is_empty(&self) -> bool {
        KdTree::is_empty(self)
    }
}

/// Link the slot arena into an owned node tree.
///
/// Children occupy strictly higher slots than their parent, so walking
/// the arena backwards guarantees both children exist before their
/// parent is assembled.
fn assemble<L: Label>(mut slots: Vec<Slot<L>>) -> KdNode<L> {
    let mut nodes: Vec<Option<KdNode<L>>> = slots.iter().map(|_| None).collect();
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

#[inline]
fn promising_order<'a, L: Label>(
    split: &'a SplitNode<BoundingBox, AxisSplit, L>,
    query: &[f64],
) -> (&'a KdNode<L>, &'a KdNode<L>) {
    if split.discriminant().goes_left(query) {
        (split.left(), split.right())
    } else {
        (split.right(), split.left())
    }
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

/// Column with the largest variance over the dataset's rows.
///
/// Category ids are treated numerically here; variance only ranks
/// columns by spread, the split comparator stays categorical. Zero
/// variances floor to a small epsilon so argmax stays defined, ties keep
/// the first column.
fn max_variance_column<L: Label>(data: &Dataset<L>) -> usize {
    let n = data.n_rows() as f64;
    let mut best_column = 0;
    let mut best_variance = f64::NEG_INFINITY;
    for column in 0..data.n_columns() {
        let mean = data.column(column).sum::<f64>() / n;
        let variance = data
            .column(column)
            .map(|value| (value - mean) * (value - mean))
            .sum::<f64>()
            / n;
        let variance = variance.max(GEOMETRY_EPSILON);
        if variance > best_variance {
            best_variance = variance;
            best_column = column;
        }
    }
    best_column
}

/// Median split value of a column.
///
/// Continuous columns average the two middle values for even counts;
/// categorical columns take the upper-median id so the split value is
/// always an existing category.
fn column_median<L: Label>(data: &Dataset<L>, column: usize) -> SplitValue {
    let mut values: Vec<f64> = data.column(column).collect();
    values.sort_by(f64::total_cmp);
    let n = values.len();
    match data.column_type(column) {
        ColumnType::Continuous => {
            let median = if n % 2 == 0 {
                (values[n / 2 - 1] + values[n / 2]) / 2.0
            } else {
                values[n / 2]
            };
            SplitValue::Numeric(median)
        }
        ColumnType::Categorical => SplitValue::Categorical(values[n / 2] as u64),
    }
}
