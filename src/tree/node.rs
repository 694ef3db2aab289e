//! Node and bound model shared by both tree variants.
//!
//! A tree is a strictly parent-owned structure: split nodes box their two
//! children, leaf nodes hold a batch of samples, and no node carries a
//! back-reference. All shape-dependent walks (`height`, `num_samples`,
//! validation) use explicit stacks so pathological inputs with many
//! duplicate feature values cannot overflow the call stack.
//!
//! Every node type derives serde so a grown tree can be exported as a
//! plain parent-agnostic literal and reconstructed later; the literal
//! carries no kernel or dataset handles.

use serde::{Deserialize, Serialize};

use crate::dataset::Label;
use crate::kernel::Kernel;

/// Slack allowed when testing bound membership.
///
/// Bounds are computed with floating-point arithmetic; a sample sitting
/// exactly on a ball surface can land epsilon outside it after the
/// mean/radius round trip.
pub const BOUND_TOLERANCE: f64 = 1e-9;

/// Floor applied to degenerate geometry (zero-variance columns,
/// zero-radius balls) so argmax selection and pruning stay well-defined.
pub(crate) const GEOMETRY_EPSILON: f64 = 1e-12;

// ============================================================================
// SplitValue
// ============================================================================

/// Tagged split discriminant value.
///
/// Numeric splits compare with `<`; categorical splits send every row
/// whose category id differs from the split id to the left.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SplitValue {
    /// Median of a continuous column.
    Numeric(f64),
    /// Upper-median category id of a categorical column.
    Categorical(u64),
}

impl SplitValue {
    /// Evaluate which side a feature value belongs to.
    ///
    /// Returns true for left, false for right.
    #[inline]
    pub fn goes_left(&self, feature: f64) -> bool {
        match self {
            Self::Numeric(median) => feature < *median,
            Self::Categorical(id) => feature != *id as f64,
        }
    }
}

// ============================================================================
// Bounds
// ============================================================================

/// Geometric region guaranteed to contain every sample beneath a node.
///
/// `min_distance` is the pruning primitive: a lower bound on the kernel
/// distance from a query to any point inside the region. Traversal skips
/// a subtree when that lower bound already exceeds the current search
/// radius.
pub trait Bound: Clone {
    /// Number of feature dimensions this bound spans.
    fn dimension(&self) -> usize;

    /// Whether `sample` lies inside the bound, with [`BOUND_TOLERANCE`]
    /// slack.
    fn contains<K: Kernel>(&self, sample: &[f64], kernel: &K) -> bool;

    /// Lower bound on the kernel distance from `query` to any point
    /// inside the region. Zero when the query is inside.
    fn min_distance<K: Kernel>(&self, query: &[f64], kernel: &K) -> f64;
}

/// Tight per-column min/max box over a set of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    min: Vec<f64>,
    max: Vec<f64>,
}

impl BoundingBox {
    /// Compute the tight box around a non-empty set of rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Self {
        debug_assert!(!rows.is_empty());
        let mut min = rows[0].clone();
        let mut max = rows[0].clone();
        for row in &rows[1..] {
            for (column, &value) in row.iter().enumerate() {
                if value < min[column] {
                    min[column] = value;
                }
                if value > max[column] {
                    max[column] = value;
                }
            }
        }
        Self { min, max }
    }

    /// Per-column lower corner.
    pub fn min(&self) -> &[f64] {
        &self.min
    }

    /// Per-column upper corner.
    pub fn max(&self) -> &[f64] {
        &self.max
    }
}

impl Bound for BoundingBox {
    fn dimension(&self) -> usize {
        self.min.len()
    }

    fn contains<K: Kernel>(&self, sample: &[f64], _kernel: &K) -> bool {
        sample.len() == self.min.len()
            && sample.iter().enumerate().all(|(column, &value)| {
                value >= self.min[column] - BOUND_TOLERANCE
                    && value <= self.max[column] + BOUND_TOLERANCE
            })
    }

    fn min_distance<K: Kernel>(&self, query: &[f64], kernel: &K) -> f64 {
        // The nearest box point is the query clamped into the box; for
        // the coordinate-separable Minkowski-family kernels this is the
        // exact minimum, not just a lower bound.
        let clamped: Vec<f64> = query
            .iter()
            .enumerate()
            .map(|(column, &value)| value.clamp(self.min[column], self.max[column]))
            .collect();
        kernel.distance(query, &clamped)
    }
}

/// Kernel ball: a center point plus the maximum kernel distance from it
/// to any contained sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBall {
    center: Vec<f64>,
    radius: f64,
}

impl BoundingBall {
    /// Compute the (mean, max-distance) ball around a non-empty set of
    /// rows. A zero radius (single or all-identical rows) is floored to
    /// a small epsilon to keep the geometry well-defined.
    pub fn from_rows<K: Kernel>(rows: &[Vec<f64>], kernel: &K) -> Self {
        debug_assert!(!rows.is_empty());
        let n_columns = rows[0].len();
        let mut center = vec![0.0; n_columns];
        for row in rows {
            for (column, &value) in row.iter().enumerate() {
                center[column] += value;
            }
        }
        for value in &mut center {
            *value /= rows.len() as f64;
        }

        let radius = rows
            .iter()
            .map(|row| kernel.distance(&center, row))
            .fold(0.0, f64::max)
            .max(GEOMETRY_EPSILON);

        Self { center, radius }
    }

    /// Ball center (per-column mean of the bounded samples).
    pub fn center(&self) -> &[f64] {
        &self.center
    }

    /// Ball radius.
    pub fn radius(&self) -> f64 {
        self.radius
    }
}

impl Bound for BoundingBall {
    fn dimension(&self) -> usize {
        self.center.len()
    }

    fn contains<K: Kernel>(&self, sample: &[f64], kernel: &K) -> bool {
        sample.len() == self.center.len()
            && kernel.distance(&self.center, sample) <= self.radius + BOUND_TOLERANCE
    }

    fn min_distance<K: Kernel>(&self, query: &[f64], kernel: &K) -> f64 {
        // Triangle inequality: nothing inside the ball can be closer than
        // the center distance minus the radius.
        (kernel.distance(query, &self.center) - self.radius).max(0.0)
    }
}

// ============================================================================
// Split discriminants
// ============================================================================

/// Discriminant of an axis-partitioning split: a single column compared
/// against its median.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSplit {
    column: usize,
    value: SplitValue,
}

impl AxisSplit {
    pub fn new(column: usize, value: SplitValue) -> Self {
        Self { column, value }
    }

    /// Column index the split compares.
    pub fn column(&self) -> usize {
        self.column
    }

    /// Split value for the column.
    pub fn value(&self) -> SplitValue {
        self.value
    }

    /// Which side a full row belongs to.
    #[inline]
    pub fn goes_left(&self, row: &[f64]) -> bool {
        self.value.goes_left(row[self.column])
    }
}

/// Discriminant of a centroid-partitioning split: two reference samples
/// ("poles"); every row belongs to the side of its nearer pole, ties to
/// the left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoleSplit {
    left: Vec<f64>,
    right: Vec<f64>,
}

impl PoleSplit {
    pub fn new(left: Vec<f64>, right: Vec<f64>) -> Self {
        Self { left, right }
    }

    /// Left reference sample.
    pub fn left_pole(&self) -> &[f64] {
        &self.left
    }

    /// Right reference sample.
    pub fn right_pole(&self) -> &[f64] {
        &self.right
    }

    /// Which side a row belongs to under the given kernel.
    #[inline]
    pub fn goes_left<K: Kernel>(&self, row: &[f64], kernel: &K) -> bool {
        kernel.distance(row, &self.left) <= kernel.distance(row, &self.right)
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Internal node: a bound over both partitions, the split discriminant,
/// and two exclusively-owned children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitNode<B, S, L> {
    bound: B,
    discriminant: S,
    left: Box<Node<B, S, L>>,
    right: Box<Node<B, S, L>>,
}

impl<B, S, L> SplitNode<B, S, L> {
    pub fn new(bound: B, discriminant: S, left: Node<B, S, L>, right: Node<B, S, L>) -> Self {
        Self {
            bound,
            discriminant,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn bound(&self) -> &B {
        &self.bound
    }

    pub fn discriminant(&self) -> &S {
        &self.discriminant
    }

    pub fn left(&self) -> &Node<B, S, L> {
        &self.left
    }

    pub fn right(&self) -> &Node<B, S, L> {
        &self.right
    }
}

/// Terminal node: a bound plus an ordered batch of samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafNode<B, L> {
    bound: B,
    samples: Vec<Vec<f64>>,
    labels: Vec<L>,
}

impl<B, L> LeafNode<B, L> {
    pub fn new(bound: B, samples: Vec<Vec<f64>>, labels: Vec<L>) -> Self {
        debug_assert_eq!(samples.len(), labels.len());
        Self {
            bound,
            samples,
            labels,
        }
    }

    pub fn bound(&self) -> &B {
        &self.bound
    }

    /// Number of samples stored in the leaf.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Samples paired with their labels, in insertion order.
    pub fn samples(&self) -> impl Iterator<Item = (&[f64], &L)> {
        self.samples.iter().map(Vec::as_slice).zip(&self.labels)
    }
}

/// A node in a spatial tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node<B, S, L> {
    /// Internal split node.
    Split(SplitNode<B, S, L>),
    /// Terminal batch of samples.
    Leaf(LeafNode<B, L>),
}

/// Node of an axis-partitioning (kd) tree.
pub type KdNode<L> = Node<BoundingBox, AxisSplit, L>;

/// Node of a centroid-partitioning (ball) tree.
pub type BallNode<L> = Node<BoundingBall, PoleSplit, L>;

impl<B, S, L> Node<B, S, L> {
    /// Returns true if this is a leaf node.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf(_))
    }

    /// Bound covering every sample beneath this node.
    #[inline]
    pub fn bound(&self) -> &B {
        match self {
            Self::Split(split) => split.bound(),
            Self::Leaf(leaf) => leaf.bound(),
        }
    }

    /// Height of the subtree rooted here; a lone leaf has height 1.
    ///
    /// Walks with an explicit stack: duplicate-heavy inputs can produce
    /// trees far deeper than the call stack tolerates.
    pub fn height(&self) -> usize {
        let mut max_depth = 0;
        let mut stack = vec![(self, 1usize)];
        while let Some((node, depth)) = stack.pop() {
            match node {
                Self::Leaf(_) => max_depth = max_depth.max(depth),
                Self::Split(split) => {
                    stack.push((split.left(), depth + 1));
                    stack.push((split.right(), depth + 1));
                }
            }
        }
        max_depth
    }

    /// Total number of samples stored in the subtree's leaves.
    pub fn num_samples(&self) -> usize {
        let mut total = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::Leaf(leaf) => total += leaf.len(),
                Self::Split(split) => {
                    stack.push(split.left());
                    stack.push(split.right());
                }
            }
        }
        total
    }
}

// ============================================================================
// Validation
// ============================================================================

/// Geometry/structure violations reported by tree validation.
///
/// These indicate a defect in bound computation or a hand-edited tree
/// literal, not bad user input. Oversized leaves are deliberately legal:
/// a degenerate partition that cannot subdivide terminates as one.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("sample {sample:?} lies outside the bound of an ancestor node")]
    SampleOutsideBound { sample: Vec<f64> },

    #[error("leaf node contains no samples")]
    EmptyLeaf,

    #[error("leaf stores {samples} samples but {labels} labels")]
    LeafLenMismatch { samples: usize, labels: usize },
}

/// Check the bounding invariant over a whole tree: every sample beneath
/// a node lies within that node's bound, every leaf is non-empty and its
/// sample/label storage is parallel.
///
/// O(n * depth); intended for tests and debug checks after `grow` or
/// after reconstructing a tree from an external literal.
pub(crate) fn validate_tree<B, S, L, K>(root: &Node<B, S, L>, kernel: &K) -> Result<(), ValidationError>
where
    B: Bound,
    L: Label,
    K: Kernel,
{
    let mut nodes = vec![root];
    while let Some(node) = nodes.pop() {
        if let Node::Leaf(leaf) = node {
            if leaf.samples.is_empty() {
                return Err(ValidationError::EmptyLeaf);
            }
            if leaf.samples.len() != leaf.labels.len() {
                return Err(ValidationError::LeafLenMismatch {
                    samples: leaf.samples.len(),
                    labels: leaf.labels.len(),
                });
            }
        }

        // Every leaf sample in this subtree must sit inside this node's
        // own bound, not just its leaf's.
        let mut subtree = vec![node];
        while let Some(inner) = subtree.pop() {
            match inner {
                Node::Leaf(leaf) => {
                    for (sample, _) in leaf.samples() {
                        if !node.bound().contains(sample, kernel) {
                            return Err(ValidationError::SampleOutsideBound {
                                sample: sample.to_vec(),
                            });
                        }
                    }
                }
                Node::Split(split) => {
                    subtree.push(split.left());
                    subtree.push(split.right());
                }
            }
        }

        if let Node::Split(split) = node {
            nodes.push(split.left());
            nodes.push(split.right());
        }
    }
    Ok(())
}
