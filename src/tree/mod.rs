//! Spatial trees for exact nearest-neighbour and radius search.
//!
//! Two interchangeable strategies share one query contract:
//!
//! - [`KdTree`]: axis-partitioning; splits on the median of the
//!   highest-variance column, bounds subtrees with tight axis-aligned
//!   boxes. Supports mixed continuous/categorical columns.
//! - [`BallTree`]: centroid-partitioning; splits by proximity to two
//!   reference poles, bounds subtrees with kernel balls. Continuous
//!   columns only.
//!
//! Both grow with explicit work-stacks (never native recursion on tree
//! shape), answer queries with branch-and-bound pruning, and are
//! immutable after `grow`: a grown tree is plain `Send + Sync` data and
//! safe for concurrent queries without locking.

pub mod ball;
pub mod kd;
pub mod node;
pub mod search;

pub use ball::BallTree;
pub use kd::KdTree;
pub use node::{
    AxisSplit, BallNode, Bound, BoundingBall, BoundingBox, KdNode, LeafNode, Node, PoleSplit,
    SplitNode, SplitValue, ValidationError, BOUND_TOLERANCE,
};
pub use search::{KnnBuffer, Neighbors, RangeBuffer};

use crate::dataset::{Dataset, Label};

/// Default `max_leaf_size` used by [`KdTree::default`] and
/// [`BallTree::default`].
pub const DEFAULT_MAX_LEAF_SIZE: usize = 30;

/// Tree configuration, growth and query errors.
///
/// All errors are reported synchronously at the offending call; nothing
/// is retried and no partial results are produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TreeError {
    /// `max_leaf_size` below 1.
    #[error("max leaf size must be at least 1, got {got}")]
    InvalidLeafSize { got: usize },

    /// `grow` called with zero rows or zero columns.
    #[error("cannot grow a tree from an empty dataset")]
    EmptyDataset,

    /// Ball trees partition by kernel distance and have no geometry for
    /// unordered category ids.
    #[error("ball trees support continuous columns only, column {column} is categorical")]
    CategoricalNotSupported { column: usize },

    /// Query issued before any successful `grow`.
    #[error("tree has not been grown yet")]
    NotGrown,

    /// `nearest` called with `k < 1`.
    #[error("k must be at least 1")]
    InvalidK,

    /// `range` called with a non-positive radius.
    #[error("search radius must be positive, got {radius}")]
    InvalidRadius { radius: f64 },

    /// Query vector length differs from the grown dimensionality.
    #[error("query has dimension {got}, tree was grown with dimension {expected}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Common surface of both tree strategies.
///
/// Object-safe so downstream consumers (neighbour classifiers, density
/// scorers) can hold a `Box<dyn Spatial<L>>` and swap strategies.
pub trait Spatial<L: Label> {
    /// Build the tree from `dataset`, replacing any previous contents
    /// wholesale.
    fn grow(&mut self, dataset: Dataset<L>) -> Result<(), TreeError>;

    /// The `k` nearest samples to `query`, sorted ascending by distance.
    ///
    /// Returns exactly `min(k, n_samples)` pairs.
    fn nearest(&self, query: &[f64], k: usize) -> Result<Neighbors<L>, TreeError>;

    /// All samples within `radius` of `query`, in visitation order.
    fn range(&self, query: &[f64], radius: f64) -> Result<Neighbors<L>, TreeError>;

    /// Height of the tree; 0 when not grown, 1 for a lone leaf.
    fn height(&self) -> usize;

    /// Right subtree height minus left subtree height at the root; 0 for
    /// bare or leaf-rooted trees.
    fn balance(&self) -> i64;

    /// True until the first successful `grow`.
    fn is_empty(&self) -> bool;
}
