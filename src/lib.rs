//! neighbors: exact nearest-neighbour and radius search over labeled
//! feature vectors.
//!
//! This crate provides two spatial index strategies behind one query
//! contract: an axis-partitioning [`KdTree`] (median splits, box bounds,
//! mixed continuous/categorical columns) and a centroid-partitioning
//! [`BallTree`] (two-pole splits, ball bounds, continuous columns only).
//! Both grow in one pass with explicit work-stacks, prune search with
//! branch-and-bound over geometric bounds, and return exact results.
//!
//! # Example
//!
//! ```
//! use neighbors::{Dataset, KdTree};
//!
//! let dataset = Dataset::new(
//!     vec![vec![0.0, 0.0], vec![10.0, 0.0], vec![0.0, 10.0]],
//!     vec!["a", "b", "c"],
//! )?;
//!
//! let mut tree: KdTree<&str> = KdTree::default();
//! tree.grow(dataset)?;
//!
//! let hits = tree.nearest(&[1.0, 1.0], 1)?;
//! assert_eq!(hits.labels(), ["a"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod dataset;
pub mod kernel;
pub mod testing;
pub mod tree;

pub use dataset::{ColumnType, Dataset, DatasetError, Label};
pub use kernel::{Chebyshev, Euclidean, Kernel, Manhattan, Minkowski};
pub use tree::{BallTree, KdTree, Neighbors, Spatial, TreeError, DEFAULT_MAX_LEAF_SIZE};
