//! User-facing dataset abstraction.
//!
//! This is the canonical entry point for the grow APIs: an ordered list of
//! feature vectors with one opaque label per row.

use std::fmt::Debug;

/// Trait for label payloads attached to samples.
///
/// Blanket-implemented for any type that is cloneable, comparable and
/// printable; trees never inspect labels beyond moving them around.
pub trait Label: Clone + PartialEq + Debug + Send + Sync {}

impl<T> Label for T where T: Clone + PartialEq + Debug + Send + Sync {}

/// Interpretation of a feature column.
///
/// Categorical features are stored as integer category ids widened to
/// `f64`; the column type tells splits to compare them by identity rather
/// than by order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    /// Ordered numeric values.
    Continuous,
    /// Unordered integer category ids.
    Categorical,
}

/// Dataset construction/validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DatasetError {
    #[error("inconsistent row dimension: row {row_idx} expected {expected}, got {got}")]
    InconsistentRows {
        row_idx: usize,
        expected: usize,
        got: usize,
    },

    #[error("number of labels ({labels}) does not match number of rows ({rows})")]
    LabelLenMismatch { rows: usize, labels: usize },

    #[error("number of column types ({types}) does not match number of columns ({columns})")]
    ColumnTypeLenMismatch { columns: usize, types: usize },

    #[error("column {column} is categorical but row {row} holds {value}, not a non-negative integer id")]
    InvalidCategoryId {
        column: usize,
        row: usize,
        value: f64,
    },
}

/// A user-facing dataset: samples in row-major layout plus parallel labels.
///
/// Rows keep their insertion order; partitioning preserves the relative
/// order within each half.
#[derive(Debug, Clone)]
pub struct Dataset<L: Label> {
    samples: Vec<Vec<f64>>,
    labels: Vec<L>,
    column_types: Vec<ColumnType>,
}

impl<L: Label> Dataset<L> {
    /// Create a dataset with all-continuous columns.
    pub fn new(samples: Vec<Vec<f64>>, labels: Vec<L>) -> Result<Self, DatasetError> {
        let n_columns = samples.first().map_or(0, Vec::len);
        Self::with_column_types(samples, labels, vec![ColumnType::Continuous; n_columns])
    }

    /// Create a dataset with explicit per-column types.
    ///
    /// Categorical columns must hold non-negative integer ids; any other
    /// value errors with [`DatasetError::InvalidCategoryId`], since
    /// splits compare ids by identity after a lossless `u64` cast.
    pub fn with_column_types(
        samples: Vec<Vec<f64>>,
        labels: Vec<L>,
        column_types: Vec<ColumnType>,
    ) -> Result<Self, DatasetError> {
        if labels.len() != samples.len() {
            return Err(DatasetError::LabelLenMismatch {
                rows: samples.len(),
                labels: labels.len(),
            });
        }

        let n_columns = samples.first().map_or(column_types.len(), Vec::len);
        for (row_idx, row) in samples.iter().enumerate() {
            if row.len() != n_columns {
                return Err(DatasetError::InconsistentRows {
                    row_idx,
                    expected: n_columns,
                    got: row.len(),
                });
            }
        }

        if column_types.len() != n_columns {
            return Err(DatasetError::ColumnTypeLenMismatch {
                columns: n_columns,
                types: column_types.len(),
            });
        }

        for (column, kind) in column_types.iter().enumerate() {
            if *kind != ColumnType::Categorical {
                continue;
            }
            for (row, values) in samples.iter().enumerate() {
                let value = values[column];
                let is_id = value.is_finite()
                    && value >= 0.0
                    && value.fract() == 0.0
                    && value <= u64::MAX as f64;
                if !is_id {
                    return Err(DatasetError::InvalidCategoryId { column, row, value });
                }
            }
        }

        Ok(Self {
            samples,
            labels,
            column_types,
        })
    }

    /// Number of rows.
    pub fn n_rows(&self) -> usize {
        self.samples.len()
    }

    /// Number of feature columns.
    pub fn n_columns(&self) -> usize {
        self.column_types.len()
    }

    /// Returns true if the dataset has no rows or no columns.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty() || self.column_types.is_empty()
    }

    /// Sample rows.
    pub fn samples(&self) -> &[Vec<f64>] {
        &self.samples
    }

    /// Labels (length = n_rows).
    pub fn labels(&self) -> &[L] {
        &self.labels
    }

    /// Per-column types (length = n_columns).
    pub fn column_types(&self) -> &[ColumnType] {
        &self.column_types
    }

    /// Type of a single column.
    ///
    /// # Panics
    /// Panics if `column` is out of range.
    pub fn column_type(&self, column: usize) -> ColumnType {
        self.column_types[column]
    }

    /// Values of a single column, in row order.
    ///
    /// # Panics
    /// The returned iterator panics if `column` is out of range.
    pub fn column(&self, column: usize) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(move |row| row[column])
    }

    /// Rows paired with their labels, in row order.
    pub fn iter(&self) -> impl Iterator<Item = (&[f64], &L)> {
        self.samples.iter().map(Vec::as_slice).zip(&self.labels)
    }

    /// Split into two datasets by a row predicate, consuming this one.
    ///
    /// Rows for which `goes_left` returns true land in the first half.
    /// Ownership of every row moves into exactly one half, so the parent's
    /// storage is released as soon as both halves are built.
    pub fn partition_by<F>(self, mut goes_left: F) -> (Self, Self)
    where
        F: FnMut(&[f64]) -> bool,
    {
        let mut left_samples = Vec::new();
        let mut left_labels = Vec::new();
        let mut right_samples = Vec::new();
        let mut right_labels = Vec::new();

        for (row, label) in self.samples.into_iter().zip(self.labels) {
            if goes_left(&row) {
                left_samples.push(row);
                left_labels.push(label);
            } else {
                right_samples.push(row);
                right_labels.push(label);
            }
        }

        let left = Self {
            samples: left_samples,
            labels: left_labels,
            column_types: self.column_types.clone(),
        };
        let right = Self {
            samples: right_samples,
            labels: right_labels,
            column_types: self.column_types,
        };
        (left, right)
    }

    /// Consume the dataset into its sample and label storage.
    pub fn into_rows(self) -> (Vec<Vec<f64>>, Vec<L>) {
        (self.samples, self.labels)
    }
}
