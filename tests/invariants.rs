//! Structural and contract invariants.
//!
//! Bounding geometry, result shapes, self-retrievability, the concrete
//! four-corner scenarios, and the error surface of both tree variants.

mod common;

use common::random_rows;
use neighbors::testing::{four_corners, DEFAULT_TOLERANCE};
use neighbors::{
    BallTree, ColumnType, Dataset, Euclidean, KdTree, Label, Spatial, TreeError,
};
use rstest::rstest;

fn grown_pair(
    rows: Vec<Vec<f64>>,
    labels: Vec<usize>,
    max_leaf_size: usize,
) -> (KdTree<usize>, BallTree<usize>) {
    let mut kd = KdTree::new(max_leaf_size, Euclidean).unwrap();
    kd.grow(Dataset::new(rows.clone(), labels.clone()).unwrap())
        .unwrap();
    let mut ball = BallTree::new(max_leaf_size, Euclidean).unwrap();
    ball.grow(Dataset::new(rows, labels).unwrap()).unwrap();
    (kd, ball)
}

// =============================================================================
// Bounding invariant
// =============================================================================

#[rstest]
#[case(2, 1)]
#[case(3, 4)]
#[case(6, 30)]
fn grown_trees_pass_validation(#[case] n_columns: usize, #[case] max_leaf_size: usize) {
    let (rows, labels) = random_rows(99, 150, n_columns);
    let (kd, ball) = grown_pair(rows, labels, max_leaf_size);

    kd.validate().unwrap();
    ball.validate().unwrap();
}

// =============================================================================
// Result shape
// =============================================================================

#[test]
fn nearest_returns_min_k_n_sorted_ascending() {
    let (rows, labels) = random_rows(3, 60, 3);
    let (kd, ball) = grown_pair(rows, labels, 5);

    for k in [1, 2, 59, 60, 61, 500] {
        for tree in [&kd as &dyn Spatial<usize>, &ball] {
            let result = tree.nearest(&[0.0, 0.0, 0.0], k).unwrap();
            assert_eq!(result.len(), k.min(60));
            assert!(result
                .distances()
                .windows(2)
                .all(|pair| pair[0] <= pair[1]));
        }
    }
}

#[test]
fn every_sample_retrieves_itself() {
    let (rows, labels) = random_rows(17, 80, 4);
    let (kd, ball) = grown_pair(rows.clone(), labels.clone(), 8);

    for (row, label) in rows.iter().zip(&labels) {
        let from_kd = kd.range(row, DEFAULT_TOLERANCE).unwrap();
        assert!(from_kd.labels().contains(label));

        let from_ball = ball.range(row, DEFAULT_TOLERANCE).unwrap();
        assert!(from_ball.labels().contains(label));
    }
}

// =============================================================================
// Concrete four-corner scenarios
// =============================================================================

#[test]
fn four_corner_scenarios() {
    let mut kd: KdTree<&str> = KdTree::new(1, Euclidean).unwrap();
    kd.grow(four_corners()).unwrap();
    let mut ball: BallTree<&str> = BallTree::new(1, Euclidean).unwrap();
    ball.grow(four_corners()).unwrap();

    for tree in [&kd as &dyn Spatial<&str>, &ball] {
        let nearest = tree.nearest(&[1.0, 1.0], 1).unwrap();
        assert_eq!(nearest.labels(), ["origin"]);

        // Every corner sits ~7.07 from the center.
        let mut within_eight = tree.range(&[5.0, 5.0], 8.0).unwrap().into_parts().0;
        within_eight.sort_unstable();
        assert_eq!(within_eight, vec!["east", "far", "north", "origin"]);

        assert!(tree.range(&[5.0, 5.0], 1.0).unwrap().is_empty());
    }
}

// =============================================================================
// Height / balance / emptiness
// =============================================================================

#[test]
fn bare_tree_shape_accessors() {
    let kd: KdTree<u32> = KdTree::default();
    assert!(kd.is_empty());
    assert_eq!(kd.height(), 0);
    assert_eq!(kd.balance(), 0);

    let ball: BallTree<u32> = BallTree::default();
    assert!(ball.is_empty());
    assert_eq!(ball.height(), 0);
    assert_eq!(ball.balance(), 0);
}

#[test]
fn height_grows_with_splits_and_balance_is_bounded() {
    let (rows, labels) = random_rows(5, 128, 2);
    let (kd, ball) = grown_pair(rows, labels, 1);

    for tree in [&kd as &dyn Spatial<usize>, &ball] {
        assert!(!tree.is_empty());
        // 128 samples at leaf size 1 need at least 8 levels.
        assert!(tree.height() >= 8);
        assert!(tree.balance().unsigned_abs() < tree.height() as u64);
    }
}

// =============================================================================
// Error surface
// =============================================================================

#[test]
fn constructor_rejects_zero_leaf_size() {
    assert_eq!(
        KdTree::<u32, Euclidean>::new(0, Euclidean).unwrap_err(),
        TreeError::InvalidLeafSize { got: 0 }
    );
    assert_eq!(
        BallTree::<u32, Euclidean>::new(0, Euclidean).unwrap_err(),
        TreeError::InvalidLeafSize { got: 0 }
    );
}

#[test]
fn grow_on_empty_dataset_fails() {
    let empty = || Dataset::<u32>::new(vec![], vec![]).unwrap();

    let mut kd = KdTree::new(1, Euclidean).unwrap();
    assert_eq!(kd.grow(empty()).unwrap_err(), TreeError::EmptyDataset);

    let mut ball = BallTree::new(1, Euclidean).unwrap();
    assert_eq!(ball.grow(empty()).unwrap_err(), TreeError::EmptyDataset);
}

#[test]
fn query_before_grow_fails() {
    let kd: KdTree<u32> = KdTree::default();
    assert_eq!(kd.nearest(&[0.0], 1).unwrap_err(), TreeError::NotGrown);
    assert_eq!(kd.range(&[0.0], 1.0).unwrap_err(), TreeError::NotGrown);

    let ball: BallTree<u32> = BallTree::default();
    assert_eq!(ball.nearest(&[0.0], 1).unwrap_err(), TreeError::NotGrown);
    assert_eq!(ball.range(&[0.0], 1.0).unwrap_err(), TreeError::NotGrown);
}

#[test]
fn invalid_arguments_fail_without_partial_results() {
    let (rows, labels) = random_rows(1, 10, 2);
    let (kd, ball) = grown_pair(rows, labels, 2);

    for tree in [&kd as &dyn Spatial<usize>, &ball] {
        assert_eq!(tree.nearest(&[0.0, 0.0], 0).unwrap_err(), TreeError::InvalidK);
        assert_eq!(
            tree.range(&[0.0, 0.0], 0.0).unwrap_err(),
            TreeError::InvalidRadius { radius: 0.0 }
        );
        assert_eq!(
            tree.range(&[0.0, 0.0], -2.5).unwrap_err(),
            TreeError::InvalidRadius { radius: -2.5 }
        );
        assert_eq!(
            tree.nearest(&[0.0, 0.0, 0.0], 1).unwrap_err(),
            TreeError::DimensionMismatch { expected: 2, got: 3 }
        );
        assert_eq!(
            tree.range(&[0.0], 1.0).unwrap_err(),
            TreeError::DimensionMismatch { expected: 2, got: 1 }
        );
    }
}

#[test]
fn ball_tree_rejects_categorical_columns() {
    let dataset = Dataset::with_column_types(
        vec![vec![1.0, 0.0], vec![2.0, 1.0]],
        vec![0u32, 1],
        vec![ColumnType::Continuous, ColumnType::Categorical],
    )
    .unwrap();

    let mut ball = BallTree::new(1, Euclidean).unwrap();
    assert_eq!(
        ball.grow(dataset).unwrap_err(),
        TreeError::CategoricalNotSupported { column: 1 }
    );
}

#[test]
fn kd_tree_accepts_mixed_column_types() {
    let dataset = Dataset::with_column_types(
        vec![
            vec![1.0, 0.0],
            vec![2.0, 1.0],
            vec![3.0, 0.0],
            vec![4.0, 1.0],
        ],
        vec!["a", "b", "c", "d"],
        vec![ColumnType::Continuous, ColumnType::Categorical],
    )
    .unwrap();

    let mut kd = KdTree::new(1, Euclidean).unwrap();
    kd.grow(dataset).unwrap();
    kd.validate().unwrap();
    assert_eq!(kd.num_samples(), 4);
}

// =============================================================================
// Strategy swapping through the trait object
// =============================================================================

#[test]
fn trees_are_interchangeable_behind_the_trait() {
    fn nearest_label<L: Label>(index: &mut dyn Spatial<L>, dataset: Dataset<L>, query: &[f64]) -> L {
        index.grow(dataset).unwrap();
        index.nearest(query, 1).unwrap().labels()[0].clone()
    }

    let mut kd: KdTree<&str> = KdTree::default();
    let mut ball: BallTree<&str> = BallTree::default();
    assert_eq!(nearest_label(&mut kd, four_corners(), &[9.0, 9.5]), "far");
    assert_eq!(nearest_label(&mut ball, four_corners(), &[9.0, 9.5]), "far");
}
