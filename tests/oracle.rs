//! Oracle equivalence tests.
//!
//! Both tree variants must return exactly what a brute-force linear scan
//! returns, across dimensionalities, leaf sizes and kernels.

mod common;

use common::{random_queries, random_rows};
use neighbors::testing::{linear_nearest, linear_range};
use neighbors::{
    BallTree, Chebyshev, ColumnType, Dataset, Euclidean, KdTree, Kernel, Manhattan, Minkowski,
};
use rstest::rstest;

const N_ROWS: usize = 200;
const N_QUERIES: usize = 25;

fn check_nearest_and_range<K: Kernel>(kernel: K, n_columns: usize, max_leaf_size: usize, seed: u64) {
    let (rows, labels) = random_rows(seed, N_ROWS, n_columns);
    let queries = random_queries(seed ^ 0x9e37_79b9, N_QUERIES, n_columns);

    let mut kd = KdTree::new(max_leaf_size, kernel.clone()).unwrap();
    kd.grow(Dataset::new(rows.clone(), labels.clone()).unwrap())
        .unwrap();
    let mut ball = BallTree::new(max_leaf_size, kernel.clone()).unwrap();
    ball.grow(Dataset::new(rows.clone(), labels.clone()).unwrap())
        .unwrap();

    for query in &queries {
        for k in [1, 3, 10, N_ROWS + 5] {
            let oracle = linear_nearest(&rows, &labels, &kernel, query, k);
            let from_kd = kd.nearest(query, k).unwrap();
            let from_ball = ball.nearest(query, k).unwrap();

            assert_eq!(from_kd.labels(), oracle.labels(), "kd k={k}");
            assert_eq!(from_kd.distances(), oracle.distances(), "kd k={k}");
            assert_eq!(from_ball.labels(), oracle.labels(), "ball k={k}");
            assert_eq!(from_ball.distances(), oracle.distances(), "ball k={k}");
        }

        for radius in [0.5, 3.0, 12.0] {
            let mut oracle = linear_range(&rows, &labels, &kernel, query, radius)
                .into_parts()
                .0;
            oracle.sort_unstable();

            // Range results are a set contract; visitation order is free.
            let mut from_kd = kd.range(query, radius).unwrap().into_parts().0;
            from_kd.sort_unstable();
            let mut from_ball = ball.range(query, radius).unwrap().into_parts().0;
            from_ball.sort_unstable();

            assert_eq!(from_kd, oracle, "kd radius={radius}");
            assert_eq!(from_ball, oracle, "ball radius={radius}");
        }
    }
}

#[rstest]
#[case(1, 1)]
#[case(2, 1)]
#[case(2, 7)]
#[case(3, 3)]
#[case(5, 30)]
#[case(8, 16)]
fn euclidean_matches_linear_scan(#[case] n_columns: usize, #[case] max_leaf_size: usize) {
    check_nearest_and_range(Euclidean, n_columns, max_leaf_size, 42);
}

#[rstest]
#[case(2, 1)]
#[case(4, 5)]
fn manhattan_matches_linear_scan(#[case] n_columns: usize, #[case] max_leaf_size: usize) {
    check_nearest_and_range(Manhattan, n_columns, max_leaf_size, 7);
}

#[rstest]
#[case(2, 1)]
#[case(4, 5)]
fn chebyshev_matches_linear_scan(#[case] n_columns: usize, #[case] max_leaf_size: usize) {
    check_nearest_and_range(Chebyshev, n_columns, max_leaf_size, 11);
}

#[rstest]
#[case(3, 4)]
fn minkowski_matches_linear_scan(#[case] n_columns: usize, #[case] max_leaf_size: usize) {
    check_nearest_and_range(Minkowski::new(3.0), n_columns, max_leaf_size, 13);
}

/// Mixed continuous/categorical data exercises the identity-split branch
/// and the box pruning over category ids; kd results must still match
/// the oracle exactly.
#[rstest]
#[case(1)]
#[case(5)]
fn kd_mixed_columns_match_linear_scan(#[case] max_leaf_size: usize) {
    let (mut rows, labels) = random_rows(57, 150, 4);
    for (i, row) in rows.iter_mut().enumerate() {
        row[3] = ((i * 7) % 5) as f64;
    }
    let types = vec![
        ColumnType::Continuous,
        ColumnType::Continuous,
        ColumnType::Continuous,
        ColumnType::Categorical,
    ];

    let mut kd = KdTree::new(max_leaf_size, Euclidean).unwrap();
    kd.grow(Dataset::with_column_types(rows.clone(), labels.clone(), types).unwrap())
        .unwrap();
    kd.validate().unwrap();

    for (j, mut query) in random_queries(58, 20, 4).into_iter().enumerate() {
        // Half the queries carry an existing id, half an off-id value.
        if j % 2 == 0 {
            query[3] = (j % 5) as f64;
        }

        for k in [1, 4, 25] {
            let oracle = linear_nearest(&rows, &labels, &Euclidean, &query, k);
            let result = kd.nearest(&query, k).unwrap();
            assert_eq!(result.labels(), oracle.labels(), "k={k}");
            assert_eq!(result.distances(), oracle.distances(), "k={k}");
        }

        let mut expected = linear_range(&rows, &labels, &Euclidean, &query, 4.0)
            .into_parts()
            .0;
        expected.sort_unstable();
        let mut found = kd.range(&query, 4.0).unwrap().into_parts().0;
        found.sort_unstable();
        assert_eq!(found, expected);
    }
}

/// Duplicate-heavy data grows deep, degenerate trees; results must still
/// match the oracle.
#[rstest]
#[case(1)]
#[case(4)]
fn duplicate_heavy_data_matches_linear_scan(#[case] max_leaf_size: usize) {
    let values = [0.0, 0.0, 0.0, 1.0, 1.0, 2.0];
    let rows: Vec<Vec<f64>> = (0..120)
        .map(|i| vec![values[i % values.len()], values[(i / 3) % values.len()]])
        .collect();
    let labels: Vec<usize> = (0..rows.len()).collect();

    let mut kd = KdTree::new(max_leaf_size, Euclidean).unwrap();
    kd.grow(Dataset::new(rows.clone(), labels.clone()).unwrap())
        .unwrap();
    let mut ball = BallTree::new(max_leaf_size, Euclidean).unwrap();
    ball.grow(Dataset::new(rows.clone(), labels.clone()).unwrap())
        .unwrap();

    for query in [vec![0.0, 0.0], vec![1.5, 0.5], vec![-3.0, 2.0]] {
        let oracle = linear_nearest(&rows, &labels, &Euclidean, &query, 5);
        assert_eq!(
            kd.nearest(&query, 5).unwrap().distances(),
            oracle.distances()
        );
        assert_eq!(
            ball.nearest(&query, 5).unwrap().distances(),
            oracle.distances()
        );

        let mut expected = linear_range(&rows, &labels, &Euclidean, &query, 1.5)
            .into_parts()
            .0;
        expected.sort_unstable();
        let mut from_kd = kd.range(&query, 1.5).unwrap().into_parts().0;
        from_kd.sort_unstable();
        assert_eq!(from_kd, expected);
    }
}
