//! Shared helpers for the integration suites.

// Each suite compiles this module separately and uses its own subset.
#![allow(dead_code)]

use rand::Rng;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;

/// Deterministic random rows in [-10, 10), labeled by row index.
pub fn random_rows(seed: u64, n_rows: usize, n_columns: usize) -> (Vec<Vec<f64>>, Vec<usize>) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let rows = (0..n_rows)
        .map(|_| (0..n_columns).map(|_| rng.gen_range(-10.0..10.0)).collect())
        .collect();
    let labels = (0..n_rows).collect();
    (rows, labels)
}

/// Deterministic random query points over the same range as
/// [`random_rows`].
pub fn random_queries(seed: u64, n_queries: usize, n_columns: usize) -> Vec<Vec<f64>> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..n_queries)
        .map(|_| (0..n_columns).map(|_| rng.gen_range(-10.0..10.0)).collect())
        .collect()
}
