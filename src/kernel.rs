//! Distance kernels.
//!
//! A kernel measures the distance between two feature vectors of equal
//! dimension. Every kernel in this module is a Minkowski-family metric,
//! which keeps the two lower bounds used for subtree pruning exact: the
//! clamp-into-box distance for axis-aligned boxes and the
//! centre-distance-minus-radius rule for balls.

/// Distance function between two feature vectors.
///
/// Implementations must be true metrics (non-negative, symmetric,
/// triangle inequality), otherwise branch-and-bound pruning can discard
/// subtrees that still contain closer neighbours.
pub trait Kernel: Clone + Send + Sync {
    /// Distance between `a` and `b`.
    ///
    /// Both slices must have the same length. Dimension checks happen at
    /// the query boundary, not here.
    fn distance(&self, a: &[f64], b: &[f64]) -> f64;

    /// Name of the kernel (for diagnostics).
    fn name(&self) -> &'static str;
}

/// Straight-line (L2) distance. The default kernel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl Kernel for Euclidean {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y) * (x - y))
            .sum::<f64>()
            .sqrt()
    }

    fn name(&self) -> &'static str {
        "euclidean"
    }
}

/// Taxicab (L1) distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Manhattan;

impl Kernel for Manhattan {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter().zip(b).map(|(x, y)| (x - y).abs()).sum()
    }

    fn name(&self) -> &'static str {
        "manhattan"
    }
}

/// Maximum-coordinate (L-infinity) distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Chebyshev;

impl Kernel for Chebyshev {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max)
    }

    fn name(&self) -> &'static str {
        "chebyshev"
    }
}

/// General Minkowski (Lp) distance with configurable order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Minkowski {
    p: f64,
}

impl Minkowski {
    /// Create a Minkowski kernel of order `p`.
    ///
    /// Orders below 1.0 violate the triangle inequality and are clamped
    /// up to 1.0.
    pub fn new(p: f64) -> Self {
        Self { p: p.max(1.0) }
    }

    /// The order of this kernel.
    pub fn p(&self) -> f64 {
        self.p
    }
}

impl Default for Minkowski {
    fn default() -> Self {
        Self::new(2.0)
    }
}

impl Kernel for Minkowski {
    #[inline]
    fn distance(&self, a: &[f64], b: &[f64]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).abs().powf(self.p))
            .sum::<f64>()
            .powf(1.0 / self.p)
    }

    fn name(&self) -> &'static str {
        "minkowski"
    }
}
