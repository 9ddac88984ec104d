use num_traits::Float;

/// Convert an `f64` constant into the working float type.
///
/// Falls back to NaN when the constant is not representable, so a bad
/// conversion surfaces through the finite-state checks instead of being
/// silently truncated.
pub(crate) fn cast<F: Float>(v: f64) -> F {
    F::from(v).unwrap_or_else(F::nan)
}

/// Compute the dot product of two vectors.
pub fn dot<F: Float>(a: &[F], b: &[F]) -> F {
    debug_assert_eq!(a.len(), b.len());
    let mut s = F::zero();
    for i in 0..a.len() {
        s = s + a[i] * b[i];
    }
    s
}

/// Compute the L2 norm of a vector.
pub fn norm<F: Float>(v: &[F]) -> F {
    dot(v, v).sqrt()
}

/// Compute the infinity norm of a vector (0 for an empty vector).
pub fn inf_norm<F: Float>(v: &[F]) -> F {
    let mut s = F::zero();
    for &x in v {
        s = s.max(x.abs());
    }
    s
}

/// `y = a + t * b`, element-wise.
pub fn axpy<F: Float>(a: &[F], t: F, b: &[F]) -> Vec<F> {
    debug_assert_eq!(a.len(), b.len());
    let mut y = vec![F::zero(); a.len()];
    for i in 0..a.len() {
        y[i] = a[i] + t * b[i];
    }
    y
}

/// Matrix-vector product for a square row-major matrix stored as `m[row][col]`.
pub fn matvec<F: Float>(m: &[Vec<F>], x: &[F]) -> Vec<F> {
    let mut y = vec![F::zero(); m.len()];
    for (i, row) in m.iter().enumerate() {
        debug_assert_eq!(row.len(), x.len());
        y[i] = dot(row, x);
    }
    y
}

/// `n x n` identity matrix.
pub fn identity<F: Float>(n: usize) -> Vec<Vec<F>> {
    let mut m = vec![vec![F::zero(); n]; n];
    for (i, row) in m.iter_mut().enumerate() {
        row[i] = F::one();
    }
    m
}

/// Rank-1 update `m += alpha * u * v^T`, in place.
pub fn rank1_update<F: Float>(m: &mut [Vec<F>], alpha: F, u: &[F], v: &[F]) {
    debug_assert_eq!(m.len(), u.len());
    for (i, row) in m.iter_mut().enumerate() {
        debug_assert_eq!(row.len(), v.len());
        for j in 0..row.len() {
            row[j] = row[j] + alpha * u[i] * v[j];
        }
    }
}

/// True iff every component is finite.
pub fn all_finite<F: Float>(v: &[F]) -> bool {
    v.iter().all(|x| x.is_finite())
}
