//! Small quadratic programs over the probability simplex,
//! `min 1/2 w' Q w + b.dot(w)` subject to `sum(w) = 1`, `w >= 0`,
//! shared by the bundle and gradient-sampling solvers.

use num_traits::Float;

use crate::linalg::{cast, inf_norm, matvec};

/// Euclidean projection onto the probability simplex (Held et al.), in
/// place: sort the components, find the largest prefix with a positive
/// shifted mean, clamp.
pub fn project_simplex<F: Float>(w: &mut [F]) {
    let n = w.len();
    debug_assert!(n > 0);

    let mut sorted = w.to_vec();
    sorted.sort_by(|a, b| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));

    let mut prefix = F::zero();
    let mut theta = sorted[0] - F::one();
    for (k, &v) in sorted.iter().enumerate() {
        prefix = prefix + v;
        let candidate = (prefix - F::one()) / cast::<F>((k + 1) as f64);
        if v - candidate > F::zero() {
            theta = candidate;
        }
    }

    for v in w.iter_mut() {
        *v = (*v - theta).max(F::zero());
    }
}

/// Solve `min 1/2 w' Q w + b.dot(w)` over the simplex by projected gradient
/// descent with a Lipschitz step, starting from the uniform point.
///
/// `Q` must be symmetric positive semi-definite (a Gram matrix in both call
/// sites). The returned point is feasible by construction.
pub fn solve_simplex_qp<F: Float>(q: &[Vec<F>], b: &[F], max_iterations: usize) -> Vec<F> {
    let m = q.len();
    debug_assert_eq!(b.len(), m);
    debug_assert!(m > 0);

    let mut w = vec![F::one() / cast::<F>(m as f64); m];

    // Row-sum bound on the largest eigenvalue of Q.
    let mut lipschitz = F::zero();
    for row in q {
        let mut s = F::zero();
        for &v in row {
            s = s + v.abs();
        }
        lipschitz = lipschitz.max(s);
    }
    let step = F::one() / (lipschitz + F::one());
    let tol = cast::<F>(1e-12);

    for _ in 0..max_iterations {
        let qw = matvec(q, &w);
        let mut next = vec![F::zero(); m];
        for i in 0..m {
            next[i] = w[i] - step * (qw[i] + b[i]);
        }
        project_simplex(&mut next);

        let mut moved = F::zero();
        for i in 0..m {
            moved = moved.max((next[i] - w[i]).abs());
        }
        w = next;
        if moved < tol * (F::one() + inf_norm(&w)) {
            break;
        }
    }

    w
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn projection_is_feasible() {
        let mut w = vec![0.5, -0.2, 1.4];
        project_simplex(&mut w);
        let sum: f64 = w.iter().sum();
        assert_relative_eq!(sum, 1.0, max_relative = 1e-12);
        assert!(w.iter().all(|&v| v >= 0.0));
    }

    #[test]
    fn projection_of_a_feasible_point_is_identity() {
        let mut w = vec![0.25, 0.25, 0.5];
        project_simplex(&mut w);
        assert_relative_eq!(w[0], 0.25, max_relative = 1e-12);
        assert_relative_eq!(w[2], 0.5, max_relative = 1e-12);
    }

    #[test]
    fn projection_of_a_vertex() {
        let mut w = vec![10.0, 0.0, 0.0];
        project_simplex(&mut w);
        assert_relative_eq!(w[0], 1.0, max_relative = 1e-12);
        assert_eq!(w[1], 0.0);
    }

    #[test]
    fn qp_picks_the_cheapest_vertex() {
        // Zero quadratic part: the minimizer of b.dot(w) over the simplex is
        // the vertex of the smallest coefficient.
        let q = vec![vec![0.0; 3]; 3];
        let b = vec![3.0, 1.0, 2.0];
        let w = solve_simplex_qp(&q, &b, 1000);
        assert_relative_eq!(w[1], 1.0, max_relative = 1e-6);
    }

    #[test]
    fn qp_minimum_norm_combination() {
        // Gram matrix of g1 = (1, 0), g2 = (-1, 0): the minimum-norm convex
        // combination is the midpoint, |G w| = 0.
        let q = vec![vec![1.0, -1.0], vec![-1.0, 1.0]];
        let b = vec![0.0, 0.0];
        let w = solve_simplex_qp(&q, &b, 1000);
        assert_relative_eq!(w[0], 0.5, max_relative = 1e-6);
        assert_relative_eq!(w[1], 0.5, max_relative = 1e-6);
    }
}
