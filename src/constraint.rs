use num_traits::Float;

use crate::function::Function;
use crate::linalg::{cast, dot, matvec};

/// A constraint that can be attached to an objective function.
///
/// The variant set is closed by design: every free function below dispatches
/// with an exhaustive `match`, so adding a variant is a compile-checked,
/// crate-wide change rather than an open extension point.
pub enum Constraint<F: Float> {
    /// Inequality `value - x[dimension] <= 0` (lower bound on one coordinate).
    Minimum { value: F, dimension: usize },
    /// Inequality `x[dimension] - value <= 0` (upper bound on one coordinate).
    Maximum { value: F, dimension: usize },
    /// Equality `q.dot(x) + r = 0`.
    LinearEquality { q: Vec<F>, r: F },
    /// Inequality `q.dot(x) + r <= 0`.
    LinearInequality { q: Vec<F>, r: F },
    /// Equality `1/2 * x.dot(P * x) + q.dot(x) + r = 0`, `P` symmetric.
    QuadraticEquality { p: Vec<Vec<F>>, q: Vec<F>, r: F },
    /// Inequality `1/2 * x.dot(P * x) + q.dot(x) + r <= 0`, `P` symmetric.
    QuadraticInequality { p: Vec<Vec<F>>, q: Vec<F>, r: F },
    /// Equality `||x - origin||^2 - radius^2 = 0`.
    BallEquality { origin: Vec<F>, radius: F },
    /// Inequality `||x - origin||^2 - radius^2 <= 0`.
    BallInequality { origin: Vec<F>, radius: F },
    /// Equality `h(x) = 0` for an arbitrary owned function.
    FunctionalEquality(Box<dyn Function<F>>),
    /// Inequality `g(x) <= 0` for an arbitrary owned function.
    FunctionalInequality(Box<dyn Function<F>>),
}

impl<F: Float> Clone for Constraint<F> {
    fn clone(&self) -> Self {
        match self {
            Constraint::Minimum { value, dimension } => Constraint::Minimum {
                value: *value,
                dimension: *dimension,
            },
            Constraint::Maximum { value, dimension } => Constraint::Maximum {
                value: *value,
                dimension: *dimension,
            },
            Constraint::LinearEquality { q, r } => Constraint::LinearEquality {
                q: q.clone(),
                r: *r,
            },
            Constraint::LinearInequality { q, r } => Constraint::LinearInequality {
                q: q.clone(),
                r: *r,
            },
            Constraint::QuadraticEquality { p, q, r } => Constraint::QuadraticEquality {
                p: p.clone(),
                q: q.clone(),
                r: *r,
            },
            Constraint::QuadraticInequality { p, q, r } => Constraint::QuadraticInequality {
                p: p.clone(),
                q: q.clone(),
                r: *r,
            },
            Constraint::BallEquality { origin, radius } => Constraint::BallEquality {
                origin: origin.clone(),
                radius: *radius,
            },
            Constraint::BallInequality { origin, radius } => Constraint::BallInequality {
                origin: origin.clone(),
                radius: *radius,
            },
            // Functional constraints own their sub-function exclusively, so
            // copying a constraint deep-copies it.
            Constraint::FunctionalEquality(f) => Constraint::FunctionalEquality(f.clone_boxed()),
            Constraint::FunctionalInequality(f) => {
                Constraint::FunctionalInequality(f.clone_boxed())
            }
        }
    }
}

/// Whether the constraint's scalar function is convex.
pub fn convex<F: Float>(c: &Constraint<F>) -> bool {
    match c {
        Constraint::Minimum { .. }
        | Constraint::Maximum { .. }
        | Constraint::LinearEquality { .. }
        | Constraint::LinearInequality { .. }
        | Constraint::BallEquality { .. }
        | Constraint::BallInequality { .. } => true,
        Constraint::QuadraticEquality { p, .. } | Constraint::QuadraticInequality { p, .. } => {
            positive_semidefinite(p)
        }
        Constraint::FunctionalEquality(f) | Constraint::FunctionalInequality(f) => f.convex(),
    }
}

/// Whether the constraint's scalar function is continuously differentiable.
pub fn smooth<F: Float>(c: &Constraint<F>) -> bool {
    match c {
        Constraint::FunctionalEquality(f) | Constraint::FunctionalInequality(f) => f.smooth(),
        _ => true,
    }
}

/// Strong-convexity coefficient of the constraint's scalar function.
pub fn strong_convexity<F: Float>(c: &Constraint<F>) -> F {
    match c {
        Constraint::Minimum { .. }
        | Constraint::Maximum { .. }
        | Constraint::LinearEquality { .. }
        | Constraint::LinearInequality { .. } => F::zero(),
        Constraint::BallEquality { .. } | Constraint::BallInequality { .. } => cast(2.0),
        // Gershgorin lower bound on the smallest eigenvalue of P, clamped
        // at zero.
        Constraint::QuadraticEquality { p, .. } | Constraint::QuadraticInequality { p, .. } => {
            gershgorin_bound(p).max(F::zero())
        }
        Constraint::FunctionalEquality(f) | Constraint::FunctionalInequality(f) => {
            f.strong_convexity()
        }
    }
}

/// How much the point violates the constraint: 0 when satisfied, `|h(x)|`
/// for an equality and `max(0, g(x))` for an inequality.
pub fn violation<F: Float>(c: &Constraint<F>, x: &[F]) -> F {
    let v = vgrad(c, x, None);
    if is_equality(c) {
        v.abs()
    } else {
        v.max(F::zero())
    }
}

/// Value and (sub-)gradient of the constraint's own scalar function.
pub fn vgrad<F: Float>(c: &Constraint<F>, x: &[F], gx: Option<&mut [F]>) -> F {
    match c {
        Constraint::Minimum { value, dimension } => {
            if let Some(gx) = gx {
                fill(gx, F::zero());
                gx[*dimension] = -F::one();
            }
            *value - x[*dimension]
        }
        Constraint::Maximum { value, dimension } => {
            if let Some(gx) = gx {
                fill(gx, F::zero());
                gx[*dimension] = F::one();
            }
            x[*dimension] - *value
        }
        Constraint::LinearEquality { q, r } | Constraint::LinearInequality { q, r } => {
            if let Some(gx) = gx {
                gx.copy_from_slice(q);
            }
            dot(q, x) + *r
        }
        Constraint::QuadraticEquality { p, q, r } | Constraint::QuadraticInequality { p, q, r } => {
            let px = matvec(p, x);
            if let Some(gx) = gx {
                for i in 0..gx.len() {
                    gx[i] = px[i] + q[i];
                }
            }
            cast::<F>(0.5) * dot(x, &px) + dot(q, x) + *r
        }
        Constraint::BallEquality { origin, radius } | Constraint::BallInequality { origin, radius } => {
            let mut v = F::zero();
            for i in 0..x.len() {
                let d = x[i] - origin[i];
                v = v + d * d;
            }
            if let Some(gx) = gx {
                let two = cast::<F>(2.0);
                for i in 0..gx.len() {
                    gx[i] = two * (x[i] - origin[i]);
                }
            }
            v - *radius * *radius
        }
        Constraint::FunctionalEquality(f) | Constraint::FunctionalInequality(f) => f.eval(x, gx),
    }
}

/// Whether the constraint fits a function of `dim` dimensions.
pub fn compatible<F: Float>(c: &Constraint<F>, dim: usize) -> bool {
    match c {
        Constraint::Minimum { dimension, .. } | Constraint::Maximum { dimension, .. } => {
            *dimension < dim
        }
        Constraint::LinearEquality { q, .. } | Constraint::LinearInequality { q, .. } => {
            q.len() == dim
        }
        Constraint::QuadraticEquality { p, q, .. }
        | Constraint::QuadraticInequality { p, q, .. } => {
            q.len() == dim && p.len() == dim && p.iter().all(|row| row.len() == dim)
        }
        Constraint::BallEquality { origin, radius }
        | Constraint::BallInequality { origin, radius } => {
            origin.len() == dim && *radius > F::zero()
        }
        Constraint::FunctionalEquality(f) | Constraint::FunctionalInequality(f) => f.dim() == dim,
    }
}

/// Whether the constraint is an equality constraint.
pub fn is_equality<F: Float>(c: &Constraint<F>) -> bool {
    matches!(
        c,
        Constraint::LinearEquality { .. }
            | Constraint::QuadraticEquality { .. }
            | Constraint::BallEquality { .. }
            | Constraint::FunctionalEquality(_)
    )
}

/// Number of equality constraints in the collection.
pub fn count_equalities<F: Float>(constraints: &[Constraint<F>]) -> usize {
    constraints.iter().filter(|c| is_equality(c)).count()
}

/// Number of inequality constraints in the collection.
pub fn count_inequalities<F: Float>(constraints: &[Constraint<F>]) -> usize {
    constraints.len() - count_equalities(constraints)
}

fn fill<F: Float>(v: &mut [F], value: F) {
    for x in v.iter_mut() {
        *x = value;
    }
}

/// PSD test via an unpivoted Cholesky factorization; exact for symmetric
/// matrices up to the pivot tolerance.
fn positive_semidefinite<F: Float>(p: &[Vec<F>]) -> bool {
    let n = p.len();
    let tol = cast::<F>(-1e-12);
    let mut l = vec![vec![F::zero(); n]; n];

    for i in 0..n {
        for j in 0..=i {
            let mut s = p[i][j];
            for k in 0..j {
                s = s - l[i][k] * l[j][k];
            }
            if i == j {
                if s < tol {
                    return false;
                }
                l[i][j] = s.max(F::zero()).sqrt();
            } else if l[j][j] > F::zero() {
                l[i][j] = s / l[j][j];
            }
        }
    }

    true
}

fn gershgorin_bound<F: Float>(p: &[Vec<F>]) -> F {
    let mut bound = F::infinity();
    for (i, row) in p.iter().enumerate() {
        let mut radius = F::zero();
        for (j, &v) in row.iter().enumerate() {
            if i != j {
                radius = radius + v.abs();
            }
        }
        bound = bound.min(row[i] - radius);
    }
    bound
}
