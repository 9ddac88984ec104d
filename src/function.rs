use num_traits::Float;

use crate::constraint::{self, Constraint};
use crate::linalg::cast;

/// Trait for objective functions of a continuous optimization problem.
///
/// Implementors provide the value and (sub-)gradient of a multi-dimensional
/// function together with the analytic metadata (convexity, smoothness,
/// strong-convexity coefficient) some solvers exploit.
///
/// Evaluation must be deterministic for a fixed point: solvers rely on
/// re-evaluating the same trial point producing bit-identical results.
pub trait Function<F: Float> {
    /// Human-readable name, used in tests and benchmark tooling.
    fn name(&self) -> String;

    /// Number of free dimensions.
    fn dim(&self) -> usize;

    /// Whether the function is convex.
    fn convex(&self) -> bool;

    /// Whether the function is continuously differentiable.
    ///
    /// Non-smooth functions must still return a valid sub-gradient from
    /// [`Function::eval`].
    fn smooth(&self) -> bool;

    /// Strong-convexity coefficient, zero when not (strongly) convex.
    fn strong_convexity(&self) -> F {
        F::zero()
    }

    /// Evaluate the function at `x` and, if a buffer is given, fill in the
    /// (sub-)gradient.
    ///
    /// Precondition: `x.len() == self.dim()` and, when present,
    /// `gx.len() == self.dim()`.
    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F;

    /// Explicit clone capability, needed because penalty wrappers and
    /// functional constraints own independent copies of their objective.
    fn clone_boxed(&self) -> Box<dyn Function<F>>;

    /// The constraints attached to this function, if any.
    fn constraints(&self) -> &[Constraint<F>] {
        &[]
    }
}

/// An objective function together with its registered constraints:
///
/// ```text
/// argmin    f(x)
/// such that h_j(x) = 0   (equality constraints)
///           g_i(x) <= 0  (inequality constraints)
/// ```
pub struct Problem<F: Float> {
    objective: Box<dyn Function<F>>,
    constraints: Vec<Constraint<F>>,
}

impl<F: Float> Problem<F> {
    /// Wrap an objective with no constraints attached yet.
    pub fn new(objective: impl Function<F> + 'static) -> Self {
        Problem {
            objective: Box::new(objective),
            constraints: Vec::new(),
        }
    }

    /// Register a constraint.
    ///
    /// Returns false (leaving the problem unchanged) if the constraint is
    /// not compatible with the objective's dimensionality.
    pub fn constrain(&mut self, c: Constraint<F>) -> bool {
        if !constraint::compatible(&c, self.objective.dim()) {
            return false;
        }
        self.constraints.push(c);
        true
    }

    /// True iff every registered constraint is satisfied at `x` up to a
    /// small numerical tolerance.
    pub fn valid(&self, x: &[F]) -> bool {
        let tol = cast::<F>(1e-12);
        self.constraints
            .iter()
            .all(|c| constraint::violation(c, x) < tol)
    }

    /// Borrow the wrapped objective.
    pub fn objective(&self) -> &dyn Function<F> {
        self.objective.as_ref()
    }
}

impl<F: Float> Clone for Problem<F> {
    fn clone(&self) -> Self {
        Problem {
            objective: self.objective.clone_boxed(),
            constraints: self.constraints.clone(),
        }
    }
}

impl<F: Float + 'static> Function<F> for Problem<F> {
    fn name(&self) -> String {
        self.objective.name()
    }

    fn dim(&self) -> usize {
        self.objective.dim()
    }

    fn convex(&self) -> bool {
        self.objective.convex() && self.constraints.iter().all(constraint::convex)
    }

    fn smooth(&self) -> bool {
        self.objective.smooth() && self.constraints.iter().all(constraint::smooth)
    }

    fn strong_convexity(&self) -> F {
        self.objective.strong_convexity()
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        self.objective.eval(x, gx)
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(self.clone())
    }

    fn constraints(&self) -> &[Constraint<F>] {
        &self.constraints
    }
}

/// Finite-difference steps tried by [`grad_accuracy`], from tightest to
/// loosest; see "Numerical optimization", Nocedal & Wright, 2nd edition,
/// p.197 for the scaling.
const FD_STEPS: [f64; 12] = [
    1e-9, 3e-9, 1e-8, 3e-8, 5e-8, 8e-8, 1e-7, 3e-7, 5e-7, 8e-7, 1e-6, 3e-6,
];

/// Compare the analytical gradient against central finite differences.
///
/// Each coordinate is perturbed by `dx * max(1, |x_i|)` for a list of
/// candidate steps; the returned value is the best (smallest) infinity-norm
/// discrepancy found, normalized by `1 + |f(x)|`. The step scan stops early
/// once the discrepancy drops below `desired`, so callers pass the accuracy
/// they intend to assert and pay only for the steps needed to reach it.
pub fn grad_accuracy<F: Float>(function: &dyn Function<F>, x: &[F], desired: F) -> F {
    let n = function.dim();
    debug_assert_eq!(x.len(), n);

    let mut gx = vec![F::zero(); n];
    let fx = function.eval(x, Some(&mut gx));

    let mut xp = x.to_vec();
    let mut xn = x.to_vec();
    let mut best = F::infinity();

    for dx in FD_STEPS {
        let dx = cast::<F>(dx);

        let mut worst = F::zero();
        for i in 0..n {
            if i > 0 {
                xp[i - 1] = x[i - 1];
                xn[i - 1] = x[i - 1];
            }
            let step = dx * F::one().max(x[i].abs());
            xp[i] = x[i] + step;
            xn[i] = x[i] - step;

            let dfi = function.eval(&xp, None) - function.eval(&xn, None);
            let gi_approx = dfi / (xp[i] - xn[i]);
            worst = worst.max((gx[i] - gi_approx).abs());
        }
        xp[n - 1] = x[n - 1];
        xn[n - 1] = x[n - 1];

        best = best.min(worst / (F::one() + fx.abs()));
        if best < desired {
            break;
        }
    }

    best
}

/// Sample `steps - 1` interior points of the segment `x1..x2` and check the
/// strong-convexity inequality at each; returns false on first violation.
pub fn is_convex<F: Float>(
    function: &dyn Function<F>,
    x1: &[F],
    x2: &[F],
    steps: usize,
    epsilon: F,
) -> bool {
    debug_assert!(steps > 2);
    debug_assert_eq!(x1.len(), function.dim());
    debug_assert_eq!(x2.len(), function.dim());

    let f1 = function.eval(x1, None);
    let f2 = function.eval(x2, None);
    debug_assert!(f1.is_finite() && f2.is_finite());

    let mut dx = F::zero();
    for i in 0..x1.len() {
        let d = x1[i] - x2[i];
        dx = dx + d * d;
    }

    let mu = function.strong_convexity();
    let half = cast::<F>(0.5);
    let mut tx = vec![F::zero(); x1.len()];

    for step in 1..steps {
        let t1 = cast::<F>(step as f64) / cast::<F>(steps as f64);
        let t2 = F::one() - t1;

        for i in 0..tx.len() {
            tx[i] = t1 * x1[i] + t2 * x2[i];
        }
        if function.eval(&tx, None) > t1 * f1 + t2 * f2 - t1 * t2 * mu * half * dx + epsilon {
            return false;
        }
    }

    true
}
