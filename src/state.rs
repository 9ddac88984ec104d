use num_traits::Float;

use crate::constraint::{self, Constraint};
use crate::function::Function;
use crate::linalg::{all_finite, axpy, dot, inf_norm};

/// Termination reason attached to the state a solver returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Status {
    /// The convergence criterion was met.
    Converged,
    /// The evaluation budget ran out first.
    MaxEvals,
    /// A logger callback requested an early stop.
    Stopped,
    /// The iterate, value or gradient turned non-finite.
    Failed,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Status::Converged => "converged",
            Status::MaxEvals => "max_evals",
            Status::Stopped => "stopped",
            Status::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// The full state of a solver at some iterate: the point, its value and
/// (sub-)gradient, the current descent direction and step length, the raw
/// constraint values and the evaluation counters.
///
/// The call counters live here rather than on the function: the state is the
/// single chokepoint through which solvers evaluate, so budgets are enforced
/// without interior mutability on the objective.
#[derive(Clone)]
pub struct SolverState<F: Float> {
    pub x: Vec<F>,
    pub f: F,
    pub g: Vec<F>,
    /// Current descent direction (zero until a solver sets one).
    pub d: Vec<F>,
    /// Step length along `d` that produced `x`.
    pub t: F,
    /// Raw values `h_j(x)` of the equality constraints.
    pub ceq: Vec<F>,
    /// Raw values `g_i(x)` of the inequality constraints.
    pub cineq: Vec<F>,
    pub iterations: usize,
    /// Iterations spent in inner solves (constrained outer loops only).
    pub inner_iters: usize,
    pub fcalls: usize,
    pub gcalls: usize,
    pub status: Status,
}

impl<F: Float> SolverState<F> {
    /// Evaluate `function` at `x0`: one value+gradient call plus one
    /// evaluation of each registered constraint.
    pub fn new(function: &dyn Function<F>, x0: &[F]) -> Self {
        debug_assert_eq!(x0.len(), function.dim());
        let n = x0.len();
        let mut state = SolverState {
            x: x0.to_vec(),
            f: F::zero(),
            g: vec![F::zero(); n],
            d: vec![F::zero(); n],
            t: F::zero(),
            ceq: Vec::new(),
            cineq: Vec::new(),
            iterations: 0,
            inner_iters: 0,
            fcalls: 0,
            gcalls: 0,
            status: Status::MaxEvals,
        };
        state.evaluate(function);
        state
    }

    fn evaluate(&mut self, function: &dyn Function<F>) {
        self.f = function.eval(&self.x, Some(&mut self.g));
        self.fcalls += 1;
        self.gcalls += 1;

        let constraints = function.constraints();
        self.ceq.clear();
        self.cineq.clear();
        for c in constraints {
            let v = constraint::vgrad(c, &self.x, None);
            if constraint::is_equality(c) {
                self.ceq.push(v);
            } else {
                self.cineq.push(v);
            }
        }
    }

    /// Move to `state0.x + t * state0.d`, re-evaluate and report whether the
    /// resulting state is finite.
    pub fn try_step(&mut self, function: &dyn Function<F>, state0: &SolverState<F>, t: F) -> bool {
        self.t = t;
        self.x = axpy(&state0.x, t, &state0.d);
        self.evaluate(function);
        self.valid()
    }

    /// Accept the candidate point iff it is finite and strictly better.
    pub fn update_if_better(&mut self, x: &[F], g: &[F], f: F) -> bool {
        if f.is_finite() && all_finite(x) && all_finite(g) && f < self.f {
            self.x.copy_from_slice(x);
            self.g.copy_from_slice(g);
            self.f = f;
            true
        } else {
            false
        }
    }

    /// Accept the candidate state when it improves the constrained problem:
    /// if both states are feasible up to `epsilon` the objective decides,
    /// otherwise the smaller constraint violation wins.
    pub fn update_if_better_constrained(
        &mut self,
        candidate: &SolverState<F>,
        epsilon: F,
    ) -> bool {
        if !candidate.valid() {
            return false;
        }
        let own = self.constraint_test();
        let theirs = candidate.constraint_test();
        let better = if own < epsilon && theirs < epsilon {
            candidate.f < self.f
        } else {
            theirs < own
        };
        if better {
            self.x.clone_from(&candidate.x);
            self.g.clone_from(&candidate.g);
            self.f = candidate.f;
            self.ceq.clone_from(&candidate.ceq);
            self.cineq.clone_from(&candidate.cineq);
        }
        better
    }

    /// True iff the value, step, point, gradient and constraint values are
    /// all finite.
    pub fn valid(&self) -> bool {
        self.f.is_finite()
            && self.t.is_finite()
            && all_finite(&self.x)
            && all_finite(&self.g)
            && all_finite(&self.ceq)
            && all_finite(&self.cineq)
    }

    /// Directional derivative `d.dot(g)` at the current point.
    pub fn dg(&self) -> F {
        dot(&self.d, &self.g)
    }

    /// Whether `d` is a strict descent direction.
    pub fn has_descent(&self) -> bool {
        self.dg() < F::zero()
    }

    /// Magnitude-normalized gradient criterion `||g||_inf / max(1, |f|)`.
    pub fn gradient_test(&self) -> F {
        inf_norm(&self.g) / F::one().max(self.f.abs())
    }

    /// Total constraint violation at the current point.
    pub fn constraint_test(&self) -> F {
        let mut s = F::zero();
        for &h in &self.ceq {
            s = s + h.abs();
        }
        for &g in &self.cineq {
            s = s + g.max(F::zero());
        }
        s
    }

    /// Armijo sufficient-decrease condition relative to `state0`.
    pub fn has_armijo(&self, state0: &SolverState<F>, c1: F) -> bool {
        self.f <= state0.f + c1 * self.t * state0.dg()
    }

    /// Regular Wolfe curvature condition relative to `state0`.
    pub fn has_wolfe(&self, state0: &SolverState<F>, c2: F) -> bool {
        self.dg() >= c2 * state0.dg()
    }

    /// Strong Wolfe curvature condition relative to `state0`.
    pub fn has_strong_wolfe(&self, state0: &SolverState<F>, c2: F) -> bool {
        self.dg().abs() <= c2 * state0.dg().abs()
    }

    /// Approximate Wolfe conditions (CG-DESCENT), usable when the decrease
    /// `f0 - f` is at the level of machine precision.
    pub fn has_approx_wolfe(&self, state0: &SolverState<F>, c1: F, c2: F, epsilon: F) -> bool {
        let dg0 = state0.dg();
        let two = F::one() + F::one();
        (two * c1 - F::one()) * dg0 >= self.dg()
            && self.dg() >= c2 * dg0
            && self.f <= state0.f + epsilon * state0.f.abs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::Sphere;
    use crate::function::Problem;

    fn sphere_state(x0: &[f64]) -> SolverState<f64> {
        SolverState::new(&Sphere::new(x0.len()), x0)
    }

    #[test]
    fn new_evaluates_once() {
        let state = sphere_state(&[1.0, 2.0]);
        assert_eq!(state.f, 5.0);
        assert_eq!(state.g, vec![2.0, 4.0]);
        assert_eq!(state.fcalls, 1);
        assert_eq!(state.gcalls, 1);
        assert_eq!(state.status, Status::MaxEvals);
    }

    #[test]
    fn descent_and_directional_derivative() {
        let mut state = sphere_state(&[1.0, 0.0]);
        state.d = vec![-1.0, 0.0];
        assert_eq!(state.dg(), -2.0);
        assert!(state.has_descent());

        state.d = vec![1.0, 0.0];
        assert!(!state.has_descent());

        state.d = vec![0.0, 1.0];
        assert!(!state.has_descent());
    }

    #[test]
    fn try_step_moves_along_direction() {
        let function = Sphere::new(2);
        let mut state0 = sphere_state(&[1.0, 1.0]);
        state0.d = vec![-1.0, -1.0];

        let mut state = state0.clone();
        assert!(state.try_step(&function, &state0, 0.5));
        assert_eq!(state.x, vec![0.5, 0.5]);
        assert_eq!(state.f, 0.5);
        assert_eq!(state.fcalls, 2);
    }

    #[test]
    fn update_if_better_rejects_non_finite_and_worse() {
        let mut state = sphere_state(&[1.0, 1.0]);
        assert!(!state.update_if_better(&[0.0, 0.0], &[0.0, 0.0], f64::NAN));
        assert!(!state.update_if_better(&[2.0, 2.0], &[4.0, 4.0], 8.0));
        assert!(state.update_if_better(&[0.5, 0.5], &[1.0, 1.0], 0.5));
        assert_eq!(state.f, 0.5);
    }

    #[test]
    fn constrained_update_prefers_feasibility() {
        let mut problem = Problem::new(Sphere::new(2));
        assert!(problem.constrain(Constraint::BallInequality {
            origin: vec![0.0, 0.0],
            radius: 1.0,
        }));

        // Infeasible incumbent with a better objective.
        let mut incumbent = SolverState::new(&problem, &[2.0, 0.0]);
        // Feasible candidate with a worse objective.
        let candidate = SolverState::new(&problem, &[1.0, 0.0]);

        assert!(incumbent.constraint_test() > 0.0);
        assert!(incumbent.update_if_better_constrained(&candidate, 1e-6));
        assert_eq!(incumbent.x, vec![1.0, 0.0]);

        // Both feasible: the objective decides.
        let worse = SolverState::new(&problem, &[0.9, 0.0]);
        assert!(incumbent.update_if_better_constrained(&worse, 1e-6));
        let worse_again = SolverState::new(&problem, &[0.95, 0.0]);
        assert!(!incumbent.update_if_better_constrained(&worse_again, 1e-6));
    }

    #[test]
    fn wolfe_conditions_on_a_parabola() {
        let function = Sphere::new(1);
        let mut state0 = sphere_state(&[1.0]);
        state0.d = vec![-1.0];

        // Exact minimizer along the ray: both conditions hold.
        let mut state = state0.clone();
        assert!(state.try_step(&function, &state0, 1.0));
        assert!(state.has_armijo(&state0, 1e-4));
        assert!(state.has_wolfe(&state0, 0.9));
        assert!(state.has_strong_wolfe(&state0, 0.9));

        // Tiny step: Armijo holds, curvature does not.
        let mut state = state0.clone();
        assert!(state.try_step(&function, &state0, 1e-3));
        assert!(state.has_armijo(&state0, 1e-4));
        assert!(!state.has_wolfe(&state0, 0.9));
    }

    #[test]
    fn gradient_test_normalizes_by_value() {
        let state = sphere_state(&[10.0, 0.0]);
        // f = 100, |g|_inf = 20.
        assert_eq!(state.gradient_test(), 0.2);

        let state = sphere_state(&[0.1, 0.0]);
        // f = 0.01 < 1, so no normalization.
        assert_eq!(state.gradient_test(), 0.2);
    }
}
