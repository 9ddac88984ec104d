use std::sync::Arc;

use num_traits::Float;

use crate::linalg::cast;
use crate::state::SolverState;

/// Diagnostic callback invoked with the current state and the proposed
/// initial step length.
pub type Lsearch0Logger<F> = Arc<dyn Fn(&SolverState<F>, F) + Send + Sync>;

/// Strategy estimating the initial step length `t0 > 0` of a line search.
///
/// Implementations may keep history across iterations of one solve; cloning
/// resets that history so each solve starts fresh.
pub trait Lsearch0<F: Float> {
    fn initial_step(&mut self, state: &SolverState<F>) -> F;

    fn clone_boxed(&self) -> Box<dyn Lsearch0<F>>;

    fn set_logger(&mut self, logger: Lsearch0Logger<F>);
}

/// Constant initial step length, the natural choice for quasi-Newton methods
/// where the unit step is expected to be accepted eventually.
pub struct Lsearch0Constant<F: Float> {
    pub t0: F,
    logger: Option<Lsearch0Logger<F>>,
}

impl<F: Float> Lsearch0Constant<F> {
    pub fn new(t0: F) -> Self {
        debug_assert!(t0 > F::zero());
        Lsearch0Constant { t0, logger: None }
    }
}

impl<F: Float> Default for Lsearch0Constant<F> {
    fn default() -> Self {
        Lsearch0Constant::new(F::one())
    }
}

impl<F: Float + 'static> Lsearch0<F> for Lsearch0Constant<F> {
    fn initial_step(&mut self, state: &SolverState<F>) -> F {
        if let Some(logger) = &self.logger {
            logger(state, self.t0);
        }
        self.t0
    }

    fn clone_boxed(&self) -> Box<dyn Lsearch0<F>> {
        Box::new(Lsearch0Constant::new(self.t0))
    }

    fn set_logger(&mut self, logger: Lsearch0Logger<F>) {
        self.logger = Some(logger);
    }
}

/// Initial step length assuming the objective decreases along the new
/// direction roughly as it did along the previous one, fitted with a
/// quadratic model; see "Numerical optimization", Nocedal & Wright, 2nd
/// edition, p.59.
pub struct Lsearch0Quadratic<F: Float> {
    pub alpha: F,
    pub beta: F,
    prev: Option<(F, F)>,
    logger: Option<Lsearch0Logger<F>>,
}

impl<F: Float> Lsearch0Quadratic<F> {
    pub fn new(alpha: F, beta: F) -> Self {
        Lsearch0Quadratic {
            alpha,
            beta,
            prev: None,
            logger: None,
        }
    }
}

impl<F: Float> Default for Lsearch0Quadratic<F> {
    fn default() -> Self {
        Lsearch0Quadratic::new(cast(1.01), cast(10.0))
    }
}

impl<F: Float + 'static> Lsearch0<F> for Lsearch0Quadratic<F> {
    fn initial_step(&mut self, state: &SolverState<F>) -> F {
        let two = cast::<F>(2.0);
        let t0 = match self.prev {
            // No history on the first iteration.
            None => F::one(),
            Some((prev_f, prev_dg)) => {
                let decrease = (prev_f - state.f).max(self.beta * F::epsilon());
                F::one().min(-self.alpha * two * decrease / prev_dg)
            }
        };
        self.prev = Some((state.f, state.dg()));

        if let Some(logger) = &self.logger {
            logger(state, t0);
        }
        t0
    }

    fn clone_boxed(&self) -> Box<dyn Lsearch0<F>> {
        Box::new(Lsearch0Quadratic::new(self.alpha, self.beta))
    }

    fn set_logger(&mut self, logger: Lsearch0Logger<F>) {
        self.logger = Some(logger);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::Sphere;
    use approx::assert_relative_eq;

    fn descent_state(x0: &[f64]) -> SolverState<f64> {
        let mut state = SolverState::new(&Sphere::new(x0.len()), x0);
        for i in 0..state.d.len() {
            state.d[i] = -state.g[i];
        }
        state
    }

    #[test]
    fn constant_returns_its_step() {
        let mut ls = Lsearch0Constant::new(0.25);
        let state = descent_state(&[1.0, 1.0]);
        assert_eq!(ls.initial_step(&state), 0.25);
        assert_eq!(ls.initial_step(&state), 0.25);
    }

    #[test]
    fn quadratic_first_step_is_unit() {
        let mut ls = Lsearch0Quadratic::<f64>::default();
        let state = descent_state(&[1.0, 1.0]);
        assert_eq!(ls.initial_step(&state), 1.0);
    }

    #[test]
    fn quadratic_uses_previous_decrease() {
        let mut ls = Lsearch0Quadratic::new(1.01, 10.0);

        let state0 = descent_state(&[1.0, 1.0]);
        assert_eq!(ls.initial_step(&state0), 1.0);

        // After a decrease from f=2 to f=0.5 with previous dg = -8, the
        // quadratic fit proposes 1.01 * 2 * 1.5 / 8.
        let state1 = descent_state(&[0.5, 0.0]);
        let t0 = ls.initial_step(&state1);
        assert_relative_eq!(t0, 1.01 * 2.0 * 1.5 / 8.0, max_relative = 1e-12);
        assert!(t0 <= 1.0);
    }

    #[test]
    fn clone_resets_history() {
        let mut ls = Lsearch0Quadratic::new(1.01, 10.0);
        let state = descent_state(&[1.0, 1.0]);
        ls.initial_step(&state);

        let mut fresh = ls.clone_boxed();
        assert_eq!(fresh.initial_step(&state), 1.0);
    }
}
