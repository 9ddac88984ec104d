use num_traits::Float;

use super::{cubic, LsearchK, LsearchkLogger, LsearchkParams, Trial};
use crate::function::Function;
use crate::linalg::cast;
use crate::state::SolverState;

/// Backtracking line search targeting the Armijo condition, shrinking the
/// step by safeguarded cubic interpolation.
pub struct LsearchkBacktrack<F: Float> {
    logger: Option<LsearchkLogger<F>>,
}

impl<F: Float> Default for LsearchkBacktrack<F> {
    fn default() -> Self {
        LsearchkBacktrack { logger: None }
    }
}

impl<F: Float + 'static> LsearchK<F> for LsearchkBacktrack<F> {
    fn search(
        &mut self,
        function: &dyn Function<F>,
        state0: &SolverState<F>,
        state: &mut SolverState<F>,
        params: &LsearchkParams<F>,
    ) -> bool {
        let origin = Trial::origin(state0);

        for _ in 0..params.max_iterations {
            if state.has_armijo(state0, params.c1) {
                return true;
            }

            let cur = Trial::of(state);
            let lo = cast::<F>(0.1) * cur.t;
            let hi = cast::<F>(0.5) * cur.t;
            let proposal = cubic(&origin, &cur);
            let t = if proposal.is_finite() {
                proposal.max(lo).min(hi)
            } else {
                hi
            };

            if !state.try_step(function, state0, t) {
                return false;
            }
            if let Some(logger) = &self.logger {
                logger(state0, state);
            }
        }

        false
    }

    fn clone_boxed(&self) -> Box<dyn LsearchK<F>> {
        Box::new(LsearchkBacktrack { logger: None })
    }

    fn set_logger(&mut self, logger: LsearchkLogger<F>) {
        self.logger = Some(logger);
    }

    fn logger(&self) -> Option<&LsearchkLogger<F>> {
        self.logger.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{Rosenbrock, Sphere};
    use crate::lsearchk::line_search;

    fn steepest_descent_state(function: &dyn Function<f64>, x0: &[f64]) -> SolverState<f64> {
        let mut state = SolverState::new(function, x0);
        for i in 0..state.d.len() {
            state.d[i] = -state.g[i];
        }
        state
    }

    #[test]
    fn accepts_armijo_step_on_sphere() {
        let function = Sphere::new(3);
        let mut state = steepest_descent_state(&function, &[1.0, -2.0, 3.0]);
        let state0 = state.clone();
        let params = LsearchkParams::default();

        let mut strategy = LsearchkBacktrack::default();
        assert!(line_search(&mut strategy, &function, &mut state, 1.0, &params));
        assert!(state.has_armijo(&state0, params.c1));
        assert!(state.f < state0.f);
    }

    #[test]
    fn shrinks_overlong_step_on_rosenbrock() {
        let function = Rosenbrock::new(2);
        let mut state = steepest_descent_state(&function, &[-1.2, 1.0]);
        let state0 = state.clone();
        let params = LsearchkParams::default();

        let mut strategy = LsearchkBacktrack::default();
        assert!(line_search(&mut strategy, &function, &mut state, 1.0, &params));
        assert!(state.has_armijo(&state0, params.c1));
        assert!(state.t < 1.0);
    }
}
