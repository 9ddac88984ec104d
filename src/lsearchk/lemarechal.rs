use num_traits::Float;

use super::{cubic, stpmax, LsearchK, LsearchkLogger, LsearchkParams, Trial};
use crate::function::Function;
use crate::linalg::cast;
use crate::state::SolverState;

/// Line search targeting the regular Wolfe conditions by bracketing,
/// following Lemarechal's scheme: extrapolate until the sufficient decrease
/// fails, then interpolate inside the bracket with safeguarded cubic steps.
pub struct LsearchkLemarechal<F: Float> {
    /// Extrapolation factor applied while no upper bracket end is known.
    pub tau1: F,
    logger: Option<LsearchkLogger<F>>,
}

impl<F: Float> Default for LsearchkLemarechal<F> {
    fn default() -> Self {
        LsearchkLemarechal {
            tau1: cast(9.0),
            logger: None,
        }
    }
}

impl<F: Float + 'static> LsearchK<F> for LsearchkLemarechal<F> {
    fn search(
        &mut self,
        function: &dyn Function<F>,
        state0: &SolverState<F>,
        state: &mut SolverState<F>,
        params: &LsearchkParams<F>,
    ) -> bool {
        let mut lo = Trial::origin(state0);
        let mut hi: Option<Trial<F>> = None;

        for _ in 0..params.max_iterations {
            if !state.has_armijo(state0, params.c1) {
                hi = Some(Trial::of(state));
            } else if !state.has_wolfe(state0, params.c2) {
                lo = Trial::of(state);
            } else {
                return true;
            }

            let t = match &hi {
                // Still extrapolating: the last Armijo-satisfying step is lo.
                None => ((F::one() + self.tau1) * lo.t).min(stpmax()),
                Some(hi) => {
                    let width = (hi.t - lo.t).abs();
                    let margin = cast::<F>(0.1) * width;
                    let inner_lo = lo.t.min(hi.t) + margin;
                    let inner_hi = lo.t.max(hi.t) - margin;
                    let proposal = cubic(&lo, hi);
                    if proposal.is_finite() {
                        proposal.max(inner_lo).min(inner_hi)
                    } else {
                        lo.t + (hi.t - lo.t) * cast::<F>(0.5)
                    }
                }
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
        Box::new(LsearchkLemarechal {
            tau1: self.tau1,
            logger: None,
        })
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
    fn satisfies_regular_wolfe() {
        let params = LsearchkParams::default();
        for x0 in [vec![1.0, -2.0, 3.0], vec![0.1, 0.1, 0.1]] {
            let function = Sphere::new(3);
            let mut state = steepest_descent_state(&function, &x0);
            let state0 = state.clone();

            let mut strategy = LsearchkLemarechal::default();
            assert!(line_search(&mut strategy, &function, &mut state, 0.01, &params));
            assert!(state.has_armijo(&state0, params.c1));
            assert!(state.has_wolfe(&state0, params.c2));
        }
    }

    #[test]
    fn brackets_on_rosenbrock() {
        let function = Rosenbrock::new(2);
        let params = LsearchkParams::default();
        let mut state = steepest_descent_state(&function, &[-1.2, 1.0]);
        let state0 = state.clone();

        let mut strategy = LsearchkLemarechal::default();
        assert!(line_search(&mut strategy, &function, &mut state, 1.0, &params));
        assert!(state.has_armijo(&state0, params.c1));
        assert!(state.has_wolfe(&state0, params.c2));
    }
}
