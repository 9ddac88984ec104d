use num_traits::Float;

use super::{cubic, stpmax, LsearchK, LsearchkLogger, LsearchkParams, Trial};
use crate::function::Function;
use crate::linalg::cast;
use crate::state::SolverState;

/// Line search targeting the strong Wolfe conditions with the classic
/// bracket-then-zoom scheme; see "Numerical optimization", Nocedal & Wright,
/// 2nd edition, p.60.
pub struct LsearchkFletcher<F: Float> {
    /// Bracket expansion factor.
    pub tau1: F,
    logger: Option<LsearchkLogger<F>>,
}

impl<F: Float> Default for LsearchkFletcher<F> {
    fn default() -> Self {
        LsearchkFletcher {
            tau1: cast(9.0),
            logger: None,
        }
    }
}

impl<F: Float> LsearchkFletcher<F> {
    fn zoom(
        &self,
        function: &dyn Function<F>,
        state0: &SolverState<F>,
        state: &mut SolverState<F>,
        mut lo: Trial<F>,
        mut hi: Trial<F>,
        params: &LsearchkParams<F>,
    ) -> bool {
        for _ in 0..params.max_iterations {
            let width = (hi.t - lo.t).abs();
            if width < F::epsilon() {
                return false;
            }

            let margin = cast::<F>(0.1) * width;
            let inner_lo = lo.t.min(hi.t) + margin;
            let inner_hi = lo.t.max(hi.t) - margin;
            let proposal = cubic(&lo, &hi);
            let t = if proposal.is_finite() {
                proposal.max(inner_lo).min(inner_hi)
            } else {
                lo.t + (hi.t - lo.t) * cast::<F>(0.5)
            };

            if !state.try_step(function, state0, t) {
                return false;
            }
            if let Some(logger) = &self.logger {
                logger(state0, state);
            }

            let cur = Trial::of(state);
            if !state.has_armijo(state0, params.c1) || cur.f >= lo.f {
                hi = cur;
            } else {
                if state.has_strong_wolfe(state0, params.c2) {
                    return true;
                }
                if cur.dg * (hi.t - lo.t) >= F::zero() {
                    hi = lo;
                }
                lo = cur;
            }
        }

        false
    }
}

impl<F: Float + 'static> LsearchK<F> for LsearchkFletcher<F> {
    fn search(
        &mut self,
        function: &dyn Function<F>,
        state0: &SolverState<F>,
        state: &mut SolverState<F>,
        params: &LsearchkParams<F>,
    ) -> bool {
        let mut prev = Trial::origin(state0);

        for i in 0..params.max_iterations {
            let cur = Trial::of(state);

            if !state.has_armijo(state0, params.c1) || (i > 0 && cur.f >= prev.f) {
                return self.zoom(function, state0, state, prev, cur, params);
            }
            if state.has_strong_wolfe(state0, params.c2) {
                return true;
            }
            if cur.dg >= F::zero() {
                return self.zoom(function, state0, state, cur, prev, params);
            }

            let t = (cur.t + self.tau1 * (cur.t - prev.t)).min(stpmax());
            prev = cur;
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
        Box::new(LsearchkFletcher {
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
