use num_traits::Float;

use super::{secant, stpmax, LsearchK, LsearchkLogger, LsearchkParams, Trial};
use crate::function::Function;
use crate::linalg::cast;
use crate::state::SolverState;

/// CG-DESCENT line search (Hager & Zhang): accepts either the regular Wolfe
/// conditions or the approximate Wolfe conditions, which stay usable when
/// the decrease `f0 - f` is at the level of machine precision. The bracket
/// is refined with secant steps, falling back to bisection whenever the
/// interval does not contract fast enough.
pub struct LsearchkCgDescent<F: Float> {
    /// Bisection weight used while restoring the opposite-slope invariant.
    pub theta: F,
    /// Required contraction factor of the bracketing interval per round.
    pub gamma: F,
    /// Expansion factor of the initial bracketing phase.
    pub ro: F,
    logger: Option<LsearchkLogger<F>>,
}

impl<F: Float> Default for LsearchkCgDescent<F> {
    fn default() -> Self {
        LsearchkCgDescent {
            theta: cast(0.5),
            gamma: cast(0.66),
            ro: cast(5.0),
            logger: None,
        }
    }
}

enum Shrink<F: Float> {
    Accepted,
    Bracket(Trial<F>),
    Failed,
}

fn accepted<F: Float>(
    state: &SolverState<F>,
    state0: &SolverState<F>,
    params: &LsearchkParams<F>,
) -> bool {
    (state.has_armijo(state0, params.c1) && state.has_wolfe(state0, params.c2))
        || state.has_approx_wolfe(state0, params.c1, params.c2, params.epsilon)
}

impl<F: Float> LsearchkCgDescent<F> {
    fn log(&self, state0: &SolverState<F>, state: &SolverState<F>) {
        if let Some(logger) = &self.logger {
            logger(state0, state);
        }
    }

    /// Restore the bracket invariant on `[a, b]` when `b` has a negative
    /// slope but a too-large value, by theta-weighted bisection.
    fn shrink(
        &self,
        function: &dyn Function<F>,
        state0: &SolverState<F>,
        state: &mut SolverState<F>,
        a: &mut Trial<F>,
        mut b: Trial<F>,
        fmax: F,
        params: &LsearchkParams<F>,
    ) -> Shrink<F> {
        for _ in 0..params.max_iterations {
            if b.t - a.t <= F::epsilon() * b.t.max(F::one()) {
                return Shrink::Failed;
            }

            let t = (F::one() - self.theta) * a.t + self.theta * b.t;
            if !state.try_step(function, state0, t) {
                return Shrink::Failed;
            }
            self.log(state0, state);
            if accepted(state, state0, params) {
                return Shrink::Accepted;
            }

            let d = Trial::of(state);
            if d.dg >= F::zero() {
                return Shrink::Bracket(d);
            }
            if d.f <= fmax {
                *a = d;
            } else {
                b = d;
            }
        }

        Shrink::Failed
    }
}

impl<F: Float + 'static> LsearchK<F> for LsearchkCgDescent<F> {
    fn search(
        &mut self,
        function: &dyn Function<F>,
        state0: &SolverState<F>,
        state: &mut SolverState<F>,
        params: &LsearchkParams<F>,
    ) -> bool {
        if accepted(state, state0, params) {
            return true;
        }

        let fmax = state0.f + params.epsilon * state0.f.abs();
        let mut a = Trial::origin(state0);
        let mut b: Option<Trial<F>> = None;

        // Bracketing: expand until the slope turns non-negative or the value
        // exceeds the tolerance band.
        let mut cur = Trial::of(state);
        for _ in 0..params.max_iterations {
            if cur.dg >= F::zero() {
                b = Some(cur);
                break;
            }
            if cur.f > fmax {
                match self.shrink(function, state0, state, &mut a, cur, fmax, params) {
                    Shrink::Accepted => return true,
                    Shrink::Bracket(bb) => {
                        b = Some(bb);
                        break;
                    }
                    Shrink::Failed => return false,
                }
            }

            a = cur;
            let t = self.ro * cur.t;
            if t > stpmax() {
                return false;
            }
            if !state.try_step(function, state0, t) {
                return false;
            }
            self.log(state0, state);
            if accepted(state, state0, params) {
                return true;
            }
            cur = Trial::of(state);
        }

        let Some(mut b) = b else {
            return false;
        };

        // Refinement: secant steps, with a bisection round whenever the
        // interval failed to contract by gamma.
        let half = cast::<F>(0.5);
        let mut force_bisection = false;
        for _ in 0..params.max_iterations {
            let width = b.t - a.t;
            if width <= F::epsilon() * b.t.max(F::one()) {
                return false;
            }

            let mut t = if force_bisection {
                F::nan()
            } else {
                secant(&a, &b)
            };
            if !(t.is_finite() && a.t < t && t < b.t) {
                t = half * (a.t + b.t);
            }

            if !state.try_step(function, state0, t) {
                return false;
            }
            self.log(state0, state);
            if accepted(state, state0, params) {
                return true;
            }

            let c = Trial::of(state);
            if c.dg >= F::zero() {
                b = c;
            } else if c.f <= fmax {
                a = c;
            } else {
                match self.shrink(function, state0, state, &mut a, c, fmax, params) {
                    Shrink::Accepted => return true,
                    Shrink::Bracket(bb) => b = bb,
                    Shrink::Failed => return false,
                }
            }
            force_bisection = b.t - a.t > self.gamma * width;
        }

        false
    }

    fn clone_boxed(&self) -> Box<dyn LsearchK<F>> {
        Box::new(LsearchkCgDescent {
            theta: self.theta,
            gamma: self.gamma,
            ro: self.ro,
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
