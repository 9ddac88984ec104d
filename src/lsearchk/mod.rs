//! Line-search refinement: given a state with a descent direction and an
//! initial step length, find a step length satisfying the strategy's
//! acceptance conditions (Armijo, regular/strong/approximate Wolfe).

use std::sync::Arc;

use num_traits::Float;

use crate::function::Function;
use crate::linalg::cast;
use crate::state::SolverState;

mod backtrack;
mod cgdescent;
mod fletcher;
mod lemarechal;
mod morethuente;

pub use backtrack::LsearchkBacktrack;
pub use cgdescent::LsearchkCgDescent;
pub use fletcher::LsearchkFletcher;
pub use lemarechal::LsearchkLemarechal;
pub use morethuente::LsearchkMoreThuente;

/// Diagnostic callback invoked once per trial with the starting state and
/// the trial state.
pub type LsearchkLogger<F> = Arc<dyn Fn(&SolverState<F>, &SolverState<F>) + Send + Sync>;

/// Acceptance tolerances and iteration budget of the refinement stage.
#[derive(Clone, Copy)]
pub struct LsearchkParams<F: Float> {
    /// Sufficient-decrease coefficient, `0 < c1 < c2`.
    pub c1: F,
    /// Curvature coefficient, `c1 < c2 < 1`.
    pub c2: F,
    pub max_iterations: usize,
    /// Relative tolerance used by the approximate Wolfe conditions.
    pub epsilon: F,
}

impl Default for LsearchkParams<f64> {
    fn default() -> Self {
        LsearchkParams {
            c1: 1e-4,
            c2: 0.9,
            max_iterations: 100,
            epsilon: 1e-6,
        }
    }
}

impl Default for LsearchkParams<f32> {
    fn default() -> Self {
        LsearchkParams {
            c1: 1e-4,
            c2: 0.9,
            max_iterations: 100,
            epsilon: 1e-5,
        }
    }
}

/// A line-search refinement strategy.
///
/// `search` is handed the starting state (`t = 0`) and a state already
/// evaluated at the first valid trial step; it must leave `state` at the
/// accepted step when returning true.
pub trait LsearchK<F: Float> {
    fn search(
        &mut self,
        function: &dyn Function<F>,
        state0: &SolverState<F>,
        state: &mut SolverState<F>,
        params: &LsearchkParams<F>,
    ) -> bool;

    fn clone_boxed(&self) -> Box<dyn LsearchK<F>>;

    fn set_logger(&mut self, logger: LsearchkLogger<F>);

    fn logger(&self) -> Option<&LsearchkLogger<F>> {
        None
    }
}

/// Smallest step length a caller may request.
pub(crate) fn stpmin<F: Float>() -> F {
    cast::<F>(100.0) * F::epsilon()
}

/// Largest step length the strategies will extrapolate to.
pub(crate) fn stpmax<F: Float>() -> F {
    cast(1e6)
}

/// Shared driver for all refinement strategies.
///
/// Rejects non-descent directions outright, clamps the initial step to
/// `(stpmin, 1]` (non-finite proposals become 1), halves the step while the
/// evaluated state is non-finite, then delegates to the strategy. Success
/// additionally requires the final state to be finite.
pub fn line_search<F: Float>(
    strategy: &mut dyn LsearchK<F>,
    function: &dyn Function<F>,
    state: &mut SolverState<F>,
    t0: F,
    params: &LsearchkParams<F>,
) -> bool {
    if !state.has_descent() {
        return false;
    }

    let mut state0 = state.clone();
    state0.t = F::zero();

    let mut t = if t0.is_finite() {
        t0.max(stpmin()).min(F::one())
    } else {
        F::one()
    };

    let mut ok = false;
    for _ in 0..params.max_iterations {
        ok = state.try_step(function, &state0, t);
        if let Some(logger) = strategy.logger() {
            logger(&state0, state);
        }
        if ok {
            break;
        }
        t = t * cast::<F>(0.5);
    }
    if !ok {
        return false;
    }

    strategy.search(function, &state0, state, params) && state.valid()
}

/// One evaluated point of the scalar function `phi(t) = f(x0 + t d)`.
#[derive(Clone, Copy)]
pub(crate) struct Trial<F: Float> {
    pub t: F,
    pub f: F,
    pub dg: F,
}

impl<F: Float> Trial<F> {
    pub fn of(state: &SolverState<F>) -> Self {
        Trial {
            t: state.t,
            f: state.f,
            dg: state.dg(),
        }
    }

    pub fn origin(state0: &SolverState<F>) -> Self {
        Trial {
            t: F::zero(),
            f: state0.f,
            dg: state0.dg(),
        }
    }
}

/// Minimizer of the cubic interpolating two points with values and slopes;
/// see "Numerical optimization", Nocedal & Wright, 2nd edition, p.59.
/// May return a non-finite value, callers must safeguard.
pub(crate) fn cubic<F: Float>(l: &Trial<F>, r: &Trial<F>) -> F {
    let three = cast::<F>(3.0);
    let two = cast::<F>(2.0);

    let d1 = l.dg + r.dg - three * (l.f - r.f) / (l.t - r.t);
    let sign = if r.t > l.t { F::one() } else { -F::one() };
    let d2 = sign * (d1 * d1 - l.dg * r.dg).sqrt();

    r.t - (r.t - l.t) * (r.dg + d2 - d1) / (r.dg - l.dg + two * d2)
}

/// Minimizer of the quadratic through `(0, f0)` with slope `dg0` and the
/// point `(t, ft)`. May return a non-finite value, callers must safeguard.
pub(crate) fn quadratic<F: Float>(origin: &Trial<F>, t: F, ft: F) -> F {
    let two = cast::<F>(2.0);
    -origin.dg * t * t / (two * (ft - origin.f - origin.dg * t))
}

/// Secant step through two slopes.
pub(crate) fn secant<F: Float>(a: &Trial<F>, b: &Trial<F>) -> F {
    (a.t * b.dg - b.t * a.dg) / (b.dg - a.dg)
}
