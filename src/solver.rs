use std::sync::Arc;

use num_traits::Float;

use crate::config::{check_half_open, check_open, check_range, ConfigError};
use crate::function::Problem;
use crate::linalg::cast;
use crate::lsearch0::Lsearch0;
use crate::lsearchk::{line_search, LsearchK, LsearchkParams};
use crate::state::{SolverState, Status};

/// Per-iteration callback: receives the state after each accepted step and
/// returns whether the solve should continue.
pub type SolverLogger<F> = Arc<dyn Fn(&SolverState<F>) -> bool + Send + Sync>;

/// A numerical solver for (constrained) continuous optimization problems.
pub trait Solver<F: Float> {
    fn name(&self) -> String;

    /// Minimize starting from `x0`, or fail fast on a dimension mismatch.
    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError>;

    /// Minimize starting from `x0`.
    ///
    /// Panics when `x0` does not match the problem's dimensionality; use
    /// [`Solver::try_minimize`] for a checked entry point.
    fn minimize(&self, problem: &Problem<F>, x0: &[F]) -> SolverState<F> {
        match self.try_minimize(problem, x0) {
            Ok(state) => state,
            Err(error) => panic!("{}", error),
        }
    }

    /// Tune a named parameter; out-of-domain values are rejected, never
    /// clamped.
    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError>;

    fn set_logger(&mut self, logger: SolverLogger<F>);

    fn clone_boxed(&self) -> Box<dyn Solver<F>>;
}

/// Tunables shared by every solver: the convergence criterion, the
/// evaluation budget and the line-search tolerance pair.
#[derive(Clone)]
pub struct SolverOptions<F: Float> {
    /// Convergence threshold on [`SolverState::gradient_test`], in (0, 0.1].
    pub epsilon: F,
    /// Budget on function evaluations, in [10, 1e9].
    pub max_evals: usize,
    /// Sufficient-decrease coefficient, 0 < c1 < c2 < 1.
    pub c1: F,
    /// Curvature coefficient.
    pub c2: F,
    pub lsearch_max_iterations: usize,
    pub logger: Option<SolverLogger<F>>,
}

impl Default for SolverOptions<f64> {
    fn default() -> Self {
        SolverOptions {
            epsilon: 1e-8,
            max_evals: 1000,
            c1: 1e-4,
            c2: 0.9,
            lsearch_max_iterations: 100,
            logger: None,
        }
    }
}

impl Default for SolverOptions<f32> {
    fn default() -> Self {
        SolverOptions {
            epsilon: 1e-5,
            max_evals: 1000,
            c1: 1e-4,
            c2: 0.9,
            lsearch_max_iterations: 100,
            logger: None,
        }
    }
}

impl<F: Float + 'static> SolverOptions<F> {
    /// Handle one of the shared parameter keys; `Ok(false)` means the key is
    /// not a shared one and the caller should try its own keys.
    pub fn set_param(&mut self, key: &str, value: f64) -> Result<bool, ConfigError> {
        match key {
            "epsilon" => {
                self.epsilon = cast(check_half_open(key, value, 0.0, 0.1)?);
                Ok(true)
            }
            "max_evals" => {
                self.max_evals = check_range(key, value, 10.0, 1e9)? as usize;
                Ok(true)
            }
            "c1" => {
                let c2: f64 = self.c2.to_f64().unwrap_or(1.0);
                self.c1 = cast(check_open(key, value, 0.0, c2)?);
                Ok(true)
            }
            "c2" => {
                let c1: f64 = self.c1.to_f64().unwrap_or(0.0);
                self.c2 = cast(check_open(key, value, c1, 1.0)?);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub(crate) fn lsearchk_params(&self) -> LsearchkParams<F> {
        LsearchkParams {
            c1: self.c1,
            c2: self.c2,
            max_iterations: self.lsearch_max_iterations,
            epsilon: cast(1e-6),
        }
    }

    /// Invoke the logger; true means "keep going".
    pub(crate) fn log(&self, state: &SolverState<F>) -> bool {
        match &self.logger {
            Some(logger) => logger(state),
            None => true,
        }
    }

    /// End-of-iteration protocol: settle the status and report whether the
    /// outer loop is finished.
    ///
    /// Order matters: an invalid iteration fails the solve, convergence wins
    /// over the budget, and the logger may request a stop at any iteration.
    pub(crate) fn done(&self, state: &mut SolverState<F>, iter_ok: bool, converged: bool) -> bool {
        if converged {
            state.status = Status::Converged;
            self.log(state);
            true
        } else if !iter_ok {
            state.status = Status::Failed;
            self.log(state);
            true
        } else if !self.log(state) {
            state.status = Status::Stopped;
            true
        } else if state.fcalls >= self.max_evals {
            state.status = Status::MaxEvals;
            true
        } else {
            false
        }
    }

    pub(crate) fn check_dim(&self, problem: &Problem<F>, x0: &[F]) -> Result<(), ConfigError> {
        use crate::function::Function;
        if x0.len() == problem.dim() {
            Ok(())
        } else {
            Err(ConfigError::DimensionMismatch {
                expected: problem.dim(),
                actual: x0.len(),
            })
        }
    }
}

/// The two stages of a line search, cloned fresh for every solve so that
/// per-solve history never leaks across threads or problems.
pub struct LsearchPair<F: Float> {
    pub lsearch0: Box<dyn Lsearch0<F>>,
    pub lsearchk: Box<dyn LsearchK<F>>,
}

impl<F: Float + 'static> LsearchPair<F> {
    pub fn new(lsearch0: Box<dyn Lsearch0<F>>, lsearchk: Box<dyn LsearchK<F>>) -> Self {
        LsearchPair { lsearch0, lsearchk }
    }

    /// Run both stages: estimate the initial step, then refine it.
    pub fn step(
        &mut self,
        problem: &Problem<F>,
        state: &mut SolverState<F>,
        params: &LsearchkParams<F>,
    ) -> bool {
        let t0 = self.lsearch0.initial_step(state);
        line_search(self.lsearchk.as_mut(), problem, state, t0, params)
    }
}

impl<F: Float> Clone for LsearchPair<F> {
    fn clone(&self) -> Self {
        LsearchPair {
            lsearch0: self.lsearch0.clone_boxed(),
            lsearchk: self.lsearchk.clone_boxed(),
        }
    }
}

/// Shared outer loop of the line-search solvers (gradient descent, conjugate
/// gradient, quasi-Newton, L-BFGS).
///
/// `direction` fills in the descent direction for the current state; it may
/// keep per-solve scratch (previous gradient, curvature history) in its
/// captures. A direction that is not a strict descent direction fails the
/// iteration.
pub(crate) fn iterate<F: Float + 'static>(
    options: &SolverOptions<F>,
    lsearch: &LsearchPair<F>,
    problem: &Problem<F>,
    x0: &[F],
    mut direction: impl FnMut(&SolverState<F>, &mut Vec<F>),
) -> SolverState<F> {
    let mut state = SolverState::new(problem, x0);

    // Already at a critical point: zero iterations.
    if state.gradient_test() < options.epsilon {
        state.status = Status::Converged;
        options.log(&state);
        return state;
    }

    let mut lsearch = lsearch.clone();
    let params = options.lsearchk_params();
    let mut best = state.clone();

    loop {
        let mut d = std::mem::take(&mut state.d);
        direction(&state, &mut d);
        state.d = d;

        let iter_ok = state.has_descent() && lsearch.step(problem, &mut state, &params);
        state.iterations += 1;

        if iter_ok {
            best.update_if_better(&state.x, &state.g, state.f);
        }
        let converged = iter_ok && state.gradient_test() < options.epsilon;
        if options.done(&mut state, iter_ok, converged) {
            break;
        }
    }

    // On failure fall back to the best valid point seen.
    if !state.valid() || best.f < state.f {
        state.x.clone_from(&best.x);
        state.g.clone_from(&best.g);
        state.f = best.f;
    }
    state
}
