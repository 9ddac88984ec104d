use num_traits::Float;

use crate::config::{check_range, ConfigError};
use crate::function::Problem;
use crate::linalg::{cast, dot, identity, matvec};
use crate::solver::{Solver, SolverLogger, SolverOptions};
use crate::state::SolverState;

/// The (deep-cut) ellipsoid method: maintain an ellipsoid `x + {d : d' inv(H) d <= 1}`
/// guaranteed to contain a minimizer, cut it through the current gradient
/// and re-center on the smaller half.
///
/// Dimension-independent but slow (`O(n^2)` per iteration, linear
/// convergence), and valid for non-smooth convex objectives; the method of
/// last resort when line searches are not applicable. Degenerates to
/// bisection when `n = 1`.
#[derive(Clone)]
pub struct Ellipsoid<F: Float> {
    pub options: SolverOptions<F>,
    /// Radius of the initial ball around `x0`, in [1e-6, 1e6]. Must be large
    /// enough for the ball to contain a minimizer.
    pub radius: F,
}

impl<F: Float> Ellipsoid<F> {
    pub fn new(options: SolverOptions<F>) -> Self {
        Ellipsoid {
            options,
            radius: cast(10.0),
        }
    }
}

impl Default for Ellipsoid<f64> {
    fn default() -> Self {
        Ellipsoid::new(SolverOptions::default())
    }
}

impl Default for Ellipsoid<f32> {
    fn default() -> Self {
        Ellipsoid::new(SolverOptions::default())
    }
}

impl<F: Float + 'static> Ellipsoid<F> {
    /// The 1-D degenerate case: bisection on the gradient sign over
    /// `[x0 - radius, x0 + radius]`.
    fn bisect(&self, problem: &Problem<F>, mut state: SolverState<F>) -> SolverState<F> {
        let half = cast::<F>(0.5);
        let mut lo = state.x[0] - self.radius;
        let mut hi = state.x[0] + self.radius;
        let mut best = state.clone();

        loop {
            let width = half * (hi - lo);
            let iter_ok = state.valid() && width > F::zero();
            let converged = iter_ok && width * state.g[0].abs() < self.options.epsilon;
            if self.options.done(&mut state, iter_ok, converged) {
                break;
            }

            if state.g[0] > F::zero() {
                hi = state.x[0];
            } else {
                lo = state.x[0];
            }

            let mid = half * (lo + hi);
            let state0 = {
                let mut s = state.clone();
                s.d = vec![mid - state.x[0]];
                s
            };
            state.try_step(problem, &state0, F::one());
            state.iterations += 1;
            best.update_if_better(&state.x, &state.g, state.f);
        }

        restore_best(state, best)
    }
}

impl<F: Float + 'static> Solver<F> for Ellipsoid<F> {
    fn name(&self) -> String {
        "ellipsoid".to_string()
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;

        let mut state = SolverState::new(problem, x0);
        let n = x0.len();
        if n == 1 {
            return Ok(self.bisect(problem, state));
        }

        let one = F::one();
        let nf = cast::<F>(n as f64);
        let two = cast::<F>(2.0);

        let mut h = identity::<F>(n);
        for row in h.iter_mut() {
            for v in row.iter_mut() {
                *v = *v * self.radius * self.radius;
            }
        }
        let mut best = state.clone();

        loop {
            let hg = matvec(&h, &state.g);
            let ghg = dot(&state.g, &hg);
            let cut = ghg.max(F::zero()).sqrt();

            let iter_ok = state.valid() && cut.is_finite() && cut > F::zero();
            let converged = iter_ok && cut < self.options.epsilon;
            if self.options.done(&mut state, iter_ok, converged) {
                break;
            }

            // Deep cut: discard the region where the (convex) objective
            // provably exceeds the incumbent value. Falls back to a central
            // cut when the depth degenerates.
            let mut alpha = ((state.f - best.f) / cut).max(F::zero());
            if !(alpha < one) {
                alpha = F::zero();
            }

            let scale = nf * nf * (one - alpha * alpha) / (nf * nf - one);
            let coef = two * (one + nf * alpha) / ((nf + one) * (one + alpha));
            let step = (one + nf * alpha) / (nf + one);

            let state0 = {
                let mut s = state.clone();
                s.d = hg.iter().map(|&v| -step * v / cut).collect();
                s
            };

            for i in 0..n {
                for j in 0..n {
                    h[i][j] = scale * (h[i][j] - coef * hg[i] * hg[j] / ghg);
                }
            }

            state.try_step(problem, &state0, F::one());
            state.iterations += 1;
            best.update_if_better(&state.x, &state.g, state.f);
        }

        Ok(restore_best(state, best))
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            return Ok(());
        }
        match key {
            "radius" => {
                self.radius = cast(check_range(key, value, 1e-6, 1e6)?);
                Ok(())
            }
            _ => Err(ConfigError::UnknownParameter(key.to_string())),
        }
    }

    fn set_logger(&mut self, logger: SolverLogger<F>) {
        self.options.logger = Some(logger);
    }

    fn clone_boxed(&self) -> Box<dyn Solver<F>> {
        Box::new(self.clone())
    }
}

/// The ellipsoid iteration is non-monotone: return the best point seen.
fn restore_best<F: Float>(mut state: SolverState<F>, best: SolverState<F>) -> SolverState<F> {
    if !state.valid() || best.f < state.f {
        state.x = best.x;
        state.g = best.g;
        state.f = best.f;
    }
    state
}
