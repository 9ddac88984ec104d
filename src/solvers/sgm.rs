use num_traits::Float;

use crate::config::{check_half_open, check_range, ConfigError};
use crate::function::Problem;
use crate::linalg::{cast, norm};
use crate::solver::{Solver, SolverLogger, SolverOptions};
use crate::state::SolverState;

/// Subgradient method with the diminishing step rule
/// `t_k = 1 / (k + 1)^power` along the normalized subgradient.
///
/// The iteration is non-monotone and has no gradient-based stopping test on
/// non-smooth objectives, so the solve tracks the best point seen and
/// declares convergence when that best value stops improving for `patience`
/// consecutive iterations.
#[derive(Clone)]
pub struct Sgm<F: Float> {
    pub options: SolverOptions<F>,
    /// Exponent of the diminishing step, in (0.5, 1].
    pub power: F,
    /// Length of the stall window on the best value, in [10, 1e6].
    pub patience: usize,
}

impl<F: Float> Sgm<F> {
    pub fn new(options: SolverOptions<F>) -> Self {
        Sgm {
            options,
            power: cast(0.75),
            patience: 100,
        }
    }
}

impl Default for Sgm<f64> {
    fn default() -> Self {
        Sgm::new(SolverOptions::default())
    }
}

impl Default for Sgm<f32> {
    fn default() -> Self {
        Sgm::new(SolverOptions::default())
    }
}

impl<F: Float + 'static> Solver<F> for Sgm<F> {
    fn name(&self) -> String {
        "sgm".to_string()
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;

        let mut state = SolverState::new(problem, x0);
        let mut best = state.clone();

        // Best value at the start of the current stall window.
        let mut window_best = best.f;
        let mut window = 0usize;
        let mut k = 0usize;

        loop {
            let gnorm = norm(&state.g);
            if gnorm < F::epsilon() {
                // A vanishing subgradient is a stationary point.
                best.update_if_better(&state.x, &state.g, state.f);
                let done = self.options.done(&mut state, true, true);
                debug_assert!(done);
                break;
            }

            let t = F::one() / cast::<F>((k + 1) as f64).powf(self.power);
            let state0 = {
                let mut s = state.clone();
                s.d = state.g.iter().map(|&v| -v / gnorm).collect();
                s
            };
            let iter_ok = state.try_step(problem, &state0, t);
            state.iterations += 1;
            k += 1;

            if iter_ok {
                best.update_if_better(&state.x, &state.g, state.f);
            }

            window += 1;
            let mut converged = false;
            if window >= self.patience {
                converged =
                    window_best - best.f < self.options.epsilon * (F::one() + best.f.abs());
                window_best = best.f;
                window = 0;
            }

            if self.options.done(&mut state, iter_ok, converged) {
                break;
            }
        }

        // The iteration is non-monotone: return the best point seen.
        if !state.valid() || best.f < state.f {
            state.x.clone_from(&best.x);
            state.g.clone_from(&best.g);
            state.f = best.f;
        }
        Ok(state)
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            return Ok(());
        }
        match key {
            "power" => {
                self.power = cast(check_half_open(key, value, 0.5, 1.0)?);
                Ok(())
            }
            "patience" => {
                self.patience = check_range(key, value, 10.0, 1e6)? as usize;
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{Kinks, Sphere};
    use crate::function::Function;
    use crate::state::Status;

    #[test]
    fn zero_subgradient_stops_immediately() {
        let problem = Problem::new(Sphere::new(3));
        let state = Sgm::default().minimize(&problem, &[0.0; 3]);
        assert_eq!(state.status, Status::Converged);
        assert_eq!(state.iterations, 0);
        assert_eq!(state.f, 0.0);
    }

    #[test]
    fn sphere_reaches_a_small_value() {
        let problem = Problem::new(Sphere::new(2));
        let mut solver = Sgm::<f64>::default();
        solver.set_param("max_evals", 5000.0).unwrap();
        solver.set_param("epsilon", 1e-8).unwrap();
        let state = solver.minimize(&problem, &[1.0, -1.0]);
        assert!(state.f < 1e-3, "f = {}", state.f);
    }

    #[test]
    fn descends_on_a_non_smooth_objective() {
        let kinks = Kinks::new(2);
        let f0 = kinks.eval(&[1.5, -1.5], None);
        let problem = Problem::new(kinks);
        let mut solver = Sgm::<f64>::default();
        solver.set_param("max_evals", 2000.0).unwrap();
        let state = solver.minimize(&problem, &[1.5, -1.5]);
        assert!(state.f < f0, "no descent: f = {}", state.f);
    }

    #[test]
    fn repeated_solves_are_identical() {
        let problem = Problem::new(Kinks::new(2));
        let mut solver = Sgm::<f64>::default();
        solver.set_param("max_evals", 500.0).unwrap();
        let a = solver.minimize(&problem, &[1.0, -1.0]);
        let b = solver.minimize(&problem, &[1.0, -1.0]);
        assert_eq!(a.x, b.x);
        assert_eq!(a.f, b.f);
        assert_eq!(a.fcalls, b.fcalls);
    }

    #[test]
    fn parameter_domains() {
        let mut solver = Sgm::<f64>::default();
        assert!(solver.set_param("power", 1.0).is_ok());
        assert!(solver.set_param("power", 0.5).is_err());
        assert!(solver.set_param("power", 1.5).is_err());
        assert!(solver.set_param("patience", 50.0).is_ok());
        assert!(solver.set_param("patience", 5.0).is_err());
    }
}
