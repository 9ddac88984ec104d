use std::collections::VecDeque;

use num_traits::Float;

use crate::config::{check_range, ConfigError};
use crate::function::Problem;
use crate::linalg::{dot, norm};
use crate::lsearch0::Lsearch0Constant;
use crate::lsearchk::LsearchkMoreThuente;
use crate::solver::{iterate, LsearchPair, Solver, SolverLogger, SolverOptions};
use crate::state::SolverState;

/// Limited-memory BFGS: the two-loop recursion over the most recent
/// `history` secant pairs, with the standard `s.y / y.y` scaling of the
/// seed matrix.
#[derive(Clone)]
pub struct Lbfgs<F: Float> {
    pub options: SolverOptions<F>,
    /// Number of secant pairs kept, in [1, 1000].
    pub history: usize,
    lsearch: LsearchPair<F>,
}

impl<F: Float + 'static> Lbfgs<F> {
    pub fn new(options: SolverOptions<F>) -> Self {
        Lbfgs {
            options,
            history: 6,
            lsearch: LsearchPair::new(
                Box::new(Lsearch0Constant::default()),
                Box::new(LsearchkMoreThuente::default()),
            ),
        }
    }

    /// Replace the line-search pair.
    pub fn set_lsearch(&mut self, lsearch: LsearchPair<F>) {
        self.lsearch = lsearch;
    }
}

impl Default for Lbfgs<f64> {
    fn default() -> Self {
        Lbfgs::new(SolverOptions::default())
    }
}

impl Default for Lbfgs<f32> {
    fn default() -> Self {
        Lbfgs::new(SolverOptions::default())
    }
}

/// Two-loop recursion, `d = -H g` without forming `H`.
fn two_loop<F: Float>(g: &[F], pairs: &VecDeque<(Vec<F>, Vec<F>, F)>, d: &mut [F]) {
    let k = pairs.len();
    let mut q = g.to_vec();
    let mut alpha = vec![F::zero(); k];

    for (i, (s, y, rho)) in pairs.iter().enumerate().rev() {
        alpha[i] = *rho * dot(s, &q);
        for j in 0..q.len() {
            q[j] = q[j] - alpha[i] * y[j];
        }
    }

    if let Some((s, y, _)) = pairs.back() {
        let gamma = dot(s, y) / dot(y, y);
        for v in q.iter_mut() {
            *v = *v * gamma;
        }
    }

    for (i, (s, y, rho)) in pairs.iter().enumerate() {
        let beta = *rho * dot(y, &q);
        for j in 0..q.len() {
            q[j] = q[j] + (alpha[i] - beta) * s[j];
        }
    }

    for i in 0..d.len() {
        d[i] = -q[i];
    }
}

impl<F: Float + 'static> Solver<F> for Lbfgs<F> {
    fn name(&self) -> String {
        "lbfgs".to_string()
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;

        let history = self.history;
        let mut pairs: VecDeque<(Vec<F>, Vec<F>, F)> = VecDeque::with_capacity(history);
        let mut prev: Option<(Vec<F>, Vec<F>)> = None;

        Ok(iterate(&self.options, &self.lsearch, problem, x0, move |state, d| {
            if let Some((px, pg)) = &prev {
                let n = px.len();
                let mut s = vec![F::zero(); n];
                let mut y = vec![F::zero(); n];
                for i in 0..n {
                    s[i] = state.x[i] - px[i];
                    y[i] = state.g[i] - pg[i];
                }
                let sy = dot(&s, &y);
                // Skip pairs without positive curvature.
                if sy > F::epsilon() * norm(&s) * norm(&y) {
                    if pairs.len() == history {
                        pairs.pop_front();
                    }
                    let rho = F::one() / sy;
                    pairs.push_back((s, y, rho));
                }
            }

            two_loop(&state.g, &pairs, d);
            prev = Some((state.x.clone(), state.g.clone()));
        }))
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            return Ok(());
        }
        match key {
            "history" => {
                self.history = check_range(key, value, 1.0, 1000.0)? as usize;
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
    use crate::benchmark::{Rosenbrock, Sphere};
    use crate::state::Status;

    #[test]
    fn sphere_from_the_origin_needs_no_iteration() {
        let problem = Problem::new(Sphere::new(7));
        let state = Lbfgs::default().minimize(&problem, &[0.0; 7]);
        assert_eq!(state.status, Status::Converged);
        assert_eq!(state.iterations, 0);
        assert_eq!(state.f, 0.0);
    }

    #[test]
    fn sphere_from_a_distance() {
        let problem = Problem::new(Sphere::new(7));
        let state = Lbfgs::default().minimize(&problem, &[3.0; 7]);
        assert_eq!(state.status, Status::Converged);
        assert!(state.f < 1e-10);
    }

    #[test]
    fn rosenbrock_converges() {
        let problem = Problem::new(Rosenbrock::new(2));
        let mut solver = Lbfgs::<f64>::default();
        solver.set_param("max_evals", 10_000.0).unwrap();
        let state = solver.minimize(&problem, &[-1.2, 1.0]);
        assert_eq!(state.status, Status::Converged);
        assert!((state.x[0] - 1.0).abs() < 1e-5);
    }

    #[test]
    fn history_domain() {
        let mut solver = Lbfgs::<f64>::default();
        assert!(solver.set_param("history", 10.0).is_ok());
        assert_eq!(solver.history, 10);
        assert!(solver.set_param("history", 0.0).is_err());
    }

    #[test]
    fn empty_history_falls_back_to_steepest_descent() {
        let pairs = VecDeque::new();
        let mut d = vec![0.0; 2];
        two_loop(&[1.0, -2.0], &pairs, &mut d);
        assert_eq!(d, vec![-1.0, 2.0]);
    }
}
