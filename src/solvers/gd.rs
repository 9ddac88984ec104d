use num_traits::Float;

use crate::config::ConfigError;
use crate::function::Problem;
use crate::lsearch0::Lsearch0Quadratic;
use crate::lsearchk::LsearchkMoreThuente;
use crate::solver::{iterate, LsearchPair, Solver, SolverLogger, SolverOptions};
use crate::state::SolverState;

/// Steepest gradient descent, `d = -g`, the baseline of the line-search
/// family.
#[derive(Clone)]
pub struct Gd<F: Float> {
    pub options: SolverOptions<F>,
    lsearch: LsearchPair<F>,
}

impl<F: Float + 'static> Gd<F> {
    pub fn new(options: SolverOptions<F>) -> Self {
        Gd {
            options,
            lsearch: LsearchPair::new(
                Box::new(Lsearch0Quadratic::default()),
                Box::new(LsearchkMoreThuente::default()),
            ),
        }
    }

    /// Replace the line-search pair.
    pub fn set_lsearch(&mut self, lsearch: LsearchPair<F>) {
        self.lsearch = lsearch;
    }
}

impl Default for Gd<f64> {
    fn default() -> Self {
        Gd::new(SolverOptions::default())
    }
}

impl Default for Gd<f32> {
    fn default() -> Self {
        Gd::new(SolverOptions::default())
    }
}

impl<F: Float + 'static> Solver<F> for Gd<F> {
    fn name(&self) -> String {
        "gd".to_string()
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;
        Ok(iterate(&self.options, &self.lsearch, problem, x0, |state, d| {
            for i in 0..d.len() {
                d[i] = -state.g[i];
            }
        }))
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            Ok(())
        } else {
            Err(ConfigError::UnknownParameter(key.to_string()))
        }
    }

    fn set_logger(&mut self, logger: SolverLogger<F>) {
        self.options.logger = Some(logger);
    }

    fn clone_boxed(&self) -> Box<dyn Solver<F>> {
        Box::new(self.clone())
    }
}
