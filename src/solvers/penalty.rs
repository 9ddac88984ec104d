use num_traits::Float;

use crate::config::{check_range, ConfigError};
use crate::constraint::{self, Constraint};
use crate::function::{Function, Problem};
use crate::linalg::cast;
use crate::solver::{Solver, SolverLogger, SolverOptions};
use crate::solvers::lbfgs::Lbfgs;
use crate::state::{SolverState, Status};

/// `f(x) + rho * sum_j |h_j(x)| + rho * sum_i max(0, g_i(x))` or the squared
/// (smooth) variant, used as the inner objective of the penalty outer loops.
pub(crate) struct PenaltyFunction<F: Float> {
    problem: Problem<F>,
    pub rho: F,
    quadratic: bool,
}

impl<F: Float> PenaltyFunction<F> {
    pub fn new(problem: &Problem<F>, rho: F, quadratic: bool) -> Self {
        PenaltyFunction {
            problem: problem.clone(),
            rho,
            quadratic,
        }
    }
}

impl<F: Float + 'static> Function<F> for PenaltyFunction<F> {
    fn name(&self) -> String {
        let kind = if self.quadratic { "quadratic" } else { "linear" };
        format!("{}-penalty({})", kind, self.problem.name())
    }

    fn dim(&self) -> usize {
        self.problem.dim()
    }

    fn convex(&self) -> bool {
        // Penalties of convex constraints are convex.
        self.problem.convex()
    }

    fn smooth(&self) -> bool {
        // max(0, g)^2 is continuously differentiable, max(0, g) is not.
        self.quadratic && self.problem.smooth()
    }

    fn strong_convexity(&self) -> F {
        self.problem.strong_convexity()
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        let two = cast::<F>(2.0);
        match gx {
            None => {
                let mut f = self.problem.eval(x, None);
                for c in self.problem.constraints() {
                    let v = constraint::vgrad(c, x, None);
                    let penalty = if constraint::is_equality(c) {
                        if self.quadratic {
                            v * v
                        } else {
                            v.abs()
                        }
                    } else {
                        let vp = v.max(F::zero());
                        if self.quadratic {
                            vp * vp
                        } else {
                            vp
                        }
                    };
                    f = f + self.rho * penalty;
                }
                f
            }
            Some(gx) => {
                let mut f = self.problem.eval(x, Some(&mut *gx));
                let mut cg = vec![F::zero(); x.len()];
                for c in self.problem.constraints() {
                    let v = constraint::vgrad(c, x, Some(&mut cg));

                    // Penalty term and the weight of the constraint's
                    // gradient in the penalty gradient.
                    let (penalty, weight) = if constraint::is_equality(c) {
                        if self.quadratic {
                            (v * v, two * v)
                        } else {
                            (v.abs(), v.signum())
                        }
                    } else {
                        let vp = v.max(F::zero());
                        if self.quadratic {
                            (vp * vp, two * vp)
                        } else {
                            (vp, if v > F::zero() { F::one() } else { F::zero() })
                        }
                    };

                    f = f + self.rho * penalty;
                    for i in 0..gx.len() {
                        gx[i] = gx[i] + self.rho * weight * cg[i];
                    }
                }
                f
            }
        }
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(PenaltyFunction {
            problem: self.problem.clone(),
            rho: self.rho,
            quadratic: self.quadratic,
        })
    }
}

/// Penalty outer loop: minimize the penalty-augmented objective at a growing
/// penalty weight until the iterate is feasible.
///
/// The linear penalty is exact but non-smooth; the quadratic penalty is
/// smooth but needs `rho` to grow without bound for exact feasibility.
#[derive(Clone)]
pub struct Penalty<F: Float> {
    pub options: SolverOptions<F>,
    /// Penalty growth factor per outer iteration, in [1.5, 1e3].
    pub eta: F,
    /// Initial penalty weight, in [1e-6, 1e3].
    pub rho0: F,
    /// Cap on outer iterations, in [1, 100].
    pub max_outer: usize,
    quadratic: bool,
}

impl<F: Float> Penalty<F> {
    pub fn linear(options: SolverOptions<F>) -> Self {
        Penalty {
            options,
            eta: cast(10.0),
            rho0: F::one(),
            max_outer: 20,
            quadratic: false,
        }
    }

    pub fn quadratic(options: SolverOptions<F>) -> Self {
        Penalty {
            quadratic: true,
            ..Penalty::linear(options)
        }
    }
}

impl<F: Float + 'static> Solver<F> for Penalty<F> {
    fn name(&self) -> String {
        if self.quadratic {
            "quadratic-penalty".to_string()
        } else {
            "linear-penalty".to_string()
        }
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;

        let mut best = SolverState::new(problem, x0);
        best.status = Status::MaxEvals;
        let mut x = x0.to_vec();
        let mut rho = self.rho0;

        for outer in 0..self.max_outer {
            let penalized = Problem::new(PenaltyFunction::new(problem, rho, self.quadratic));

            let mut inner_options = self.options.clone();
            inner_options.logger = None;
            let inner = Lbfgs::new(inner_options);
            let inner_state = inner.try_minimize(&penalized, &x)?;

            let mut candidate = SolverState::new(problem, &inner_state.x);
            best.fcalls += inner_state.fcalls + candidate.fcalls;
            best.gcalls += inner_state.gcalls + candidate.gcalls;
            best.inner_iters += inner_state.iterations;
            best.iterations = outer + 1;

            best.update_if_better_constrained(&candidate, self.options.epsilon);

            let feasible = candidate.valid()
                && candidate.constraint_test() < self.options.epsilon;
            if feasible {
                best.status = Status::Converged;
                break;
            }
            if !candidate.valid() {
                best.status = Status::Failed;
                break;
            }
            if !self.options.log(&best) {
                best.status = Status::Stopped;
                break;
            }

            x = inner_state.x;
            rho = rho * self.eta;
        }

        Ok(best)
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            return Ok(());
        }
        match key {
            "eta" => {
                self.eta = cast(check_range(key, value, 1.5, 1e3)?);
                Ok(())
            }
            "rho0" => {
                self.rho0 = cast(check_range(key, value, 1e-6, 1e3)?);
                Ok(())
            }
            "max_outer" => {
                self.max_outer = check_range(key, value, 1.0, 100.0)? as usize;
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
