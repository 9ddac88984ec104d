use num_traits::Float;

use crate::config::{check_open, check_range, ConfigError};
use crate::constraint::{self, Constraint};
use crate::function::{Function, Problem};
use crate::linalg::cast;
use crate::solver::{Solver, SolverLogger, SolverOptions};
use crate::solvers::lbfgs::Lbfgs;
use crate::state::{SolverState, Status};

/// The augmented Lagrangian of a constrained problem at fixed multipliers
/// `(lambda, mu)` and penalty `rho`:
///
/// ```text
/// L(x) = f(x) + sum_j [lambda_j h_j + rho/2 h_j^2]
///             + rho/2 sum_i [max(0, mu_i/rho + g_i)^2 - (mu_i/rho)^2]
/// ```
struct AugmentedFunction<F: Float> {
    problem: Problem<F>,
    lambda: Vec<F>,
    mu: Vec<F>,
    rho: F,
}

impl<F: Float + 'static> Function<F> for AugmentedFunction<F> {
    fn name(&self) -> String {
        format!("augmented-lagrangian({})", self.problem.name())
    }

    fn dim(&self) -> usize {
        self.problem.dim()
    }

    fn convex(&self) -> bool {
        self.problem.convex()
    }

    fn smooth(&self) -> bool {
        // The shifted quadratic penalty is continuously differentiable.
        self.problem.smooth()
    }

    fn strong_convexity(&self) -> F {
        self.problem.strong_convexity()
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        let half = cast::<F>(0.5);
        match gx {
            None => {
                let mut f = self.problem.eval(x, None);
                let (mut j, mut i) = (0, 0);
                for c in self.problem.constraints() {
                    let v = constraint::vgrad(c, x, None);
                    if constraint::is_equality(c) {
                        f = f + self.lambda[j] * v + half * self.rho * v * v;
                        j += 1;
                    } else {
                        let shift = self.mu[i] / self.rho;
                        let vp = (shift + v).max(F::zero());
                        f = f + half * self.rho * (vp * vp - shift * shift);
                        i += 1;
                    }
                }
                f
            }
            Some(gx) => {
                let mut f = self.problem.eval(x, Some(&mut *gx));
                let mut cg = vec![F::zero(); x.len()];
                let (mut j, mut i) = (0, 0);
                for c in self.problem.constraints() {
                    let v = constraint::vgrad(c, x, Some(&mut cg));
                    let weight = if constraint::is_equality(c) {
                        f = f + self.lambda[j] * v + half * self.rho * v * v;
                        j += 1;
                        self.lambda[j - 1] + self.rho * v
                    } else {
                        let shift = self.mu[i] / self.rho;
                        let vp = (shift + v).max(F::zero());
                        f = f + half * self.rho * (vp * vp - shift * shift);
                        i += 1;
                        self.rho * vp
                    };
                    for k in 0..gx.len() {
                        gx[k] = gx[k] + weight * cg[k];
                    }
                }
                f
            }
        }
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(AugmentedFunction {
            problem: self.problem.clone(),
            lambda: self.lambda.clone(),
            mu: self.mu.clone(),
            rho: self.rho,
        })
    }
}

/// Augmented-Lagrangian outer loop (Birgin & Martinez): alternate an inner
/// unconstrained minimization of the augmented Lagrangian with first-order
/// multiplier updates, growing the penalty only when feasibility stalls and
/// tightening the inner accuracy when it does not.
#[derive(Clone)]
pub struct AugmentedLagrangian<F: Float> {
    pub options: SolverOptions<F>,
    /// Penalty growth factor, in [1.5, 1e3].
    pub gamma: F,
    /// Required shrink factor of the feasibility criterion per outer
    /// iteration, in (0, 1).
    pub tau: F,
    /// Bound on the equality multipliers, `|lambda| <= lambda_max`.
    pub lambda_max: F,
    /// Bound on the inequality multipliers, `0 <= mu <= mu_max`.
    pub mu_max: F,
    /// Initial inner accuracy, tightened on feasibility progress.
    pub epsilon0: F,
    /// Inner accuracy shrink factor, in (0, 1).
    pub epsilon_factor: F,
    /// Cap on outer iterations, in [1, 1000].
    pub max_outer: usize,
}

impl<F: Float> AugmentedLagrangian<F> {
    pub fn new(options: SolverOptions<F>) -> Self {
        AugmentedLagrangian {
            options,
            gamma: cast(10.0),
            tau: cast(0.25),
            lambda_max: cast(1e9),
            mu_max: cast(1e9),
            epsilon0: cast(0.1),
            epsilon_factor: cast(0.1),
            max_outer: 100,
        }
    }
}

impl Default for AugmentedLagrangian<f64> {
    fn default() -> Self {
        AugmentedLagrangian::new(SolverOptions::default())
    }
}

impl Default for AugmentedLagrangian<f32> {
    fn default() -> Self {
        AugmentedLagrangian::new(SolverOptions::default())
    }
}

impl<F: Float + 'static> Solver<F> for AugmentedLagrangian<F> {
    fn name(&self) -> String {
        "augmented-lagrangian".to_string()
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;

        let mut best = SolverState::new(problem, x0);
        best.status = Status::MaxEvals;

        let n_eq = best.ceq.len();
        let n_ineq = best.cineq.len();
        let mut lambda = vec![F::zero(); n_eq];
        let mut mu = vec![F::zero(); n_ineq];

        // Penalty initialization balancing the objective against the
        // violation at the starting point.
        let mut v2 = F::zero();
        for &h in &best.ceq {
            v2 = v2 + h * h;
        }
        for &g in &best.cineq {
            let gp = g.max(F::zero());
            v2 = v2 + gp * gp;
        }
        let two = cast::<F>(2.0);
        let mut rho = (two * best.f.abs() / v2.max(cast(1e-6)))
            .max(cast(1e-6))
            .min(cast(10.0));

        let mut x = x0.to_vec();
        let mut epsilon_k = self.epsilon0;
        let mut criterion_prev = F::infinity();

        for outer in 0..self.max_outer {
            let augmented = Problem::new(AugmentedFunction {
                problem: problem.clone(),
                lambda: lambda.clone(),
                mu: mu.clone(),
                rho,
            });

            let inner_epsilon = epsilon_k.max(self.options.epsilon);
            let mut inner_options = self.options.clone();
            inner_options.logger = None;
            inner_options.epsilon = inner_epsilon;
            let inner = Lbfgs::new(inner_options);
            let inner_state = inner.try_minimize(&augmented, &x)?;

            let candidate = SolverState::new(problem, &inner_state.x);
            best.fcalls += inner_state.fcalls + candidate.fcalls;
            best.gcalls += inner_state.gcalls + candidate.gcalls;
            best.inner_iters += inner_state.iterations;
            best.iterations = outer + 1;

            if !candidate.valid() {
                best.status = Status::Failed;
                break;
            }

            // Feasibility criterion: max of the equality residuals and the
            // inequality residuals shifted by the active multipliers.
            let mut criterion = F::zero();
            for &h in &candidate.ceq {
                criterion = criterion.max(h.abs());
            }
            for (i, &g) in candidate.cineq.iter().enumerate() {
                criterion = criterion.max(g.max(-mu[i] / rho).abs());
            }

            // First-order multiplier updates from the inner-solve result.
            for (j, &h) in candidate.ceq.iter().enumerate() {
                lambda[j] = (lambda[j] + rho * h)
                    .max(-self.lambda_max)
                    .min(self.lambda_max);
            }
            for (i, &g) in candidate.cineq.iter().enumerate() {
                mu[i] = (mu[i] + rho * g).max(F::zero()).min(self.mu_max);
            }

            best.update_if_better_constrained(&candidate, self.options.epsilon);

            // Converged only when the inner solve already ran at the target
            // accuracy; earlier outer iterations use the looser schedule.
            if criterion < self.options.epsilon
                && inner_epsilon <= self.options.epsilon
                && inner_state.status == Status::Converged
            {
                best.status = Status::Converged;
                break;
            }
            if !self.options.log(&best) {
                best.status = Status::Stopped;
                break;
            }

            if criterion <= self.tau * criterion_prev {
                // Feasibility improved: keep the penalty, solve the next
                // inner problem more accurately.
                epsilon_k = epsilon_k * self.epsilon_factor;
            } else {
                rho = rho * self.gamma;
            }
            criterion_prev = criterion;
            x = inner_state.x;
        }

        Ok(best)
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            return Ok(());
        }
        match key {
            "gamma" => {
                self.gamma = cast(check_range(key, value, 1.5, 1e3)?);
                Ok(())
            }
            "tau" => {
                self.tau = cast(check_open(key, value, 0.0, 1.0)?);
                Ok(())
            }
            "lambda_max" => {
                self.lambda_max = cast(check_range(key, value, 1.0, 1e12)?);
                Ok(())
            }
            "mu_max" => {
                self.mu_max = cast(check_range(key, value, 1.0, 1e12)?);
                Ok(())
            }
            "epsilon0" => {
                self.epsilon0 = cast(check_range(key, value, 1e-10, 1.0)?);
                Ok(())
            }
            "epsilon_factor" => {
                self.epsilon_factor = cast(check_open(key, value, 0.0, 1.0)?);
                Ok(())
            }
            "max_outer" => {
                self.max_outer = check_range(key, value, 1.0, 1000.0)? as usize;
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
    use crate::benchmark::Sphere;
    use crate::function::grad_accuracy;
    use crate::linalg::norm;

    #[test]
    fn ball_inequality_from_outside() {
        // Minimize |x|^2 within the unit ball around the origin, starting at
        // |x0| = 2: the unconstrained minimizer (the origin) is feasible.
        let mut problem = Problem::new(Sphere::new(3));
        assert!(problem.constrain(Constraint::BallInequality {
            origin: vec![0.0; 3],
            radius: 1.0,
        }));

        let solver = AugmentedLagrangian::<f64>::default();
        let x0 = [2.0 / 3f64.sqrt(); 3];
        assert!((norm(&x0) - 2.0).abs() < 1e-12);
        let state = solver.minimize(&problem, &x0);

        let c = Constraint::BallInequality {
            origin: vec![0.0; 3],
            radius: 1.0,
        };
        assert!(constraint::violation(&c, &state.x) < 1e-6);
        assert!(state.f < 1e-6, "f = {}", state.f);
    }

    #[test]
    fn active_linear_equality() {
        // Minimize |x|^2 subject to x_0 + x_1 = 1: solution (0.5, 0.5).
        let mut problem = Problem::new(Sphere::new(2));
        assert!(problem.constrain(Constraint::LinearEquality {
            q: vec![1.0, 1.0],
            r: -1.0,
        }));

        let mut solver = AugmentedLagrangian::<f64>::default();
        solver.set_param("epsilon", 1e-8).unwrap();
        let state = solver.minimize(&problem, &[2.0, -1.0]);
        assert!((state.x[0] - 0.5).abs() < 1e-5, "x = {:?}", state.x);
        assert!((state.x[1] - 0.5).abs() < 1e-5, "x = {:?}", state.x);
    }

    #[test]
    fn active_ball_boundary() {
        // Minimize |x - (2, 0)|^2 within the unit ball: solution (1, 0) on
        // the boundary, with a strictly positive multiplier.
        let mut problem = Problem::new(Shifted::new());
        assert!(problem.constrain(Constraint::BallInequality {
            origin: vec![0.0, 0.0],
            radius: 1.0,
        }));

        let solver = AugmentedLagrangian::<f64>::default();
        let state = solver.minimize(&problem, &[0.0, 0.5]);
        assert!((state.x[0] - 1.0).abs() < 1e-4, "x = {:?}", state.x);
        assert!(state.x[1].abs() < 1e-4, "x = {:?}", state.x);
    }

    #[test]
    fn augmented_function_gradient() {
        let mut problem = Problem::new(Sphere::new(2));
        assert!(problem.constrain(Constraint::BallInequality {
            origin: vec![0.0, 0.0],
            radius: 1.0,
        }));
        assert!(problem.constrain(Constraint::LinearEquality {
            q: vec![1.0, -1.0],
            r: 0.5,
        }));
        let augmented = AugmentedFunction {
            problem,
            lambda: vec![0.3],
            mu: vec![0.7],
            rho: 2.5,
        };
        let acc = grad_accuracy(&augmented, &[1.3, -0.4], 1e-8);
        assert!(acc < 1e-6, "accuracy = {}", acc);
    }

    /// `f(x) = |x - (2, 0)|^2`, a sphere with a shifted minimum.
    #[derive(Clone)]
    struct Shifted;

    impl Shifted {
        fn new() -> Self {
            Shifted
        }
    }

    impl Function<f64> for Shifted {
        fn name(&self) -> String {
            "shifted-sphere".to_string()
        }

        fn dim(&self) -> usize {
            2
        }

        fn convex(&self) -> bool {
            true
        }

        fn smooth(&self) -> bool {
            true
        }

        fn strong_convexity(&self) -> f64 {
            2.0
        }

        fn eval(&self, x: &[f64], gx: Option<&mut [f64]>) -> f64 {
            let dx = x[0] - 2.0;
            let dy = x[1];
            if let Some(gx) = gx {
                gx[0] = 2.0 * dx;
                gx[1] = 2.0 * dy;
            }
            dx * dx + dy * dy
        }

        fn clone_boxed(&self) -> Box<dyn Function<f64>> {
            Box::new(self.clone())
        }
    }
}
