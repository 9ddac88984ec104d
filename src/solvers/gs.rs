use num_traits::Float;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

use crate::config::{check_half_open, check_open, check_range, ConfigError};
use crate::function::{Function, Problem};
use crate::linalg::{cast, dot, norm};
use crate::qp::solve_simplex_qp;
use crate::solver::{Solver, SolverLogger, SolverOptions};
use crate::state::SolverState;

/// Gradient sampling (Burke, Lewis & Overton) for non-smooth, possibly
/// non-convex objectives: approximate the `epsilon_k`-subdifferential by the
/// convex hull of `n + 1` gradients sampled within a shrinking radius, step
/// along the negated minimum-norm element, and shrink both the radius and
/// the stationarity target whenever the stabilized gradient is small or the
/// backtracking search fails.
///
/// The sampling is driven by a seeded generator, so repeated solves with the
/// same parameters produce identical trajectories.
#[derive(Clone)]
pub struct GradientSampling<F: Float> {
    pub options: SolverOptions<F>,
    /// Seed of the sampling generator.
    pub seed: u64,
    /// Initial sampling radius, in (0, 10].
    pub epsilon0: F,
    /// Initial stationarity target, in (0, 10].
    pub nu0: F,
    /// Geometric shrink factor of the sampling radius, in (0, 1).
    pub epsilon_shrink: F,
    /// Geometric shrink factor of the stationarity target, in (0, 1).
    pub nu_shrink: F,
    /// Armijo coefficient of the backtracking search, in (0, 0.5].
    pub beta: F,
    /// Cap on backtracking halvings per iteration, in [10, 200].
    pub max_backtracks: usize,
}

impl<F: Float> GradientSampling<F> {
    pub fn new(options: SolverOptions<F>) -> Self {
        GradientSampling {
            options,
            seed: 42,
            epsilon0: cast(0.1),
            nu0: cast(0.1),
            epsilon_shrink: cast(0.1),
            nu_shrink: cast(0.1),
            beta: cast(1e-4),
            max_backtracks: 50,
        }
    }
}

impl Default for GradientSampling<f64> {
    fn default() -> Self {
        GradientSampling::new(SolverOptions::default())
    }
}

impl Default for GradientSampling<f32> {
    fn default() -> Self {
        GradientSampling::new(SolverOptions::default())
    }
}

/// A point sampled uniformly in the ball of the given radius.
fn sample_ball<F: Float>(rng: &mut StdRng, center: &[F], radius: F, out: &mut [F]) {
    let n = center.len();
    let mut u = vec![0.0f64; n];
    for v in u.iter_mut() {
        *v = rng.sample(StandardNormal);
    }
    let mut len = 0.0;
    for &v in &u {
        len += v * v;
    }
    let len = len.sqrt().max(f64::MIN_POSITIVE);
    let r: f64 = rng.gen::<f64>().powf(1.0 / n as f64);
    for i in 0..n {
        out[i] = center[i] + radius * cast::<F>(r * u[i] / len);
    }
}

impl<F: Float + 'static> Solver<F> for GradientSampling<F> {
    fn name(&self) -> String {
        "gs".to_string()
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;

        let n = x0.len();
        let mut state = SolverState::new(problem, x0);
        let mut rng = StdRng::seed_from_u64(self.seed);

        let mut eps_k = self.epsilon0;
        let mut nu_k = self.nu0;

        let mut point = vec![F::zero(); n];
        let mut grads: Vec<Vec<F>> = vec![vec![F::zero(); n]; n + 2];

        loop {
            let converged = eps_k < self.options.epsilon && nu_k < self.options.epsilon;
            let valid = state.valid();
            if self.options.done(&mut state, valid, converged) {
                break;
            }

            // The incumbent gradient plus n + 1 gradients sampled within the
            // current radius.
            grads[0].copy_from_slice(&state.g);
            let mut sample_ok = true;
            for grad in grads.iter_mut().skip(1) {
                sample_ball(&mut rng, &state.x, eps_k, &mut point);
                let f = problem.eval(&point, Some(grad));
                state.fcalls += 1;
                state.gcalls += 1;
                if !f.is_finite() {
                    sample_ok = false;
                    break;
                }
            }
            state.iterations += 1;
            if !sample_ok {
                state.status = crate::state::Status::Failed;
                break;
            }

            // Minimum-norm element of the convex hull: the stabilized
            // gradient.
            let m = grads.len();
            let mut q = vec![vec![F::zero(); m]; m];
            for j in 0..m {
                for k in 0..=j {
                    let v = dot(&grads[j], &grads[k]);
                    q[j][k] = v;
                    q[k][j] = v;
                }
            }
            let w = solve_simplex_qp(&q, &vec![F::zero(); m], 100 * (m + 1));
            let mut p = vec![F::zero(); n];
            for (k, grad) in grads.iter().enumerate() {
                for i in 0..n {
                    p[i] = p[i] + w[k] * grad[i];
                }
            }
            let pnorm = norm(&p);

            if pnorm <= nu_k {
                nu_k = nu_k * self.nu_shrink;
                eps_k = eps_k * self.epsilon_shrink;
                continue;
            }

            // Backtracking Armijo search along the normalized stabilized
            // descent direction.
            let state0 = {
                let mut s = state.clone();
                s.d = p.iter().map(|&v| -v / pnorm).collect();
                s
            };
            let mut t = F::one();
            let mut accepted = false;
            let mut trial = state.clone();
            for _ in 0..self.max_backtracks {
                if trial.try_step(problem, &state0, t)
                    && trial.f < state0.f - self.beta * t * pnorm
                {
                    accepted = true;
                    break;
                }
                t = t * cast::<F>(0.5);
            }
            state.fcalls = trial.fcalls;
            state.gcalls = trial.gcalls;

            if accepted {
                state.x.clone_from(&trial.x);
                state.g.clone_from(&trial.g);
                state.f = trial.f;
                state.t = trial.t;
            } else {
                // No descent at this sampling scale: refine.
                nu_k = nu_k * self.nu_shrink;
                eps_k = eps_k * self.epsilon_shrink;
            }
        }

        Ok(state)
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            return Ok(());
        }
        match key {
            "seed" => {
                self.seed = check_range(key, value, 0.0, u32::MAX as f64)? as u64;
                Ok(())
            }
            "epsilon0" => {
                self.epsilon0 = cast(check_range(key, value, 1e-10, 10.0)?);
                Ok(())
            }
            "nu0" => {
                self.nu0 = cast(check_range(key, value, 1e-10, 10.0)?);
                Ok(())
            }
            "epsilon_shrink" => {
                self.epsilon_shrink = cast(check_open(key, value, 0.0, 1.0)?);
                Ok(())
            }
            "nu_shrink" => {
                self.nu_shrink = cast(check_open(key, value, 0.0, 1.0)?);
                Ok(())
            }
            "beta" => {
                self.beta = cast(check_half_open(key, value, 0.0, 0.5)?);
                Ok(())
            }
            "max_backtracks" => {
                self.max_backtracks = check_range(key, value, 10.0, 200.0)? as usize;
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
