use num_traits::Float;

use crate::config::{check_open, check_range, ConfigError};
use crate::function::Problem;
use crate::linalg::{cast, dot};
use crate::qp::solve_simplex_qp;
use crate::solver::{Solver, SolverLogger, SolverOptions};
use crate::state::SolverState;

/// Momentum sequence scaling the proximity parameter of the fast proximal
/// bundle algorithm across serious steps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BundleVariant {
    /// Nesterov sequence `nu_{k+1} = (1 + sqrt(1 + 4 nu_k^2)) / 2`.
    Fpba1,
    /// Arithmetic sequence `nu_{k+1} = nu_k + 1/2`.
    Fpba2,
}

/// One cutting plane `u -> f(z) + g(z).(u - z)`, stored as the triple
/// `(f(z), g(z), g(z).z)` so its linearization error can be recomputed for
/// any stability center.
struct Plane<F: Float> {
    f: F,
    g: Vec<F>,
    gz: F,
    /// Simplex weight from the most recent proximal subproblem; planes with
    /// the smallest weight are the least active and evicted first.
    weight: F,
}

impl<F: Float> Plane<F> {
    fn new(state: &SolverState<F>) -> Self {
        Plane {
            f: state.f,
            g: state.g.clone(),
            gz: dot(&state.g, &state.x),
            weight: F::one(),
        }
    }

    /// Linearization error relative to the center `(x, fx)`, clamped at zero
    /// against round-off on convex objectives.
    fn error(&self, x: &[F], fx: F) -> F {
        (fx - self.f - dot(&self.g, x) + self.gz).max(F::zero())
    }
}

/// Fast proximal bundle method for non-smooth convex objectives: build a
/// cutting-plane model from the recorded subgradients, step to the proximal
/// point of the model, move the stability center only when the achieved
/// decrease is a fraction `sigma` of the predicted one (serious step),
/// otherwise only enrich the model (null step).
///
/// The bundle is bounded: once `capacity` planes are stored, the least
/// active plane is evicted before a new one is appended, keeping the
/// proximal subproblem small.
#[derive(Clone)]
pub struct Bundle<F: Float> {
    pub options: SolverOptions<F>,
    pub variant: BundleVariant,
    /// Initial proximity parameter, in [1e-6, 1e6].
    pub mu0: F,
    /// Serious-step fraction of the predicted decrease, in (0, 1).
    pub sigma: F,
    /// Cap on the number of stored cutting planes, in [3, 1000].
    pub capacity: usize,
}

impl<F: Float> Bundle<F> {
    pub fn new(options: SolverOptions<F>, variant: BundleVariant) -> Self {
        Bundle {
            options,
            variant,
            mu0: F::one(),
            sigma: cast(0.5),
            capacity: 50,
        }
    }

    fn momentum(&self, nu: F) -> F {
        let half = cast::<F>(0.5);
        match self.variant {
            BundleVariant::Fpba1 => {
                let four = cast::<F>(4.0);
                half * (F::one() + (F::one() + four * nu * nu).sqrt())
            }
            BundleVariant::Fpba2 => nu + half,
        }
    }
}

impl Default for Bundle<f64> {
    fn default() -> Self {
        Bundle::new(SolverOptions::default(), BundleVariant::Fpba1)
    }
}

impl Default for Bundle<f32> {
    fn default() -> Self {
        Bundle::new(SolverOptions::default(), BundleVariant::Fpba1)
    }
}

impl<F: Float + 'static> Solver<F> for Bundle<F> {
    fn name(&self) -> String {
        match self.variant {
            BundleVariant::Fpba1 => "fpba1".to_string(),
            BundleVariant::Fpba2 => "fpba2".to_string(),
        }
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;

        let mut center = SolverState::new(problem, x0);
        let mut bundle: Vec<Plane<F>> = vec![Plane::new(&center)];
        let mut mu = self.mu0;
        let mut nu = F::one();
        let mu_min = cast::<F>(1e-6);
        let mu_max = cast::<F>(1e12);

        loop {
            // Proximal subproblem in dual form: the simplex weights of the
            // aggregated subgradient.
            let m = bundle.len();
            let mut q = vec![vec![F::zero(); m]; m];
            let mut e = vec![F::zero(); m];
            for j in 0..m {
                e[j] = bundle[j].error(&center.x, center.f);
                for k in 0..=j {
                    let v = dot(&bundle[j].g, &bundle[k].g) / mu;
                    q[j][k] = v;
                    q[k][j] = v;
                }
            }
            let w = solve_simplex_qp(&q, &e, 100 * (m + 1));
            for (plane, &wk) in bundle.iter_mut().zip(&w) {
                plane.weight = wk;
            }

            let n = center.x.len();
            let mut p = vec![F::zero(); n];
            let mut etilde = F::zero();
            for (k, plane) in bundle.iter().enumerate() {
                for i in 0..n {
                    p[i] = p[i] + w[k] * plane.g[i];
                }
                etilde = etilde + w[k] * e[k];
            }
            let pp = dot(&p, &p);
            let half = cast::<F>(0.5);
            let predicted = half * pp / mu + etilde;

            let converged = predicted < self.options.epsilon * (F::one() + center.f.abs());
            if converged || !center.valid() {
                let valid = center.valid();
                let done = self.options.done(&mut center, valid, converged);
                debug_assert!(done);
                break;
            }

            // Trial point: the proximal point of the cutting-plane model.
            let state0 = {
                let mut s = center.clone();
                s.d = p.iter().map(|&v| -v / mu).collect();
                s
            };
            let mut trial = center.clone();
            let trial_ok = trial.try_step(problem, &state0, F::one());
            center.fcalls = trial.fcalls;
            center.gcalls = trial.gcalls;
            center.iterations += 1;

            if !trial_ok {
                if self.options.done(&mut center, false, false) {
                    break;
                }
                continue;
            }

            let serious = center.f - trial.f >= self.sigma * predicted;
            if serious {
                let counters = (center.iterations, center.inner_iters);
                let mut next = trial.clone();
                next.iterations = counters.0;
                next.inner_iters = counters.1;
                next.status = center.status;
                center = next;

                // Serious steps advance the momentum sequence and relax the
                // proximity parameter accordingly.
                let nu_next = self.momentum(nu);
                mu = (mu * nu / nu_next).max(mu_min).min(mu_max);
                nu = nu_next;
            }

            if bundle.len() == self.capacity {
                let mut evict = 0;
                for (k, plane) in bundle.iter().enumerate() {
                    if plane.weight < bundle[evict].weight {
                        evict = k;
                    }
                }
                bundle.remove(evict);
            }
            bundle.push(Plane::new(&trial));

            if self.options.done(&mut center, true, false) {
                break;
            }
        }

        Ok(center)
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            return Ok(());
        }
        match key {
            "mu0" => {
                self.mu0 = cast(check_range(key, value, 1e-6, 1e6)?);
                Ok(())
            }
            "sigma" => {
                self.sigma = cast(check_open(key, value, 0.0, 1.0)?);
                Ok(())
            }
            "capacity" => {
                self.capacity = check_range(key, value, 3.0, 1000.0)? as usize;
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
