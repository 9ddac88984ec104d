use num_traits::Float;

use crate::config::{check_open, ConfigError};
use crate::function::Problem;
use crate::linalg::{cast, dot};
use crate::lsearch0::Lsearch0Quadratic;
use crate::lsearchk::LsearchkCgDescent;
use crate::solver::{iterate, LsearchPair, Solver, SolverLogger, SolverOptions};
use crate::state::SolverState;

/// Update formula of the nonlinear conjugate-gradient direction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CgdVariant {
    /// Fletcher-Reeves, `beta = g.g / g0.g0`.
    FletcherReeves,
    /// Polak-Ribiere with the non-negativity safeguard (PR+).
    PolakRibiere,
    /// Hestenes-Stiefel with the non-negativity safeguard (HS+).
    HestenesStiefel,
    /// Dai-Yuan, `beta = g.g / d0.(g - g0)`.
    DaiYuan,
}

/// Nonlinear conjugate gradient, `d = -g + beta * d0`, restarted to steepest
/// descent whenever consecutive gradients lose orthogonality (Powell's test)
/// or the conjugate direction stops being a descent direction.
#[derive(Clone)]
pub struct Cgd<F: Float> {
    pub options: SolverOptions<F>,
    pub variant: CgdVariant,
    /// Powell restart threshold on `|g.g0| / g.g`, in (0, 1).
    pub orthotest: F,
    lsearch: LsearchPair<F>,
}

impl<F: Float + 'static> Cgd<F> {
    pub fn new(mut options: SolverOptions<F>, variant: CgdVariant) -> Self {
        // Conjugate-gradient directions need a tight curvature tolerance to
        // stay conjugate; the CG-DESCENT line search enforces it.
        options.c2 = cast(0.1);
        Cgd {
            options,
            variant,
            orthotest: cast(0.1),
            lsearch: LsearchPair::new(
                Box::new(Lsearch0Quadratic::default()),
                Box::new(LsearchkCgDescent::default()),
            ),
        }
    }

    /// Replace the line-search pair.
    pub fn set_lsearch(&mut self, lsearch: LsearchPair<F>) {
        self.lsearch = lsearch;
    }

    fn id(&self) -> &'static str {
        match self.variant {
            CgdVariant::FletcherReeves => "cgd-fr",
            CgdVariant::PolakRibiere => "cgd-pr",
            CgdVariant::HestenesStiefel => "cgd-hs",
            CgdVariant::DaiYuan => "cgd-dy",
        }
    }
}

impl Default for Cgd<f64> {
    fn default() -> Self {
        Cgd::new(SolverOptions::default(), CgdVariant::PolakRibiere)
    }
}

impl Default for Cgd<f32> {
    fn default() -> Self {
        Cgd::new(SolverOptions::default(), CgdVariant::PolakRibiere)
    }
}

impl<F: Float + 'static> Solver<F> for Cgd<F> {
    fn name(&self) -> String {
        self.id().to_string()
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;

        let variant = self.variant;
        let orthotest = self.orthotest;
        let mut prev_g: Vec<F> = Vec::new();
        let mut prev_d: Vec<F> = Vec::new();

        Ok(iterate(&self.options, &self.lsearch, problem, x0, move |state, d| {
            let g = &state.g;
            let gg = dot(g, g);

            let restart = prev_g.is_empty() || dot(g, &prev_g).abs() >= orthotest * gg;
            let beta = if restart {
                F::zero()
            } else {
                let gg0 = dot(&prev_g, &prev_g);
                match variant {
                    CgdVariant::FletcherReeves => gg / gg0,
                    CgdVariant::PolakRibiere => {
                        ((gg - dot(g, &prev_g)) / gg0).max(F::zero())
                    }
                    CgdVariant::HestenesStiefel => {
                        let mut gy = F::zero();
                        let mut dy = F::zero();
                        for i in 0..g.len() {
                            let y = g[i] - prev_g[i];
                            gy = gy + g[i] * y;
                            dy = dy + prev_d[i] * y;
                        }
                        (gy / dy).max(F::zero())
                    }
                    CgdVariant::DaiYuan => {
                        let mut dy = F::zero();
                        for i in 0..g.len() {
                            dy = dy + prev_d[i] * (g[i] - prev_g[i]);
                        }
                        gg / dy
                    }
                }
            };
            let beta = if beta.is_finite() { beta } else { F::zero() };

            for i in 0..d.len() {
                d[i] = -g[i] + if prev_d.is_empty() { F::zero() } else { beta * prev_d[i] };
            }
            // The conjugate direction may point uphill on non-convex
            // problems; fall back to steepest descent.
            if dot(d, g) >= F::zero() {
                for i in 0..d.len() {
                    d[i] = -g[i];
                }
            }

            prev_g = g.clone();
            prev_d = d.clone();
        }))
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            return Ok(());
        }
        match key {
            "orthotest" => {
                self.orthotest = cast(check_open(key, value, 0.0, 1.0)?);
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
    use crate::benchmark::{AxisEllipsoid, Rosenbrock, Sphere};
    use crate::state::Status;

    fn all_variants() -> [CgdVariant; 4] {
        [
            CgdVariant::FletcherReeves,
            CgdVariant::PolakRibiere,
            CgdVariant::HestenesStiefel,
            CgdVariant::DaiYuan,
        ]
    }

    #[test]
    fn every_variant_converges_on_the_sphere() {
        let problem = Problem::new(Sphere::new(5));
        for variant in all_variants() {
            let solver = Cgd::new(SolverOptions::default(), variant);
            let state = solver.minimize(&problem, &[1.0, -2.0, 3.0, -4.0, 5.0]);
            assert_eq!(state.status, Status::Converged, "{:?}", variant);
            assert!(state.f < 1e-10, "{:?}: f = {}", variant, state.f);
        }
    }

    #[test]
    fn conditioned_quadratic() {
        let problem = Problem::new(AxisEllipsoid::new(8));
        let solver = Cgd::<f64>::default();
        let state = solver.minimize(&problem, &[1.0; 8]);
        assert_eq!(state.status, Status::Converged);
        assert!(state.f < 1e-10);
    }

    #[test]
    fn polak_ribiere_handles_rosenbrock() {
        let problem = Problem::new(Rosenbrock::new(2));
        let mut solver = Cgd::<f64>::default();
        solver.set_param("max_evals", 20_000.0).unwrap();
        let state = solver.minimize(&problem, &[-1.2, 1.0]);
        assert_eq!(state.status, Status::Converged);
        assert!(state.f < 1e-8);
    }

    #[test]
    fn orthotest_domain_is_open() {
        let mut solver = Cgd::<f64>::default();
        assert!(solver.set_param("orthotest", 0.2).is_ok());
        assert!(solver.set_param("orthotest", 0.0).is_err());
        assert!(solver.set_param("orthotest", 1.0).is_err());
    }
}
