use num_traits::Float;

use crate::config::{check_half_open, ConfigError};
use crate::function::Problem;
use crate::linalg::{cast, dot, identity, matvec, norm, rank1_update};
use crate::lsearch0::Lsearch0Constant;
use crate::lsearchk::LsearchkMoreThuente;
use crate::solver::{iterate, LsearchPair, Solver, SolverLogger, SolverOptions};
use crate::state::SolverState;

/// Update formula of the dense inverse-Hessian approximation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QuasiNewtonUpdate {
    /// Symmetric rank-one update; may lose positive-definiteness.
    Sr1,
    /// Davidon-Fletcher-Powell rank-two update.
    Dfp,
    /// Broyden-Fletcher-Goldfarb-Shanno rank-two update.
    Bfgs,
    /// Hoshino's self-dual member of the Broyden family.
    Hoshino,
    /// Fletcher's switch between the DFP and BFGS updates.
    FletcherSwitch,
}

/// Dense quasi-Newton solver: `d = -H * g` where the inverse-Hessian
/// approximation `H` starts at the identity and is updated from the
/// secant pair `(s, y)` of consecutive iterates.
///
/// The update is skipped whenever the curvature product `s.y` is too small
/// relative to `|s| * |y|`, preserving positive-definiteness for the
/// rank-two formulas.
#[derive(Clone)]
pub struct QuasiNewton<F: Float> {
    pub options: SolverOptions<F>,
    pub update: QuasiNewtonUpdate,
    /// Denominator safeguard of the SR1 update, in (0, 1].
    pub r: F,
    lsearch: LsearchPair<F>,
}

impl<F: Float + 'static> QuasiNewton<F> {
    pub fn new(options: SolverOptions<F>, update: QuasiNewtonUpdate) -> Self {
        QuasiNewton {
            options,
            update,
            r: cast(1e-8),
            lsearch: LsearchPair::new(
                // The unit step is expected near the solution; do not scale
                // it down from the previous iteration.
                Box::new(Lsearch0Constant::default()),
                Box::new(LsearchkMoreThuente::default()),
            ),
        }
    }

    /// Replace the line-search pair.
    pub fn set_lsearch(&mut self, lsearch: LsearchPair<F>) {
        self.lsearch = lsearch;
    }

    fn id(&self) -> &'static str {
        match self.update {
            QuasiNewtonUpdate::Sr1 => "sr1",
            QuasiNewtonUpdate::Dfp => "dfp",
            QuasiNewtonUpdate::Bfgs => "bfgs",
            QuasiNewtonUpdate::Hoshino => "hoshino",
            QuasiNewtonUpdate::FletcherSwitch => "fletcher",
        }
    }
}

impl Default for QuasiNewton<f64> {
    fn default() -> Self {
        QuasiNewton::new(SolverOptions::default(), QuasiNewtonUpdate::Bfgs)
    }
}

impl Default for QuasiNewton<f32> {
    fn default() -> Self {
        QuasiNewton::new(SolverOptions::default(), QuasiNewtonUpdate::Bfgs)
    }
}

/// Apply one secant update to `h` in place.
fn update_h<F: Float>(update: QuasiNewtonUpdate, r: F, h: &mut Vec<Vec<F>>, s: &[F], y: &[F]) {
    let hy = matvec(h, y);
    let sy = dot(s, y);
    let yhy = dot(y, &hy);

    match update {
        QuasiNewtonUpdate::Sr1 => {
            // u = s - H y; guard the denominator against near-orthogonality.
            let mut u = vec![F::zero(); s.len()];
            for i in 0..s.len() {
                u[i] = s[i] - hy[i];
            }
            let denom = dot(&u, y);
            if denom.abs() >= r * norm(y) * norm(&u) {
                rank1_update(h, F::one() / denom, &u, &u);
            }
        }
        QuasiNewtonUpdate::Dfp => {
            if curvature_ok(sy, s, y) && yhy > F::zero() {
                rank1_update(h, F::one() / sy, s, s);
                rank1_update(h, -F::one() / yhy, &hy, &hy);
            }
        }
        QuasiNewtonUpdate::Bfgs => {
            if curvature_ok(sy, s, y) {
                rank1_update(h, (sy + yhy) / (sy * sy), s, s);
                rank1_update(h, -F::one() / sy, &hy, s);
                rank1_update(h, -F::one() / sy, s, &hy);
            }
        }
        QuasiNewtonUpdate::Hoshino => {
            // Broyden-family blend H_phi = H_dfp + phi * yhy * v v' with
            // v = s / sy - H y / yhy and phi = sy / (sy + yhy).
            if curvature_ok(sy, s, y) && yhy > F::zero() {
                rank1_update(h, F::one() / sy, s, s);
                rank1_update(h, -F::one() / yhy, &hy, &hy);

                let phi = sy / (sy + yhy);
                let mut v = vec![F::zero(); s.len()];
                for i in 0..s.len() {
                    v[i] = s[i] / sy - hy[i] / yhy;
                }
                rank1_update(h, phi * yhy, &v, &v);
            }
        }
        QuasiNewtonUpdate::FletcherSwitch => {
            let inner = if sy < yhy {
                QuasiNewtonUpdate::Dfp
            } else {
                QuasiNewtonUpdate::Bfgs
            };
            update_h(inner, r, h, s, y);
        }
    }
}

fn curvature_ok<F: Float>(sy: F, s: &[F], y: &[F]) -> bool {
    sy > F::epsilon() * norm(s) * norm(y)
}

impl<F: Float + 'static> Solver<F> for QuasiNewton<F> {
    fn name(&self) -> String {
        self.id().to_string()
    }

    fn try_minimize(&self, problem: &Problem<F>, x0: &[F]) -> Result<SolverState<F>, ConfigError> {
        self.options.check_dim(problem, x0)?;

        let update = self.update;
        let r = self.r;
        let mut h: Vec<Vec<F>> = identity(x0.len());
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
                update_h(update, r, &mut h, &s, &y);
            }

            let hg = matvec(&h, &state.g);
            for i in 0..d.len() {
                d[i] = -hg[i];
            }
            prev = Some((state.x.clone(), state.g.clone()));
        }))
    }

    fn set_param(&mut self, key: &str, value: f64) -> Result<(), ConfigError> {
        if self.options.set_param(key, value)? {
            return Ok(());
        }
        match key {
            "r" => {
                self.r = cast(check_half_open(key, value, 0.0, 1.0)?);
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
