use num_traits::Float;

use super::{stpmax, stpmin, LsearchK, LsearchkLogger, LsearchkParams, Trial};
use crate::function::Function;
use crate::linalg::cast;
use crate::state::SolverState;

/// Line search targeting the strong Wolfe conditions with the More-Thuente
/// interval update (the MINPACK `dcsrch`/`dcstep` scheme).
pub struct LsearchkMoreThuente<F: Float> {
    logger: Option<LsearchkLogger<F>>,
}

impl<F: Float> Default for LsearchkMoreThuente<F> {
    fn default() -> Self {
        LsearchkMoreThuente { logger: None }
    }
}

/// One step of the interval update: given the best point `x`, the other
/// endpoint `y` and the freshly evaluated point `p`, pick the next trial
/// step and update the interval in place.
fn dcstep<F: Float>(
    x: &mut Trial<F>,
    y: &mut Trial<F>,
    p: &Trial<F>,
    brackt: &mut bool,
    stmin: F,
    stmax: F,
) -> F {
    let two = cast::<F>(2.0);
    let three = cast::<F>(3.0);
    let p66 = cast::<F>(0.66);

    let sgnd = p.dg * x.dg.signum();

    let stpf = if p.f > x.f {
        // Higher value: the minimum is bracketed between x and p.
        let theta = three * (x.f - p.f) / (p.t - x.t) + x.dg + p.dg;
        let s = theta.abs().max(x.dg.abs()).max(p.dg.abs());
        let mut gamma = s * ((theta / s) * (theta / s) - (x.dg / s) * (p.dg / s)).sqrt();
        if p.t < x.t {
            gamma = -gamma;
        }
        let r = (gamma - x.dg + theta) / (gamma - x.dg + gamma + p.dg);
        let stpc = x.t + r * (p.t - x.t);
        let stpq = x.t + x.dg / ((x.f - p.f) / (p.t - x.t) + x.dg) / two * (p.t - x.t);
        *brackt = true;
        if (stpc - x.t).abs() < (stpq - x.t).abs() {
            stpc
        } else {
            stpc + (stpq - stpc) / two
        }
    } else if sgnd < F::zero() {
        // Lower value, opposite slope sign: bracketed between x and p.
        let theta = three * (x.f - p.f) / (p.t - x.t) + x.dg + p.dg;
        let s = theta.abs().max(x.dg.abs()).max(p.dg.abs());
        let mut gamma = s * ((theta / s) * (theta / s) - (x.dg / s) * (p.dg / s)).sqrt();
        if p.t > x.t {
            gamma = -gamma;
        }
        let r = (gamma - p.dg + theta) / (gamma - p.dg + gamma + x.dg);
        let stpc = p.t + r * (x.t - p.t);
        let stpq = p.t + p.dg / (p.dg - x.dg) * (x.t - p.t);
        *brackt = true;
        if (stpc - p.t).abs() > (stpq - p.t).abs() {
            stpc
        } else {
            stpq
        }
    } else if p.dg.abs() < x.dg.abs() {
        // Lower value, same slope sign, decreasing magnitude.
        let theta = three * (x.f - p.f) / (p.t - x.t) + x.dg + p.dg;
        let s = theta.abs().max(x.dg.abs()).max(p.dg.abs());
        let mut gamma =
            s * (((theta / s) * (theta / s) - (x.dg / s) * (p.dg / s)).max(F::zero())).sqrt();
        if p.t > x.t {
            gamma = -gamma;
        }
        let r = (gamma - p.dg + theta) / (gamma + (x.dg - p.dg) + gamma);
        let stpc = if r < F::zero() && gamma != F::zero() {
            p.t + r * (x.t - p.t)
        } else if p.t > x.t {
            stmax
        } else {
            stmin
        };
        let stpq = p.t + p.dg / (p.dg - x.dg) * (x.t - p.t);
        if *brackt {
            let stpf = if (stpc - p.t).abs() < (stpq - p.t).abs() {
                stpc
            } else {
                stpq
            };
            if p.t > x.t {
                stpf.min(p.t + p66 * (y.t - p.t))
            } else {
                stpf.max(p.t + p66 * (y.t - p.t))
            }
        } else {
            let stpf = if (stpc - p.t).abs() > (stpq - p.t).abs() {
                stpc
            } else {
                stpq
            };
            stpf.max(stmin).min(stmax)
        }
    } else {
        // Lower value, same slope sign, non-decreasing magnitude.
        if *brackt {
            let theta = three * (p.f - y.f) / (y.t - p.t) + y.dg + p.dg;
            let s = theta.abs().max(y.dg.abs()).max(p.dg.abs());
            let mut gamma = s * ((theta / s) * (theta / s) - (y.dg / s) * (p.dg / s)).sqrt();
            if p.t > y.t {
                gamma = -gamma;
            }
            let r = (gamma - p.dg + theta) / (gamma - p.dg + gamma + y.dg);
            p.t + r * (y.t - p.t)
        } else if p.t > x.t {
            stmax
        } else {
            stmin
        }
    };

    // Interval endpoint update.
    if p.f > x.f {
        *y = *p;
    } else {
        if sgnd < F::zero() {
            *y = *x;
        }
        *x = *p;
    }

    stpf
}

impl<F: Float + 'static> LsearchK<F> for LsearchkMoreThuente<F> {
    fn search(
        &mut self,
        function: &dyn Function<F>,
        state0: &SolverState<F>,
        state: &mut SolverState<F>,
        params: &LsearchkParams<F>,
    ) -> bool {
        let four = cast::<F>(4.0);
        let p66 = cast::<F>(0.66);
        let half = cast::<F>(0.5);

        let origin = Trial::origin(state0);
        let gtest = params.c1 * origin.dg;

        let mut brackt = false;
        let mut stage1 = true;
        let mut width = stpmax::<F>() - stpmin::<F>();
        let mut width1 = width / half;

        let mut x = origin;
        let mut y = origin;

        for _ in 0..params.max_iterations {
            if state.has_armijo(state0, params.c1) && state.has_strong_wolfe(state0, params.c2) {
                return true;
            }

            let p = Trial::of(state);
            let (stmin, stmax) = if brackt {
                (x.t.min(y.t), x.t.max(y.t))
            } else {
                (x.t, p.t + four * (p.t - x.t))
            };
            if brackt && stmax - stmin <= F::epsilon() * stmax {
                return false;
            }

            let ftest = origin.f + p.t * gtest;
            if stage1 && p.f <= ftest && p.dg >= params.c1.min(params.c2) * origin.dg {
                stage1 = false;
            }

            let mut stp = if stage1 && p.f <= x.f && p.f > ftest {
                // Work on the modified function psi(t) = phi(t) - f0 - c1 t dg0
                // while the sufficient decrease has not been attained.
                let mut xm = Trial {
                    t: x.t,
                    f: x.f - x.t * gtest,
                    dg: x.dg - gtest,
                };
                let mut ym = Trial {
                    t: y.t,
                    f: y.f - y.t * gtest,
                    dg: y.dg - gtest,
                };
                let pm = Trial {
                    t: p.t,
                    f: p.f - p.t * gtest,
                    dg: p.dg - gtest,
                };
                let stp = dcstep(&mut xm, &mut ym, &pm, &mut brackt, stmin, stmax);
                x = Trial {
                    t: xm.t,
                    f: xm.f + xm.t * gtest,
                    dg: xm.dg + gtest,
                };
                y = Trial {
                    t: ym.t,
                    f: ym.f + ym.t * gtest,
                    dg: ym.dg + gtest,
                };
                stp
            } else {
                dcstep(&mut x, &mut y, &p, &mut brackt, stmin, stmax)
            };

            if brackt {
                // Force a decent shrink rate on the bracketing interval.
                if (y.t - x.t).abs() >= p66 * width1 {
                    stp = x.t + half * (y.t - x.t);
                }
                width1 = width;
                width = (y.t - x.t).abs();
            }

            stp = stp.max(stpmin()).min(stpmax());
            if !stp.is_finite() {
                return false;
            }

            if !state.try_step(function, state0, stp) {
                return false;
            }
            if let Some(logger) = &self.logger {
                logger(state0, state);
            }
        }

        false
    }

    fn clone_boxed(&self) -> Box<dyn LsearchK<F>> {
        Box::new(LsearchkMoreThuente { logger: None })
    }

    fn set_logger(&mut self, logger: LsearchkLogger<F>) {
        self.logger = Some(logger);
    }

    fn logger(&self) -> Option<&LsearchkLogger<F>> {
        self.logger.as_ref()
    }
}
