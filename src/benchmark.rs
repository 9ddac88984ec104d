//! Analytic test fixtures with known metadata, used by the test suites and
//! the benches.

use num_traits::Float;

use crate::function::Function;
use crate::linalg::cast;

/// `f(x) = x.dot(x)`, the smooth strongly-convex baseline.
#[derive(Clone)]
pub struct Sphere {
    dim: usize,
}

impl Sphere {
    pub fn new(dim: usize) -> Self {
        Sphere { dim }
    }
}

impl<F: Float> Function<F> for Sphere {
    fn name(&self) -> String {
        format!("sphere[{}]", self.dim)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn convex(&self) -> bool {
        true
    }

    fn smooth(&self) -> bool {
        true
    }

    fn strong_convexity(&self) -> F {
        cast(2.0)
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        debug_assert_eq!(x.len(), self.dim);
        let mut f = F::zero();
        for &xi in x {
            f = f + xi * xi;
        }
        if let Some(gx) = gx {
            let two = cast::<F>(2.0);
            for i in 0..x.len() {
                gx[i] = two * x[i];
            }
        }
        f
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(self.clone())
    }
}

/// `f(x) = sum_i i * x_i^2`, an axis-aligned ellipsoid with conditioning
/// growing with the dimension.
#[derive(Clone)]
pub struct AxisEllipsoid {
    dim: usize,
}

impl AxisEllipsoid {
    pub fn new(dim: usize) -> Self {
        AxisEllipsoid { dim }
    }
}

impl<F: Float> Function<F> for AxisEllipsoid {
    fn name(&self) -> String {
        format!("axis-ellipsoid[{}]", self.dim)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn convex(&self) -> bool {
        true
    }

    fn smooth(&self) -> bool {
        true
    }

    fn strong_convexity(&self) -> F {
        cast(2.0)
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        debug_assert_eq!(x.len(), self.dim);
        let mut f = F::zero();
        for (i, &xi) in x.iter().enumerate() {
            let w = cast::<F>((i + 1) as f64);
            f = f + w * xi * xi;
        }
        if let Some(gx) = gx {
            let two = cast::<F>(2.0);
            for (i, &xi) in x.iter().enumerate() {
                gx[i] = two * cast::<F>((i + 1) as f64) * xi;
            }
        }
        f
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(self.clone())
    }
}

/// `f(x) = sum_i x_i^4` (Schumer-Steiglitz), convex but not strongly convex
/// with a degenerate fourth-order minimum.
#[derive(Clone)]
pub struct SchumerSteiglitz {
    dim: usize,
}

impl SchumerSteiglitz {
    pub fn new(dim: usize) -> Self {
        SchumerSteiglitz { dim }
    }
}

impl<F: Float> Function<F> for SchumerSteiglitz {
    fn name(&self) -> String {
        format!("schumer-steiglitz[{}]", self.dim)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn convex(&self) -> bool {
        true
    }

    fn smooth(&self) -> bool {
        true
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        debug_assert_eq!(x.len(), self.dim);
        let mut f = F::zero();
        for &xi in x {
            f = f + xi * xi * xi * xi;
        }
        if let Some(gx) = gx {
            let four = cast::<F>(4.0);
            for i in 0..x.len() {
                gx[i] = four * x[i] * x[i] * x[i];
            }
        }
        f
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(self.clone())
    }
}

/// The Rosenbrock valley, non-convex and badly scaled.
#[derive(Clone)]
pub struct Rosenbrock {
    dim: usize,
}

impl Rosenbrock {
    pub fn new(dim: usize) -> Self {
        debug_assert!(dim >= 2);
        Rosenbrock { dim }
    }
}

impl<F: Float> Function<F> for Rosenbrock {
    fn name(&self) -> String {
        format!("rosenbrock[{}]", self.dim)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn convex(&self) -> bool {
        false
    }

    fn smooth(&self) -> bool {
        true
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        debug_assert_eq!(x.len(), self.dim);
        let c = cast::<F>(100.0);
        let two = cast::<F>(2.0);

        let mut f = F::zero();
        for i in 0..self.dim - 1 {
            let a = x[i + 1] - x[i] * x[i];
            let b = F::one() - x[i];
            f = f + c * a * a + b * b;
        }
        if let Some(gx) = gx {
            for g in gx.iter_mut() {
                *g = F::zero();
            }
            for i in 0..self.dim - 1 {
                let a = x[i + 1] - x[i] * x[i];
                gx[i] = gx[i] - two * c * two * x[i] * a - two * (F::one() - x[i]);
                gx[i + 1] = gx[i + 1] + two * c * a;
            }
        }
        f
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(self.clone())
    }
}

/// The Styblinski-Tang function, non-convex with multiple local minima.
#[derive(Clone)]
pub struct StyblinskiTang {
    dim: usize,
}

impl StyblinskiTang {
    pub fn new(dim: usize) -> Self {
        StyblinskiTang { dim }
    }
}

impl<F: Float> Function<F> for StyblinskiTang {
    fn name(&self) -> String {
        format!("styblinski-tang[{}]", self.dim)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn convex(&self) -> bool {
        false
    }

    fn smooth(&self) -> bool {
        true
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        debug_assert_eq!(x.len(), self.dim);
        let half = cast::<F>(0.5);
        let sixteen = cast::<F>(16.0);
        let five = cast::<F>(5.0);

        let mut f = F::zero();
        for &xi in x {
            let x2 = xi * xi;
            f = f + half * (x2 * x2 - sixteen * x2 + five * xi);
        }
        if let Some(gx) = gx {
            let two = cast::<F>(2.0);
            for i in 0..x.len() {
                let xi = x[i];
                gx[i] = two * xi * xi * xi - sixteen * xi + half * five;
            }
        }
        f
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(self.clone())
    }
}

/// Fixed offsets the kinks fixture places its non-smooth points at.
const KINK_TABLE: [f64; 9] = [-0.75, 0.5, 0.25, -0.25, 1.0, -0.5, 0.75, -1.0, 0.0];

/// `f(x) = sum_k sum_i |x_i - k_{k,i}|`, convex and piecewise linear with a
/// fixed table of kink locations.
#[derive(Clone)]
pub struct Kinks {
    dim: usize,
    kinks: Vec<Vec<f64>>,
}

impl Kinks {
    pub fn new(dim: usize) -> Self {
        let rows = 3;
        let mut kinks = Vec::with_capacity(rows);
        for k in 0..rows {
            let mut row = Vec::with_capacity(dim);
            for i in 0..dim {
                row.push(KINK_TABLE[(k * dim + i) % KINK_TABLE.len()]);
            }
            kinks.push(row);
        }
        Kinks { dim, kinks }
    }
}

impl<F: Float> Function<F> for Kinks {
    fn name(&self) -> String {
        format!("kinks[{}]", self.dim)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn convex(&self) -> bool {
        true
    }

    fn smooth(&self) -> bool {
        false
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        debug_assert_eq!(x.len(), self.dim);
        let mut f = F::zero();
        if let Some(gx) = &gx {
            debug_assert_eq!(gx.len(), self.dim);
        }
        let mut grad = vec![F::zero(); if gx.is_some() { self.dim } else { 0 }];
        for row in &self.kinks {
            for i in 0..self.dim {
                let d = x[i] - cast::<F>(row[i]);
                f = f + d.abs();
                if !grad.is_empty() {
                    grad[i] = grad[i] + d.signum();
                }
            }
        }
        if let Some(gx) = gx {
            gx.copy_from_slice(&grad);
        }
        f
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(self.clone())
    }
}

/// `f(x) = exp(1 + x.dot(x) / n)`, smooth and convex with a flat basin
/// around the origin.
#[derive(Clone)]
pub struct Exponential {
    dim: usize,
}

impl Exponential {
    pub fn new(dim: usize) -> Self {
        Exponential { dim }
    }
}

impl<F: Float> Function<F> for Exponential {
    fn name(&self) -> String {
        format!("exponential[{}]", self.dim)
    }

    fn dim(&self) -> usize {
        self.dim
    }

    fn convex(&self) -> bool {
        true
    }

    fn smooth(&self) -> bool {
        true
    }

    fn eval(&self, x: &[F], gx: Option<&mut [F]>) -> F {
        debug_assert_eq!(x.len(), self.dim);
        let n = cast::<F>(self.dim as f64);
        let mut s = F::zero();
        for &xi in x {
            s = s + xi * xi;
        }
        let f = (F::one() + s / n).exp();
        if let Some(gx) = gx {
            let two = cast::<F>(2.0);
            for i in 0..x.len() {
                gx[i] = f * two * x[i] / n;
            }
        }
        f
    }

    fn clone_boxed(&self) -> Box<dyn Function<F>> {
        Box::new(self.clone())
    }
}
