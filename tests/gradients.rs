//! Analytic gradients of every fixture checked against central finite
//! differences, plus the convexity metadata.

use descent::benchmark::{
    AxisEllipsoid, Exponential, Kinks, Rosenbrock, SchumerSteiglitz, Sphere, StyblinskiTang,
};
use descent::{grad_accuracy, is_convex, Function};

// Generic points away from the axes; the coordinates of the non-smooth
// fixture's kinks are multiples of 0.25, so these stay clear of them.
const POINTS: [[f64; 4]; 3] = [
    [0.13, -0.41, 0.77, -1.09],
    [1.31, 0.57, -0.83, 0.29],
    [-0.67, 1.11, 0.39, -0.21],
];

fn check(function: &dyn Function<f64>) {
    for point in POINTS {
        let x = &point[..function.dim()];
        let acc = grad_accuracy(function, x, 1e-8);
        assert!(
            acc < 1e-6,
            "{} at {:?}: accuracy = {}",
            function.name(),
            x,
            acc
        );
    }
}

#[test]
fn smooth_fixture_gradients() {
    check(&Sphere::new(4));
    check(&AxisEllipsoid::new(4));
    check(&SchumerSteiglitz::new(4));
    check(&Rosenbrock::new(4));
    check(&StyblinskiTang::new(4));
    check(&Exponential::new(4));
}

#[test]
fn kinks_subgradient_away_from_the_kinks() {
    // The piecewise-linear fixture is differentiable between kinks, so the
    // sub-gradient must match finite differences at generic points.
    check(&Kinks::new(4));
}

#[test]
fn convex_fixtures_pass_the_segment_test() {
    let x1 = [1.3, -0.7, 0.4];
    let x2 = [-0.9, 1.1, -1.6];
    for function in [
        Box::new(Sphere::new(3)) as Box<dyn Function<f64>>,
        Box::new(AxisEllipsoid::new(3)),
        Box::new(SchumerSteiglitz::new(3)),
        Box::new(Kinks::new(3)),
        Box::new(Exponential::new(3)),
    ] {
        assert!(function.convex(), "{}", function.name());
        assert!(
            is_convex(function.as_ref(), &x1, &x2, 10, 1e-9),
            "{}",
            function.name()
        );
    }
}

#[test]
fn styblinski_tang_fails_the_segment_test() {
    // The segment joining the two one-dimensional minima passes over the
    // hump at the origin.
    let function = StyblinskiTang::new(1);
    assert!(!<StyblinskiTang as Function<f64>>::convex(&function));
    assert!(!is_convex(
        &function as &dyn Function<f64>,
        &[-2.9],
        &[2.7],
        10,
        1e-9
    ));
}

#[test]
fn strong_convexity_tightens_the_segment_test() {
    // The sphere satisfies the inequality with its own coefficient but not
    // with a larger one.
    let sphere: &dyn Function<f64> = &Sphere::new(2);
    assert_eq!(sphere.strong_convexity(), 2.0);
    assert!(is_convex(sphere, &[1.0, 1.0], &[-1.0, 0.5], 10, 1e-9));

    // x^4 is convex but not strongly convex near the origin, so borrowing
    // the sphere's coefficient must fail there.
    #[derive(Clone)]
    struct Overclaimed;
    impl Function<f64> for Overclaimed {
        fn name(&self) -> String {
            "overclaimed".to_string()
        }
        fn dim(&self) -> usize {
            1
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
            if let Some(gx) = gx {
                gx[0] = 4.0 * x[0] * x[0] * x[0];
            }
            x[0] * x[0] * x[0] * x[0]
        }
        fn clone_boxed(&self) -> Box<dyn Function<f64>> {
            Box::new(self.clone())
        }
    }
    assert!(!is_convex(
        &Overclaimed as &dyn Function<f64>,
        &[-0.1],
        &[0.1],
        10,
        1e-12
    ));
}
