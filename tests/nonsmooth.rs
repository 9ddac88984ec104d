//! The non-smooth solver family (bundle, gradient sampling, subgradient,
//! ellipsoid) on the piecewise-linear fixture, compared against a grid scan
//! of the exact minimum.

use descent::benchmark::{Kinks, Sphere};
use descent::registry::make_solver;
use descent::{Function, Problem, Solver, Status};

/// Per-coordinate grid scan; valid because the fixture is
/// coordinate-separable and its kink offsets lie on the grid.
fn kinks_minimum(kinks: &Kinks, dim: usize) -> f64 {
    let steps = 4000;
    let mut best = vec![0.0; dim];
    for c in 0..dim {
        let mut fc = f64::INFINITY;
        let mut xc = 0.0;
        for i in 0..=steps {
            let mut x = best.clone();
            x[c] = -2.0 + 4.0 * i as f64 / steps as f64;
            let f = kinks.eval(&x, None);
            if f < fc {
                fc = f;
                xc = x[c];
            }
        }
        best[c] = xc;
    }
    kinks.eval(&best, None)
}

#[test]
fn bundle_variants_reach_the_grid_minimum() {
    let kinks = Kinks::new(2);
    let fmin = kinks_minimum(&kinks, 2);
    let problem = Problem::new(kinks);
    for id in ["fpba1", "fpba2"] {
        let mut solver = make_solver(id).unwrap();
        solver.set_param("max_evals", 3000.0).unwrap();
        solver.set_param("epsilon", 1e-8).unwrap();
        let state = solver.minimize(&problem, &[2.0, -2.0]);
        assert!(
            state.f <= fmin + 1e-3,
            "{}: f = {}, fmin = {}",
            id,
            state.f,
            fmin
        );
    }
}

#[test]
fn ellipsoid_reaches_the_grid_minimum() {
    let kinks = Kinks::new(2);
    let fmin = kinks_minimum(&kinks, 2);
    let problem = Problem::new(kinks);
    let mut solver = make_solver("ellipsoid").unwrap();
    solver.set_param("max_evals", 20_000.0).unwrap();
    solver.set_param("epsilon", 1e-6).unwrap();
    let state = solver.minimize(&problem, &[2.0, -2.0]);
    assert!(state.f <= fmin + 1e-2, "f = {}, fmin = {}", state.f, fmin);
}

#[test]
fn subgradient_method_reaches_the_grid_minimum() {
    // The diminishing-step rule closes in at the rate of the late steps, so
    // the tolerance is looser than the bundle one.
    let kinks = Kinks::new(2);
    let fmin = kinks_minimum(&kinks, 2);
    let problem = Problem::new(kinks);
    let mut solver = make_solver("sgm").unwrap();
    solver.set_param("max_evals", 50_000.0).unwrap();
    solver.set_param("epsilon", 1e-9).unwrap();
    let state = solver.minimize(&problem, &[2.0, -2.0]);
    assert!(state.f <= fmin + 1e-2, "f = {}, fmin = {}", state.f, fmin);
}

#[test]
fn gradient_sampling_descends_from_every_corner() {
    let problem = Problem::new(Kinks::new(2));
    for x0 in [[1.5, 1.5], [-1.5, 1.5], [1.5, -1.5], [-1.5, -1.5]] {
        let mut solver = make_solver("gs").unwrap();
        solver.set_param("max_evals", 3000.0).unwrap();
        solver.set_param("epsilon", 1e-5).unwrap();
        let f0 = problem.eval(&x0, None);
        let state = solver.minimize(&problem, &x0);
        assert!(state.f < f0, "from {:?}: f = {}", x0, state.f);
    }
}

#[test]
fn non_smooth_solvers_are_deterministic() {
    let problem = Problem::new(Kinks::new(3));
    for id in ["fpba1", "ellipsoid", "gs", "sgm"] {
        let mut solver = make_solver(id).unwrap();
        solver.set_param("max_evals", 1000.0).unwrap();
        let a = solver.minimize(&problem, &[1.5, -0.6, 0.9]);
        let b = solver.minimize(&problem, &[1.5, -0.6, 0.9]);
        assert_eq!(a.x, b.x, "{}", id);
        assert_eq!(a.f, b.f, "{}", id);
        assert_eq!(a.fcalls, b.fcalls, "{}", id);
    }
}

#[test]
fn ellipsoid_bisection_agrees_with_the_quadratic_minimum() {
    let problem = Problem::new(Sphere::new(1));
    let mut solver = make_solver("ellipsoid").unwrap();
    solver.set_param("epsilon", 1e-9).unwrap();
    let state = solver.minimize(&problem, &[7.5]);
    assert_eq!(state.status, Status::Converged);
    assert!(state.x[0].abs() < 1e-4, "x = {}", state.x[0]);
}

#[test]
fn non_smooth_family_agrees_on_the_smooth_baseline() {
    // On a smooth strongly-convex objective all three families must land
    // near the same minimum, if at different precision.
    let problem = Problem::new(Sphere::new(2));
    for id in ["fpba1", "fpba2", "ellipsoid", "gs", "sgm"] {
        let mut solver = make_solver(id).unwrap();
        solver.set_param("max_evals", 10_000.0).unwrap();
        solver.set_param("epsilon", 1e-7).unwrap();
        let state = solver.minimize(&problem, &[1.0, -1.0]);
        assert!(state.f < 1e-3, "{}: f = {}", id, state.f);
    }
}
