//! Acceptance guarantees of every line-search refinement strategy on the
//! smooth fixtures, checked through the registry.

use descent::benchmark::{Exponential, Rosenbrock, Sphere};
use descent::lsearchk::line_search;
use descent::registry::{lsearchk_ids, make_lsearchk};
use descent::{Function, LsearchkParams, SolverState};

fn steepest_descent_state(function: &dyn Function<f64>, x0: &[f64]) -> SolverState<f64> {
    let mut state = SolverState::new(function, x0);
    state.d = state.g.iter().map(|&g| -g).collect();
    state
}

fn fixtures() -> Vec<(Box<dyn Function<f64>>, Vec<f64>)> {
    vec![
        (Box::new(Sphere::new(3)), vec![1.0, -2.0, 0.5]),
        (Box::new(Rosenbrock::new(2)), vec![-1.2, 1.0]),
        (Box::new(Exponential::new(2)), vec![0.8, -0.6]),
    ]
}

#[test]
fn accepted_steps_satisfy_the_strategy_conditions() {
    let params = LsearchkParams::default();
    for id in lsearchk_ids() {
        for (function, x0) in fixtures() {
            for t0 in [1.0, 0.1, 0.01] {
                let mut state = steepest_descent_state(function.as_ref(), &x0);
                let mut state0 = state.clone();
                state0.t = 0.0;

                let mut strategy = make_lsearchk(id).unwrap();
                let ok = line_search(strategy.as_mut(), function.as_ref(), &mut state, t0, &params);
                assert!(ok, "{} on {} from t0 = {}", id, function.name(), t0);
                assert!(state.t > 0.0);
                assert!(state.valid());

                match id {
                    "backtrack" => {
                        assert!(state.has_armijo(&state0, params.c1), "{}", id);
                    }
                    "lemarechal" => {
                        assert!(state.has_armijo(&state0, params.c1), "{}", id);
                        assert!(state.has_wolfe(&state0, params.c2), "{}", id);
                    }
                    "fletcher" | "morethuente" => {
                        assert!(state.has_armijo(&state0, params.c1), "{}", id);
                        assert!(state.has_strong_wolfe(&state0, params.c2), "{}", id);
                    }
                    "cgdescent" => {
                        let regular = state.has_armijo(&state0, params.c1)
                            && state.has_wolfe(&state0, params.c2);
                        let approx = state.has_approx_wolfe(
                            &state0,
                            params.c1,
                            params.c2,
                            params.epsilon,
                        );
                        assert!(regular || approx, "{}", id);
                    }
                    other => panic!("untested strategy {}", other),
                }
            }
        }
    }
}

#[test]
fn strong_wolfe_acceptance_implies_the_weaker_conditions() {
    // A step passing the strong Wolfe test also passes the regular one.
    let params = LsearchkParams::default();
    let function = Sphere::new(2);
    let mut state = steepest_descent_state(&function, &[2.0, -1.0]);
    let mut state0 = state.clone();
    state0.t = 0.0;

    let mut strategy = make_lsearchk("morethuente").unwrap();
    assert!(line_search(
        strategy.as_mut(),
        &function,
        &mut state,
        1.0,
        &params
    ));
    assert!(state.has_strong_wolfe(&state0, params.c2));
    assert!(state.has_wolfe(&state0, params.c2));
    assert!(state.has_armijo(&state0, params.c1));
}

#[test]
fn every_strategy_rejects_a_non_descent_direction() {
    let params = LsearchkParams::default();
    let function = Sphere::new(2);
    for id in lsearchk_ids() {
        let mut state = SolverState::new(&function, &[1.0, 1.0]);
        state.d = state.g.clone();
        let mut strategy = make_lsearchk(id).unwrap();
        assert!(
            !line_search(strategy.as_mut(), &function, &mut state, 1.0, &params),
            "{}",
            id
        );
    }
}

#[test]
fn non_finite_trials_are_stepped_over() {
    // A log barrier turns non-finite left of the wall; the driver halves
    // the step until the trial value is finite again.
    #[derive(Clone)]
    struct Barrier;
    impl Function<f64> for Barrier {
        fn name(&self) -> String {
            "barrier".to_string()
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
        fn eval(&self, x: &[f64], gx: Option<&mut [f64]>) -> f64 {
            if let Some(gx) = gx {
                gx[0] = 2.0 * x[0] - 1.0 / x[0];
            }
            x[0] * x[0] - x[0].ln()
        }
        fn clone_boxed(&self) -> Box<dyn Function<f64>> {
            Box::new(self.clone())
        }
    }

    let params = LsearchkParams::default();
    let function = Barrier;
    // The full step overshoots the wall at zero.
    let mut state = steepest_descent_state(&function, &[2.0]);
    let mut strategy = make_lsearchk("backtrack").unwrap();
    assert!(line_search(
        strategy.as_mut(),
        &function,
        &mut state,
        1.0,
        &params
    ));
    assert!(state.x[0] > 0.0);
    assert!(state.f.is_finite());
    assert!(state.f < function.eval(&[2.0], None));
}
