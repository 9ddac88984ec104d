use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use descent::benchmark::{Rosenbrock, Sphere};
use descent::registry::make_solver;
use descent::{Problem, Solver};

fn make_input(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| if i % 2 == 0 { 1.5 } else { -1.5 })
        .collect()
}

fn bench_smooth_solvers(c: &mut Criterion) {
    let mut group = c.benchmark_group("sphere");
    for n in [2, 10, 100] {
        let problem = Problem::new(Sphere::new(n));
        let x0 = make_input(n);

        for id in ["gd", "cgd-pr", "bfgs", "lbfgs"] {
            group.bench_with_input(BenchmarkId::new(id, n), &x0, |b, x0| {
                let solver = make_solver(id).unwrap();
                b.iter(|| black_box(solver.minimize(&problem, black_box(x0))))
            });
        }
    }
    group.finish();
}

fn bench_rosenbrock(c: &mut Criterion) {
    let mut group = c.benchmark_group("rosenbrock");
    for n in [2, 10] {
        let problem = Problem::new(Rosenbrock::new(n));
        let x0 = make_input(n);

        for id in ["cgd-pr", "bfgs", "lbfgs"] {
            group.bench_with_input(BenchmarkId::new(id, n), &x0, |b, x0| {
                let mut solver = make_solver(id).unwrap();
                solver.set_param("max_evals", 50_000.0).unwrap();
                b.iter(|| black_box(solver.minimize(&problem, black_box(x0))))
            });
        }
    }
    group.finish();
}

fn bench_line_searches(c: &mut Criterion) {
    use descent::lsearchk::line_search;
    use descent::registry::{lsearchk_ids, make_lsearchk};
    use descent::{LsearchkParams, SolverState};

    let mut group = c.benchmark_group("lsearchk");
    let function = Rosenbrock::new(10);
    let x0 = make_input(10);
    let params = LsearchkParams::default();

    for id in lsearchk_ids() {
        group.bench_function(id, |b| {
            b.iter(|| {
                let mut state = SolverState::new(&function, &x0);
                state.d = state.g.iter().map(|&g| -g).collect();
                let mut strategy = make_lsearchk(id).unwrap();
                black_box(line_search(
                    strategy.as_mut(),
                    &function,
                    &mut state,
                    1.0,
                    &params,
                ))
            })
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_smooth_solvers,
    bench_rosenbrock,
    bench_line_searches
);
criterion_main!(benches);
