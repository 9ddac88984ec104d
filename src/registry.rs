//! Process-wide name -> factory registries for solvers and line-search
//! strategies, lazily built on first access and read-only afterwards.
//! Benchmark tooling enumerates and instantiates by id.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;

use crate::lsearch0::{Lsearch0, Lsearch0Constant, Lsearch0Quadratic};
use crate::lsearchk::{
    LsearchK, LsearchkBacktrack, LsearchkCgDescent, LsearchkFletcher, LsearchkLemarechal,
    LsearchkMoreThuente,
};
use crate::solver::{Solver, SolverOptions};
use crate::solvers::{
    AugmentedLagrangian, Bundle, BundleVariant, Cgd, CgdVariant, Ellipsoid, Gd, GradientSampling,
    Lbfgs, Penalty, QuasiNewton, QuasiNewtonUpdate, Sgm,
};

type SolverFactory = fn() -> Box<dyn Solver<f64>>;
type Lsearch0Factory = fn() -> Box<dyn Lsearch0<f64>>;
type LsearchkFactory = fn() -> Box<dyn LsearchK<f64>>;

static SOLVERS: Lazy<BTreeMap<&'static str, SolverFactory>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, SolverFactory> = BTreeMap::new();
    map.insert("gd", || Box::new(Gd::default()));
    map.insert("cgd-fr", || {
        Box::new(Cgd::new(SolverOptions::default(), CgdVariant::FletcherReeves))
    });
    map.insert("cgd-pr", || {
        Box::new(Cgd::new(SolverOptions::default(), CgdVariant::PolakRibiere))
    });
    map.insert("cgd-hs", || {
        Box::new(Cgd::new(SolverOptions::default(), CgdVariant::HestenesStiefel))
    });
    map.insert("cgd-dy", || {
        Box::new(Cgd::new(SolverOptions::default(), CgdVariant::DaiYuan))
    });
    map.insert("sr1", || {
        Box::new(QuasiNewton::new(SolverOptions::default(), QuasiNewtonUpdate::Sr1))
    });
    map.insert("dfp", || {
        Box::new(QuasiNewton::new(SolverOptions::default(), QuasiNewtonUpdate::Dfp))
    });
    map.insert("bfgs", || {
        Box::new(QuasiNewton::new(SolverOptions::default(), QuasiNewtonUpdate::Bfgs))
    });
    map.insert("hoshino", || {
        Box::new(QuasiNewton::new(SolverOptions::default(), QuasiNewtonUpdate::Hoshino))
    });
    map.insert("fletcher", || {
        Box::new(QuasiNewton::new(
            SolverOptions::default(),
            QuasiNewtonUpdate::FletcherSwitch,
        ))
    });
    map.insert("lbfgs", || Box::new(Lbfgs::default()));
    map.insert("ellipsoid", || Box::new(Ellipsoid::default()));
    map.insert("linear-penalty", || {
        Box::new(Penalty::linear(SolverOptions::default()))
    });
    map.insert("quadratic-penalty", || {
        Box::new(Penalty::quadratic(SolverOptions::default()))
    });
    map.insert("augmented-lagrangian", || {
        Box::new(AugmentedLagrangian::default())
    });
    map.insert("fpba1", || {
        Box::new(Bundle::new(SolverOptions::default(), BundleVariant::Fpba1))
    });
    map.insert("fpba2", || {
        Box::new(Bundle::new(SolverOptions::default(), BundleVariant::Fpba2))
    });
    map.insert("gs", || Box::new(GradientSampling::default()));
    map.insert("sgm", || Box::new(Sgm::default()));
    map
});

static LSEARCH0S: Lazy<BTreeMap<&'static str, Lsearch0Factory>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, Lsearch0Factory> = BTreeMap::new();
    map.insert("constant", || Box::new(Lsearch0Constant::default()));
    map.insert("quadratic", || Box::new(Lsearch0Quadratic::default()));
    map
});

static LSEARCHKS: Lazy<BTreeMap<&'static str, LsearchkFactory>> = Lazy::new(|| {
    let mut map: BTreeMap<&'static str, LsearchkFactory> = BTreeMap::new();
    map.insert("backtrack", || Box::new(LsearchkBacktrack::default()));
    map.insert("lemarechal", || Box::new(LsearchkLemarechal::default()));
    map.insert("fletcher", || Box::new(LsearchkFletcher::default()));
    map.insert("morethuente", || Box::new(LsearchkMoreThuente::default()));
    map.insert("cgdescent", || Box::new(LsearchkCgDescent::default()));
    map
});

/// Instantiate a solver by exact id.
pub fn make_solver(id: &str) -> Option<Box<dyn Solver<f64>>> {
    SOLVERS.get(id).map(|factory| factory())
}

/// Instantiate a line-search initialization strategy by exact id.
pub fn make_lsearch0(id: &str) -> Option<Box<dyn Lsearch0<f64>>> {
    LSEARCH0S.get(id).map(|factory| factory())
}

/// Instantiate a line-search refinement strategy by exact id.
pub fn make_lsearchk(id: &str) -> Option<Box<dyn LsearchK<f64>>> {
    LSEARCHKS.get(id).map(|factory| factory())
}

/// All registered solver ids, sorted.
pub fn solver_ids() -> Vec<&'static str> {
    SOLVERS.keys().copied().collect()
}

/// All registered line-search initialization ids, sorted.
pub fn lsearch0_ids() -> Vec<&'static str> {
    LSEARCH0S.keys().copied().collect()
}

/// All registered line-search refinement ids, sorted.
pub fn lsearchk_ids() -> Vec<&'static str> {
    LSEARCHKS.keys().copied().collect()
}

/// Solver ids containing the given pattern, for tooling filters.
pub fn matching(pattern: &str) -> Vec<&'static str> {
    SOLVERS
        .keys()
        .copied()
        .filter(|id| id.contains(pattern))
        .collect()
}
