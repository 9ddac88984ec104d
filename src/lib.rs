//! Iterative solvers for smooth and non-smooth continuous optimization.
//!
//! A [`Problem`] pairs an objective implementing the [`Function`] contract
//! (value + (sub-)gradient, convexity/smoothness metadata) with an optional
//! set of [`Constraint`]s. A [`Solver`] minimizes it from a starting point
//! and always returns a [`SolverState`] whose [`Status`] distinguishes
//! convergence from budget exhaustion from numerical failure:
//!
//! ```
//! use descent::{benchmark::Sphere, Problem, Solver, Status};
//! use descent::solvers::Lbfgs;
//!
//! let problem = Problem::new(Sphere::new(7));
//! let state = Lbfgs::default().minimize(&problem, &[1.0; 7]);
//! assert_eq!(state.status, Status::Converged);
//! assert!(state.f < 1e-10);
//! ```
//!
//! Line-search solvers (gradient descent, conjugate gradient, quasi-Newton,
//! L-BFGS) combine an initialization strategy ([`lsearch0`]) with a
//! refinement strategy ([`lsearchk`]) enforcing Armijo/Wolfe conditions.
//! Constrained problems are handled by the penalty and augmented-Lagrangian
//! outer loops; non-smooth ones by the bundle, subgradient,
//! gradient-sampling and ellipsoid solvers. All of them are also available
//! by string id through
//! the [`registry`].

pub mod benchmark;
pub mod config;
pub mod constraint;
pub mod function;
pub mod linalg;
pub mod lsearch0;
pub mod lsearchk;
pub mod qp;
pub mod registry;
pub mod solver;
pub mod solvers;
pub mod state;

pub use config::ConfigError;
pub use constraint::Constraint;
pub use function::{grad_accuracy, is_convex, Function, Problem};
pub use lsearch0::{Lsearch0, Lsearch0Constant, Lsearch0Quadratic};
pub use lsearchk::{LsearchK, LsearchkParams};
pub use solver::{LsearchPair, Solver, SolverLogger, SolverOptions};
pub use state::{SolverState, Status};
