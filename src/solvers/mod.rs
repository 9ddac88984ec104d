//! The descent solver family: line-search solvers for smooth problems,
//! bundle, subgradient and gradient-sampling solvers for non-smooth ones,
//! and the
//! penalty-based outer loops for constrained problems.

pub mod augmented;
pub mod bundle;
pub mod cgd;
pub mod ellipsoid;
pub mod gd;
pub mod gs;
pub mod lbfgs;
pub mod penalty;
pub mod quasi;
pub mod sgm;

pub use augmented::AugmentedLagrangian;
pub use bundle::{Bundle, BundleVariant};
pub use cgd::{Cgd, CgdVariant};
pub use ellipsoid::Ellipsoid;
pub use gd::Gd;
pub use gs::GradientSampling;
pub use lbfgs::Lbfgs;
pub use penalty::Penalty;
pub use quasi::{QuasiNewton, QuasiNewtonUpdate};
pub use sgm::Sgm;
