//! Numerical utilities: Nelder–Mead minimization and observed-information
//! standard errors.

pub mod hessian;
pub mod optim;

pub use hessian::*;
pub use optim::*;
