//! Input/output helpers.
//!
//! - ranking exports (CSV) (`export`)
//! - report JSON read/write (`report`)
//!
//! Input tables are read by `data::TableSource`.

pub mod export;
pub mod report;

pub use export::*;
pub use report::*;
