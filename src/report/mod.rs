//! Reporting utilities: formatted rankings for the terminal.

pub mod format;

pub use format::*;
