//! Mathematical utilities: sample statistics, Normal distribution helpers and
//! least squares.

pub mod ols;
pub mod stats;

pub use ols::*;
pub use stats::*;
