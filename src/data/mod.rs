//! Data sources that do not come from a CSV on disk.

pub mod synthetic;

pub use synthetic::{TwoRegimeSpec, generate_returns, simulate_prices};
