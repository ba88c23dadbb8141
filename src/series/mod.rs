//! Signal preparation: prices to stationary log returns, and the unit-root
//! tests that back that choice.

pub mod returns;
pub mod stationarity;

pub use returns::*;
pub use stationarity::*;
