//! Posterior inference stages.
//!
//! - run the sampler (`orchestrator`)
//! - judge convergence (`diagnostics`)
//! - map `tau` onto the calendar (`posterior`)
//! - quantify before/after shifts (`impact`)
//!
//! Everything after sampling is a pure function of the draws.

pub mod diagnostics;
pub mod impact;
pub mod orchestrator;
pub mod posterior;

pub use diagnostics::diagnose;
pub use impact::{quantify, shift_to_percent};
pub use orchestrator::run;
pub use posterior::{DEFAULT_CREDIBLE_MASS, extract};
