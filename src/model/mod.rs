//! Statistical model for a single regime switch.
//!
//! The model is a pure specification: priors plus a log density the sampler
//! can evaluate. It performs no sampling and no I/O.

pub mod changepoint;

pub use changepoint::*;
