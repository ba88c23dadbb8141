//! `oil-regimes` library crate.
//!
//! The binary (`oilcp`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the sampler, diagnostics and query layer are reusable on their own
//! - code stays easy to navigate as the project grows

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod events;
pub mod inference;
pub mod io;
pub mod math;
pub mod model;
pub mod query;
pub mod report;
pub mod sampler;
pub mod series;
