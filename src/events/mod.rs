//! Curated event catalog helpers.
//!
//! - proximity matching around a change point (`associate`)
//! - simple catalog filters used by the query layer

pub mod associate;

pub use associate::*;
