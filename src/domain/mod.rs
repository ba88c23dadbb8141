//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - dated series (`Observation`, `ObservationSeries`)
//! - model/sampler/diagnostic configuration (`PriorConfig`, `SamplerConfig`, ...)
//! - pipeline outputs (`ChangePointEstimate`, `ImpactSummary`, `EventMatch`, ...)

pub mod types;

pub use types::*;
