//! Reporting: terminal summaries and narrative text.

pub mod format;
pub mod narrative;

pub use format::*;
pub use narrative::*;
