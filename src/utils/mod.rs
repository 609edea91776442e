//! Utils Module - Helper Functions & Shared Utilities
//!
//! Constants, unit conversion and in-process telemetry.

pub mod constants;
pub mod telemetry;

pub use constants::*;
pub use telemetry::*;
