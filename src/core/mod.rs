//! Core Module - Risk Pipeline
//!
//! Feature extraction, risk scoring and the analyzer that wires them to a
//! wallet source.

pub mod analyzer;
pub mod features;
pub mod risk_score;

pub use analyzer::*;
pub use features::*;
pub use risk_score::*;
