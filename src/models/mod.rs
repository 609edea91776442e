//! Models Module - Data Structures & Configuration
//!
//! Wallet records, feature vectors, verdicts, errors and runtime config.

pub mod config;
pub mod errors;
pub mod types;

pub use config::*;
pub use errors::*;
pub use types::*;
