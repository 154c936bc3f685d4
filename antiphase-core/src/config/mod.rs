//! Configuration types
//!
//! Session settings with range validation, optionally serde-serializable.

pub mod types;

pub use types::*;
