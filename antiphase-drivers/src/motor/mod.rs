//! Motor driver implementations

pub mod hbridge;

pub use hbridge::{BridgeState, HBridge, HBridgeConfig};
