//! Link safety monitoring
//!
//! Detects peer outages and bounds how long a frozen epoch is trusted.

pub mod monitor;

pub use monitor::{LinkMonitor, LinkStatus, BEACON_TIMEOUT_US, EPOCH_STALE_US};
