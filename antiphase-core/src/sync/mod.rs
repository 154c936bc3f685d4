//! Time synchronization between the two units
//!
//! Roles, the shared motor epoch and the context that owns both.

pub mod context;
pub mod epoch;
pub mod role;

pub use context::{ClockQuality, Reconnect, SyncContext};
pub use epoch::MotorEpoch;
pub use role::{arbitrate, PeerInfo, Role};
