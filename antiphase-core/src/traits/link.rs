//! Coordination channel to the peer unit

use antiphase_protocol::{CoordinationMessage, LinkError};

/// Best-effort, at-most-once message path
///
/// `send` only queues; delivery is never confirmed. Inbound messages reach
/// the engine through its event queue.
pub trait CoordinationLink {
    fn send(&mut self, msg: CoordinationMessage) -> Result<(), LinkError>;

    fn is_connected(&self) -> bool;
}
