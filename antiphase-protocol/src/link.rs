//! Link-level helpers: send errors, sequence numbering, duplicate suppression

use crate::frame::FrameError;

/// Errors reported by a coordination link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// No peer connected
    Disconnected,
    /// Outbound queue full, message dropped
    QueueFull,
    /// Message could not be framed
    Encoding,
}

impl From<FrameError> for LinkError {
    fn from(_: FrameError) -> Self {
        LinkError::Encoding
    }
}

/// Wrapping sequence counter for outbound frames
#[derive(Debug, Clone, Default)]
pub struct SequenceCounter {
    next: u8,
}

impl SequenceCounter {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Return the next sequence number
    pub fn advance(&mut self) -> u8 {
        let seq = self.next;
        self.next = self.next.wrapping_add(1);
        seq
    }
}

/// Drops frames whose sequence number repeats the previous one
///
/// The radio retransmits a frame with the same sequence number when an
/// acknowledgement is lost, so only back-to-back repeats are duplicates.
#[derive(Debug, Clone, Default)]
pub struct DuplicateFilter {
    last: Option<u8>,
}

impl DuplicateFilter {
    pub const fn new() -> Self {
        Self { last: None }
    }

    /// Returns true if the frame should be delivered
    pub fn accept(&mut self, seq: u8) -> bool {
        if self.last == Some(seq) {
            return false;
        }
        self.last = Some(seq);
        true
    }

    /// Forget the last sequence number (new connection)
    pub fn reset(&mut self) {
        self.last = None;
    }
}
