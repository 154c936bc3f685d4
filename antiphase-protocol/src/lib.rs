//! Peer Coordination Protocol
//!
//! This crate defines the messages two Antiphase units exchange over their
//! radio link, and the framing used to carry them. The link is lossy and
//! best-effort: no message is acknowledged at this layer.
//!
//! # Protocol Overview
//!
//! All messages use a simple binary frame format:
//! ```text
//! ┌───────┬────────┬─────┬─────────────┬───────┐
//! │ START │ LENGTH │ SEQ │ PAYLOAD     │ CRC-8 │
//! │ 1B    │ 1B     │ 1B  │ 0–64B       │ 1B    │
//! └───────┴────────┴─────┴─────────────┴───────┘
//! ```
//!
//! The payload is a postcard-encoded [`CoordinationMessage`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod frame;
pub mod link;
pub mod messages;
pub mod version;

pub use frame::{Frame, FrameError, FrameParser, FRAME_START, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE};
pub use link::{DuplicateFilter, LinkError, SequenceCounter};
pub use messages::{Address, CoordinationMessage, ADDRESS_LEN};
pub use version::FirmwareVersion;
