//! Coordination messages exchanged between the two units
//!
//! Every message is fire-and-forget. The payload of each frame is the
//! postcard encoding of one [`CoordinationMessage`].

use serde::{Deserialize, Serialize};

use crate::frame::{Frame, FrameError, MAX_PAYLOAD_SIZE};
use crate::version::FirmwareVersion;

/// Length of a radio hardware address
pub const ADDRESS_LEN: usize = 6;

/// Hardware address of a unit
pub type Address = [u8; ADDRESS_LEN];

/// Role carried in `Hello` when a unit remembers one from an earlier session
pub const PRESERVED_NONE: u8 = 0;
pub const PRESERVED_INITIATOR: u8 = 1;
pub const PRESERVED_RESPONDER: u8 = 2;

/// Messages carried over the peer link
///
/// Times are microseconds. `shared_us` and epoch values are on the
/// Initiator's time base; `t1`..`t3` are on the clock of the unit that
/// took each sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoordinationMessage {
    /// Pairing announcement used for role arbitration
    Hello {
        address: Address,
        battery_pct: u8,
        preserved_role: u8,
    },
    /// Responder clock request
    SyncRequest { t1_us: u64 },
    /// Initiator answer to a `SyncRequest`
    SyncReply { t1_us: u64, t2_us: u64, t3_us: u64 },
    /// Periodic Initiator beacon, refreshes the Responder's epoch
    SyncBeacon {
        shared_us: u64,
        epoch_us: Option<u64>,
        cycle_ms: u32,
    },
    /// Responder finished its handshake and is waiting for the start
    ResponderReady,
    /// Initiator committed the motor epoch
    MotorStarted { epoch_us: u64, cycle_ms: u32 },
    /// Two-phase commit proposal for new timing
    ModeChangeProposal {
        mode: u8,
        cycle_ms: u32,
        active_ms: u32,
        initiator_epoch_us: u64,
        responder_epoch_us: u64,
    },
    /// Responder asks the Initiator to propose a mode change
    ModeRequest { mode: u8 },
    /// Responder phase diagnostics
    ActivationReport {
        actual_us: u64,
        target_us: u64,
        error_ms: i32,
        cycle_number: u32,
    },
    /// Peer battery level
    PeerBatteryLevel { pct: u8 },
    /// Sender is ending the session; the receiver stops too
    Shutdown,
    /// Initiator's session settings for the Responder to mirror
    ///
    /// Mode is not carried; mode changes go through the proposal.
    Settings {
        freq_centihz: u16,
        duty_pct: u8,
        intensity_pct: [u8; 5],
        led_enabled: bool,
        led_color: u8,
        led_brightness_pct: u8,
        session_duration_s: u32,
    },
    /// Build identity, sent once per session
    Version(FirmwareVersion),
}

impl CoordinationMessage {
    /// Encode this message into a frame with the given sequence number
    pub fn to_frame(&self, seq: u8) -> Result<Frame, FrameError> {
        let mut buf = [0u8; MAX_PAYLOAD_SIZE];
        let used = postcard::to_slice(self, &mut buf).map_err(|_| FrameError::PayloadTooLarge)?;
        Frame::new(seq, used)
    }

    /// Parse a message from a frame
    pub fn from_frame(frame: &Frame) -> Result<Self, FrameError> {
        postcard::from_bytes(&frame.payload).map_err(|_| FrameError::InvalidFrame)
    }

    /// Short name for logging
    pub fn name(&self) -> &'static str {
        match self {
            CoordinationMessage::Hello { .. } => "Hello",
            CoordinationMessage::SyncRequest { .. } => "SyncRequest",
            CoordinationMessage::SyncReply { .. } => "SyncReply",
            CoordinationMessage::SyncBeacon { .. } => "SyncBeacon",
            CoordinationMessage::ResponderReady => "ResponderReady",
            CoordinationMessage::MotorStarted { .. } => "MotorStarted",
            CoordinationMessage::ModeChangeProposal { .. } => "ModeChangeProposal",
            CoordinationMessage::ModeRequest { .. } => "ModeRequest",
            CoordinationMessage::ActivationReport { .. } => "ActivationReport",
            CoordinationMessage::PeerBatteryLevel { .. } => "PeerBatteryLevel",
            CoordinationMessage::Shutdown => "Shutdown",
            CoordinationMessage::Settings { .. } => "Settings",
            CoordinationMessage::Version(_) => "Version",
        }
    }
}
