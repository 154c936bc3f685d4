//! Inter-task communication channels
//!
//! Static embassy-sync primitives connecting the link tasks, the pairing
//! and clock tasks, the precision alarm and the motor task.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;
use portable_atomic::{AtomicBool, AtomicU8};

use antiphase_core::state::MotorEvent;
use antiphase_protocol::CoordinationMessage;

/// Motor task event queue depth
const MOTOR_EVENT_DEPTH: usize = 16;

/// Outbound radio queue depth
const LINK_TX_DEPTH: usize = 8;

/// Everything the motor task reacts to
pub static MOTOR_EVENTS: Channel<CriticalSectionRawMutex, MotorEvent, MOTOR_EVENT_DEPTH> =
    Channel::new();

/// Messages waiting to be framed and sent to the peer
pub static LINK_TX: Channel<CriticalSectionRawMutex, CoordinationMessage, LINK_TX_DEPTH> =
    Channel::new();

/// `Hello` announcements for the pairing task
pub static PEER_HELLO: Channel<CriticalSectionRawMutex, CoordinationMessage, 4> = Channel::new();

/// Precision alarm commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum AlarmCommand {
    /// Fire at this local instant, microseconds since boot
    Arm(u64),
    Cancel,
}

/// Latest alarm command; a new one replaces any pending target
pub static ALARM: Signal<CriticalSectionRawMutex, AlarmCommand> = Signal::new();

/// Set while the peer is considered lost
pub static LINK_DOWN: AtomicBool = AtomicBool::new(false);

/// Local battery charge, percent; holds a placeholder until the first sample
pub static BATTERY_PCT: AtomicU8 = AtomicU8::new(100);

/// First battery sample, percent; pairing waits for it before announcing
pub static BATTERY_READY: Signal<CriticalSectionRawMutex, u8> = Signal::new();
