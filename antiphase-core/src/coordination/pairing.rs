//! Pairing announcements
//!
//! A unit announces one fixed [`PeerInfo`] for a whole pairing attempt and
//! arbitrates against the peer with that same snapshot. If the announced
//! and the arbitrated battery level could differ, the two units might
//! decide from different inputs and pick the same role.

use antiphase_protocol::{Address, CoordinationMessage};

use crate::sync::{arbitrate, PeerInfo, Role};

/// One pairing attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairingSession {
    local: PeerInfo,
}

impl PairingSession {
    pub const fn new(local: PeerInfo) -> Self {
        Self { local }
    }

    pub fn local(&self) -> &PeerInfo {
        &self.local
    }

    /// The announcement sent for this attempt, always the same
    pub fn hello(&self) -> CoordinationMessage {
        hello_for(&self.local)
    }

    /// Arbitrate against a peer announcement; `None` if `msg` is not a `Hello`
    pub fn on_hello(&self, msg: &CoordinationMessage) -> Option<Role> {
        remote_info(msg).map(|remote| arbitrate(&self.local, &remote))
    }
}

/// Peer data carried by a `Hello`
pub fn remote_info(msg: &CoordinationMessage) -> Option<PeerInfo> {
    match *msg {
        CoordinationMessage::Hello {
            address,
            battery_pct,
            preserved_role,
        } => Some(PeerInfo {
            address,
            battery_pct,
            preserved: Role::from_wire(preserved_role),
        }),
        _ => None,
    }
}

/// Answer from a unit already in a session to a peer that is pairing
///
/// Carries the running role, so the peer takes the complement.
pub fn session_hello(address: Address, battery_pct: u8, role: Role) -> CoordinationMessage {
    hello_for(&PeerInfo {
        address,
        battery_pct,
        preserved: role,
    })
}

fn hello_for(info: &PeerInfo) -> CoordinationMessage {
    CoordinationMessage::Hello {
        address: info.address,
        battery_pct: info.battery_pct,
        preserved_role: info.preserved.to_wire(),
    }
}
