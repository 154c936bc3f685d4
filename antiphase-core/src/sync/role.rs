//! Unit roles and pairing arbitration

use core::cmp::Ordering;

use antiphase_protocol::messages::{PRESERVED_INITIATOR, PRESERVED_NONE, PRESERVED_RESPONDER};
use antiphase_protocol::Address;

/// Role of a unit within a paired session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Not paired, running standalone
    #[default]
    None,
    /// Time authority, owns the motor epoch
    Initiator,
    /// Follows the Initiator's epoch, activates half a cycle later
    Responder,
}

impl Role {
    /// Role the peer must hold
    pub const fn peer(self) -> Self {
        match self {
            Role::None => Role::None,
            Role::Initiator => Role::Responder,
            Role::Responder => Role::Initiator,
        }
    }

    pub const fn is_paired(self) -> bool {
        !matches!(self, Role::None)
    }

    /// Encoding used in `Hello`
    pub const fn to_wire(self) -> u8 {
        match self {
            Role::None => PRESERVED_NONE,
            Role::Initiator => PRESERVED_INITIATOR,
            Role::Responder => PRESERVED_RESPONDER,
        }
    }

    pub const fn from_wire(value: u8) -> Self {
        match value {
            PRESERVED_INITIATOR => Role::Initiator,
            PRESERVED_RESPONDER => Role::Responder,
            _ => Role::None,
        }
    }
}

/// What a unit announces about itself when pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PeerInfo {
    pub address: Address,
    pub battery_pct: u8,
    /// Role remembered from an interrupted session
    pub preserved: Role,
}

/// Decide the local role from both announcements
///
/// Evaluated independently on both units; the two results are always
/// complementary or both `Role::None`.
///
/// 1. Complementary preserved roles are kept.
/// 2. A unit that alone preserves a role keeps it; the other takes the
///    complement. This is how a rebooted unit rejoins a running session.
/// 3. The unit with more battery becomes Initiator.
/// 4. The greater hardware address becomes Initiator.
/// 5. Identical addresses cannot be ordered: no role.
pub fn arbitrate(local: &PeerInfo, remote: &PeerInfo) -> Role {
    match (local.preserved, remote.preserved) {
        (mine, theirs) if mine.is_paired() && theirs == mine.peer() => return mine,
        (mine, Role::None) if mine.is_paired() => return mine,
        (Role::None, theirs) if theirs.is_paired() => return theirs.peer(),
        _ => {}
    }

    match local.battery_pct.cmp(&remote.battery_pct) {
        Ordering::Greater => return Role::Initiator,
        Ordering::Less => return Role::Responder,
        Ordering::Equal => {}
    }

    match local.address.cmp(&remote.address) {
        Ordering::Greater => Role::Initiator,
        Ordering::Less => Role::Responder,
        Ordering::Equal => Role::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn info(last: u8, battery_pct: u8, preserved: Role) -> PeerInfo {
        PeerInfo {
            address: [0x24, 0x0A, 0xC4, 0x00, 0x00, last],
            battery_pct,
            preserved,
        }
    }

    #[test]
    fn test_preserved_roles_win() {
        let a = info(1, 20, Role::Initiator);
        let b = info(2, 90, Role::Responder);
        assert_eq!(arbitrate(&a, &b), Role::Initiator);
        assert_eq!(arbitrate(&b, &a), Role::Responder);
    }

    #[test]
    fn test_conflicting_preserved_roles_fall_back_to_battery() {
        let a = info(1, 20, Role::Initiator);
        let b = info(2, 90, Role::Initiator);
        assert_eq!(arbitrate(&a, &b), Role::Responder);
        assert_eq!(arbitrate(&b, &a), Role::Initiator);
    }

    #[test]
    fn test_rebooted_unit_takes_complement() {
        // Running Responder answers a rebooted unit that remembers nothing
        let running = info(1, 10, Role::Responder);
        let rebooted = info(2, 95, Role::None);
        assert_eq!(arbitrate(&rebooted, &running), Role::Initiator);
        assert_eq!(arbitrate(&running, &rebooted), Role::Responder);
    }

    #[test]
    fn test_battery_then_address() {
        let a = info(9, 50, Role::None);
        let b = info(3, 50, Role::None);
        assert_eq!(arbitrate(&a, &b), Role::Initiator);
        assert_eq!(arbitrate(&b, &a), Role::Responder);
    }

    #[test]
    fn test_identical_address_refused() {
        let a = info(7, 50, Role::None);
        assert_eq!(arbitrate(&a, &a), Role::None);
    }

    #[test]
    fn test_wire_encoding() {
        for role in [Role::None, Role::Initiator, Role::Responder] {
            assert_eq!(Role::from_wire(role.to_wire()), role);
        }
        assert_eq!(Role::from_wire(0xEE), Role::None);
    }

    fn any_role() -> impl Strategy<Value = Role> {
        prop_oneof![Just(Role::None), Just(Role::Initiator), Just(Role::Responder)]
    }

    proptest! {
        #[test]
        fn arbitration_is_complementary(
            addr_a in any::<[u8; 6]>(),
            addr_b in any::<[u8; 6]>(),
            bat_a in 0u8..=100,
            bat_b in 0u8..=100,
            pre_a in any_role(),
            pre_b in any_role(),
        ) {
            let a = PeerInfo { address: addr_a, battery_pct: bat_a, preserved: pre_a };
            let b = PeerInfo { address: addr_b, battery_pct: bat_b, preserved: pre_b };
            let role_a = arbitrate(&a, &b);
            let role_b = arbitrate(&b, &a);
            prop_assert_eq!(role_a.peer(), role_b);
        }
    }
}
