//! Events delivered to the motor task

use antiphase_protocol::CoordinationMessage;

use crate::mode::Mode;
use crate::sync::Role;

/// Session lifecycle events from the pairing logic and user input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEvent {
    /// Peer found and roles assigned
    PairingComplete { role: Role },
    /// No peer within the pairing window
    PairingFailed,
    /// The peer rebooted and paired back into the running session
    PeerRejoined,
    /// User or app selected a mode
    ModeChangeRequested(Mode),
    /// Stop immediately
    EmergencyShutdown,
    /// Cell voltage under the cutoff
    LowBattery,
}

/// Everything the motor task can receive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorEvent {
    Session(SessionEvent),
    /// Message from the peer unit
    Peer(CoordinationMessage),
    /// Precision alarm expired
    TimerFired,
    /// Peer silent past the beacon timeout
    LinkLost,
    /// Peer traffic resumed after an outage
    LinkRestored,
}

impl MotorEvent {
    /// Events that abort an activation or wait in progress
    pub fn is_urgent(&self) -> bool {
        self.is_shutdown()
            || matches!(
                self,
                MotorEvent::Session(SessionEvent::ModeChangeRequested(_))
                    | MotorEvent::Peer(CoordinationMessage::ModeChangeProposal { .. })
            )
    }

    /// Why this event ends the session, if it does
    pub fn shutdown_reason(&self) -> Option<SessionEnd> {
        match self {
            MotorEvent::Session(SessionEvent::EmergencyShutdown) => {
                Some(SessionEnd::EmergencyShutdown)
            }
            MotorEvent::Session(SessionEvent::LowBattery) => Some(SessionEnd::LowBattery),
            MotorEvent::Peer(CoordinationMessage::Shutdown) => Some(SessionEnd::PeerShutdown),
            _ => None,
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown_reason().is_some()
    }
}

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionEnd {
    EmergencyShutdown,
    /// Configured session duration elapsed
    SessionTimeout,
    /// The peer unit ended its session
    PeerShutdown,
    /// Cell voltage fell under the cutoff
    LowBattery,
}

impl SessionEnd {
    /// The peer must be told; it already knows when it asked for the end
    pub fn notify_peer(self) -> bool {
        self != SessionEnd::PeerShutdown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urgent_events() {
        assert!(MotorEvent::Session(SessionEvent::EmergencyShutdown).is_urgent());
        assert!(MotorEvent::Session(SessionEvent::ModeChangeRequested(Mode::Hz2)).is_urgent());
        assert!(MotorEvent::Peer(CoordinationMessage::ModeChangeProposal {
            mode: 0,
            cycle_ms: 2000,
            active_ms: 1000,
            initiator_epoch_us: 0,
            responder_epoch_us: 1_000_000,
        })
        .is_urgent());

        assert!(!MotorEvent::TimerFired.is_urgent());
        assert!(!MotorEvent::LinkLost.is_urgent());
        assert!(!MotorEvent::Peer(CoordinationMessage::ResponderReady).is_urgent());
    }

    #[test]
    fn test_shutdown_detection() {
        assert!(MotorEvent::Session(SessionEvent::EmergencyShutdown).is_shutdown());
        assert!(!MotorEvent::Session(SessionEvent::PairingFailed).is_shutdown());
        assert!(MotorEvent::Peer(CoordinationMessage::Shutdown).is_urgent());
    }

    #[test]
    fn test_shutdown_reasons() {
        assert_eq!(
            MotorEvent::Peer(CoordinationMessage::Shutdown).shutdown_reason(),
            Some(SessionEnd::PeerShutdown)
        );
        assert_eq!(
            MotorEvent::Session(SessionEvent::LowBattery).shutdown_reason(),
            Some(SessionEnd::LowBattery)
        );
        assert_eq!(MotorEvent::LinkLost.shutdown_reason(), None);

        assert!(SessionEnd::LowBattery.notify_peer());
        assert!(SessionEnd::SessionTimeout.notify_peer());
        assert!(!SessionEnd::PeerShutdown.notify_peer());
    }
}
