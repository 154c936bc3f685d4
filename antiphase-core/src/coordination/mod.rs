//! Peer coordination protocols
//!
//! Pairing announcements, coordinated start, two-phase mode change and
//! settings mirroring.

pub mod mode_change;
pub mod pairing;
pub mod settings_sync;
pub mod startup;

pub use mode_change::{ArmedModeChange, PendingModeChange, ProposalError, COMMIT_LEAD_US};
pub use pairing::{remote_info, session_hello, PairingSession};
pub use settings_sync::PeerSettings;
pub use startup::{StartupCoordinator, StartupOutcome};
