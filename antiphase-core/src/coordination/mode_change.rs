//! Two-phase mode change
//!
//! The Initiator proposes new timing together with a commit epoch two
//! seconds ahead. Both units arm the same values and switch only when
//! their own commit instant arrives: the Initiator at the epoch, the
//! Responder half a new cycle later. Until then the old mode stays in force.

use antiphase_protocol::CoordinationMessage;

use crate::mode::{Mode, ModeConfig, MAX_CYCLE_MS, MIN_CYCLE_MS};
use crate::sync::{MotorEpoch, Role};

/// Lead between proposal and commit
pub const COMMIT_LEAD_US: u64 = 2_000_000;

/// Reasons a Responder drops a proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ProposalError {
    /// Message is not a proposal
    NotAProposal,
    UnknownMode(u8),
    /// Commit epoch already behind local time
    EpochPassed,
    /// Responder epoch is not half a cycle after the Initiator epoch
    InconsistentEpochs,
    /// Cycle outside the supported range or active half not half the cycle
    InvalidTiming,
}

/// Mode change agreed by both units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArmedModeChange {
    pub mode: Mode,
    pub cycle_ms: u32,
    pub active_ms: u32,
    pub initiator_epoch_us: u64,
    pub responder_epoch_us: u64,
}

impl ArmedModeChange {
    /// Build from a received proposal without validating it
    pub fn from_message(msg: &CoordinationMessage) -> Result<Self, ProposalError> {
        match *msg {
            CoordinationMessage::ModeChangeProposal {
                mode,
                cycle_ms,
                active_ms,
                initiator_epoch_us,
                responder_epoch_us,
            } => Ok(Self {
                mode: Mode::from_id(mode).ok_or(ProposalError::UnknownMode(mode))?,
                cycle_ms,
                active_ms,
                initiator_epoch_us,
                responder_epoch_us,
            }),
            _ => Err(ProposalError::NotAProposal),
        }
    }

    pub fn to_message(&self) -> CoordinationMessage {
        CoordinationMessage::ModeChangeProposal {
            mode: self.mode.id(),
            cycle_ms: self.cycle_ms,
            active_ms: self.active_ms,
            initiator_epoch_us: self.initiator_epoch_us,
            responder_epoch_us: self.responder_epoch_us,
        }
    }

    /// Epoch both units use once committed
    pub fn epoch(&self) -> MotorEpoch {
        MotorEpoch::new(self.initiator_epoch_us, self.cycle_ms)
    }

    /// Local commit instant for a role
    pub fn commit_at(&self, role: Role) -> u64 {
        match role {
            Role::Responder => self.responder_epoch_us,
            _ => self.initiator_epoch_us,
        }
    }

    fn validate(&self, now_us: u64) -> Result<(), ProposalError> {
        if !(MIN_CYCLE_MS..=MAX_CYCLE_MS).contains(&self.cycle_ms)
            || self.active_ms != self.cycle_ms / 2
        {
            return Err(ProposalError::InvalidTiming);
        }
        if self.responder_epoch_us != self.initiator_epoch_us + self.epoch().half_cycle_us() {
            return Err(ProposalError::InconsistentEpochs);
        }
        if self.initiator_epoch_us <= now_us {
            return Err(ProposalError::EpochPassed);
        }
        Ok(())
    }
}

/// The engine's single mode-change slot
#[derive(Debug, Clone, Default)]
pub struct PendingModeChange {
    armed: Option<ArmedModeChange>,
}

impl PendingModeChange {
    pub const fn new() -> Self {
        Self { armed: None }
    }

    /// Initiator: arm new timing to commit [`COMMIT_LEAD_US`] from now
    ///
    /// Returns the armed change, whose message must be sent to the peer.
    pub fn propose(&mut self, mode: Mode, timing: &ModeConfig, now_us: u64) -> ArmedModeChange {
        let initiator_epoch_us = now_us + COMMIT_LEAD_US;
        let cycle_ms = timing.cycle_ms();
        let change = ArmedModeChange {
            mode,
            cycle_ms,
            active_ms: cycle_ms / 2,
            initiator_epoch_us,
            responder_epoch_us: initiator_epoch_us
                + MotorEpoch::new(initiator_epoch_us, cycle_ms).half_cycle_us(),
        };
        self.armed = Some(change);
        change
    }

    /// Responder: validate and arm a received proposal
    ///
    /// A rejected proposal leaves any previously armed change untouched.
    pub fn accept(
        &mut self,
        msg: &CoordinationMessage,
        now_us: u64,
    ) -> Result<ArmedModeChange, ProposalError> {
        let change = ArmedModeChange::from_message(msg)?;
        change.validate(now_us)?;
        self.armed = Some(change);
        Ok(change)
    }

    pub fn armed(&self) -> Option<&ArmedModeChange> {
        self.armed.as_ref()
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Disarm and return the change once the role's commit instant is reached
    pub fn take_due(&mut self, role: Role, now_us: u64) -> Option<ArmedModeChange> {
        match self.armed {
            Some(change) if now_us >= change.commit_at(role) => self.armed.take(),
            _ => None,
        }
    }

    pub fn cancel(&mut self) {
        self.armed = None;
    }
}
