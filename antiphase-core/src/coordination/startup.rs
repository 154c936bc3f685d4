//! Coordinated start
//!
//! Brings two freshly paired units to their first activation. The
//! Initiator picks the start instant and commits the epoch when it fires;
//! the Responder aims half a cycle later, refining its target as soon as
//! the real epoch arrives.

use antiphase_protocol::CoordinationMessage;

use crate::engine::sleep::{sleep_until, EventInbox, Wake};
use crate::state::{MotorEvent, SessionEnd};
use crate::sync::MotorEpoch;
use crate::traits::{ClockSync, CoordinationLink, TaskRuntime};

/// Initiator wait for `ResponderReady`
pub const READY_TIMEOUT_US: u64 = 5_000_000;
/// Responder wait for the clock handshake
pub const HANDSHAKE_TIMEOUT_US: u64 = 5_000_000;
/// Start lead once both sides are ready
pub const READY_LEAD_US: u64 = 1_500_000;
/// Start lead when the peer never confirmed
pub const FALLBACK_LEAD_US: u64 = 3_000_000;

/// Result of the startup protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartupOutcome {
    /// First activation reached at `first_activation_us` (shared time)
    Started { first_activation_us: u64 },
    /// Session ended during startup
    Aborted(SessionEnd),
}

/// Runs one side of the startup protocol
pub struct StartupCoordinator<'a, C, L, R> {
    clock: &'a C,
    link: &'a mut L,
    runtime: &'a mut R,
    inbox: &'a mut EventInbox,
}

impl<'a, C, L, R> StartupCoordinator<'a, C, L, R>
where
    C: ClockSync,
    L: CoordinationLink,
    R: TaskRuntime,
{
    pub fn new(clock: &'a C, link: &'a mut L, runtime: &'a mut R, inbox: &'a mut EventInbox) -> Self {
        Self {
            clock,
            link,
            runtime,
            inbox,
        }
    }

    /// Initiator side: wait for the peer, pick the start, commit the epoch
    pub async fn run_initiator(&mut self, cycle_ms: u32) -> StartupOutcome {
        let now = self.clock.now_us();
        self.send(CoordinationMessage::SyncBeacon {
            shared_us: now,
            epoch_us: None,
            cycle_ms,
        });

        let wait = sleep_until(
            self.clock,
            &mut *self.runtime,
            &mut *self.inbox,
            now + READY_TIMEOUT_US,
            |e| e.is_shutdown() || matches!(e, MotorEvent::Peer(CoordinationMessage::ResponderReady)),
        )
        .await;

        let start_us = match wait {
            Wake::Interrupted(MotorEvent::Peer(CoordinationMessage::ResponderReady)) => {
                let start = self.clock.now_us() + READY_LEAD_US;
                info!("Responder ready, starting at {}", start);
                start
            }
            Wake::Interrupted(event) => return aborted(&event),
            Wake::Deadline => {
                let start = self.clock.now_us() + FALLBACK_LEAD_US;
                warn!("No ResponderReady, fallback start at {}", start);
                start
            }
        };

        if let Wake::Interrupted(event) = sleep_until(
            self.clock,
            &mut *self.runtime,
            &mut *self.inbox,
            start_us,
            MotorEvent::is_shutdown,
        )
        .await
        {
            return aborted(&event);
        }

        let fired_us = self.clock.now_us();
        let epoch = MotorEpoch::new(fired_us, cycle_ms);
        self.clock.set_motor_epoch(epoch);
        self.send(CoordinationMessage::MotorStarted {
            epoch_us: epoch.epoch_us,
            cycle_ms,
        });
        info!("Motor epoch committed at {}", fired_us);

        StartupOutcome::Started {
            first_activation_us: fired_us,
        }
    }

    /// Responder side: finish the handshake, report ready, wait out the
    /// half-cycle offset
    pub async fn run_responder(&mut self, cycle_ms: u32) -> StartupOutcome {
        let deadline = self.clock.now_us() + HANDSHAKE_TIMEOUT_US;
        while !self.clock.handshake_complete() {
            let now = self.clock.now_us();
            if now >= deadline {
                warn!("Clock handshake incomplete, using conservative lead");
                break;
            }
            let step = (now + crate::engine::sleep::POLL_INTERVAL_US).min(deadline);
            if let Wake::Interrupted(event) =
                sleep_until(self.clock, &mut *self.runtime, &mut *self.inbox, step, MotorEvent::is_shutdown).await
            {
                return aborted(&event);
            }
        }

        self.send(CoordinationMessage::ResponderReady);

        let now = self.clock.now_us();
        let mut target = match self.clock.motor_epoch() {
            Some(epoch) => epoch.responder_target(now),
            None => {
                let lead = if self.clock.handshake_complete() {
                    READY_LEAD_US
                } else {
                    FALLBACK_LEAD_US
                };
                now + lead + MotorEpoch::new(0, cycle_ms).half_cycle_us()
            }
        };
        debug!("Responder first target {}", target);

        loop {
            let wake = sleep_until(self.clock, &mut *self.runtime, &mut *self.inbox, target, |e| {
                e.is_shutdown()
                    || matches!(e, MotorEvent::Peer(CoordinationMessage::MotorStarted { .. }))
            })
            .await;

            match wake {
                Wake::Deadline => break,
                Wake::Interrupted(MotorEvent::Peer(CoordinationMessage::MotorStarted {
                    epoch_us,
                    cycle_ms,
                })) => {
                    let epoch = MotorEpoch::new(epoch_us, cycle_ms);
                    self.clock.set_motor_epoch(epoch);
                    target = epoch.responder_target(self.clock.now_us());
                    info!("Epoch received, retargeting to {}", target);
                }
                Wake::Interrupted(event) => return aborted(&event),
            }
        }

        StartupOutcome::Started {
            first_activation_us: target,
        }
    }

    fn send(&mut self, msg: CoordinationMessage) {
        if let Err(e) = self.link.send(msg) {
            warn!("Send {} failed: {:?}", msg.name(), e);
        }
    }
}

fn aborted(event: &MotorEvent) -> StartupOutcome {
    StartupOutcome::Aborted(
        event
            .shutdown_reason()
            .unwrap_or(SessionEnd::EmergencyShutdown),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimWorld;
    use crate::state::SessionEvent;
    use crate::sync::Role;
    use embassy_futures::block_on;

    const MS: u64 = 1000;

    fn started_messages(world: &SimWorld) -> Vec<(u64, CoordinationMessage)> {
        world
            .sent()
            .into_iter()
            .filter(|(_, m)| matches!(m, CoordinationMessage::MotorStarted { .. }))
            .collect()
    }

    #[test]
    fn test_initiator_starts_after_ready() {
        let world = SimWorld::new(Role::Initiator);
        world.schedule(200 * MS, MotorEvent::Peer(CoordinationMessage::ResponderReady));
        let (mut link, mut runtime) = (world.link(), world.runtime());
        let mut inbox = EventInbox::new();

        let outcome = block_on(
            StartupCoordinator::new(&world, &mut link, &mut runtime, &mut inbox).run_initiator(1000),
        );

        assert_eq!(
            outcome,
            StartupOutcome::Started {
                first_activation_us: 1700 * MS
            }
        );
        assert_eq!(world.motor_epoch(), Some(MotorEpoch::new(1700 * MS, 1000)));
        let started = started_messages(&world);
        assert_eq!(started.len(), 1);
        assert_eq!(
            started[0],
            (
                1700 * MS,
                CoordinationMessage::MotorStarted {
                    epoch_us: 1700 * MS,
                    cycle_ms: 1000
                }
            )
        );
        // Beacon goes out first
        assert!(matches!(
            world.sent()[0].1,
            CoordinationMessage::SyncBeacon { epoch_us: None, .. }
        ));
    }

    #[test]
    fn test_initiator_fallback_without_ready() {
        let world = SimWorld::new(Role::Initiator);
        let (mut link, mut runtime) = (world.link(), world.runtime());
        let mut inbox = EventInbox::new();

        let outcome = block_on(
            StartupCoordinator::new(&world, &mut link, &mut runtime, &mut inbox).run_initiator(1000),
        );

        assert_eq!(
            outcome,
            StartupOutcome::Started {
                first_activation_us: READY_TIMEOUT_US + FALLBACK_LEAD_US
            }
        );
    }

    #[test]
    fn test_initiator_aborts_on_shutdown() {
        let world = SimWorld::new(Role::Initiator);
        world.schedule(100 * MS, MotorEvent::Session(SessionEvent::EmergencyShutdown));
        let (mut link, mut runtime) = (world.link(), world.runtime());
        let mut inbox = EventInbox::new();

        let outcome = block_on(
            StartupCoordinator::new(&world, &mut link, &mut runtime, &mut inbox).run_initiator(1000),
        );
        assert_eq!(
            outcome,
            StartupOutcome::Aborted(SessionEnd::EmergencyShutdown)
        );
        assert!(world.motor_epoch().is_none());
    }

    #[test]
    fn test_peer_shutdown_aborts_responder_start() {
        let world = SimWorld::synced_responder();
        world.schedule(400 * MS, MotorEvent::Peer(CoordinationMessage::Shutdown));
        let (mut link, mut runtime) = (world.link(), world.runtime());
        let mut inbox = EventInbox::new();

        let outcome = block_on(
            StartupCoordinator::new(&world, &mut link, &mut runtime, &mut inbox).run_responder(1000),
        );
        assert_eq!(outcome, StartupOutcome::Aborted(SessionEnd::PeerShutdown));
        assert_eq!(world.now(), 400 * MS);
    }

    #[test]
    fn test_responder_retargets_on_motor_started() {
        let world = SimWorld::synced_responder();
        world.schedule(
            1650 * MS,
            MotorEvent::Peer(CoordinationMessage::MotorStarted {
                epoch_us: 1600 * MS,
                cycle_ms: 1000,
            }),
        );
        let (mut link, mut runtime) = (world.link(), world.runtime());
        let mut inbox = EventInbox::new();

        let outcome = block_on(
            StartupCoordinator::new(&world, &mut link, &mut runtime, &mut inbox).run_responder(1000),
        );

        // Provisional target was 2000 ms; the epoch moves it to 2100 ms
        assert_eq!(
            outcome,
            StartupOutcome::Started {
                first_activation_us: 2100 * MS
            }
        );
        assert_eq!(world.sent()[0], (0, CoordinationMessage::ResponderReady));
        assert_eq!(world.motor_epoch(), Some(MotorEpoch::new(1600 * MS, 1000)));
    }

    #[test]
    fn test_responder_provisional_target() {
        let world = SimWorld::synced_responder();
        let (mut link, mut runtime) = (world.link(), world.runtime());
        let mut inbox = EventInbox::new();

        let outcome = block_on(
            StartupCoordinator::new(&world, &mut link, &mut runtime, &mut inbox).run_responder(1000),
        );
        assert_eq!(
            outcome,
            StartupOutcome::Started {
                first_activation_us: READY_LEAD_US + 500 * MS
            }
        );
    }

    #[test]
    fn test_responder_uses_known_epoch() {
        let world = SimWorld::synced_responder();
        world.set_motor_epoch(MotorEpoch::new(0, 1000));
        world.set_time(1400 * MS);
        let (mut link, mut runtime) = (world.link(), world.runtime());
        let mut inbox = EventInbox::new();

        let outcome = block_on(
            StartupCoordinator::new(&world, &mut link, &mut runtime, &mut inbox).run_responder(1000),
        );
        assert_eq!(
            outcome,
            StartupOutcome::Started {
                first_activation_us: 1500 * MS
            }
        );
    }

    #[test]
    fn test_responder_without_handshake_uses_fallback_lead() {
        let world = SimWorld::new(Role::Responder);
        let (mut link, mut runtime) = (world.link(), world.runtime());
        let mut inbox = EventInbox::new();

        let outcome = block_on(
            StartupCoordinator::new(&world, &mut link, &mut runtime, &mut inbox).run_responder(1000),
        );
        assert_eq!(
            outcome,
            StartupOutcome::Started {
                first_activation_us: HANDSHAKE_TIMEOUT_US + FALLBACK_LEAD_US + 500 * MS
            }
        );
        assert_eq!(
            world.sent()[0],
            (HANDSHAKE_TIMEOUT_US, CoordinationMessage::ResponderReady)
        );
    }
}
