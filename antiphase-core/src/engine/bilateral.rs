//! Bilateral motor engine
//!
//! Owns the motor and indicator and runs the phase state machine on an
//! absolute time grid. The Initiator activates on the epoch grid; the
//! Responder activates half a cycle later, recomputing every target from
//! the shared epoch so that no error carries from one cycle to the next.

use antiphase_protocol::{CoordinationMessage, FirmwareVersion};

use crate::config::SessionConfig;
use crate::coordination::{
    ArmedModeChange, PeerSettings, PendingModeChange, StartupCoordinator, StartupOutcome,
};
use crate::mode::{resolve, resolve_cycle, Mode, ModeConfig};
use crate::state::{MotorEvent, MotorPhase, MotorPhaseState, SessionEnd, SessionEvent};
use crate::sync::{MotorEpoch, Reconnect, Role};
use crate::traits::{
    ClockSync, CoordinationLink, HapticOutput, Indicator, PrecisionAlarm, SettingsProvider,
    TaskRuntime,
};

use super::sleep::{sleep_until, EventInbox, Wake};

/// How long to wait for a pairing outcome before running standalone
pub const PAIRING_WINDOW_US: u64 = 30_000_000;

/// Preset modes show the indicator this long after a mode change
pub const INDICATION_WINDOW_US: u64 = 10_000_000;

/// Responder reports its phase error every this many cycles
pub const REPORT_INTERVAL_CYCLES: u32 = 10;

/// A cycle start missed by more than this is skipped, not run late
pub const MAX_START_LATENESS_US: u64 = 20_000;

/// Engine counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Diagnostics {
    pub activations: u32,
    pub proposals_dropped: u32,
    pub events_dropped: u32,
    /// Startups re-run after an expired outage
    pub restarts: u32,
    /// Last phase error reported by the Responder
    pub last_peer_error_ms: Option<i32>,
    pub peer_battery_pct: Option<u8>,
    /// Peer settings that failed validation
    pub settings_dropped: u32,
    pub peer_version: Option<FirmwareVersion>,
    pub version_mismatch: bool,
}

enum Control {
    Continue,
    Shutdown,
    Restart,
}

pub struct BilateralEngine<C, L, O, A, R, S> {
    clock: C,
    link: L,
    output: O,
    alarm: A,
    runtime: R,
    settings: S,
    state: MotorPhaseState,
    role: Role,
    mode: Mode,
    timing: ModeConfig,
    config: SessionConfig,
    pending: PendingModeChange,
    /// Initiator settings mirrored by a Responder
    peer_settings: Option<PeerSettings>,
    /// Settings the Initiator last delivered to the peer
    sent_settings: Option<PeerSettings>,
    inbox: EventInbox,
    session_start_us: u64,
    indicator_until_us: u64,
    /// Responder's half-cycle offset already waited out
    offset_elapsed: bool,
    cycles: u32,
    end: Option<SessionEnd>,
    diagnostics: Diagnostics,
}

impl<C, L, O, A, R, S> BilateralEngine<C, L, O, A, R, S>
where
    C: ClockSync,
    L: CoordinationLink,
    O: HapticOutput,
    A: PrecisionAlarm,
    R: TaskRuntime,
    S: SettingsProvider,
{
    pub fn new(clock: C, link: L, output: O, alarm: A, runtime: R, settings: S) -> Self {
        let config = settings.snapshot();
        Self {
            clock,
            link,
            output,
            alarm,
            runtime,
            settings,
            state: MotorPhaseState::new(),
            role: Role::None,
            mode: config.mode,
            timing: resolve(config.mode, config.custom),
            config,
            pending: PendingModeChange::new(),
            peer_settings: None,
            sent_settings: None,
            inbox: EventInbox::new(),
            session_start_us: 0,
            indicator_until_us: 0,
            offset_elapsed: false,
            cycles: 0,
            end: None,
            diagnostics: Diagnostics::default(),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn timing(&self) -> ModeConfig {
        self.timing
    }

    pub fn phase(&self) -> MotorPhase {
        self.state.phase
    }

    /// Give the outputs back once the session is over
    pub fn into_output(self) -> O {
        self.output
    }

    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            events_dropped: self.inbox.dropped(),
            ..self.diagnostics
        }
    }

    /// Run the session to its end
    pub async fn run(&mut self) -> SessionEnd {
        info!("Motor engine started, mode {}", self.mode.name());
        self.settings.mode_committed(self.mode);
        loop {
            let next = match self.state.phase {
                MotorPhase::PairingWait => self.pairing_wait().await,
                MotorPhase::CheckMessages => self.check_messages().await,
                MotorPhase::Active => self.active().await,
                MotorPhase::Inactive => self.inactive().await,
                MotorPhase::Shutdown => return self.shut_down(),
            };
            if next != self.state.phase {
                trace!("Phase {:?} -> {:?}", self.state.phase, next);
            }
            self.state.phase = next;
        }
    }

    async fn pairing_wait(&mut self) -> MotorPhase {
        let deadline = self.clock.now_us() + PAIRING_WINDOW_US;
        let wake = sleep_until(&self.clock, &mut self.runtime, &mut self.inbox, deadline, |e| {
            e.is_shutdown()
                || matches!(
                    e,
                    MotorEvent::Session(
                        SessionEvent::PairingComplete { .. } | SessionEvent::PairingFailed
                    )
                )
        })
        .await;

        match wake {
            Wake::Interrupted(event) if event.is_shutdown() => {
                self.end = event.shutdown_reason();
                MotorPhase::Shutdown
            }
            Wake::Interrupted(MotorEvent::Session(SessionEvent::PairingComplete { role }))
                if role.is_paired() =>
            {
                info!("Paired as {:?}", role);
                self.role = role;
                self.clock.begin_session(role);
                self.begin_session_timers();
                self.send(CoordinationMessage::Version(FirmwareVersion::CURRENT));
                self.start_coordinated().await
            }
            _ => {
                warn!("No peer, running standalone");
                self.role = Role::None;
                self.clock.begin_session(Role::None);
                self.begin_session_timers();
                self.state.cycle_start_us = self.clock.now_us();
                MotorPhase::CheckMessages
            }
        }
    }

    fn begin_session_timers(&mut self) {
        let now = self.clock.now_us();
        self.session_start_us = now;
        self.indicator_until_us = now + INDICATION_WINDOW_US;
    }

    async fn start_coordinated(&mut self) -> MotorPhase {
        let cycle_ms = self.timing.cycle_ms();
        let role = self.role;
        let outcome = {
            let mut coordinator = StartupCoordinator::new(
                &self.clock,
                &mut self.link,
                &mut self.runtime,
                &mut self.inbox,
            );
            match role {
                Role::Initiator => coordinator.run_initiator(cycle_ms).await,
                _ => coordinator.run_responder(cycle_ms).await,
            }
        };

        match outcome {
            StartupOutcome::Started {
                first_activation_us,
            } => {
                self.state.cycle_start_us = first_activation_us;
                self.offset_elapsed = role == Role::Responder;
                MotorPhase::CheckMessages
            }
            StartupOutcome::Aborted(end) => {
                self.end = Some(end);
                MotorPhase::Shutdown
            }
        }
    }

    async fn check_messages(&mut self) -> MotorPhase {
        self.runtime.feed_watchdog();

        // Events after a restart stay queued for the startup to see
        let mut restart = false;
        while let Some(event) = self.next_event() {
            match self.handle_event(event) {
                Control::Continue => {}
                Control::Shutdown => return MotorPhase::Shutdown,
                Control::Restart => {
                    restart = true;
                    break;
                }
            }
        }

        let now = self.clock.now_us();
        let limit_us = self.config.session_duration_s as u64 * 1_000_000;
        if now.saturating_sub(self.session_start_us) >= limit_us {
            info!("Session duration reached");
            self.end = Some(SessionEnd::SessionTimeout);
            return MotorPhase::Shutdown;
        }

        if restart {
            self.pending.cancel();
            self.diagnostics.restarts += 1;
            info!("Re-running coordinated start");
            return self.start_coordinated().await;
        }

        self.apply_settings();

        if let Some(change) = self.pending.armed().copied() {
            let commit_us = change.commit_at(self.role);
            debug!("Holding for mode change commit at {}", commit_us);
            if let Wake::Interrupted(event) = sleep_until(
                &self.clock,
                &mut self.runtime,
                &mut self.inbox,
                commit_us,
                MotorEvent::is_shutdown,
            )
            .await
            {
                self.end = event.shutdown_reason();
                return MotorPhase::Shutdown;
            }
            if let Some(change) = self.pending.take_due(self.role, self.clock.now_us()) {
                self.commit_mode_change(change);
            }
        }

        let next = MotorPhase::after_check(self.role, self.offset_elapsed);
        self.offset_elapsed = false;
        next
    }

    async fn active(&mut self) -> MotorPhase {
        let start = self.activation_start(self.clock.now_us());
        self.state.cycle_start_us = start;
        if let Some(next) = self.wait_or_abort(start).await {
            return next;
        }

        let fired = self.clock.now_us();
        let intensity = self.config.intensity_for(self.mode);
        if intensity > 0 {
            self.output.drive(self.state.direction, intensity);
        }
        let lit = self.indicator_visible(fired);
        if lit {
            self.output.set_indicator(Indicator::Lit {
                color_index: self.config.led.color_index,
                brightness_pct: self.config.led.brightness_pct,
            });
        }
        self.diagnostics.activations = self.diagnostics.activations.wrapping_add(1);
        if self.role == Role::Responder {
            self.report_activation(fired, start);
        }

        let on_end = start + self.timing.motor_on_ms as u64 * 1000;
        let aborted = self.wait_or_abort(on_end).await;
        self.output.coast();
        if lit {
            self.output.set_indicator(Indicator::Off);
        }
        if let Some(next) = aborted {
            return next;
        }

        let active_end = on_end + self.timing.active_coast_ms as u64 * 1000;
        if let Some(next) = self.wait_or_abort(active_end).await {
            return next;
        }

        self.state.toggle_direction();
        MotorPhase::after_active(self.role)
    }

    async fn inactive(&mut self) -> MotorPhase {
        let now = self.clock.now_us();
        let target = match self.role {
            Role::Responder => {
                let target = self.responder_target(now);
                if let Err(e) = self.alarm.arm(target) {
                    trace!("Alarm not armed ({:?}), polling", e);
                }
                target
            }
            _ => self.state.cycle_start_us + self.timing.cycle_us(),
        };

        if let Some(next) = self.wait_or_abort(target).await {
            return next;
        }

        self.state.cycle_start_us = target;
        MotorPhase::after_inactive(self.role)
    }

    fn shut_down(&mut self) -> SessionEnd {
        self.output.coast();
        self.output.set_indicator(Indicator::Off);
        self.alarm.cancel();
        self.pending.cancel();
        let end = self.end.unwrap_or(SessionEnd::EmergencyShutdown);
        if self.role.is_paired() && end.notify_peer() {
            self.send(CoordinationMessage::Shutdown);
        }
        self.clock.end_session();
        info!(
            "Session ended: {:?} after {} activations",
            end, self.diagnostics.activations
        );
        end
    }

    /// Sleep to `deadline_us`, abandoning the phase on an urgent event
    async fn wait_or_abort(&mut self, deadline_us: u64) -> Option<MotorPhase> {
        match sleep_until(
            &self.clock,
            &mut self.runtime,
            &mut self.inbox,
            deadline_us,
            MotorEvent::is_urgent,
        )
        .await
        {
            Wake::Deadline => None,
            Wake::Interrupted(event) => {
                self.alarm.cancel();
                self.output.coast();
                if let Some(end) = event.shutdown_reason() {
                    self.end = Some(end);
                    Some(MotorPhase::Shutdown)
                } else {
                    self.inbox.push_front(event);
                    Some(MotorPhase::CheckMessages)
                }
            }
        }
    }

    fn activation_start(&self, now: u64) -> u64 {
        let planned = self.state.cycle_start_us;
        match self.role {
            Role::Responder => planned,
            _ if now <= planned + MAX_START_LATENESS_US => planned,
            _ => MotorEpoch::new(planned, self.timing.cycle_ms()).next_cycle_start(now),
        }
    }

    fn responder_target(&mut self, now: u64) -> u64 {
        match self.clock.motor_epoch() {
            Some(epoch) => {
                if epoch.cycle_ms != self.timing.cycle_ms() {
                    warn!(
                        "Epoch cycle {} ms differs from local {} ms, following epoch",
                        epoch.cycle_ms,
                        self.timing.cycle_ms()
                    );
                    self.timing = resolve_cycle(self.mode, epoch.cycle_ms, self.config.custom);
                }
                epoch.responder_target(now)
            }
            None => {
                // Standalone on the last known grid
                MotorEpoch::new(self.state.cycle_start_us, self.timing.cycle_ms())
                    .next_cycle_start(now + 1)
            }
        }
    }

    fn indicator_visible(&self, now: u64) -> bool {
        match self.mode {
            Mode::Custom => self.config.led.enabled,
            _ => now < self.indicator_until_us,
        }
    }

    fn report_activation(&mut self, fired_us: u64, target_us: u64) {
        self.cycles = self.cycles.wrapping_add(1);
        if self.cycles % REPORT_INTERVAL_CYCLES != 0 || self.clock.motor_epoch().is_none() {
            return;
        }

        let error_ms = ((fired_us as i64 - target_us as i64) / 1000) as i32;
        let quality = self.clock.quality();
        info!(
            "Cycle {}: error {} ms, quality {}, drift {} us, locked {}",
            self.cycles,
            error_ms,
            quality.score,
            quality.avg_drift_us,
            self.clock.antiphase_locked()
        );
        if self.link.is_connected() {
            self.send(CoordinationMessage::ActivationReport {
                actual_us: fired_us,
                target_us,
                error_ms,
                cycle_number: self.cycles,
            });
        }
    }

    fn next_event(&mut self) -> Option<MotorEvent> {
        match self.inbox.pop() {
            Some(event) => Some(event),
            None => self.runtime.try_receive(),
        }
    }

    fn handle_event(&mut self, event: MotorEvent) -> Control {
        if let Some(end) = event.shutdown_reason() {
            if end == SessionEnd::PeerShutdown {
                info!("Peer ended the session");
            }
            self.end = Some(end);
            return Control::Shutdown;
        }

        match event {
            MotorEvent::Session(SessionEvent::ModeChangeRequested(mode)) => {
                self.request_mode_change(mode);
                Control::Continue
            }
            MotorEvent::Session(SessionEvent::PeerRejoined) if self.role.is_paired() => {
                warn!("Peer rebooted and rejoined as {:?}", self.role.peer());
                self.clock.peer_rebooted();
                self.sent_settings = None;
                self.send(CoordinationMessage::Version(FirmwareVersion::CURRENT));
                if self.role == Role::Responder {
                    // Old epoch and offset belong to the peer's previous boot
                    Control::Restart
                } else {
                    Control::Continue
                }
            }
            MotorEvent::Session(_) => {
                debug!("Ignoring pairing event mid-session");
                Control::Continue
            }
            MotorEvent::Peer(msg) => {
                self.handle_peer(msg);
                Control::Continue
            }
            MotorEvent::TimerFired => Control::Continue,
            MotorEvent::LinkLost => {
                warn!("Peer link lost, epoch frozen");
                self.clock.link_lost();
                Control::Continue
            }
            MotorEvent::LinkRestored => {
                // The peer may have missed settings sent during the outage
                self.sent_settings = None;
                match self.clock.link_restored() {
                    Reconnect::Resume => {
                        info!("Peer link restored, session resumed");
                        Control::Continue
                    }
                    Reconnect::Restart if self.role.is_paired() => {
                        warn!("Peer link restored after epoch expiry");
                        Control::Restart
                    }
                    Reconnect::Restart => Control::Continue,
                }
            }
        }
    }

    fn handle_peer(&mut self, msg: CoordinationMessage) {
        match msg {
            CoordinationMessage::ModeChangeProposal { .. } => {
                if self.role != Role::Responder {
                    warn!("Ignoring proposal, not a Responder");
                    return;
                }
                match self.pending.accept(&msg, self.clock.now_us()) {
                    Ok(change) => info!(
                        "Mode change to {} armed for {}",
                        change.mode.name(),
                        change.responder_epoch_us
                    ),
                    Err(e) => {
                        warn!("Dropping mode change proposal: {:?}", e);
                        self.diagnostics.proposals_dropped += 1;
                    }
                }
            }
            CoordinationMessage::ModeRequest { mode } if self.role == Role::Initiator => {
                match Mode::from_id(mode) {
                    Some(mode) => self.request_mode_change(mode),
                    None => warn!("Peer requested unknown mode {}", mode),
                }
            }
            CoordinationMessage::MotorStarted { epoch_us, cycle_ms }
                if self.role == Role::Responder =>
            {
                debug!("Epoch update {} / {} ms", epoch_us, cycle_ms);
                self.clock.set_motor_epoch(MotorEpoch::new(epoch_us, cycle_ms));
            }
            CoordinationMessage::ResponderReady if self.role == Role::Initiator => {
                // Peer restarted its startup; it needs the running epoch
                if let Some(epoch) = self.clock.motor_epoch() {
                    info!("Late ResponderReady, republishing epoch");
                    self.send(CoordinationMessage::MotorStarted {
                        epoch_us: epoch.epoch_us,
                        cycle_ms: epoch.cycle_ms,
                    });
                }
            }
            CoordinationMessage::ActivationReport {
                error_ms,
                cycle_number,
                ..
            } => {
                info!("Peer cycle {} phase error {} ms", cycle_number, error_ms);
                self.diagnostics.last_peer_error_ms = Some(error_ms);
            }
            CoordinationMessage::PeerBatteryLevel { pct } => {
                self.diagnostics.peer_battery_pct = Some(pct);
            }
            CoordinationMessage::Settings { .. } if self.role == Role::Responder => {
                let Some(settings) = PeerSettings::from_message(&msg) else {
                    return;
                };
                match settings.validate_against(self.settings.snapshot()) {
                    Ok(()) => {
                        debug!("Mirroring peer settings");
                        self.peer_settings = Some(settings);
                    }
                    Err(e) => {
                        warn!("Dropping peer settings: {:?}", e);
                        self.diagnostics.settings_dropped += 1;
                    }
                }
            }
            CoordinationMessage::Version(peer) => {
                let local = FirmwareVersion::CURRENT;
                if local.matches(&peer) {
                    debug!("Peer firmware {}.{}.{}", peer.major, peer.minor, peer.patch);
                } else {
                    warn!(
                        "Firmware mismatch: local {}.{}.{}, peer {}.{}.{}",
                        local.major, local.minor, local.patch, peer.major, peer.minor, peer.patch
                    );
                    self.diagnostics.version_mismatch = true;
                }
                self.diagnostics.peer_version = Some(peer);
            }
            other => trace!("Ignoring {}", other.name()),
        }
    }

    fn request_mode_change(&mut self, mode: Mode) {
        let timing = resolve(mode, self.config.custom);
        match self.role {
            Role::None => self.apply_mode(mode, timing),
            Role::Initiator => {
                if self.pending.is_armed() {
                    warn!("Mode change already pending, dropping request");
                    self.diagnostics.proposals_dropped += 1;
                    return;
                }
                if mode == self.mode && timing.cycle_ms() == self.timing.cycle_ms() {
                    self.apply_mode(mode, timing);
                    return;
                }
                let change = self.pending.propose(mode, &timing, self.clock.now_us());
                info!(
                    "Proposing {} ({} ms) at {}",
                    mode.name(),
                    change.cycle_ms,
                    change.initiator_epoch_us
                );
                self.send(change.to_message());
            }
            Role::Responder => {
                self.send(CoordinationMessage::ModeRequest { mode: mode.id() });
            }
        }
    }

    fn apply_mode(&mut self, mode: Mode, timing: ModeConfig) {
        info!("Mode {} ({} ms cycle)", mode.name(), timing.cycle_ms());
        self.mode = mode;
        self.timing = timing;
        self.indicator_until_us = self.clock.now_us() + INDICATION_WINDOW_US;
        self.settings.mode_committed(mode);
    }

    fn commit_mode_change(&mut self, change: ArmedModeChange) {
        let timing = resolve_cycle(change.mode, change.cycle_ms, self.config.custom);
        self.apply_mode(change.mode, timing);

        let epoch = change.epoch();
        self.clock.set_motor_epoch(epoch);
        match self.role {
            Role::Initiator => {
                self.state.cycle_start_us = change.initiator_epoch_us;
                self.send(CoordinationMessage::MotorStarted {
                    epoch_us: epoch.epoch_us,
                    cycle_ms: epoch.cycle_ms,
                });
            }
            Role::Responder => {
                self.state.cycle_start_us = change.responder_epoch_us;
                self.offset_elapsed = true;
            }
            Role::None => {}
        }
    }

    /// Pick up settings changed since the last cycle
    ///
    /// Duty and intensity apply at once and never move the epoch; a custom
    /// frequency change goes through the two-phase commit. A Responder
    /// overlays the Initiator's mirrored settings on its own.
    fn apply_settings(&mut self) {
        let local = self.settings.snapshot();
        self.config = match self.peer_settings {
            Some(peer) if self.role == Role::Responder => peer.apply_to(local),
            _ => local,
        };
        if self.role == Role::Initiator {
            self.publish_settings();
        }
        if self.mode != Mode::Custom {
            return;
        }

        let timing = resolve(Mode::Custom, self.config.custom);
        if timing.cycle_ms() == self.timing.cycle_ms() {
            self.set_custom_timing(timing);
            return;
        }

        match self.role {
            Role::None => self.apply_mode(Mode::Custom, timing),
            Role::Initiator if !self.pending.is_armed() => self.request_mode_change(Mode::Custom),
            Role::Initiator => {}
            // Cycle comes from the epoch; only the duty is local
            Role::Responder => {
                let timing = resolve_cycle(Mode::Custom, self.timing.cycle_ms(), self.config.custom);
                self.set_custom_timing(timing);
            }
        }
    }

    fn set_custom_timing(&mut self, timing: ModeConfig) {
        if timing != self.timing {
            debug!("Custom duty now {} ms on", timing.motor_on_ms);
            self.timing = timing;
        }
    }

    /// Send the mirrored settings when they changed or were never delivered
    fn publish_settings(&mut self) {
        let settings = PeerSettings::from_config(&self.config);
        if self.sent_settings != Some(settings) && self.send(settings.to_message()) {
            self.sent_settings = Some(settings);
        }
    }

    fn send(&mut self, msg: CoordinationMessage) -> bool {
        match self.link.send(msg) {
            Ok(()) => true,
            Err(e) => {
                warn!("Send {} failed: {:?}", msg.name(), e);
                false
            }
        }
    }
}
