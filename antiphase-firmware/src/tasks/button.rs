//! User button task
//!
//! A short press steps to the next mode; holding for two seconds requests
//! an emergency shutdown.

use defmt::*;
use embassy_futures::select::{select, Either};
use embassy_rp::gpio::Input;
use embassy_time::Timer;

use antiphase_core::state::{MotorEvent, SessionEvent};

use crate::channels::MOTOR_EVENTS;
use crate::settings::SETTINGS;

const DEBOUNCE_MS: u64 = 30;
const SHUTDOWN_HOLD_MS: u64 = 2000;

#[embassy_executor::task]
pub async fn button_task(mut button: Input<'static>) {
    info!("Button task started");

    loop {
        button.wait_for_falling_edge().await;
        Timer::after_millis(DEBOUNCE_MS).await;
        if button.is_high() {
            continue;
        }

        let event = match select(
            button.wait_for_rising_edge(),
            Timer::after_millis(SHUTDOWN_HOLD_MS - DEBOUNCE_MS),
        )
        .await
        {
            Either::First(()) => next_mode(),
            Either::Second(()) => {
                warn!("Shutdown hold detected");
                SessionEvent::EmergencyShutdown
            }
        };
        MOTOR_EVENTS.send(MotorEvent::Session(event)).await;

        if button.is_low() {
            button.wait_for_high().await;
        }
        Timer::after_millis(DEBOUNCE_MS).await;
    }
}

/// Step from the mode the engine runs, not from an earlier request that
/// may still be waiting for its commit
fn next_mode() -> SessionEvent {
    let mode = SETTINGS.committed_mode().next();
    info!("Mode -> {}", mode.name());
    SessionEvent::ModeChangeRequested(mode)
}
