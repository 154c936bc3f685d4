//! Motor task
//!
//! Owns the haptic board and runs the bilateral engine for one session.

use defmt::*;
use embassy_rp::pwm::PwmOutput;
use embassy_rp::watchdog::Watchdog;
use embassy_time::Timer;

use antiphase_core::config::MAX_BRIGHTNESS_PCT;
use antiphase_core::engine::BilateralEngine;
use antiphase_core::state::SessionEnd;
use antiphase_core::traits::{HapticOutput, Indicator};
use antiphase_drivers::HapticBoard;

use crate::platform::{AlarmHandle, ChannelLink, EmbassyRuntime};
use crate::settings::SETTINGS;
use crate::sync::SYNC;

/// Motor bridge on one PWM slice, RGB indicator on three channels
pub type Board = HapticBoard<
    PwmOutput<'static>,
    PwmOutput<'static>,
    PwmOutput<'static>,
    PwmOutput<'static>,
    PwmOutput<'static>,
>;

/// Red in the indicator palette
const WARNING_COLOR: u8 = 0;

const WARNING_FLASHES: u8 = 5;
const WARNING_FLASH_MS: u64 = 200;

#[embassy_executor::task]
pub async fn motor_task(board: Board, mut watchdog: Watchdog) {
    info!("Motor task started");

    let (end, mut board) = {
        let mut engine = BilateralEngine::new(
            &SYNC,
            ChannelLink,
            board,
            AlarmHandle,
            EmbassyRuntime::new(&mut watchdog),
            &SETTINGS,
        );
        let end = engine.run().await;
        let diag = engine.diagnostics();
        info!(
            "Session over: {:?}, {} activations, {} proposals dropped, {} events dropped",
            end, diag.activations, diag.proposals_dropped, diag.events_dropped
        );
        if diag.settings_dropped > 0 {
            warn!("{} peer settings rejected", diag.settings_dropped);
        }
        if diag.version_mismatch {
            warn!("Peer firmware {:?} differs from ours", diag.peer_version);
        }
        (end, engine.into_output())
    };
    debug!("Outputs released after {:?}", end);

    if end == SessionEnd::LowBattery {
        for _ in 0..WARNING_FLASHES {
            board.set_indicator(Indicator::Lit {
                color_index: WARNING_COLOR,
                brightness_pct: MAX_BRIGHTNESS_PCT,
            });
            Timer::after_millis(WARNING_FLASH_MS).await;
            board.set_indicator(Indicator::Off);
            Timer::after_millis(WARNING_FLASH_MS).await;
            watchdog.feed();
        }
    }

    // Outputs are off; stay alive until power is removed
    loop {
        watchdog.feed();
        Timer::after_secs(1).await;
    }
}
