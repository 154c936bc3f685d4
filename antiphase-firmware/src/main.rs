//! Antiphase - Bilateral Haptic Stimulation Firmware
//!
//! Firmware for one unit of a two-unit haptic pair. Each unit drives a
//! vibration motor through an H-bridge and an RGB indicator; the pair talks
//! over a serial radio modem and alternates its activations half a cycle
//! apart.
//!
//! Task layout:
//! - `alarm_task` on a high-priority interrupt executor
//! - link RX/TX, clock sync, pairing, battery, button and motor tasks on
//!   the thread executor

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::adc::{Adc, Channel, InterruptHandler as AdcInterruptHandler};
use embassy_rp::bind_interrupts;
use embassy_rp::flash::{Blocking, Flash};
use embassy_rp::gpio::{Input, Pull};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_rp::peripherals::UART0;
use embassy_rp::pwm::{Config as PwmConfig, Pwm};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_rp::watchdog::Watchdog;
use embassy_time::Duration;
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use antiphase_drivers::indicator::RgbIndicator;
use antiphase_drivers::motor::{HBridge, HBridgeConfig};
use antiphase_drivers::HapticBoard;
use antiphase_protocol::{Address, ADDRESS_LEN};

mod channels;
mod platform;
mod settings;
mod sync;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    ADC_IRQ_FIFO => AdcInterruptHandler;
});

/// External flash size, only used to read the unique id
const FLASH_SIZE: usize = 2 * 1024 * 1024;

/// PWM wrap for a 20 kHz carrier at 125 MHz
const PWM_TOP: u16 = 6249;

/// Radio modem baud rate
const RADIO_BAUD: u32 = 115_200;

/// Watchdog period; the motor task feeds it while waiting
const WATCHDOG_PERIOD_MS: u64 = 2000;

static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

static EXECUTOR_HIGH: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
unsafe fn SWI_IRQ_1() {
    EXECUTOR_HIGH.on_interrupt()
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Antiphase firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    // Hardware address from the flash chip's unique id
    let address = {
        let mut flash = Flash::<_, Blocking, FLASH_SIZE>::new_blocking(p.FLASH);
        let mut uid = [0u8; 8];
        if let Err(e) = flash.blocking_unique_id(&mut uid) {
            warn!("Unique id read failed: {:?}", Debug2Format(&e));
        }
        let mut address: Address = [0; ADDRESS_LEN];
        address.copy_from_slice(&uid[..ADDRESS_LEN]);
        address
    };

    // Radio modem on UART0 (GPIO0 TX, GPIO1 RX)
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = RADIO_BAUD;
    let tx_buf = TX_BUF.init([0u8; 256]);
    let rx_buf = RX_BUF.init([0u8; 256]);
    let uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);
    let (tx, rx) = uart.split();
    info!("UART initialized for radio link");

    // H-bridge inputs on slice 1 (GPIO2/GPIO3), RGB on slices 2 and 3
    let mut pwm_config = PwmConfig::default();
    pwm_config.top = PWM_TOP;

    let (in1, in2) = Pwm::new_output_ab(p.PWM_SLICE1, p.PIN_2, p.PIN_3, pwm_config.clone()).split();
    let (red, green) = Pwm::new_output_ab(p.PWM_SLICE2, p.PIN_4, p.PIN_5, pwm_config.clone()).split();
    let (blue, _) = Pwm::new_output_a(p.PWM_SLICE3, p.PIN_6, pwm_config).split();

    let (Some(in1), Some(in2), Some(red), Some(green), Some(blue)) = (in1, in2, red, green, blue)
    else {
        error!("PWM channel split failed");
        return;
    };

    let motor = match HBridge::new(in1, in2, HBridgeConfig::default()) {
        Ok(motor) => motor,
        Err(e) => {
            error!("H-bridge init failed: {:?}", Debug2Format(&e));
            return;
        }
    };
    // Common-anode LED: channels sink current
    let indicator = RgbIndicator::new(red, green, blue, true);
    let board = HapticBoard::new(motor, indicator);
    info!("Motor and indicator initialized");

    // Battery divider on GPIO29
    let adc = Adc::new(p.ADC, Irqs, embassy_rp::adc::Config::default());
    let battery_channel = Channel::new_pin(p.PIN_29, Pull::None);

    let button = Input::new(p.PIN_15, Pull::Up);

    let mut watchdog = Watchdog::new(p.WATCHDOG);
    watchdog.start(Duration::from_millis(WATCHDOG_PERIOD_MS));

    // Alarm runs above the thread executor so it fires on time
    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let high_spawner = EXECUTOR_HIGH.start(interrupt::SWI_IRQ_1);
    high_spawner.spawn(tasks::alarm_task()).unwrap();

    spawner.spawn(tasks::link_rx_task(rx)).unwrap();
    spawner.spawn(tasks::link_tx_task(tx)).unwrap();
    spawner.spawn(tasks::sync_task()).unwrap();
    spawner.spawn(tasks::battery_task(adc, battery_channel)).unwrap();
    spawner.spawn(tasks::button_task(button)).unwrap();
    spawner.spawn(tasks::motor_task(board, watchdog)).unwrap();
    spawner.spawn(tasks::pairing_task(address)).unwrap();

    info!("All tasks spawned, firmware running");

    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}
