//! Embassy async tasks
//!
//! Each task runs independently and communicates via channels/signals.

pub mod alarm;
pub mod battery;
pub mod button;
pub mod clock_sync;
pub mod link_rx;
pub mod link_tx;
pub mod motor;
pub mod pairing;

pub use alarm::alarm_task;
pub use battery::battery_task;
pub use button::button_task;
pub use clock_sync::sync_task;
pub use link_rx::link_rx_task;
pub use link_tx::link_tx_task;
pub use motor::{motor_task, Board};
pub use pairing::pairing_task;
