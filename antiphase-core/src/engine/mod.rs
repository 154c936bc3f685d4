//! Motor engine
//!
//! The phase loop plus the absolute-deadline sleep it is built on.

pub mod bilateral;
pub mod sleep;

pub use bilateral::{
    BilateralEngine, Diagnostics, INDICATION_WINDOW_US, MAX_START_LATENESS_US, PAIRING_WINDOW_US,
    REPORT_INTERVAL_CYCLES,
};
pub use sleep::{sleep_until, EventInbox, Wake, INBOX_DEPTH, POLL_INTERVAL_US};
