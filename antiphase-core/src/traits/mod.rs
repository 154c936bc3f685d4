//! Collaborator traits
//!
//! These traits define the interface between the synchronization engine
//! and the platform: clock service, radio link, motor output, alarm,
//! task runtime and settings.

pub mod alarm;
pub mod clock;
pub mod link;
pub mod motor;
pub mod runtime;
pub mod settings;

pub use alarm::{AlarmError, NoAlarm, PrecisionAlarm};
pub use clock::ClockSync;
pub use link::CoordinationLink;
pub use motor::{Direction, HapticOutput, Indicator};
pub use runtime::TaskRuntime;
pub use settings::SettingsProvider;
