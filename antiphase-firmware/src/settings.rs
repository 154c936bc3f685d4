//! Active session settings
//!
//! The motor task reads a snapshot once per cycle and publishes the mode
//! it is running back here for the button task.

use core::cell::Cell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use antiphase_core::config::SessionConfig;
use antiphase_core::mode::Mode;
use antiphase_core::traits::SettingsProvider;

pub static SETTINGS: SharedSettings = SharedSettings::new();

pub struct SharedSettings {
    config: Mutex<CriticalSectionRawMutex, Cell<SessionConfig>>,
    /// Mode the motor task is running, which may lag a requested change
    committed: Mutex<CriticalSectionRawMutex, Cell<Mode>>,
}

impl SharedSettings {
    pub const fn new() -> Self {
        Self {
            config: Mutex::new(Cell::new(SessionConfig::DEFAULT)),
            committed: Mutex::new(Cell::new(SessionConfig::DEFAULT.mode)),
        }
    }

    pub fn get(&self) -> SessionConfig {
        self.config.lock(|c| c.get())
    }

    pub fn committed_mode(&self) -> Mode {
        self.committed.lock(|m| m.get())
    }
}

impl SettingsProvider for SharedSettings {
    fn snapshot(&self) -> SessionConfig {
        self.get()
    }

    fn mode_committed(&self, mode: Mode) {
        self.committed.lock(|m| m.set(mode));
    }
}
