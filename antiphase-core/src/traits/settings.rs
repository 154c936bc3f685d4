//! Configuration provider

use crate::config::SessionConfig;
use crate::mode::Mode;

pub trait SettingsProvider {
    /// Current validated settings; read once per cycle
    fn snapshot(&self) -> SessionConfig;

    /// The engine now runs `mode`; user input steps from here
    fn mode_committed(&self, _mode: Mode) {}
}

impl<T: SettingsProvider + ?Sized> SettingsProvider for &T {
    fn snapshot(&self) -> SessionConfig {
        (**self).snapshot()
    }

    fn mode_committed(&self, mode: Mode) {
        (**self).mode_committed(mode)
    }
}
