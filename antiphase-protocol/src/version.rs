//! Firmware version exchanged after pairing
//!
//! Both units are expected to run the same build. A mismatch is reported
//! but does not block the session unless both sides enforce the check.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
    /// Cleared on development builds to allow mixing versions
    pub check_enabled: bool,
}

impl FirmwareVersion {
    /// Version of this build, taken from the crate metadata
    pub const CURRENT: Self = Self {
        major: parse_component(env!("CARGO_PKG_VERSION_MAJOR")),
        minor: parse_component(env!("CARGO_PKG_VERSION_MINOR")),
        patch: parse_component(env!("CARGO_PKG_VERSION_PATCH")),
        check_enabled: true,
    };

    pub const fn new(major: u8, minor: u8, patch: u8) -> Self {
        Self {
            major,
            minor,
            patch,
            check_enabled: true,
        }
    }

    /// Versions are compatible when either side waives the check or all
    /// three components agree
    pub fn matches(&self, other: &Self) -> bool {
        if !self.check_enabled || !other.check_enabled {
            return true;
        }
        (self.major, self.minor, self.patch) == (other.major, other.minor, other.patch)
    }
}

/// Decimal version component; saturates at 255
const fn parse_component(s: &str) -> u8 {
    let bytes = s.as_bytes();
    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i].wrapping_sub(b'0');
        if digit > 9 {
            break;
        }
        value = value * 10 + digit as u32;
        if value > u8::MAX as u32 {
            return u8::MAX;
        }
        i += 1;
    }
    value as u8
}
