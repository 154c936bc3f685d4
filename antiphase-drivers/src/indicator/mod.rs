//! Indicator LED drivers

pub mod rgb;

pub use rgb::{Rgb, RgbIndicator, PALETTE};
