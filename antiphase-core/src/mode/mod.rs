//! Stimulation modes and their cycle timing

pub mod timing;

pub use timing::{
    cycle_ms_for, resolve, resolve_cycle, split_cycle, Mode, ModeConfig, MAX_CYCLE_MS,
    MIN_CYCLE_MS, MODE_COUNT, PRESETS,
};
