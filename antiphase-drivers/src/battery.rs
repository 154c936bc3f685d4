//! Battery gauge
//!
//! Converts a single-cell LiPo voltage into a charge percentage for the
//! pairing `Hello` and the periodic peer battery report. The discharge curve
//! is a lookup table with linear interpolation; no floating point.
//!
//! Below [`CUTOFF_MV`] the cell must not be drained further and the unit
//! stops its session.

/// Low-voltage cutoff
pub const CUTOFF_MV: u16 = 3200;

/// Readings below this mean no cell is fitted (bench supply over USB)
pub const NO_BATTERY_MV: u16 = 500;

/// Resting cell voltage to charge, mV / percent, by falling voltage
const DISCHARGE_CURVE: &[(u16, u8)] = &[
    (4200, 100),
    (4100, 90),
    (4000, 80),
    (3900, 65),
    (3800, 50),
    (3750, 40),
    (3700, 30),
    (3650, 20),
    (3600, 12),
    (3500, 5),
    (3300, 0),
];

/// Charge percentage for a cell voltage
pub fn percent_from_mv(cell_mv: u16) -> u8 {
    let (top_mv, top_pct) = DISCHARGE_CURVE[0];
    if cell_mv >= top_mv {
        return top_pct;
    }

    for pair in DISCHARGE_CURVE.windows(2) {
        let (hi_mv, hi_pct) = pair[0];
        let (lo_mv, lo_pct) = pair[1];
        if cell_mv >= lo_mv {
            let span_mv = (hi_mv - lo_mv) as u32;
            let span_pct = (hi_pct - lo_pct) as u32;
            let above = (cell_mv - lo_mv) as u32;
            return lo_pct + (above * span_pct / span_mv) as u8;
        }
    }
    0
}

/// Cell condition for the cutoff decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CellState {
    Ok,
    /// Under the cutoff; stop drawing current
    Cutoff,
    /// Nothing connected, the cutoff does not apply
    Absent,
}

/// Cutoff decision for a cell voltage
pub fn cell_state(cell_mv: u16) -> CellState {
    if cell_mv < NO_BATTERY_MV {
        CellState::Absent
    } else if cell_mv < CUTOFF_MV {
        CellState::Cutoff
    } else {
        CellState::Ok
    }
}

/// ADC front end for the battery divider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryGauge {
    /// ADC reference in millivolts
    pub vref_mv: u16,
    /// Full-scale ADC count (4096 for 12 bit)
    pub adc_max: u16,
    /// Divider ratio numerator / denominator (cell = pin * num / den)
    pub divider_num: u16,
    pub divider_den: u16,
}

impl Default for BatteryGauge {
    fn default() -> Self {
        Self {
            vref_mv: 3300,
            adc_max: 4096,
            divider_num: 2,
            divider_den: 1,
        }
    }
}

impl BatteryGauge {
    /// Cell voltage for a raw ADC reading
    pub fn cell_mv(&self, raw: u16) -> u16 {
        let pin_mv = raw.min(self.adc_max) as u32 * self.vref_mv as u32 / self.adc_max as u32;
        let cell = pin_mv * self.divider_num as u32 / self.divider_den.max(1) as u32;
        cell.min(u16::MAX as u32) as u16
    }

    pub fn percent(&self, raw: u16) -> u8 {
        percent_from_mv(self.cell_mv(raw))
    }

    pub fn state(&self, raw: u16) -> CellState {
        cell_state(self.cell_mv(raw))
    }
}
