//! Compile-time tuning for the roof controller.
//!
//! Every value here is baked into the firmware image; there is no runtime
//! configuration protocol. [`RoofConfig`] bundles the constants so tests and
//! the emulator can run the same control logic with shorter travel times.

use core::time::Duration;

/// Seconds the open motor is driven after an open command.
pub const MAX_OPEN_SECONDS: u8 = 180;

/// Seconds the close motor is driven after a primary close command.
pub const MAX_CLOSE_SECONDS: u8 = 180;

/// Seconds the close and auxiliary motors are driven for an auxiliary or forced close.
pub const MAX_AUX_CLOSE_SECONDS: u8 = 240;

/// Seconds the siren sounds when armed. Also the heartbeat lead time for the
/// pre-close warning.
pub const SIREN_ACTIVE_SECONDS: u8 = 5;

/// Largest heartbeat value accepted from the host.
pub const MAX_HEARTBEAT_SECONDS: u8 = 240;

/// Heartbeat value reported once the watchdog has fired.
pub const HEARTBEAT_TRIGGERED_DISPLAY: u8 = 0xFF;

/// Number of ADC conversions averaged per sampling pass.
pub const ADC_SAMPLE_COUNT: usize = 16;

/// Right shift that divides the summed conversions by [`ADC_SAMPLE_COUNT`].
pub const ADC_AVERAGE_SHIFT: u32 = ADC_SAMPLE_COUNT.trailing_zeros();

/// Averaged ADC reading with the input grounded.
pub const ADC_GROUND_OFFSET: i16 = 1979;

/// Volts per ADC unit after the ground offset is removed.
pub const VOLTAGE_GAIN: f32 = 0.017_12;

/// Interval between timer interrupts. Control logic runs on every second one.
pub const TICK_PERIOD: Duration = Duration::from_millis(500);

/// Timing and calibration constants consumed by the control engine.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RoofConfig {
    pub max_open_seconds: u8,
    pub max_close_seconds: u8,
    pub max_aux_close_seconds: u8,
    pub siren_active_seconds: u8,
    pub adc_ground_offset: i16,
    pub voltage_gain: f32,
}

impl RoofConfig {
    /// Values flashed into production firmware.
    pub const DEFAULT: Self = Self {
        max_open_seconds: MAX_OPEN_SECONDS,
        max_close_seconds: MAX_CLOSE_SECONDS,
        max_aux_close_seconds: MAX_AUX_CLOSE_SECONDS,
        siren_active_seconds: SIREN_ACTIVE_SECONDS,
        adc_ground_offset: ADC_GROUND_OFFSET,
        voltage_gain: VOLTAGE_GAIN,
    };

    /// Returns a copy with all three motion windows replaced.
    #[must_use]
    pub const fn with_travel(mut self, open: u8, close: u8, aux_close: u8) -> Self {
        self.max_open_seconds = open;
        self.max_close_seconds = close;
        self.max_aux_close_seconds = aux_close;
        self
    }
}

impl Default for RoofConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn averaging_shift_matches_sample_count() {
        assert_eq!(1usize << ADC_AVERAGE_SHIFT, ADC_SAMPLE_COUNT);
    }

    #[test]
    fn full_scale_sum_fits_accumulator() {
        let max_sample = 0x0FFFu32;
        assert!(max_sample * ADC_SAMPLE_COUNT as u32 <= u32::from(u16::MAX));
    }

    #[test]
    fn with_travel_only_touches_motion_windows() {
        let config = RoofConfig::DEFAULT.with_travel(3, 4, 5);
        assert_eq!(config.max_open_seconds, 3);
        assert_eq!(config.max_close_seconds, 4);
        assert_eq!(config.max_aux_close_seconds, 5);
        assert_eq!(config.siren_active_seconds, SIREN_ACTIVE_SECONDS);
        assert_eq!(config.adc_ground_offset, ADC_GROUND_OFFSET);
    }
}
