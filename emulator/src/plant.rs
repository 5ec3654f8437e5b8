//! Simulated roof, relays, limit switches and ADC.
//!
//! Position runs from 0 (closed) to the configured travel time, in seconds of
//! motor run. The roof moves while exactly one direction is driven; the aux
//! motor alone is enough to close it.

use std::convert::Infallible;

use roof_core::hw::{AdcBus, LimitSwitches, OutputLine, Outputs};

/// Raw ADC code for a healthy 12.5 V supply.
pub const NOMINAL_ADC_CODE: u16 = 2709;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LimitOverride {
    Open,
    Closed,
    /// Both switches held released.
    Released,
}

/// Relay bank that records level changes for the console.
#[derive(Debug, Default)]
pub struct SimOutputs {
    levels: [bool; 5],
    changes: Vec<(OutputLine, bool)>,
}

impl SimOutputs {
    pub fn is_enabled(&self, line: OutputLine) -> bool {
        self.levels[line.as_index()]
    }

    /// Level changes since the last call, indicator excluded.
    pub fn take_changes(&mut self) -> Vec<(OutputLine, bool)> {
        std::mem::take(&mut self.changes)
    }
}

impl Outputs for SimOutputs {
    fn set(&mut self, line: OutputLine, enabled: bool) {
        let level = &mut self.levels[line.as_index()];
        if *level != enabled && line != OutputLine::Indicator {
            self.changes.push((line, enabled));
        }
        *level = enabled;
    }
}

#[derive(Debug, Default)]
pub struct SimLimits {
    pub closed: bool,
    pub open: bool,
}

impl LimitSwitches for SimLimits {
    fn closed_triggered(&mut self) -> bool {
        self.closed
    }

    fn open_triggered(&mut self) -> bool {
        self.open
    }
}

/// MCP3201 stand-in returning a settable code.
#[derive(Debug)]
pub struct SimAdc {
    pub code: u16,
    low_byte_next: bool,
}

impl SimAdc {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            low_byte_next: false,
        }
    }
}

impl AdcBus for SimAdc {
    type Error = Infallible;

    fn select(&mut self) {
        self.low_byte_next = false;
    }

    fn exchange(&mut self, _byte: u8) -> Result<u8, Self::Error> {
        // Leading bits are undefined on the wire; the sampler must mask them.
        let [msb, lsb] = (self.code << 1).to_be_bytes();
        let byte = if self.low_byte_next { lsb } else { msb | 0xE0 };
        self.low_byte_next = !self.low_byte_next;
        Ok(byte)
    }

    fn deselect(&mut self) {}
}

#[derive(Debug)]
pub struct RoofPlant {
    position: f32,
    travel: f32,
    forced: Option<LimitOverride>,
}

impl RoofPlant {
    /// Starts resting on the closed stop.
    pub fn new(travel_seconds: f32) -> Self {
        Self {
            position: 0.0,
            travel: travel_seconds.max(0.5),
            forced: None,
        }
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn travel(&self) -> f32 {
        self.travel
    }

    pub fn forced(&self) -> Option<LimitOverride> {
        self.forced
    }

    pub fn force(&mut self, forced: Option<LimitOverride>) {
        self.forced = forced;
    }

    /// Moves the roof for `seconds` with the relays as currently driven.
    pub fn advance(&mut self, seconds: f32, outputs: &SimOutputs) {
        let raising = outputs.is_enabled(OutputLine::Open);
        let lowering =
            outputs.is_enabled(OutputLine::Close) || outputs.is_enabled(OutputLine::AuxMotor);

        let delta = match (raising, lowering) {
            (true, false) => seconds,
            (false, true) => -seconds,
            _ => 0.0,
        };
        self.position = (self.position + delta).clamp(0.0, self.travel);
    }

    /// Updates the switch inputs from the roof position or the override.
    pub fn drive_limits(&self, limits: &mut SimLimits) {
        let (closed, open) = match self.forced {
            Some(LimitOverride::Open) => (false, true),
            Some(LimitOverride::Closed) => (true, false),
            Some(LimitOverride::Released) => (false, false),
            None => (self.position <= 0.0, self.position >= self.travel),
        };
        limits.closed = closed;
        limits.open = open;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn driven(lines: &[OutputLine]) -> SimOutputs {
        let mut outputs = SimOutputs::default();
        for line in lines {
            outputs.enable(*line);
        }
        outputs
    }

    #[test]
    fn open_relay_raises_roof_to_open_stop() {
        let mut plant = RoofPlant::new(2.0);
        let outputs = driven(&[OutputLine::Open]);
        let mut limits = SimLimits::default();

        plant.drive_limits(&mut limits);
        assert!(limits.closed);

        for _ in 0..5 {
            plant.advance(0.5, &outputs);
        }
        plant.drive_limits(&mut limits);
        assert!(!limits.closed);
        assert!(limits.open);
        assert!((plant.position() - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn aux_motor_alone_closes() {
        let mut plant = RoofPlant::new(2.0);
        plant.advance(1.5, &driven(&[OutputLine::Open]));
        plant.advance(1.0, &driven(&[OutputLine::AuxMotor]));
        assert!((plant.position() - 0.5).abs() < f32::EPSILON);
    }

    #[test]
    fn opposing_relays_hold_position() {
        let mut plant = RoofPlant::new(2.0);
        plant.advance(1.0, &driven(&[OutputLine::Open]));
        plant.advance(1.0, &driven(&[OutputLine::Open, OutputLine::Close]));
        assert!((plant.position() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn override_wins_over_position() {
        let mut plant = RoofPlant::new(2.0);
        let mut limits = SimLimits::default();
        plant.force(Some(LimitOverride::Released));
        plant.drive_limits(&mut limits);
        assert!(!limits.closed && !limits.open);

        plant.force(None);
        plant.drive_limits(&mut limits);
        assert!(limits.closed);
    }

    #[test]
    fn outputs_record_only_level_changes() {
        let mut outputs = SimOutputs::default();
        outputs.enable(OutputLine::Close);
        outputs.enable(OutputLine::Close);
        outputs.enable(OutputLine::Indicator);
        outputs.disable(OutputLine::Close);

        assert_eq!(
            outputs.take_changes(),
            [(OutputLine::Close, true), (OutputLine::Close, false)]
        );
        assert!(outputs.take_changes().is_empty());
    }
}
