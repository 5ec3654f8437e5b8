#![allow(dead_code)]

use std::collections::VecDeque;
use std::string::String;
use std::vec::Vec;

use roof_core::config::RoofConfig;
use roof_core::hw::{AdcBus, LimitSwitches, OutputLine, Outputs, SerialChannel};
use roof_core::scheduler::PassSummary;
use roof_core::{Command, MainLoop, SharedControl, TickScheduler, TimerOutcome};

#[derive(Debug, Default)]
pub struct BenchOutputs {
    levels: [bool; 5],
}

impl BenchOutputs {
    pub fn is_enabled(&self, line: OutputLine) -> bool {
        self.levels[line.as_index()]
    }
}

impl Outputs for BenchOutputs {
    fn set(&mut self, line: OutputLine, enabled: bool) {
        self.levels[line.as_index()] = enabled;
    }
}

#[derive(Debug, Default)]
pub struct BenchLimits {
    pub closed: bool,
    pub open: bool,
}

impl LimitSwitches for BenchLimits {
    fn closed_triggered(&mut self) -> bool {
        self.closed
    }

    fn open_triggered(&mut self) -> bool {
        self.open
    }
}

/// MCP3201 stand-in that converts to the same code every time.
#[derive(Debug)]
pub struct ConstantAdc {
    pub code: u16,
    second_byte: bool,
}

impl ConstantAdc {
    pub fn new(code: u16) -> Self {
        Self {
            code,
            second_byte: false,
        }
    }
}

impl AdcBus for ConstantAdc {
    type Error = core::convert::Infallible;

    fn select(&mut self) {
        self.second_byte = false;
    }

    fn exchange(&mut self, _byte: u8) -> Result<u8, Self::Error> {
        let [msb, lsb] = (self.code << 1).to_be_bytes();
        let byte = if self.second_byte { lsb } else { msb };
        self.second_byte = !self.second_byte;
        Ok(byte)
    }

    fn deselect(&mut self) {}
}

#[derive(Debug, Default)]
pub struct BenchSerial {
    pub inbound: VecDeque<u8>,
    pub outbound: Vec<u8>,
}

impl BenchSerial {
    /// Drains transmitted bytes as complete lines.
    pub fn take_lines(&mut self) -> Vec<String> {
        let text = String::from_utf8(std::mem::take(&mut self.outbound)).expect("ascii reports");
        text.split_inclusive("\r\n").map(str::to_owned).collect()
    }
}

impl SerialChannel for BenchSerial {
    type Error = core::convert::Infallible;

    fn try_read(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.inbound.pop_front())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.outbound.extend_from_slice(bytes);
        Ok(())
    }
}

pub type BenchPass = PassSummary<core::convert::Infallible, core::convert::Infallible>;

/// Controller wired to in-memory hardware.
pub struct Bench {
    pub control: SharedControl,
    pub scheduler: TickScheduler<BenchOutputs, BenchLimits>,
    pub main_loop: MainLoop<ConstantAdc>,
    pub serial: BenchSerial,
}

impl Bench {
    pub fn new(config: RoofConfig) -> Self {
        Self::with_adc(config, config.adc_ground_offset.unsigned_abs())
    }

    pub fn with_adc(config: RoofConfig, code: u16) -> Self {
        Self {
            control: SharedControl::new(config),
            scheduler: TickScheduler::new(BenchOutputs::default(), BenchLimits::default()),
            main_loop: MainLoop::new(ConstantAdc::new(code), &config),
            serial: BenchSerial::default(),
        }
    }

    pub fn send(&mut self, command: Command) {
        self.serial.inbound.push_back(command.to_byte());
    }

    pub fn pass(&mut self) -> BenchPass {
        self.main_loop.run_pass(&mut self.serial, &self.control)
    }

    pub fn fire(&mut self) -> TimerOutcome {
        self.scheduler.on_timer(&self.control)
    }

    /// One control second: pass, control firing, pass, blink firing.
    /// Returns the report lines emitted during the second.
    pub fn second(&mut self) -> Vec<String> {
        self.pass();
        assert!(matches!(self.fire(), TimerOutcome::Control(_)));
        self.pass();
        assert_eq!(self.fire(), TimerOutcome::Blink);
        self.serial.take_lines()
    }

    pub fn output(&self, line: OutputLine) -> bool {
        self.scheduler.outputs().is_enabled(line)
    }

    pub fn limits(&mut self) -> &mut BenchLimits {
        self.scheduler.limits_mut()
    }
}
