//! Hardware capabilities the control engine depends on.
//!
//! The firmware implements these over Embassy GPIO, SPI, and USB pipes; the
//! emulator and the test suites implement them with in-memory fakes. Nothing
//! in this crate touches registers directly.

/// Actuator and indicator lines driven by the tick scheduler.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutputLine {
    Open,
    Close,
    AuxMotor,
    Siren,
    Indicator,
}

impl OutputLine {
    /// Every output line in wiring order.
    pub const ALL: [OutputLine; 5] = [
        OutputLine::Open,
        OutputLine::Close,
        OutputLine::AuxMotor,
        OutputLine::Siren,
        OutputLine::Indicator,
    ];

    /// Deterministic index for lookups into [`OutputLine::ALL`].
    #[must_use]
    pub const fn as_index(self) -> usize {
        match self {
            OutputLine::Open => 0,
            OutputLine::Close => 1,
            OutputLine::AuxMotor => 2,
            OutputLine::Siren => 3,
            OutputLine::Indicator => 4,
        }
    }

    /// Short label used in logs and the emulator console.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            OutputLine::Open => "open",
            OutputLine::Close => "close",
            OutputLine::AuxMotor => "aux",
            OutputLine::Siren => "siren",
            OutputLine::Indicator => "led",
        }
    }
}

/// Bank of digital outputs. Polarity is the implementor's concern.
pub trait Outputs {
    /// Drives `line` to its active (`true`) or idle (`false`) state.
    fn set(&mut self, line: OutputLine, enabled: bool);

    fn enable(&mut self, line: OutputLine) {
        self.set(line, true);
    }

    fn disable(&mut self, line: OutputLine) {
        self.set(line, false);
    }
}

/// Roof end-stop sensors.
pub trait LimitSwitches {
    /// Returns `true` while the roof sits on the fully-closed stop.
    fn closed_triggered(&mut self) -> bool;

    /// Returns `true` while the roof sits on the fully-open stop.
    fn open_triggered(&mut self) -> bool;
}

/// Chip-selected SPI link to the voltage ADC.
///
/// Exchanges block until the byte has been clocked; callers must stay out of
/// the interrupt context.
pub trait AdcBus {
    type Error;

    /// Asserts chip-select.
    fn select(&mut self);

    /// Clocks out `byte` and returns the byte clocked in.
    fn exchange(&mut self, byte: u8) -> Result<u8, Self::Error>;

    /// Deasserts chip-select.
    fn deselect(&mut self);
}

/// Byte link to the host computer.
pub trait SerialChannel {
    type Error;

    /// Returns the next received byte, or `Ok(None)` when nothing is waiting.
    /// Never blocks.
    fn try_read(&mut self) -> Result<Option<u8>, Self::Error>;

    /// Queues `bytes` for transmission.
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}
