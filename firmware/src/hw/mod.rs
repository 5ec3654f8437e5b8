//! Embassy GPIO and SPI adapters for the `roof-core` capability traits.
//!
//! Motor and siren relays are driven through active-low sinks; the indicator
//! LED is active-high. Both limit switches pull their input to ground when the
//! roof rests on them.
//!
//! | Signal | Pin |
//! |---|---|
//! | Open relay | PB3 |
//! | Close relay | PB4 |
//! | Aux motor relay | PB5 |
//! | Siren relay | PB6 |
//! | Indicator LED | PA15 |
//! | Open limit | PB7 |
//! | Closed limit | PB8 |
//! | ADC chip-select | PA4 |
//! | ADC SCK / MISO / MOSI | PA5 / PA6 / PA7 (SPI1) |

use embassy_stm32::gpio::{Input, Level, Output};
use embassy_stm32::mode::Blocking;
use embassy_stm32::spi::{self, Spi};
use embassy_stm32::time::Hertz;
use roof_core::hw::{AdcBus, LimitSwitches, OutputLine, Outputs};

/// MCP3201 SPI clock.
pub const ADC_SPI_FREQUENCY: Hertz = Hertz(250_000);

/// SPI mode 1: clock idles low, data sampled on the falling edge.
#[must_use]
pub fn adc_spi_config() -> spi::Config {
    let mut config = spi::Config::default();
    config.frequency = ADC_SPI_FREQUENCY;
    config.mode = spi::MODE_1;
    config
}

pub struct RoofOutputs<'d> {
    open: Output<'d>,
    close: Output<'d>,
    aux_motor: Output<'d>,
    siren: Output<'d>,
    indicator: Output<'d>,
}

impl<'d> RoofOutputs<'d> {
    pub fn new(
        open: Output<'d>,
        close: Output<'d>,
        aux_motor: Output<'d>,
        siren: Output<'d>,
        indicator: Output<'d>,
    ) -> Self {
        Self {
            open,
            close,
            aux_motor,
            siren,
            indicator,
        }
    }

    fn output_mut(&mut self, line: OutputLine) -> &mut Output<'d> {
        match line {
            OutputLine::Open => &mut self.open,
            OutputLine::Close => &mut self.close,
            OutputLine::AuxMotor => &mut self.aux_motor,
            OutputLine::Siren => &mut self.siren,
            OutputLine::Indicator => &mut self.indicator,
        }
    }
}

impl Outputs for RoofOutputs<'_> {
    fn set(&mut self, line: OutputLine, enabled: bool) {
        let level = match line {
            OutputLine::Indicator => Level::from(enabled),
            _ => Level::from(!enabled),
        };
        self.output_mut(line).set_level(level);
    }
}

pub struct RoofLimits<'d> {
    closed: Input<'d>,
    open: Input<'d>,
}

impl<'d> RoofLimits<'d> {
    pub fn new(closed: Input<'d>, open: Input<'d>) -> Self {
        Self { closed, open }
    }
}

impl LimitSwitches for RoofLimits<'_> {
    fn closed_triggered(&mut self) -> bool {
        self.closed.is_low()
    }

    fn open_triggered(&mut self) -> bool {
        self.open.is_low()
    }
}

/// Blocking SPI link to the MCP3201 with a GPIO chip-select.
pub struct AdcSpi<'d> {
    spi: Spi<'d, Blocking>,
    cs: Output<'d>,
}

impl<'d> AdcSpi<'d> {
    pub fn new(spi: Spi<'d, Blocking>, cs: Output<'d>) -> Self {
        Self { spi, cs }
    }
}

impl AdcBus for AdcSpi<'_> {
    type Error = spi::Error;

    fn select(&mut self) {
        self.cs.set_low();
    }

    fn exchange(&mut self, byte: u8) -> Result<u8, Self::Error> {
        let mut word = [byte];
        self.spi.blocking_transfer_in_place(&mut word)?;
        Ok(word[0])
    }

    fn deselect(&mut self) {
        self.cs.set_high();
    }
}
