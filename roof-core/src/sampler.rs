//! Supply voltage sampling over the SPI ADC.
//!
//! The converter is a 12-bit MCP3201. Each conversion clocks two bytes; the
//! result straddles them with a null bit in front and a spare bit behind.

use core::fmt;

use crate::config::{ADC_AVERAGE_SHIFT, ADC_SAMPLE_COUNT};
use crate::control::SharedControl;
use crate::hw::AdcBus;

/// Extracts the 12-bit result from the two bytes of one conversion.
#[must_use]
pub const fn decode_conversion(msb: u8, lsb: u8) -> u16 {
    ((((msb & 0x1F) as u16) << 8) | lsb as u16) >> 1
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleError<E> {
    /// An SPI exchange failed; the pass was abandoned.
    Bus(E),
}

impl<E: fmt::Debug> fmt::Display for SampleError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SampleError::Bus(error) => write!(f, "adc exchange failed: {error:?}"),
        }
    }
}

/// Averages a burst of conversions into a ground-corrected reading.
pub struct VoltageSampler<B> {
    bus: B,
    ground_offset: i16,
}

impl<B: AdcBus> VoltageSampler<B> {
    pub fn new(bus: B, ground_offset: i16) -> Self {
        Self { bus, ground_offset }
    }

    fn convert(&mut self) -> Result<u16, SampleError<B::Error>> {
        self.bus.select();
        let exchanged = self
            .bus
            .exchange(0x00)
            .and_then(|msb| self.bus.exchange(0x00).map(|lsb| (msb, lsb)));
        self.bus.deselect();

        let (msb, lsb) = exchanged.map_err(SampleError::Bus)?;
        Ok(decode_conversion(msb, lsb))
    }

    /// Mean of [`ADC_SAMPLE_COUNT`] raw conversions.
    ///
    /// # Errors
    ///
    /// Returns the first bus failure; chip-select is released regardless.
    pub fn read_average(&mut self) -> Result<u16, SampleError<B::Error>> {
        let mut sum: u16 = 0;
        for _ in 0..ADC_SAMPLE_COUNT {
            sum += self.convert()?;
        }
        Ok(sum >> ADC_AVERAGE_SHIFT)
    }

    /// Averaged reading with the ground offset removed.
    ///
    /// # Errors
    ///
    /// See [`VoltageSampler::read_average`].
    pub fn sample(&mut self) -> Result<i16, SampleError<B::Error>> {
        let average = self.read_average()?;
        // A 12-bit average always fits in i16.
        #[allow(clippy::cast_possible_wrap)]
        let average = average as i16;
        Ok(average - self.ground_offset)
    }

    /// Samples and publishes the result. On failure the previous reading stays.
    ///
    /// # Errors
    ///
    /// See [`VoltageSampler::read_average`].
    pub fn sample_into(&mut self, control: &SharedControl) -> Result<i16, SampleError<B::Error>> {
        let voltage = self.sample()?;
        control.store_voltage(voltage);
        Ok(voltage)
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }
}
