//! Status report framing.
//!
//! One record per control tick, pushed to the host as
//! `<status>,<heartbeat>,<volts>\r\n`: a single status digit, the heartbeat
//! zero-padded to three digits, and the calibrated voltage with an explicit
//! sign, two decimals, and a minimum width of six characters. The parser half
//! lives here too so the emulator and host-side tests decode exactly what the
//! firmware emits.

use core::fmt::{self, Write as _};

use heapless::String;
use winnow::prelude::*;
use winnow::token::{one_of, take_while};

use crate::config::HEARTBEAT_TRIGGERED_DISPLAY;
use crate::control::{RoofStatus, SharedControl};
use crate::hw::SerialChannel;

/// Length of a record whose voltage fits in six characters.
pub const REPORT_LEN: usize = 14;

/// Owned buffer for one rendered record.
pub type ReportLine = String<16>;

/// Heartbeat field of a status report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HeartbeatDisplay {
    /// Seconds left before the watchdog fires; zero when disarmed.
    Remaining(u8),
    /// The watchdog has fired and awaits a clear.
    Triggered,
}

impl HeartbeatDisplay {
    #[must_use]
    pub const fn to_wire(self) -> u8 {
        match self {
            HeartbeatDisplay::Remaining(seconds) => seconds,
            HeartbeatDisplay::Triggered => HEARTBEAT_TRIGGERED_DISPLAY,
        }
    }

    #[must_use]
    pub const fn from_wire(value: u8) -> Self {
        if value == HEARTBEAT_TRIGGERED_DISPLAY {
            HeartbeatDisplay::Triggered
        } else {
            HeartbeatDisplay::Remaining(value)
        }
    }
}

/// Values captured from the control record for one report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StatusReport {
    pub status: RoofStatus,
    pub heartbeat: HeartbeatDisplay,
    /// Offset-corrected ADC average, before calibration.
    pub voltage: i16,
}

impl StatusReport {
    #[must_use]
    pub fn volts(&self, gain: f32) -> f32 {
        f32::from(self.voltage) * gain
    }

    /// Renders the wire record.
    ///
    /// # Errors
    ///
    /// Returns [`fmt::Error`] if the record outgrows [`ReportLine`].
    pub fn render(&self, gain: f32) -> Result<ReportLine, fmt::Error> {
        let mut line = ReportLine::new();
        write!(
            line,
            "{},{:03},{:+06.2}\r\n",
            self.status.code(),
            self.heartbeat.to_wire(),
            self.volts(gain)
        )?;
        Ok(line)
    }
}

/// A record decoded from the wire.
///
/// The voltage is kept in hundredths of a volt, exactly as transmitted.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ReportRecord {
    pub status: RoofStatus,
    pub heartbeat: HeartbeatDisplay,
    pub centivolts: i32,
}

impl ReportRecord {
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn volts(&self) -> f32 {
        self.centivolts as f32 / 100.0
    }
}

/// Failure to decode a status record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ParseReportError {
    /// Byte offset where decoding stopped.
    pub offset: usize,
}

impl fmt::Display for ParseReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "malformed status record at byte {}", self.offset)
    }
}

/// Decodes one complete record, terminator included.
///
/// # Errors
///
/// Returns [`ParseReportError`] when `input` is not exactly one well-formed
/// record.
pub fn parse_record(input: &str) -> Result<ReportRecord, ParseReportError> {
    record
        .parse(input)
        .map_err(|error| ParseReportError {
            offset: error.offset(),
        })
}

fn record(input: &mut &str) -> ModalResult<ReportRecord> {
    (status_digit, ',', heartbeat_field, ',', centivolts_field, "\r\n")
        .map(|(status, _, heartbeat, _, centivolts, _)| ReportRecord {
            status,
            heartbeat,
            centivolts,
        })
        .parse_next(input)
}

fn status_digit(input: &mut &str) -> ModalResult<RoofStatus> {
    one_of('0'..='9')
        .verify_map(|digit: char| {
            let code = u8::try_from(digit.to_digit(10)?).ok()?;
            RoofStatus::from_code(code)
        })
        .parse_next(input)
}

fn heartbeat_field(input: &mut &str) -> ModalResult<HeartbeatDisplay> {
    take_while(3, '0'..='9')
        .verify_map(|digits: &str| digits.parse::<u8>().ok())
        .map(HeartbeatDisplay::from_wire)
        .parse_next(input)
}

fn centivolts_field(input: &mut &str) -> ModalResult<i32> {
    (
        one_of(['+', '-']),
        take_while(2..=3, '0'..='9'),
        '.',
        take_while(2, '0'..='9'),
    )
        .verify_map(|(sign, whole, _, fraction): (char, &str, char, &str)| {
            let magnitude = whole.parse::<i32>().ok()? * 100 + fraction.parse::<i32>().ok()?;
            Some(if sign == '-' { -magnitude } else { magnitude })
        })
        .parse_next(input)
}

/// Failure while emitting a status report.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ReportError<E> {
    /// The record did not fit the line buffer.
    Format,
    /// The serial channel refused the bytes. The report is not retried.
    Write(E),
}

impl<E: fmt::Debug> fmt::Display for ReportError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::Format => f.write_str("status record overflowed its buffer"),
            ReportError::Write(error) => write!(f, "status write failed: {error:?}"),
        }
    }
}

/// Main-loop stage that emits a report whenever a tick has produced one.
#[derive(Clone, Copy, Debug)]
pub struct StatusReporter {
    gain: f32,
}

impl StatusReporter {
    #[must_use]
    pub const fn new(gain: f32) -> Self {
        Self { gain }
    }

    /// Sends the pending report, if any.
    ///
    /// The pending flag is cleared before the write, so a failed write drops
    /// that report and the next tick produces a fresh one.
    ///
    /// # Errors
    ///
    /// Returns [`ReportError`] when rendering or writing fails.
    pub fn poll<S>(
        &mut self,
        serial: &mut S,
        control: &SharedControl,
    ) -> Result<Option<StatusReport>, ReportError<S::Error>>
    where
        S: SerialChannel,
    {
        let Some(report) = control.take_report() else {
            return Ok(None);
        };

        let line = report.render(self.gain).map_err(|_| ReportError::Format)?;
        serial
            .write_all(line.as_bytes())
            .map_err(ReportError::Write)?;
        Ok(Some(report))
    }
}
