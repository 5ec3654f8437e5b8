//! Host link protocol.
//!
//! The host drives the controller with single-byte commands and receives a
//! fixed-width ASCII status record once per second. Byte values 1-240 are
//! heartbeat pings; the top of the byte range is reserved for commands.

use core::fmt;

use crate::config::MAX_HEARTBEAT_SECONDS;

pub mod decoder;
pub mod report;

pub use decoder::{CommandDecoder, DrainSummary};
pub use report::{HeartbeatDisplay, ReportError, StatusReport, StatusReporter};

/// Decoded host command.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// Clears a fired watchdog, disarms the heartbeat, and cancels any close.
    Clear,
    /// Renews the heartbeat with the given number of seconds.
    Heartbeat(u8),
    Open,
    /// Close on the primary motor.
    Close,
    /// Close with the auxiliary motor engaged.
    AuxClose,
    /// Sounds the siren.
    Siren,
    /// Winds every countdown down to its final second.
    Stop,
    /// Unassigned byte; ignored.
    Reserved(u8),
}

impl Command {
    pub const CLEAR_BYTE: u8 = 0x00;
    pub const OPEN_BYTE: u8 = 0xF1;
    pub const CLOSE_BYTE: u8 = 0xF2;
    pub const AUX_CLOSE_BYTE: u8 = 0xF3;
    pub const SIREN_BYTE: u8 = 0xFE;
    pub const STOP_BYTE: u8 = 0xFF;

    /// Decodes a received byte. Every byte maps to some command.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            Self::CLEAR_BYTE => Command::Clear,
            1..=MAX_HEARTBEAT_SECONDS => Command::Heartbeat(byte),
            Self::OPEN_BYTE => Command::Open,
            Self::CLOSE_BYTE => Command::Close,
            Self::AUX_CLOSE_BYTE => Command::AuxClose,
            Self::SIREN_BYTE => Command::Siren,
            Self::STOP_BYTE => Command::Stop,
            other => Command::Reserved(other),
        }
    }

    /// Encodes the command for transmission from the host side.
    #[must_use]
    pub const fn to_byte(self) -> u8 {
        match self {
            Command::Clear => Self::CLEAR_BYTE,
            Command::Heartbeat(seconds) | Command::Reserved(seconds) => seconds,
            Command::Open => Self::OPEN_BYTE,
            Command::Close => Self::CLOSE_BYTE,
            Command::AuxClose => Self::AUX_CLOSE_BYTE,
            Command::Siren => Self::SIREN_BYTE,
            Command::Stop => Self::STOP_BYTE,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Clear => f.write_str("clear"),
            Command::Heartbeat(seconds) => write!(f, "heartbeat {seconds}"),
            Command::Open => f.write_str("open"),
            Command::Close => f.write_str("close"),
            Command::AuxClose => f.write_str("aux-close"),
            Command::Siren => f.write_str("siren"),
            Command::Stop => f.write_str("stop"),
            Command::Reserved(byte) => write!(f, "reserved(0x{byte:02X})"),
        }
    }
}
