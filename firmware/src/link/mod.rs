//! Byte pipes between the USB CDC task and the control loop.
//!
//! The USB task owns the endpoints and awaits on them; the control loop only
//! ever polls. Two bounded pipes sit in between so neither side waits on the
//! other. Reports written while no host holds DTR are refused outright.

#![cfg_attr(not(target_os = "none"), allow(dead_code))]

use core::fmt;

use embassy_sync::pipe::{Pipe, TryReadError, TryWriteError};
use portable_atomic::{AtomicBool, Ordering};
use roof_core::hw::SerialChannel;

#[cfg(not(target_os = "none"))]
use embassy_sync::blocking_mutex::raw::NoopRawMutex;
#[cfg(target_os = "none")]
use embassy_sync::blocking_mutex::raw::ThreadModeRawMutex;

#[cfg(target_os = "none")]
type LinkMutex = ThreadModeRawMutex;
#[cfg(not(target_os = "none"))]
type LinkMutex = NoopRawMutex;

/// Host-to-controller command buffer. Commands are single bytes and drained
/// every pass, so one USB packet's worth is plenty.
pub const COMMAND_PIPE_LEN: usize = 64;

/// Controller-to-host report buffer.
pub const REPORT_PIPE_LEN: usize = 128;

pub type CommandPipe = Pipe<LinkMutex, COMMAND_PIPE_LEN>;
pub type ReportPipe = Pipe<LinkMutex, REPORT_PIPE_LEN>;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[cfg_attr(target_os = "none", derive(defmt::Format))]
pub enum LinkError {
    /// No host has the port open.
    Detached,
    /// The report pipe lacks room for the whole record.
    Overflow,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkError::Detached => f.write_str("host detached"),
            LinkError::Overflow => f.write_str("report pipe full"),
        }
    }
}

/// Both pipes plus the host attachment flag.
pub struct HostPipes {
    commands: CommandPipe,
    reports: ReportPipe,
    attached: AtomicBool,
}

impl HostPipes {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            commands: Pipe::new(),
            reports: Pipe::new(),
            attached: AtomicBool::new(false),
        }
    }

    pub fn commands(&self) -> &CommandPipe {
        &self.commands
    }

    pub fn reports(&self) -> &ReportPipe {
        &self.reports
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::Acquire)
    }

    /// Records a DTR transition. Detaching discards queued reports so a
    /// reconnecting host never sees stale records.
    pub fn set_attached(&self, attached: bool) {
        self.attached.store(attached, Ordering::Release);
        if !attached {
            self.reports.clear();
        }
    }

    /// Control-loop view of the pipes.
    pub fn link(&self) -> HostLink<'_> {
        HostLink { pipes: self }
    }
}

impl Default for HostPipes {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking [`SerialChannel`] over [`HostPipes`].
pub struct HostLink<'a> {
    pipes: &'a HostPipes,
}

impl SerialChannel for HostLink<'_> {
    type Error = LinkError;

    fn try_read(&mut self) -> Result<Option<u8>, Self::Error> {
        let mut byte = [0u8; 1];
        match self.pipes.commands.try_read(&mut byte) {
            Ok(0) | Err(TryReadError::Empty) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
        }
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        if !self.pipes.is_attached() {
            return Err(LinkError::Detached);
        }
        // Records are all-or-nothing; a partial line would corrupt framing.
        if self.pipes.reports.free_capacity() < bytes.len() {
            return Err(LinkError::Overflow);
        }

        let mut pending = bytes;
        while !pending.is_empty() {
            match self.pipes.reports.try_write(pending) {
                Ok(written) => pending = &pending[written..],
                Err(TryWriteError::Full) => return Err(LinkError::Overflow),
            }
        }
        Ok(())
    }
}
