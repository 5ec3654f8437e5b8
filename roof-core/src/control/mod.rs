//! Shared control record and the 1 Hz control update.
//!
//! [`ControlState`] holds every value exchanged between the timer interrupt
//! and the main loop. Its fields are private; the interrupt side reaches it
//! through [`ControlState::tick`], the main loop through
//! [`ControlState::apply`], [`ControlState::set_voltage`], and
//! [`ControlState::take_report`]. [`SharedControl`] wraps the record in a
//! `critical_section::Mutex` so each of those operations observes and leaves
//! the record consistent even when the timer fires mid-pass.

use core::cell::RefCell;
use core::fmt;

use critical_section::Mutex;

use crate::config::{MAX_HEARTBEAT_SECONDS, RoofConfig};
use crate::hw::{LimitSwitches, Outputs};
use crate::protocol::Command;
use crate::protocol::report::{HeartbeatDisplay, StatusReport};

mod motion;
mod siren;
mod watchdog;

/// Roof position as derived on the latest control tick.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RoofStatus {
    PartOpen,
    Closed,
    Open,
    Closing,
    Opening,
}

impl RoofStatus {
    /// Digit transmitted in the status report.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            RoofStatus::PartOpen => 0,
            RoofStatus::Closed => 1,
            RoofStatus::Open => 2,
            RoofStatus::Closing => 3,
            RoofStatus::Opening => 4,
        }
    }

    /// Inverse of [`RoofStatus::code`].
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(RoofStatus::PartOpen),
            1 => Some(RoofStatus::Closed),
            2 => Some(RoofStatus::Open),
            3 => Some(RoofStatus::Closing),
            4 => Some(RoofStatus::Opening),
            _ => None,
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            RoofStatus::PartOpen => "part-open",
            RoofStatus::Closed => "closed",
            RoofStatus::Open => "open",
            RoofStatus::Closing => "closing",
            RoofStatus::Opening => "opening",
        }
    }
}

impl fmt::Display for RoofStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Notable transitions observed during a single control tick.
///
/// Purely informational: callers log them, the control logic never reads
/// them back.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[allow(clippy::struct_excessive_bools)]
pub struct TickEvents {
    /// The heartbeat reached zero and a forced auxiliary close began.
    pub watchdog_fired: bool,
    /// The heartbeat passed the siren lead time and re-armed the siren.
    pub siren_warning: bool,
    /// The closed limit cut short an active close countdown.
    pub close_stopped_at_limit: bool,
    /// The open limit cut short an active open countdown.
    pub open_stopped_at_limit: bool,
    /// The close countdown ran out this tick.
    pub close_finished: bool,
    /// The open countdown ran out this tick.
    pub open_finished: bool,
    /// The siren countdown ran out this tick.
    pub siren_finished: bool,
}

impl TickEvents {
    /// Returns `true` when nothing noteworthy happened.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Result of one 1 Hz control update.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TickReport {
    pub status: RoofStatus,
    pub events: TickEvents,
}

/// Whether a decoded command changed the control record.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandDisposition {
    Applied,
    /// Reserved byte, or a ping/open refused because the watchdog has fired.
    Ignored,
}

/// The single record shared between the timer interrupt and the main loop.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlState {
    config: RoofConfig,
    heartbeat_seconds_remaining: u8,
    heartbeat_triggered: bool,
    close_seconds_remaining: u8,
    open_seconds_remaining: u8,
    siren_seconds_remaining: u8,
    close_uses_aux_motor: bool,
    voltage: i16,
    status_report_pending: bool,
    current_status: RoofStatus,
}

impl ControlState {
    /// Power-on state: part open, every countdown idle, watchdog disarmed.
    #[must_use]
    pub const fn new(config: RoofConfig) -> Self {
        Self {
            config,
            heartbeat_seconds_remaining: 0,
            heartbeat_triggered: false,
            close_seconds_remaining: 0,
            open_seconds_remaining: 0,
            siren_seconds_remaining: 0,
            close_uses_aux_motor: false,
            voltage: 0,
            status_report_pending: false,
            current_status: RoofStatus::PartOpen,
        }
    }

    pub fn config(&self) -> &RoofConfig {
        &self.config
    }

    pub fn heartbeat_seconds_remaining(&self) -> u8 {
        self.heartbeat_seconds_remaining
    }

    pub fn heartbeat_triggered(&self) -> bool {
        self.heartbeat_triggered
    }

    pub fn close_seconds_remaining(&self) -> u8 {
        self.close_seconds_remaining
    }

    pub fn open_seconds_remaining(&self) -> u8 {
        self.open_seconds_remaining
    }

    pub fn siren_seconds_remaining(&self) -> u8 {
        self.siren_seconds_remaining
    }

    pub fn close_uses_aux_motor(&self) -> bool {
        self.close_uses_aux_motor
    }

    pub fn voltage(&self) -> i16 {
        self.voltage
    }

    pub fn status_report_pending(&self) -> bool {
        self.status_report_pending
    }

    pub fn current_status(&self) -> RoofStatus {
        self.current_status
    }

    /// Applies a host command. Effects become visible on the next tick.
    pub fn apply(&mut self, command: Command) -> CommandDisposition {
        match command {
            Command::Clear => {
                self.heartbeat_triggered = false;
                self.close_seconds_remaining = 0;
                self.heartbeat_seconds_remaining = 0;
            }
            Command::Heartbeat(seconds) => {
                // A fired watchdog stays fired until an explicit clear.
                if self.heartbeat_triggered || !(1..=MAX_HEARTBEAT_SECONDS).contains(&seconds) {
                    return CommandDisposition::Ignored;
                }
                self.heartbeat_seconds_remaining = seconds;
            }
            Command::Open => {
                if self.heartbeat_triggered {
                    return CommandDisposition::Ignored;
                }
                self.close_seconds_remaining = 0;
                self.open_seconds_remaining = self.config.max_open_seconds;
                self.close_uses_aux_motor = false;
            }
            Command::Close => {
                self.open_seconds_remaining = 0;
                self.close_seconds_remaining = self.config.max_close_seconds;
                self.close_uses_aux_motor = false;
            }
            Command::AuxClose => {
                self.open_seconds_remaining = 0;
                self.close_seconds_remaining = self.config.max_aux_close_seconds;
                self.close_uses_aux_motor = true;
            }
            Command::Siren => {
                self.siren_seconds_remaining = self.config.siren_active_seconds;
            }
            Command::Stop => {
                self.open_seconds_remaining = self.open_seconds_remaining.min(1);
                self.close_seconds_remaining = self.close_seconds_remaining.min(1);
                self.siren_seconds_remaining = self.siren_seconds_remaining.min(1);
            }
            Command::Reserved(_) => return CommandDisposition::Ignored,
        }

        CommandDisposition::Applied
    }

    /// Runs the 1 Hz control update: watchdog, motion, siren, in that order.
    pub fn tick<O, L>(&mut self, outputs: &mut O, limits: &mut L) -> TickReport
    where
        O: Outputs,
        L: LimitSwitches,
    {
        let mut events = TickEvents::default();

        self.run_watchdog(outputs, &mut events);
        let status = self.run_motion(outputs, limits, &mut events);
        self.run_siren(outputs, &mut events);

        self.current_status = status;
        self.status_report_pending = true;

        TickReport { status, events }
    }

    /// Stores the latest calibrated voltage reading.
    pub fn set_voltage(&mut self, voltage: i16) {
        self.voltage = voltage;
    }

    /// Captures the reportable fields without touching the pending flag.
    #[must_use]
    pub fn snapshot(&self) -> StatusReport {
        let heartbeat = if self.heartbeat_triggered {
            HeartbeatDisplay::Triggered
        } else {
            HeartbeatDisplay::Remaining(self.heartbeat_seconds_remaining)
        };

        StatusReport {
            status: self.current_status,
            heartbeat,
            voltage: self.voltage,
        }
    }

    /// Returns a snapshot and clears the pending flag if a report is due.
    pub fn take_report(&mut self) -> Option<StatusReport> {
        if !self.status_report_pending {
            return None;
        }

        self.status_report_pending = false;
        Some(self.snapshot())
    }
}

impl Default for ControlState {
    fn default() -> Self {
        Self::new(RoofConfig::DEFAULT)
    }
}

/// Interrupt-safe owner of the [`ControlState`].
///
/// Every method runs inside one critical section, so a multi-field update or
/// snapshot is never observed half-done by the other execution context.
pub struct SharedControl {
    state: Mutex<RefCell<ControlState>>,
}

impl SharedControl {
    #[must_use]
    pub const fn new(config: RoofConfig) -> Self {
        Self {
            state: Mutex::new(RefCell::new(ControlState::new(config))),
        }
    }

    /// Main-loop entry point for decoded host commands.
    pub fn apply_command(&self, command: Command) -> CommandDisposition {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).apply(command))
    }

    /// Interrupt entry point for the 1 Hz control update.
    pub fn tick<O, L>(&self, outputs: &mut O, limits: &mut L) -> TickReport
    where
        O: Outputs,
        L: LimitSwitches,
    {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).tick(outputs, limits))
    }

    pub fn store_voltage(&self, voltage: i16) {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).set_voltage(voltage));
    }

    /// Takes the pending status report, if any, clearing the pending flag.
    pub fn take_report(&self) -> Option<StatusReport> {
        critical_section::with(|cs| self.state.borrow_ref_mut(cs).take_report())
    }

    #[must_use]
    pub fn snapshot(&self) -> StatusReport {
        critical_section::with(|cs| self.state.borrow_ref(cs).snapshot())
    }

    #[must_use]
    pub fn config(&self) -> RoofConfig {
        critical_section::with(|cs| *self.state.borrow_ref(cs).config())
    }

    /// Runs `inspect` against a consistent view of the record.
    pub fn inspect<R>(&self, inspect: impl FnOnce(&ControlState) -> R) -> R {
        critical_section::with(|cs| inspect(&self.state.borrow_ref(cs)))
    }
}

impl Default for SharedControl {
    fn default() -> Self {
        Self::new(RoofConfig::DEFAULT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ControlState {
        ControlState::new(RoofConfig::DEFAULT)
    }

    #[test]
    fn power_on_defaults_are_safe() {
        let control = state();
        assert_eq!(control.current_status(), RoofStatus::PartOpen);
        assert!(!control.heartbeat_triggered());
        assert_eq!(control.heartbeat_seconds_remaining(), 0);
        assert_eq!(control.open_seconds_remaining(), 0);
        assert_eq!(control.close_seconds_remaining(), 0);
        assert_eq!(control.siren_seconds_remaining(), 0);
        assert!(!control.status_report_pending());
    }

    #[test]
    fn heartbeat_ping_sets_countdown() {
        let mut control = state();
        assert_eq!(control.apply(Command::Heartbeat(42)), CommandDisposition::Applied);
        assert_eq!(control.heartbeat_seconds_remaining(), 42);
    }

    #[test]
    fn out_of_range_heartbeat_is_ignored() {
        let mut control = state();
        assert_eq!(control.apply(Command::Heartbeat(241)), CommandDisposition::Ignored);
        assert_eq!(control.apply(Command::Heartbeat(0)), CommandDisposition::Ignored);
        assert_eq!(control.heartbeat_seconds_remaining(), 0);
    }

    #[test]
    fn close_replaces_pending_open() {
        let mut control = state();
        control.apply(Command::Open);
        control.apply(Command::Close);
        assert_eq!(control.open_seconds_remaining(), 0);
        assert_eq!(control.close_seconds_remaining(), RoofConfig::DEFAULT.max_close_seconds);
        assert!(!control.close_uses_aux_motor());
    }

    #[test]
    fn aux_close_flags_aux_motor() {
        let mut control = state();
        control.apply(Command::AuxClose);
        assert_eq!(
            control.close_seconds_remaining(),
            RoofConfig::DEFAULT.max_aux_close_seconds
        );
        assert!(control.close_uses_aux_motor());

        control.apply(Command::Open);
        assert_eq!(control.close_seconds_remaining(), 0);
        assert!(!control.close_uses_aux_motor());
    }

    #[test]
    fn stop_clamps_countdowns_to_one() {
        let mut control = state();
        control.apply(Command::Close);
        control.apply(Command::Siren);
        control.apply(Command::Stop);
        assert_eq!(control.close_seconds_remaining(), 1);
        assert_eq!(control.siren_seconds_remaining(), 1);
        assert_eq!(control.open_seconds_remaining(), 0);
    }

    #[test]
    fn reserved_bytes_leave_state_untouched() {
        let mut control = state();
        control.apply(Command::Heartbeat(10));
        let before = control.clone();
        for byte in 0xF4..=0xFD {
            assert_eq!(
                control.apply(Command::from_byte(byte)),
                CommandDisposition::Ignored
            );
        }
        assert_eq!(control, before);
    }

    #[test]
    fn take_report_clears_pending_flag() {
        let mut control = state();
        assert!(control.take_report().is_none());

        control.status_report_pending = true;
        control.set_voltage(-12);
        let report = control.take_report().expect("report pending");
        assert_eq!(report.voltage, -12);
        assert_eq!(report.heartbeat, HeartbeatDisplay::Remaining(0));
        assert!(control.take_report().is_none());
    }

    #[test]
    fn snapshot_reports_triggered_heartbeat_as_sentinel() {
        let mut control = state();
        control.heartbeat_triggered = true;
        control.heartbeat_seconds_remaining = 7;
        assert_eq!(control.snapshot().heartbeat, HeartbeatDisplay::Triggered);
    }

    #[test]
    fn status_codes_round_trip() {
        for code in 0..5 {
            let status = RoofStatus::from_code(code).expect("valid code");
            assert_eq!(status.code(), code);
        }
        assert_eq!(RoofStatus::from_code(5), None);
    }
}
