//! Execution contexts of the controller.
//!
//! [`TickScheduler`] runs in the timer interrupt at twice the control rate:
//! every other firing runs the control update, the rest only blink the
//! indicator. [`MainLoop`] runs in thread mode and does everything that may
//! block or take a while.

mod main_loop;

pub use main_loop::{MainLoop, PassSummary};

use crate::control::{SharedControl, TickReport};
use crate::hw::{LimitSwitches, OutputLine, Outputs};

/// What one timer firing did.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TimerOutcome {
    /// Indicator switched off; no control update.
    Blink,
    /// Indicator switched on and the control update ran.
    Control(TickReport),
}

impl TimerOutcome {
    #[must_use]
    pub fn report(&self) -> Option<&TickReport> {
        match self {
            TimerOutcome::Blink => None,
            TimerOutcome::Control(report) => Some(report),
        }
    }
}

/// Owns the output bank and limit switches on behalf of the timer context.
pub struct TickScheduler<O, L> {
    outputs: O,
    limits: L,
    indicator_phase: bool,
}

impl<O, L> TickScheduler<O, L>
where
    O: Outputs,
    L: LimitSwitches,
{
    /// Takes the hardware and drives every output to its idle level.
    pub fn new(mut outputs: O, limits: L) -> Self {
        for line in OutputLine::ALL {
            outputs.disable(line);
        }

        Self {
            outputs,
            limits,
            indicator_phase: false,
        }
    }

    /// Handles one timer firing.
    pub fn on_timer(&mut self, control: &SharedControl) -> TimerOutcome {
        self.indicator_phase = !self.indicator_phase;
        if !self.indicator_phase {
            self.outputs.disable(OutputLine::Indicator);
            return TimerOutcome::Blink;
        }

        self.outputs.enable(OutputLine::Indicator);
        TimerOutcome::Control(control.tick(&mut self.outputs, &mut self.limits))
    }

    pub fn outputs(&self) -> &O {
        &self.outputs
    }

    pub fn outputs_mut(&mut self) -> &mut O {
        &mut self.outputs
    }

    pub fn limits(&self) -> &L {
        &self.limits
    }

    pub fn limits_mut(&mut self) -> &mut L {
        &mut self.limits
    }
}
