//! Roof motion state machine.
//!
//! Limit switches are read first and always win over the countdowns. A close
//! countdown is serviced before an open one.

use super::{ControlState, RoofStatus, TickEvents};
use crate::hw::{LimitSwitches, OutputLine, Outputs};

impl ControlState {
    pub(super) fn run_motion<O, L>(
        &mut self,
        outputs: &mut O,
        limits: &mut L,
        events: &mut TickEvents,
    ) -> RoofStatus
    where
        O: Outputs,
        L: LimitSwitches,
    {
        let mut status = RoofStatus::PartOpen;

        if limits.closed_triggered() {
            outputs.disable(OutputLine::Close);
            outputs.disable(OutputLine::AuxMotor);
            status = RoofStatus::Closed;
            events.close_stopped_at_limit = self.close_seconds_remaining > 0;
            self.close_seconds_remaining = 0;
            self.close_uses_aux_motor = false;
        } else if limits.open_triggered() {
            outputs.disable(OutputLine::Open);
            status = RoofStatus::Open;
            events.open_stopped_at_limit = self.open_seconds_remaining > 0;
            self.open_seconds_remaining = 0;
        }

        if self.close_seconds_remaining > 0 {
            outputs.enable(OutputLine::Close);
            if self.close_uses_aux_motor {
                outputs.enable(OutputLine::AuxMotor);
            }

            status = RoofStatus::Closing;
            self.close_seconds_remaining -= 1;
            if self.close_seconds_remaining == 0 {
                outputs.disable(OutputLine::Close);
                outputs.disable(OutputLine::AuxMotor);
                self.close_uses_aux_motor = false;
                events.close_finished = true;
            }
        } else if self.open_seconds_remaining > 0 {
            outputs.enable(OutputLine::Open);
            status = RoofStatus::Opening;
            self.open_seconds_remaining -= 1;
            if self.open_seconds_remaining == 0 {
                outputs.disable(OutputLine::Open);
                events.open_finished = true;
            }
        }

        status
    }
}
