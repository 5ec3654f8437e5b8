use super::{ControlState, TickEvents};
use crate::hw::{OutputLine, Outputs};

impl ControlState {
    pub(super) fn run_siren<O: Outputs>(&mut self, outputs: &mut O, events: &mut TickEvents) {
        if self.siren_seconds_remaining == 0 {
            return;
        }

        outputs.enable(OutputLine::Siren);
        self.siren_seconds_remaining -= 1;
        if self.siren_seconds_remaining == 0 {
            outputs.disable(OutputLine::Siren);
            events.siren_finished = true;
        }
    }
}
