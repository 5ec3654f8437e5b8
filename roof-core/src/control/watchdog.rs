//! Heartbeat watchdog.
//!
//! The host renews the heartbeat with pings; if the countdown reaches zero
//! the roof is forced closed on the auxiliary motor, since the primary
//! motor's supply may be the reason the host went quiet.

use super::{ControlState, TickEvents};
use crate::hw::{OutputLine, Outputs};

impl ControlState {
    pub(super) fn run_watchdog<O: Outputs>(&mut self, outputs: &mut O, events: &mut TickEvents) {
        if self.heartbeat_triggered || self.heartbeat_seconds_remaining == 0 {
            return;
        }

        // Warn before the forced close. A late ping may still cancel it.
        if self.heartbeat_seconds_remaining == self.config.siren_active_seconds {
            self.siren_seconds_remaining = self.config.siren_active_seconds;
            events.siren_warning = true;
        }

        self.heartbeat_seconds_remaining -= 1;
        if self.heartbeat_seconds_remaining != 0 {
            return;
        }

        outputs.disable(OutputLine::Open);
        self.heartbeat_triggered = true;
        self.close_uses_aux_motor = true;
        self.open_seconds_remaining = 0;
        self.close_seconds_remaining = self.config.max_aux_close_seconds;
        events.watchdog_fired = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoofConfig;
    use crate::hw::fakes::RecordingOutputs;
    use crate::protocol::Command;

    fn run(control: &mut ControlState, outputs: &mut RecordingOutputs) -> TickEvents {
        let mut events = TickEvents::default();
        control.run_watchdog(outputs, &mut events);
        events
    }

    #[test]
    fn idle_watchdog_does_nothing() {
        let mut control = ControlState::new(RoofConfig::DEFAULT);
        let mut outputs = RecordingOutputs::default();
        assert!(run(&mut control, &mut outputs).is_empty());
        assert_eq!(outputs.writes(), 0);
    }

    #[test]
    fn siren_arms_at_lead_time_before_decrement() {
        let mut control = ControlState::new(RoofConfig::DEFAULT);
        let mut outputs = RecordingOutputs::default();
        control.apply(Command::Heartbeat(6));

        assert!(!run(&mut control, &mut outputs).siren_warning);
        assert_eq!(control.siren_seconds_remaining(), 0);

        let events = run(&mut control, &mut outputs);
        assert!(events.siren_warning);
        assert_eq!(control.heartbeat_seconds_remaining(), 4);
        assert_eq!(
            control.siren_seconds_remaining(),
            RoofConfig::DEFAULT.siren_active_seconds
        );
    }

    #[test]
    fn expiry_forces_auxiliary_close() {
        let mut control = ControlState::new(RoofConfig::DEFAULT);
        let mut outputs = RecordingOutputs::default();
        control.apply(Command::Open);
        control.apply(Command::Heartbeat(1));
        outputs.enable(OutputLine::Open);

        let events = run(&mut control, &mut outputs);

        assert!(events.watchdog_fired);
        assert!(control.heartbeat_triggered());
        assert!(!outputs.is_enabled(OutputLine::Open));
        assert_eq!(control.open_seconds_remaining(), 0);
        assert_eq!(
            control.close_seconds_remaining(),
            RoofConfig::DEFAULT.max_aux_close_seconds
        );
        assert!(control.close_uses_aux_motor());
    }

    #[test]
    fn triggered_watchdog_stays_quiet() {
        let mut control = ControlState::new(RoofConfig::DEFAULT);
        let mut outputs = RecordingOutputs::default();
        control.apply(Command::Heartbeat(1));
        run(&mut control, &mut outputs);

        let events = run(&mut control, &mut outputs);
        assert!(events.is_empty());
        assert!(control.heartbeat_triggered());
    }
}
