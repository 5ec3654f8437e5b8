//! Drains host bytes into the shared control record.

use super::Command;
use crate::control::{CommandDisposition, SharedControl};
use crate::hw::SerialChannel;

/// Tally of one drain pass.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct DrainSummary<E> {
    /// Commands that changed the control record.
    pub applied: u16,
    /// Reserved bytes and refused commands.
    pub ignored: u16,
    /// Read failure that ended the pass early, if any.
    pub error: Option<E>,
    /// Most recent command decoded during the pass.
    pub last: Option<Command>,
}

impl<E> DrainSummary<E> {
    /// Returns `true` when no bytes were consumed.
    pub fn is_idle(&self) -> bool {
        self.applied == 0 && self.ignored == 0
    }

    fn record(&mut self, command: Command, disposition: CommandDisposition) {
        match disposition {
            CommandDisposition::Applied => self.applied = self.applied.saturating_add(1),
            CommandDisposition::Ignored => self.ignored = self.ignored.saturating_add(1),
        }
        self.last = Some(command);
    }
}

/// Main-loop command decoder.
///
/// Reads until the channel runs dry, applying each byte in its own critical
/// section. A read error ends the pass; the next pass starts afresh.
#[derive(Clone, Copy, Debug, Default)]
pub struct CommandDecoder;

impl CommandDecoder {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    pub fn drain<S>(&mut self, serial: &mut S, control: &SharedControl) -> DrainSummary<S::Error>
    where
        S: SerialChannel,
    {
        let mut summary = DrainSummary {
            applied: 0,
            ignored: 0,
            error: None,
            last: None,
        };

        loop {
            match serial.try_read() {
                Ok(Some(byte)) => {
                    let command = Command::from_byte(byte);
                    let disposition = control.apply_command(command);
                    summary.record(command, disposition);
                }
                Ok(None) => break,
                Err(error) => {
                    summary.error = Some(error);
                    break;
                }
            }
        }

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RoofConfig;
    use heapless::Deque;

    #[derive(Debug, Eq, PartialEq)]
    struct LinkDown;

    struct ScriptedSerial {
        rx: Deque<Result<u8, LinkDown>, 16>,
    }

    impl ScriptedSerial {
        fn new(script: &[Result<u8, LinkDown>]) -> Self {
            let mut rx = Deque::new();
            for step in script {
                let step = match step {
                    Ok(byte) => Ok(*byte),
                    Err(LinkDown) => Err(LinkDown),
                };
                rx.push_back(step).expect("script fits");
            }
            Self { rx }
        }
    }

    impl SerialChannel for ScriptedSerial {
        type Error = LinkDown;

        fn try_read(&mut self) -> Result<Option<u8>, Self::Error> {
            self.rx.pop_front().transpose()
        }

        fn write_all(&mut self, _bytes: &[u8]) -> Result<(), Self::Error> {
            Ok(())
        }
    }

    #[test]
    fn drains_until_channel_is_empty() {
        let control = SharedControl::new(RoofConfig::DEFAULT);
        let mut serial = ScriptedSerial::new(&[Ok(30), Ok(0xF2), Ok(0xF7)]);

        let summary = CommandDecoder::new().drain(&mut serial, &control);

        assert_eq!(summary.applied, 2);
        assert_eq!(summary.ignored, 1);
        assert_eq!(summary.last, Some(Command::Reserved(0xF7)));
        assert!(summary.error.is_none());
        control.inspect(|state| {
            assert_eq!(state.heartbeat_seconds_remaining(), 30);
            assert_eq!(
                state.close_seconds_remaining(),
                RoofConfig::DEFAULT.max_close_seconds
            );
        });
    }

    #[test]
    fn read_error_ends_pass_and_keeps_remaining_bytes() {
        let control = SharedControl::new(RoofConfig::DEFAULT);
        let mut serial = ScriptedSerial::new(&[Ok(0xFE), Err(LinkDown), Ok(0xF1)]);

        let summary = CommandDecoder::new().drain(&mut serial, &control);
        assert_eq!(summary.applied, 1);
        assert_eq!(summary.error, Some(LinkDown));
        control.inspect(|state| assert_eq!(state.open_seconds_remaining(), 0));

        let summary = CommandDecoder::new().drain(&mut serial, &control);
        assert_eq!(summary.last, Some(Command::Open));
        control.inspect(|state| {
            assert_eq!(
                state.open_seconds_remaining(),
                RoofConfig::DEFAULT.max_open_seconds
            );
        });
    }

    #[test]
    fn empty_channel_is_idle() {
        let control = SharedControl::new(RoofConfig::DEFAULT);
        let mut serial = ScriptedSerial::new(&[]);
        let summary = CommandDecoder::new().drain(&mut serial, &control);
        assert!(summary.is_idle());
    }
}
