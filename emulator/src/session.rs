use std::collections::VecDeque;
use std::convert::Infallible;
use std::fmt;
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant as HostInstant};

use roof_core::config::{RoofConfig, TICK_PERIOD};
use roof_core::hw::{OutputLine, SerialChannel};
use roof_core::{Command, MainLoop, SharedControl, TickEvents, TickScheduler, TimerOutcome};

use crate::grammar::{self, ConsoleCommand};
use crate::plant::{LimitOverride, NOMINAL_ADC_CODE, RoofPlant, SimAdc, SimLimits, SimOutputs};

/// Default simulated travel time, end to end.
pub const DEFAULT_TRAVEL_SECONDS: f32 = 120.0;

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub config: RoofConfig,
    pub travel_seconds: f32,
    pub transcript: Option<PathBuf>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            config: RoofConfig::DEFAULT,
            travel_seconds: DEFAULT_TRAVEL_SECONDS,
            transcript: None,
        }
    }
}

/// One line of console output.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Reply {
    /// A status record exactly as the controller sent it, terminator removed.
    Report(String),
    /// Something the controller did on its own.
    Event(String),
    Info(String),
    Error(String),
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Report(line) => write!(f, "RPT {line}"),
            Reply::Event(line) => write!(f, "EVT {line}"),
            Reply::Info(line) => f.write_str(line),
            Reply::Error(line) => write!(f, "ERR {line}"),
        }
    }
}

type SimScheduler = TickScheduler<SimOutputs, SimLimits>;

pub struct Session {
    control: SharedControl,
    scheduler: SimScheduler,
    main_loop: MainLoop<SimAdc>,
    serial: LoopbackSerial,
    plant: RoofPlant,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
    simulated: Duration,
}

impl Session {
    pub fn new(options: &SessionOptions) -> io::Result<Self> {
        let transcript = options
            .transcript
            .as_deref()
            .map(TranscriptLogger::new)
            .transpose()?;

        let config = options.config;
        let mut session = Self {
            control: SharedControl::new(config),
            scheduler: TickScheduler::new(SimOutputs::default(), SimLimits::default()),
            main_loop: MainLoop::new(SimAdc::new(NOMINAL_ADC_CODE), &config),
            serial: LoopbackSerial::default(),
            plant: RoofPlant::new(options.travel_seconds),
            transcript,
            started_at: HostInstant::now(),
            simulated: Duration::ZERO,
        };
        session.scheduler.outputs_mut().take_changes();
        session.plant.drive_limits(session.scheduler.limits_mut());
        Ok(session)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<Reply>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(elapsed, TranscriptRole::Host, trimmed)?;
        }

        let replies = match grammar::parse_console(trimmed) {
            Ok(command) => self.execute(command),
            Err(error) => vec![Reply::Error(format!("syntax: {error}"))],
        };

        if let Some(transcript) = self.transcript.as_mut() {
            for reply in &replies {
                transcript.append_line(elapsed, TranscriptRole::Emulator, &reply.to_string())?;
            }
        }
        Ok(replies)
    }

    fn execute(&mut self, command: ConsoleCommand) -> Vec<Reply> {
        match command {
            ConsoleCommand::Send(command) => self.send(command),
            ConsoleCommand::Tick(seconds) => self.advance(seconds),
            ConsoleCommand::Limit(forced) => {
                self.plant.force(forced);
                self.plant.drive_limits(self.scheduler.limits_mut());
                vec![Reply::Info(format!("limits: {}", describe_override(forced)))]
            }
            ConsoleCommand::Adc(code) => {
                self.main_loop.sampler_mut().bus_mut().code = code;
                vec![Reply::Info(format!("adc: raw code {code}"))]
            }
            ConsoleCommand::Status => self.status(),
            ConsoleCommand::Help => grammar::help_lines()
                .map(|line| Reply::Info(line.to_string()))
                .collect(),
        }
    }

    fn send(&mut self, command: Command) -> Vec<Reply> {
        self.serial.inbound.push_back(command.to_byte());
        let pass = self.main_loop.run_pass(&mut self.serial, &self.control);

        let outcome = if pass.commands.applied > 0 {
            "applied"
        } else {
            "ignored"
        };
        let mut replies = vec![Reply::Info(format!(
            "sent 0x{:02X} ({command}): {outcome}",
            command.to_byte()
        ))];
        replies.extend(self.serial.take_reports());
        replies
    }

    fn advance(&mut self, seconds: u32) -> Vec<Reply> {
        let mut replies = Vec::new();
        let step = TICK_PERIOD.as_secs_f32();

        for _ in 0..seconds * 2 {
            self.plant.drive_limits(self.scheduler.limits_mut());
            let outcome = self.scheduler.on_timer(&self.control);
            self.simulated += TICK_PERIOD;

            for (line, enabled) in self.scheduler.outputs_mut().take_changes() {
                let level = if enabled { "on" } else { "off" };
                replies.push(Reply::Event(format!("{} {level}", line.label())));
            }
            if let TimerOutcome::Control(report) = outcome {
                replies.extend(describe_events(&report.events));
            }

            self.plant.advance(step, self.scheduler.outputs());
            // The pass always succeeds against simulated hardware.
            let _ = self.main_loop.run_pass(&mut self.serial, &self.control);
            replies.extend(self.serial.take_reports());
        }

        replies
    }

    fn status(&self) -> Vec<Reply> {
        let snapshot = self.control.snapshot();
        let config = self.control.config();
        let mut replies = self.control.inspect(|state| {
            vec![
                Reply::Info(format!(
                    "status={} heartbeat={} triggered={}",
                    snapshot.status,
                    state.heartbeat_seconds_remaining(),
                    state.heartbeat_triggered()
                )),
                Reply::Info(format!(
                    "open={}s close={}s aux={} siren={}s",
                    state.open_seconds_remaining(),
                    state.close_seconds_remaining(),
                    state.close_uses_aux_motor(),
                    state.siren_seconds_remaining()
                )),
                Reply::Info(format!(
                    "voltage={:+.2} V (adc offset {})",
                    snapshot.volts(config.voltage_gain),
                    snapshot.voltage
                )),
            ]
        });

        let outputs = self.scheduler.outputs();
        let driven: Vec<&str> = OutputLine::ALL
            .into_iter()
            .filter(|line| *line != OutputLine::Indicator && outputs.is_enabled(*line))
            .map(OutputLine::label)
            .collect();
        replies.push(Reply::Info(format!(
            "outputs=[{}] roof={:.1}/{:.1}s limits={} t={:.1}s",
            driven.join(","),
            self.plant.position(),
            self.plant.travel(),
            describe_override(self.plant.forced()),
            self.simulated.as_secs_f32()
        )));
        replies
    }
}

fn describe_events(events: &TickEvents) -> Vec<Reply> {
    let notes = [
        (events.siren_warning, "watchdog: siren warning"),
        (events.watchdog_fired, "watchdog: heartbeat expired, forcing aux close"),
        (events.close_stopped_at_limit, "motion: close stopped at closed limit"),
        (events.open_stopped_at_limit, "motion: open stopped at open limit"),
        (events.close_finished, "motion: close window elapsed"),
        (events.open_finished, "motion: open window elapsed"),
        (events.siren_finished, "siren: finished"),
    ];
    notes
        .into_iter()
        .filter(|(happened, _)| *happened)
        .map(|(_, note)| Reply::Event(note.to_string()))
        .collect()
}

fn describe_override(forced: Option<LimitOverride>) -> &'static str {
    match forced {
        None => "auto",
        Some(LimitOverride::Open) => "forced open",
        Some(LimitOverride::Closed) => "forced closed",
        Some(LimitOverride::Released) => "forced released",
    }
}

/// In-memory serial link standing in for the USB port.
#[derive(Debug, Default)]
struct LoopbackSerial {
    inbound: VecDeque<u8>,
    outbound: Vec<u8>,
}

impl LoopbackSerial {
    fn take_reports(&mut self) -> Vec<Reply> {
        let bytes = std::mem::take(&mut self.outbound);
        String::from_utf8_lossy(&bytes)
            .split_terminator("\r\n")
            .map(|line| Reply::Report(line.to_string()))
            .collect()
    }
}

impl SerialChannel for LoopbackSerial {
    type Error = Infallible;

    fn try_read(&mut self) -> Result<Option<u8>, Self::Error> {
        Ok(self.inbound.pop_front())
    }

    fn write_all(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        self.outbound.extend_from_slice(bytes);
        Ok(())
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };

        logger.write_header()?;
        Ok(logger)
    }

    fn write_header(&mut self) -> io::Result<()> {
        writeln!(self.writer, "# Roof controller emulator transcript")?;
        writeln!(
            self.writer,
            "# Timestamps are milliseconds since session start"
        )?;
        writeln!(self.writer)?;
        self.writer.flush()
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(travel_seconds: f32) -> Session {
        let options = SessionOptions {
            config: RoofConfig::DEFAULT.with_travel(6, 6, 8),
            travel_seconds,
            transcript: None,
        };
        Session::new(&options).expect("session without transcript")
    }

    fn reports(replies: &[Reply]) -> Vec<&str> {
        replies
            .iter()
            .filter_map(|reply| match reply {
                Reply::Report(line) => Some(line.as_str()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn one_report_per_simulated_second() {
        let mut session = session(4.0);
        let replies = session.handle_command("tick 3").expect("no io");
        let lines = reports(&replies);
        assert_eq!(lines.len(), 3);
        assert!(lines.iter().all(|line| line.starts_with("1,000,+12.50")));
    }

    #[test]
    fn open_runs_roof_onto_open_limit() {
        let mut session = session(4.0);
        session.handle_command("open").expect("no io");

        let replies = session.handle_command("tick 6").expect("no io");
        let lines = reports(&replies);
        assert!(lines[0].starts_with("4,"));
        assert!(lines[5].starts_with("2,"));
        assert!(replies.contains(&Reply::Event(
            "motion: open stopped at open limit".to_string()
        )));
    }

    #[test]
    fn expired_heartbeat_closes_roof_with_aux_motor() {
        let mut session = session(4.0);
        session.handle_command("limit none").expect("no io");
        session.handle_command("heartbeat 2").expect("no io");

        let replies = session.handle_command("tick 2").expect("no io");
        assert!(replies.contains(&Reply::Event(
            "watchdog: heartbeat expired, forcing aux close".to_string()
        )));
        assert!(replies.contains(&Reply::Event("aux on".to_string())));
        assert!(reports(&replies)[1].starts_with("3,255,"));
    }

    #[test]
    fn ignored_commands_are_flagged() {
        let mut session = session(4.0);
        let replies = session.handle_command("raw 0xF5").expect("no io");
        assert_eq!(
            replies,
            [Reply::Info("sent 0xF5 (reserved(0xF5)): ignored".to_string())]
        );
    }

    #[test]
    fn syntax_errors_do_not_reach_the_controller() {
        let mut session = session(4.0);
        let replies = session.handle_command("fly away").expect("no io");
        assert!(matches!(replies.as_slice(), [Reply::Error(_)]));
    }
}
