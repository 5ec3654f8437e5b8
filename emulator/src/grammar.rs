//! Console grammar for the emulator prompt.
//!
//! Keywords are case-insensitive; the whole line must match one command.

use std::fmt;

use roof_core::Command;
use roof_core::config::MAX_HEARTBEAT_SECONDS;
use winnow::ascii::{dec_uint, hex_uint, space1};
use winnow::combinator::{alt, opt, preceded};
use winnow::prelude::*;

use crate::plant::LimitOverride;

/// Longest single `tick` request, in seconds.
pub const MAX_TICK_SECONDS: u32 = 3600;

/// Largest code the 12-bit ADC can return.
pub const MAX_ADC_CODE: u16 = 0x0FFF;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    ("open", "open                      - send 0xF1, open the roof"),
    ("close", "close                     - send 0xF2, close on the main motor"),
    ("auxclose", "auxclose                  - send 0xF3, close with the aux motor"),
    ("siren", "siren                     - send 0xFE, sound the siren"),
    ("stop", "stop                      - send 0xFF, stop motion and siren"),
    ("clear", "clear                     - send 0x00, clear a fired watchdog"),
    ("heartbeat", "heartbeat <0-240>         - send a heartbeat ping (0 clears)"),
    ("raw", "raw <byte>                - send any byte, decimal or 0x-prefixed"),
    ("tick", "tick [seconds]            - advance simulated time (default 1)"),
    ("limit", "limit <open|closed|none|auto> - force the limit switches"),
    ("adc", "adc <0-4095>              - set the simulated raw ADC code"),
    ("status", "status                    - show controller and roof state"),
    ("help", "help                      - show this list"),
    ("exit", "exit                      - leave the emulator"),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ConsoleCommand {
    /// Byte queued on the simulated serial link.
    Send(Command),
    /// Seconds of simulated time to run.
    Tick(u32),
    /// `None` returns the switches to the simulated roof.
    Limit(Option<LimitOverride>),
    Adc(u16),
    Status,
    Help,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SyntaxError {
    /// One-based column where parsing stopped.
    pub column: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognised input at column {}", self.column)
    }
}

pub fn parse_console(line: &str) -> Result<ConsoleCommand, SyntaxError> {
    let lowered = line.trim().to_ascii_lowercase();
    console_command
        .parse(lowered.as_str())
        .map_err(|error| SyntaxError {
            column: error.offset() + 1,
        })
}

fn console_command(input: &mut &str) -> ModalResult<ConsoleCommand> {
    alt((
        host_command.map(ConsoleCommand::Send),
        tick,
        limit,
        adc,
        "status".value(ConsoleCommand::Status),
        "help".value(ConsoleCommand::Help),
    ))
    .parse_next(input)
}

fn host_command(input: &mut &str) -> ModalResult<Command> {
    alt((
        "open".value(Command::Open),
        "close".value(Command::Close),
        "auxclose".value(Command::AuxClose),
        "siren".value(Command::Siren),
        "stop".value(Command::Stop),
        "clear".value(Command::Clear),
        heartbeat,
        preceded(("raw", space1), byte_literal).map(Command::from_byte),
    ))
    .parse_next(input)
}

fn heartbeat(input: &mut &str) -> ModalResult<Command> {
    preceded(("heartbeat", space1), dec_uint::<_, u16, _>)
        .verify_map(|seconds| {
            u8::try_from(seconds)
                .ok()
                .filter(|seconds| *seconds <= MAX_HEARTBEAT_SECONDS)
        })
        .map(Command::from_byte)
        .parse_next(input)
}

fn byte_literal(input: &mut &str) -> ModalResult<u8> {
    alt((preceded("0x", hex_uint::<_, u8, _>), dec_uint::<_, u8, _>)).parse_next(input)
}

fn tick(input: &mut &str) -> ModalResult<ConsoleCommand> {
    preceded("tick", opt(preceded(space1, dec_uint::<_, u32, _>)))
        .verify_map(|seconds| {
            let seconds = seconds.unwrap_or(1);
            (1..=MAX_TICK_SECONDS).contains(&seconds).then_some(seconds)
        })
        .map(ConsoleCommand::Tick)
        .parse_next(input)
}

fn limit(input: &mut &str) -> ModalResult<ConsoleCommand> {
    preceded(
        ("limit", space1),
        alt((
            "open".value(Some(LimitOverride::Open)),
            "closed".value(Some(LimitOverride::Closed)),
            "none".value(Some(LimitOverride::Released)),
            "auto".value(None),
        )),
    )
    .map(ConsoleCommand::Limit)
    .parse_next(input)
}

fn adc(input: &mut &str) -> ModalResult<ConsoleCommand> {
    preceded(("adc", space1), dec_uint::<_, u16, _>)
        .verify(|code: &u16| *code <= MAX_ADC_CODE)
        .map(ConsoleCommand::Adc)
        .parse_next(input)
}

pub fn help_lines() -> impl Iterator<Item = &'static str> {
    HELP_TOPICS.iter().map(|(_, line)| *line)
}
