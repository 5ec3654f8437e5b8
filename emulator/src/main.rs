mod grammar;
mod plant;
mod session;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use crossterm::style::Stylize;

use session::{Reply, Session, SessionOptions};

fn main() -> io::Result<()> {
    let options = parse_options().unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("Usage: roof-emulator [--travel <seconds>] [--transcript <path>]");
        process::exit(2);
    });

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut session = Session::new(&options)?;
    let mut line = String::new();

    writeln!(
        writer,
        "Roof Controller Emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for reply in session.handle_command(trimmed)? {
            write_reply(&mut writer, &reply)?;
        }
    }

    Ok(())
}

fn write_reply(writer: &mut impl Write, reply: &Reply) -> io::Result<()> {
    let text = reply.to_string();
    match reply {
        Reply::Report(_) => writeln!(writer, "{}", text.green()),
        Reply::Event(_) => writeln!(writer, "{}", text.yellow()),
        Reply::Info(_) => writeln!(writer, "{text}"),
        Reply::Error(_) => writeln!(writer, "{}", text.red()),
    }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options() -> Result<SessionOptions, String> {
    let mut options = SessionOptions::default();
    let mut args = env::args().skip(1);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--travel" => {
                let raw = value()?;
                let seconds: f32 = raw
                    .parse()
                    .map_err(|_| format!("Invalid travel time `{raw}`"))?;
                if !(seconds.is_finite() && seconds > 0.0) {
                    return Err(format!("Travel time must be positive, got {seconds}"));
                }
                options.travel_seconds = seconds;
            }
            "--transcript" => options.transcript = Some(PathBuf::from(value()?)),
            other => return Err(format!("Unknown argument `{other}`")),
        }
    }

    Ok(options)
}
