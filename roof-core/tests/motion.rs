mod support;

use roof_core::config::RoofConfig;
use roof_core::hw::OutputLine;
use roof_core::{Command, RoofStatus};
use support::Bench;

fn status(bench: &Bench) -> RoofStatus {
    bench.control.inspect(|state| state.current_status())
}

#[test]
fn closed_limit_stops_close_on_the_same_tick_at_any_countdown() {
    for ticks_before_limit in [0u8, 1, 17, 178] {
        let mut bench = Bench::new(RoofConfig::DEFAULT);
        bench.send(Command::AuxClose);
        for _ in 0..ticks_before_limit {
            bench.second();
        }

        bench.limits().closed = true;
        let lines = bench.second();

        assert_eq!(status(&bench), RoofStatus::Closed);
        assert_eq!(bench.control.inspect(|state| state.close_seconds_remaining()), 0);
        assert!(!bench.output(OutputLine::Close));
        assert!(!bench.output(OutputLine::AuxMotor));
        assert_eq!(lines, ["1,000,+00.00\r\n"]);
    }
}

#[test]
fn open_limit_stops_open() {
    let mut bench = Bench::new(RoofConfig::DEFAULT);
    bench.send(Command::Open);
    bench.second();
    bench.second();
    assert!(bench.output(OutputLine::Open));

    bench.limits().open = true;
    bench.second();

    assert_eq!(status(&bench), RoofStatus::Open);
    assert!(!bench.output(OutputLine::Open));
    assert_eq!(bench.control.inspect(|state| state.open_seconds_remaining()), 0);
}

#[test]
fn stop_lets_the_motor_run_one_more_tick() {
    let mut bench = Bench::new(RoofConfig::DEFAULT.with_travel(20, 20, 20));
    bench.send(Command::Close);
    for _ in 0..10 {
        bench.second();
    }
    assert_eq!(bench.control.inspect(|state| state.close_seconds_remaining()), 10);

    bench.send(Command::Stop);
    bench.pass();
    assert_eq!(bench.control.inspect(|state| state.close_seconds_remaining()), 1);
    assert!(bench.output(OutputLine::Close));

    bench.second();
    assert!(!bench.output(OutputLine::Close));
    assert_eq!(status(&bench), RoofStatus::Closing);

    bench.second();
    assert_eq!(status(&bench), RoofStatus::PartOpen);
}

#[test]
fn reversing_direction_switches_motors_next_tick() {
    let mut bench = Bench::new(RoofConfig::DEFAULT);
    bench.send(Command::Open);
    bench.second();
    assert!(bench.output(OutputLine::Open));

    bench.send(Command::Close);
    bench.second();

    assert_eq!(status(&bench), RoofStatus::Closing);
    assert!(bench.output(OutputLine::Close));
    assert_eq!(bench.control.inspect(|state| state.open_seconds_remaining()), 0);
}
