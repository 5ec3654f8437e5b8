use embassy_time::{Duration, Ticker};
use roof_core::config::TICK_PERIOD;
use roof_core::{TickReport, TickScheduler, TimerOutcome};

use super::CONTROL;
use crate::hw::{RoofLimits, RoofOutputs};

pub type RoofScheduler = TickScheduler<RoofOutputs<'static>, RoofLimits<'static>>;

fn tick_period() -> Duration {
    let micros = u64::try_from(TICK_PERIOD.as_micros()).unwrap_or(u64::MAX);
    Duration::from_micros(micros)
}

/// Timer context, spawned on the interrupt executor.
#[embassy_executor::task]
pub async fn run(mut scheduler: RoofScheduler) -> ! {
    let mut ticker = Ticker::every(tick_period());

    loop {
        ticker.next().await;
        if let TimerOutcome::Control(report) = scheduler.on_timer(&CONTROL) {
            log_tick(&report);
        }
    }
}

fn log_tick(report: &TickReport) {
    let events = &report.events;
    if events.is_empty() {
        return;
    }

    if events.watchdog_fired {
        defmt::warn!("watchdog: heartbeat expired, forcing aux close");
    }
    if events.siren_warning {
        defmt::warn!("watchdog: siren warning armed");
    }
    if events.close_stopped_at_limit || events.open_stopped_at_limit {
        defmt::info!("motion: stopped at {} limit", report.status);
    }
    defmt::debug!("tick: status={} events={}", report.status, events);
}
