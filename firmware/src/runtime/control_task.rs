use defmt::Debug2Format;
use embassy_futures::yield_now;
use roof_core::MainLoop;
use roof_core::protocol::ReportError;

use super::{CONTROL, HOST_PIPES};
use crate::hw::AdcSpi;
use crate::link::LinkError;

pub type RoofMainLoop = MainLoop<AdcSpi<'static>>;

/// Thread-mode loop: sample the supply, drain host commands, emit reports.
#[embassy_executor::task]
pub async fn run(mut main_loop: RoofMainLoop) -> ! {
    let mut link = HOST_PIPES.link();
    let mut adc_healthy = true;

    loop {
        let pass = main_loop.run_pass(&mut link, &CONTROL);

        match pass.voltage {
            Ok(_) if !adc_healthy => {
                defmt::info!("adc: sampling recovered");
                adc_healthy = true;
            }
            Err(error) if adc_healthy => {
                defmt::warn!("adc: {}, keeping last voltage", Debug2Format(&error));
                adc_healthy = false;
            }
            _ => {}
        }

        if let Some(command) = pass.commands.last {
            defmt::debug!(
                "host: last={} applied={} ignored={}",
                command,
                pass.commands.applied,
                pass.commands.ignored
            );
        }
        if let Some(error) = pass.commands.error {
            defmt::warn!("host: read failed: {}", error);
        }

        match pass.report {
            Ok(_) | Err(ReportError::Write(LinkError::Detached)) => {}
            Err(error) => defmt::warn!("report: dropped: {}", error),
        }

        yield_now().await;
    }
}
