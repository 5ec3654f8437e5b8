use crate::config::RoofConfig;
use crate::control::SharedControl;
use crate::hw::{AdcBus, SerialChannel};
use crate::protocol::{CommandDecoder, DrainSummary, ReportError, StatusReport, StatusReporter};
use crate::sampler::{SampleError, VoltageSampler};

/// Outcome of one main-loop pass.
#[derive(Debug)]
pub struct PassSummary<B, S> {
    pub voltage: Result<i16, SampleError<B>>,
    pub commands: DrainSummary<S>,
    pub report: Result<Option<StatusReport>, ReportError<S>>,
}

/// Thread-mode work: sample, drain host commands, emit the pending report.
///
/// Each stage touches the control record through [`SharedControl`] only, so
/// a timer firing between stages is harmless.
pub struct MainLoop<B> {
    sampler: VoltageSampler<B>,
    decoder: CommandDecoder,
    reporter: StatusReporter,
}

impl<B: AdcBus> MainLoop<B> {
    pub fn new(bus: B, config: &RoofConfig) -> Self {
        Self {
            sampler: VoltageSampler::new(bus, config.adc_ground_offset),
            decoder: CommandDecoder::new(),
            reporter: StatusReporter::new(config.voltage_gain),
        }
    }

    pub fn run_pass<S>(
        &mut self,
        serial: &mut S,
        control: &SharedControl,
    ) -> PassSummary<B::Error, S::Error>
    where
        S: SerialChannel,
    {
        let voltage = self.sampler.sample_into(control);
        let commands = self.decoder.drain(serial, control);
        let report = self.reporter.poll(serial, control);

        PassSummary {
            voltage,
            commands,
            report,
        }
    }

    pub fn sampler_mut(&mut self) -> &mut VoltageSampler<B> {
        &mut self.sampler
    }
}
