use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Input, Level, Output, Pull, Speed};
use embassy_stm32::interrupt::{InterruptExt, Priority};
use embassy_stm32::spi::Spi;
use roof_core::{MainLoop, RoofConfig, SharedControl, TickScheduler};
use static_cell::StaticCell;

use crate::hw::{self, AdcSpi, RoofLimits, RoofOutputs};
use crate::link::HostPipes;
use crate::usb;

mod control_task;
mod tick_task;
mod usb_task;

critical_section::set_impl!(InterruptCriticalSection);

struct InterruptCriticalSection;

unsafe impl critical_section::Impl for InterruptCriticalSection {
    unsafe fn acquire() -> RawRestoreState {
        let primask = primask::read();
        interrupt::disable();
        primask.is_active()
    }

    unsafe fn release(restore_state: RawRestoreState) {
        if restore_state {
            unsafe {
                interrupt::enable();
            }
        }
    }
}

pub(super) static CONTROL: SharedControl = SharedControl::new(RoofConfig::DEFAULT);
pub(super) static HOST_PIPES: HostPipes = HostPipes::new();
pub(super) static USB_STORAGE: StaticCell<usb::UsbDeviceStorage> = StaticCell::new();

static TICK_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[allow(non_snake_case)]
#[hal::interrupt]
unsafe fn TIM14() {
    unsafe { TICK_EXECUTOR.on_interrupt() }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA4,
        PA5,
        PA6,
        PA7,
        PA15,
        PB3,
        PB4,
        PB5,
        PB6,
        PB7,
        PB8,
        SPI1,
        USB,
        PA11,
        PA12,
        ..
    } = hal::init(config);

    defmt::info!("roof controller starting");

    // Relays are active-low, so idle is high.
    let outputs = RoofOutputs::new(
        Output::new(PB3, Level::High, Speed::Low),
        Output::new(PB4, Level::High, Speed::Low),
        Output::new(PB5, Level::High, Speed::Low),
        Output::new(PB6, Level::High, Speed::Low),
        Output::new(PA15, Level::Low, Speed::Low),
    );
    let limits = RoofLimits::new(Input::new(PB8, Pull::Up), Input::new(PB7, Pull::Up));
    let scheduler = TickScheduler::new(outputs, limits);

    let adc = AdcSpi::new(
        Spi::new_blocking(SPI1, PA5, PA7, PA6, hw::adc_spi_config()),
        Output::new(PA4, Level::High, Speed::Medium),
    );
    let main_loop = MainLoop::new(adc, &RoofConfig::DEFAULT);

    hal::interrupt::TIM14.set_priority(Priority::P1);
    let tick_spawner = TICK_EXECUTOR.start(hal::interrupt::TIM14);
    tick_spawner
        .spawn(tick_task::run(scheduler))
        .expect("failed to spawn tick task");

    spawner
        .spawn(usb_task::run(USB, PA12, PA11))
        .expect("failed to spawn USB task");

    spawner
        .spawn(control_task::run(main_loop))
        .expect("failed to spawn control task");

    core::future::pending::<()>().await;
}
