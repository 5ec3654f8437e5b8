use super::{HOST_PIPES, USB_STORAGE};
use crate::link::HostPipes;
use crate::usb::{self, HostPort, UsbDeviceStrings};
use embassy_futures::join::join;
use embassy_futures::select::{Either3, select3};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_usb::class::cdc_acm::{ControlChanged, Sender};
use embassy_usb::driver::{Driver, EndpointError};

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    USB_UCPD1_2 => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB>;
});

#[embassy_executor::task]
pub async fn run(
    usb: Peri<'static, hal::peripherals::USB>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
) -> ! {
    let storage = USB_STORAGE.init(usb::UsbDeviceStorage::new());
    let driver = embassy_stm32::usb::Driver::new(usb, UsbIrqs, dp, dm);

    let (mut device, port) = usb::build(driver, storage, UsbDeviceStrings::default());

    join(device.run(), serve_host(port, &HOST_PIPES)).await;
    loop {
        core::future::pending::<()>().await;
    }
}

async fn serve_host<D>(port: HostPort<D>, pipes: &'static HostPipes) -> !
where
    D: Driver<'static>,
{
    let HostPort {
        mut sender,
        mut receiver,
        control,
    } = port;
    let mut ingress = [0u8; usb::MAX_PACKET_SIZE as usize];
    let mut egress = [0u8; usb::MAX_PACKET_SIZE as usize];
    let mut pending_len = 0usize;

    loop {
        join(receiver.wait_connection(), sender.wait_connection()).await;
        wait_for_dtr(&control, &sender).await;

        pending_len = 0;
        pipes.set_attached(true);
        defmt::info!("usb: host attached");

        loop {
            let event = select3(
                receiver.read_packet(&mut ingress),
                async {
                    if pending_len == 0 {
                        pending_len = pipes.reports().read(&mut egress).await;
                    }

                    let written = sender.write_packet(&egress[..pending_len]).await;
                    if written.is_ok() {
                        pending_len = 0;
                    }
                    written
                },
                control.control_changed(),
            )
            .await;

            match event {
                Either3::First(Ok(0)) | Either3::Second(Ok(())) => {}
                Either3::First(Ok(count)) => {
                    pipes.commands().write_all(&ingress[..count]).await;
                }
                Either3::First(Err(EndpointError::Disabled)) => {
                    defmt::warn!("usb: interface disabled");
                    break;
                }
                Either3::First(Err(_)) => {
                    defmt::warn!("usb: read error");
                }
                Either3::Second(Err(EndpointError::Disabled)) => {
                    defmt::warn!("usb: write disabled");
                    break;
                }
                Either3::Second(Err(_)) => {
                    defmt::warn!("usb: write error");
                }
                Either3::Third(()) => {
                    if !sender.dtr() {
                        defmt::warn!("usb: host dropped DTR");
                        break;
                    }
                }
            }
        }

        pipes.set_attached(false);
    }
}

async fn wait_for_dtr<D>(control: &ControlChanged<'static>, sender: &Sender<'static, D>)
where
    D: Driver<'static>,
{
    while !sender.dtr() {
        control.control_changed().await;
    }
}
