//! USB CDC-ACM device carrying the host protocol.
//!
//! The controller enumerates as a single serial port. The host opens it,
//! asserts DTR, and exchanges command bytes and status records over the bulk
//! endpoints.

use embassy_usb::class::cdc_acm::{CdcAcmClass, ControlChanged, Receiver, Sender, State};
use embassy_usb::driver::Driver;

pub const MAX_PACKET_SIZE: u16 = 64;

const CONTROL_BUFFER_LEN: usize = 64;
const CONFIG_DESCRIPTOR_LEN: usize = 128;
const BOS_DESCRIPTOR_LEN: usize = 16;
const MSOS_DESCRIPTOR_LEN: usize = 0;

/// User-visible strings advertised in the USB descriptors.
#[derive(Clone, Copy, Debug)]
pub struct UsbDeviceStrings {
    pub manufacturer: &'static str,
    pub product: &'static str,
    pub serial_number: Option<&'static str>,
}

impl Default for UsbDeviceStrings {
    fn default() -> Self {
        Self {
            manufacturer: "Observatory",
            product: "Roof Controller",
            serial_number: None,
        }
    }
}

/// Backing storage for the Embassy USB builder and the CDC ACM class.
pub struct UsbDeviceStorage {
    control_buf: [u8; CONTROL_BUFFER_LEN],
    config_descriptor: [u8; CONFIG_DESCRIPTOR_LEN],
    bos_descriptor: [u8; BOS_DESCRIPTOR_LEN],
    msos_descriptor: [u8; MSOS_DESCRIPTOR_LEN],
    cdc_state: State<'static>,
}

impl UsbDeviceStorage {
    pub fn new() -> Self {
        Self {
            control_buf: [0; CONTROL_BUFFER_LEN],
            config_descriptor: [0; CONFIG_DESCRIPTOR_LEN],
            bos_descriptor: [0; BOS_DESCRIPTOR_LEN],
            msos_descriptor: [0; MSOS_DESCRIPTOR_LEN],
            cdc_state: State::new(),
        }
    }
}

/// Split halves of the host port.
pub struct HostPort<D: Driver<'static>> {
    pub sender: Sender<'static, D>,
    pub receiver: Receiver<'static, D>,
    pub control: ControlChanged<'static>,
}

/// Builds the device and its single CDC ACM interface.
pub fn build<D: Driver<'static>>(
    driver: D,
    storage: &'static mut UsbDeviceStorage,
    strings: UsbDeviceStrings,
) -> (embassy_usb::UsbDevice<'static, D>, HostPort<D>) {
    let mut config = embassy_usb::Config::new(0x1209, 0x0001);
    config.manufacturer = Some(strings.manufacturer);
    config.product = Some(strings.product);
    config.serial_number = strings.serial_number;
    config.max_packet_size_0 = 64;
    config.max_power = 100;

    let mut builder = embassy_usb::Builder::new(
        driver,
        config,
        &mut storage.config_descriptor,
        &mut storage.bos_descriptor,
        &mut storage.msos_descriptor,
        &mut storage.control_buf,
    );

    let class = CdcAcmClass::new(&mut builder, &mut storage.cdc_state, MAX_PACKET_SIZE);
    let (sender, receiver, control) = class.split_with_control();
    let device = builder.build();

    (
        device,
        HostPort {
            sender,
            receiver,
            control,
        },
    )
}
