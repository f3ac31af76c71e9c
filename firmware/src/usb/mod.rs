//! Single CDC ACM console device.
//!
//! The board enumerates as one serial port carrying the operator console and
//! the status/global publications. [`UsbConsole`] owns the embassy builder
//! bookkeeping and hands out the split CDC endpoints.

use embassy_usb::class::cdc_acm::{CdcAcmClass, ControlChanged, Receiver, Sender, State};
use embassy_usb::driver::Driver;
use embassy_usb::{Builder, Config, UsbDevice};

use crate::identity;

pub const MAX_PACKET_SIZE: u16 = 64;

const CONTROL_BUFFER_LEN: usize = 64;
const CONFIG_DESCRIPTOR_LEN: usize = 128;
const BOS_DESCRIPTOR_LEN: usize = 64;
const MSOS_DESCRIPTOR_LEN: usize = 64;

const MANUFACTURER: &str = "Crossing Signals";

/// Backing storage for the embassy USB builder and the CDC class state.
pub struct UsbDeviceStorage {
    control_buf: [u8; CONTROL_BUFFER_LEN],
    config_descriptor: [u8; CONFIG_DESCRIPTOR_LEN],
    bos_descriptor: [u8; BOS_DESCRIPTOR_LEN],
    msos_descriptor: [u8; MSOS_DESCRIPTOR_LEN],
    console_state: State<'static>,
}

impl UsbDeviceStorage {
    pub fn new() -> Self {
        Self {
            control_buf: [0; CONTROL_BUFFER_LEN],
            config_descriptor: [0; CONFIG_DESCRIPTOR_LEN],
            bos_descriptor: [0; BOS_DESCRIPTOR_LEN],
            msos_descriptor: [0; MSOS_DESCRIPTOR_LEN],
            console_state: State::new(),
        }
    }
}

/// Split handles of the console port.
pub struct ConsolePort<D: Driver<'static>> {
    pub sender: Sender<'static, D>,
    pub receiver: Receiver<'static, D>,
    pub control: ControlChanged<'static>,
}

impl<D: Driver<'static>> ConsolePort<D> {
    /// Waits until the host enables both endpoints.
    pub async fn wait_connection(&mut self) {
        embassy_futures::join::join(
            self.sender.wait_connection(),
            self.receiver.wait_connection(),
        )
        .await;
    }

    /// Waits until the host asserts DTR, i.e. a terminal holds the port open.
    pub async fn wait_dtr(&mut self) {
        while !self.sender.dtr() {
            self.control.control_changed().await;
        }
    }
}

pub struct UsbConsole<D: Driver<'static>> {
    pub device: UsbDevice<'static, D>,
    pub port: ConsolePort<D>,
}

impl<D: Driver<'static>> UsbConsole<D> {
    pub fn new(driver: D, storage: &'static mut UsbDeviceStorage) -> Self {
        let mut config = Config::new(0x1209, 0x0001);
        config.manufacturer = Some(MANUFACTURER);
        config.product = Some(identity::PRODUCT);
        config.serial_number = Some(identity::SERIAL);
        config.max_packet_size_0 = 64;
        config.max_power = 100;

        let mut builder = Builder::new(
            driver,
            config,
            &mut storage.config_descriptor,
            &mut storage.bos_descriptor,
            &mut storage.msos_descriptor,
            &mut storage.control_buf,
        );

        let class = CdcAcmClass::new(&mut builder, &mut storage.console_state, MAX_PACKET_SIZE);
        let (sender, receiver, control) = class.split_with_control();

        Self {
            device: builder.build(),
            port: ConsolePort {
                sender,
                receiver,
                control,
            },
        }
    }
}
