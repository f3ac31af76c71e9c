use embassy_futures::join::join;
use embassy_futures::select::{Either3, select3};
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_sync::channel::TrySendError;
use embassy_usb::driver::{Driver, EndpointError};
use static_cell::StaticCell;

use super::CONSOLE_QUEUE;
use crate::console::{LineSender, OutputLine};
use crate::line::LineAssembler;
use crate::status;
use crate::usb::{self, ConsolePort, UsbConsole, UsbDeviceStorage};
use signal_core::console::MAX_LINE_LEN;

const PACKET_LEN: usize = usb::MAX_PACKET_SIZE as usize;

static USB_STORAGE: StaticCell<UsbDeviceStorage> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UsbIrqs {
    USB_UCPD1_2 => embassy_stm32::usb::InterruptHandler<hal::peripherals::USB>;
});

#[embassy_executor::task]
pub async fn run(
    usb: Peri<'static, hal::peripherals::USB>,
    dp: Peri<'static, hal::peripherals::PA12>,
    dm: Peri<'static, hal::peripherals::PA11>,
) -> ! {
    let storage = USB_STORAGE.init(UsbDeviceStorage::new());
    let driver = embassy_stm32::usb::Driver::new(usb, UsbIrqs, dp, dm);

    let UsbConsole { mut device, port } = UsbConsole::new(driver, storage);

    join(device.run(), run_console(port)).await;
    loop {
        core::future::pending::<()>().await;
    }
}

async fn run_console<D: Driver<'static>>(mut port: ConsolePort<D>) -> ! {
    let lines = CONSOLE_QUEUE.line_sender();
    let output = CONSOLE_QUEUE.output_receiver();
    let mut assembler: LineAssembler<MAX_LINE_LEN> = LineAssembler::editing();
    let mut ingress = [0u8; PACKET_LEN];
    let mut pending: Option<OutputLine> = None;

    loop {
        port.wait_connection().await;
        port.wait_dtr().await;
        assembler.reset();
        pending.take();
        // Replies queued while nobody was listening are stale.
        while output.try_receive().is_ok() {}
        status::set_console_attached(true);

        defmt::info!("usb: console connected");

        loop {
            let ConsolePort {
                sender,
                receiver,
                control,
            } = &mut port;

            let event = select3(
                receiver.read_packet(&mut ingress),
                async {
                    if pending.is_none() {
                        pending = Some(output.receive().await);
                    }
                    if let Some(line) = pending.as_ref() {
                        write_line(sender, line.as_bytes()).await?;
                    }
                    pending = None;
                    Ok::<(), EndpointError>(())
                },
                control.control_changed(),
            )
            .await;

            match event {
                Either3::First(Ok(count)) => {
                    for &byte in &ingress[..count] {
                        feed(&mut assembler, byte, &lines);
                    }
                }
                Either3::First(Err(EndpointError::Disabled))
                | Either3::Second(Err(EndpointError::Disabled)) => {
                    defmt::warn!("usb: console disabled");
                    break;
                }
                Either3::First(Err(_)) => defmt::warn!("usb: console read error"),
                Either3::Second(Err(_)) => defmt::warn!("usb: console write error"),
                Either3::Second(Ok(())) => {}
                Either3::Third(()) => {
                    if !port.sender.dtr() {
                        defmt::warn!("usb: host dropped DTR");
                        break;
                    }
                }
            }
        }

        status::set_console_attached(false);
    }
}

fn feed(
    assembler: &mut LineAssembler<MAX_LINE_LEN>,
    byte: u8,
    lines: &LineSender<'static>,
) {
    match assembler.push(byte) {
        Ok(Some(line)) => {
            if let Err(TrySendError::Full(_)) = lines.try_send(line) {
                defmt::warn!("usb: console busy, line dropped");
            }
        }
        Ok(None) => {}
        Err(_) => defmt::warn!("usb: console line too long, discarded"),
    }
}

/// Writes one line in packet-sized chunks, closing with a zero-length packet
/// when the line fills the last packet exactly.
async fn write_line<D: Driver<'static>>(
    sender: &mut embassy_usb::class::cdc_acm::Sender<'static, D>,
    bytes: &[u8],
) -> Result<(), EndpointError> {
    for chunk in bytes.chunks(PACKET_LEN) {
        sender.write_packet(chunk).await?;
    }
    if bytes.len() % PACKET_LEN == 0 {
        sender.write_packet(&[]).await?;
    }
    Ok(())
}
