use embassy_futures::join::join;
use embassy_stm32 as hal;
use embassy_stm32::Peri;
use embassy_stm32::usart::{BufferedUart, Config as UartConfig, DataBits, Parity, StopBits};
use embassy_sync::channel::TrySendError;
use embassy_time::{Duration, Timer};
use embedded_io_async::{Read, Write};
use signal_core::link::MAX_FRAME_LEN;
use static_cell::StaticCell;

use crate::radio::{FrameAssembler, RADIO_QUEUE_DEPTH, RadioQueue};
use crate::status;

// Frame plus terminator, for every queued frame.
const UART_BUFFER_SIZE: usize = (MAX_FRAME_LEN + 1) * RADIO_QUEUE_DEPTH;
const MODEM_BAUD: u32 = 9_600;
const ERROR_BACKOFF: Duration = Duration::from_millis(5);

static UART_TX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();
static UART_RX_BUFFER: StaticCell<[u8; UART_BUFFER_SIZE]> = StaticCell::new();

embassy_stm32::bind_interrupts!(struct UartIrqs {
    USART3_4_5_6_LPUART1 => embassy_stm32::usart::BufferedInterruptHandler<hal::peripherals::USART5>;
});

/// Moves frames between the radio queues and the transparent modem.
#[embassy_executor::task]
pub async fn run(
    queue: &'static RadioQueue,
    usart: Peri<'static, hal::peripherals::USART5>,
    tx_pin: Peri<'static, hal::peripherals::PB0>,
    rx_pin: Peri<'static, hal::peripherals::PB1>,
) -> ! {
    let mut config = UartConfig::default();
    config.baudrate = MODEM_BAUD;
    config.data_bits = DataBits::DataBits8;
    config.stop_bits = StopBits::STOP1;
    config.parity = Parity::ParityNone;

    let uart = BufferedUart::new(
        usart,
        rx_pin,
        tx_pin,
        UART_TX_BUFFER.init([0; UART_BUFFER_SIZE]),
        UART_RX_BUFFER.init([0; UART_BUFFER_SIZE]),
        UartIrqs,
        config,
    )
    .expect("failed to initialize modem UART");

    let (mut uart_tx, mut uart_rx) = uart.split();

    let outbound = queue.outbound_receiver();
    let inbound = queue.inbound_sender();

    let transmit = async move {
        loop {
            let frame = outbound.receive().await;
            let written = async {
                uart_tx.write_all(&frame).await?;
                uart_tx.write_all(b"\n").await?;
                uart_tx.flush().await
            }
            .await;

            match written {
                Ok(()) => status::record_tx_frame(),
                Err(_) => {
                    status::record_uart_error();
                    defmt::warn!("radio: UART write error");
                    Timer::after(ERROR_BACKOFF).await;
                }
            }
        }
    };

    let receive = async move {
        let mut assembler = FrameAssembler::new();
        let mut ingress = [0u8; MAX_FRAME_LEN];
        loop {
            let count = match uart_rx.read(&mut ingress).await {
                Ok(count) => count,
                Err(_) => {
                    status::record_uart_error();
                    defmt::warn!("radio: UART read error");
                    assembler.reset();
                    Timer::after(ERROR_BACKOFF).await;
                    continue;
                }
            };

            for &byte in &ingress[..count] {
                match assembler.push(byte) {
                    Ok(Some(frame)) => match inbound.try_send(frame) {
                        Ok(()) => status::record_rx_frame(),
                        Err(TrySendError::Full(_)) => {
                            status::record_rx_dropped();
                            defmt::warn!("radio: inbound queue full, frame dropped");
                        }
                    },
                    Ok(None) => {}
                    Err(_) => {
                        status::record_rx_dropped();
                        defmt::warn!("radio: dropping oversized frame");
                    }
                }
            }
        }
    };

    join(transmit, receive).await;
    loop {
        core::future::pending::<()>().await;
    }
}
