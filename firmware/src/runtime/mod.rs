use cortex_m::interrupt;
use cortex_m::register::primask;
use critical_section::{self, RawRestoreState};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_stm32 as hal;
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_time::Instant;
use signal_core::clock::Millis;
use signal_core::controller::NodeController;

use crate::console::{ConsoleQueue, ConsoleSink};
use crate::identity;
use crate::lamps::GpioLamps;
use crate::radio::{ChannelRadio, RadioQueue};

mod control_task;
mod radio_task;
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

pub(super) static RADIO_QUEUE: RadioQueue = RadioQueue::new();
pub(super) static CONSOLE_QUEUE: ConsoleQueue = ConsoleQueue::new();

pub(super) type Controller =
    NodeController<ChannelRadio<'static>, GpioLamps<'static>, ConsoleSink<'static>>;

/// Current time on the controller's wrapping millisecond clock.
pub(super) fn now() -> Millis {
    #[allow(clippy::cast_possible_truncation)]
    Millis::from_ticks(Instant::now().as_millis() as u32)
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) {
    let config = hal::Config::default();
    let hal::Peripherals {
        PA2,
        PA3,
        PA4,
        PB0,
        PB1,
        USB,
        PA11,
        PA12,
        USART5,
        ..
    } = hal::init(config);

    let lamps = GpioLamps::new(
        Output::new(PA2, Level::Low, Speed::Low),
        Output::new(PA3, Level::Low, Speed::Low),
        Output::new(PA4, Level::Low, Speed::Low),
    );

    let controller = NodeController::new(
        identity::NODE_ID,
        identity::ROLE,
        ChannelRadio::new(&RADIO_QUEUE),
        lamps,
        ConsoleSink::new(CONSOLE_QUEUE.output_sender()),
        now(),
    );

    defmt::info!(
        "signal: node {} starting as {}",
        identity::NODE_ID,
        identity::ROLE
    );

    spawner
        .spawn(control_task::run(controller))
        .expect("failed to spawn control task");

    spawner
        .spawn(radio_task::run(&RADIO_QUEUE, USART5, PB0, PB1))
        .expect("failed to spawn radio task");

    spawner
        .spawn(usb_task::run(USB, PA12, PA11))
        .expect("failed to spawn USB task");

    core::future::pending::<()>().await;
}
