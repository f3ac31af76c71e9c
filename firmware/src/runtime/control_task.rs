use embassy_time::{Duration, Ticker};

use super::{CONSOLE_QUEUE, Controller, now};
use crate::console;
use crate::telemetry::TelemetryLog;

const CONTROL_PERIOD: Duration = Duration::from_millis(10);

/// Runs the control cycle and answers console lines between cycles.
#[embassy_executor::task]
pub async fn run(mut controller: Controller) -> ! {
    let lines = CONSOLE_QUEUE.line_receiver();
    let output = CONSOLE_QUEUE.output_sender();
    let mut telemetry = TelemetryLog::new();
    let mut ticker = Ticker::every(CONTROL_PERIOD);

    loop {
        controller.run_cycle(now());

        while let Ok(line) = lines.try_receive() {
            console::respond(&line, &mut controller, |reply| {
                if output.try_send(reply).is_err() {
                    defmt::warn!("console: output queue full, reply truncated");
                }
            });
        }

        telemetry.drain(controller.telemetry());
        ticker.next().await;
    }
}
