//! GPIO lamp outputs.
//!
//! Each lamp is driven through a push-pull pin wired to its driver stage,
//! active high. Pins start low so the head is dark until the first cycle.

use embassy_stm32::gpio::Output;
use signal_core::light::{LampDriver, LampOutput};

pub struct GpioLamps<'d> {
    red: Output<'d>,
    yellow: Output<'d>,
    green: Output<'d>,
    shown: LampOutput,
}

impl<'d> GpioLamps<'d> {
    pub fn new(red: Output<'d>, yellow: Output<'d>, green: Output<'d>) -> Self {
        Self {
            red,
            yellow,
            green,
            shown: LampOutput::DARK,
        }
    }
}

fn drive(pin: &mut Output<'_>, lit: bool) {
    if lit {
        pin.set_high();
    } else {
        pin.set_low();
    }
}

impl LampDriver for GpioLamps<'_> {
    fn apply(&mut self, output: LampOutput) {
        if output == self.shown {
            return;
        }

        drive(&mut self.red, output.red);
        drive(&mut self.yellow, output.yellow);
        drive(&mut self.green, output.green);
        defmt::debug!(
            "lamps: red={} yellow={} green={}",
            output.red,
            output.yellow,
            output.green
        );
        self.shown = output;
    }
}
