//! Local light state machine.
//!
//! Each node owns one [`TrafficLight`]. Commands from the coordinator (local or
//! over the radio link) are turned into lamp output while enforcing the mandatory
//! yellow phase between green and red, and the blinking fail-safe pattern. Every
//! change of output is pushed to the [`LampDriver`] in the same call that causes
//! it.

use core::fmt;
use core::time::Duration;

use crate::clock::Millis;

mod lamps;

pub use lamps::{LampDriver, LampOutput, NoopLampDriver};

/// Fixed duration of the yellow phase between green and red.
pub const YELLOW_DURATION: Duration = Duration::from_secs(3);

/// Period of the yellow lamp toggle while in the fail-safe state.
pub const ERROR_BLINK_INTERVAL: Duration = Duration::from_millis(1_000);

/// Observable state of a node's light.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LightState {
    Red,
    Green,
    Yellow,
    /// Fail-safe: red steady, yellow blinking.
    Error,
}

impl LightState {
    /// Upper-case name used in status lines.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            LightState::Red => "RED",
            LightState::Green => "GREEN",
            LightState::Yellow => "YELLOW",
            LightState::Error => "ERROR",
        }
    }
}

impl fmt::Display for LightState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Directive given to a light, either locally or through a radio command.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CommandedState {
    Green,
    Red,
    Error,
}

impl CommandedState {
    /// Byte used for this state in command frames.
    #[must_use]
    pub const fn wire_byte(self) -> u8 {
        match self {
            CommandedState::Green => b'G',
            CommandedState::Red => b'R',
            CommandedState::Error => b'E',
        }
    }

    /// Decodes a state byte. Anything unrecognized is treated as red so a
    /// corrupted command can never produce green.
    #[must_use]
    pub const fn from_wire(byte: u8) -> Self {
        match byte {
            b'G' => CommandedState::Green,
            b'E' => CommandedState::Error,
            _ => CommandedState::Red,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            CommandedState::Green => "GREEN",
            CommandedState::Red => "RED",
            CommandedState::Error => "ERROR",
        }
    }
}

impl fmt::Display for CommandedState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of feeding a command or a time update into the light.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LightChange {
    pub from: LightState,
    pub to: LightState,
    pub output: LampOutput,
}

impl LightChange {
    /// Returns `true` when the light state itself changed (blink toggles do not).
    #[must_use]
    pub fn is_transition(&self) -> bool {
        self.from != self.to
    }
}

/// Light state machine driving one signal head.
pub struct TrafficLight<D = NoopLampDriver> {
    driver: D,
    state: LightState,
    yellow_started_at: Millis,
    blink_toggled_at: Millis,
    blink_lit: bool,
}

impl<D> TrafficLight<D>
where
    D: LampDriver,
{
    /// Creates a light showing red and pushes that output to the driver.
    pub fn new(driver: D, now: Millis) -> Self {
        let mut light = Self {
            driver,
            state: LightState::Red,
            yellow_started_at: now,
            blink_toggled_at: now,
            blink_lit: true,
        };
        light.push_output();
        light
    }

    /// Current light state.
    pub fn state(&self) -> LightState {
        self.state
    }

    /// Current lamp levels.
    pub fn output(&self) -> LampOutput {
        LampOutput::for_state(self.state, self.blink_lit)
    }

    /// Whether the yellow lamp is lit in the current blink phase.
    pub fn blink_lit(&self) -> bool {
        self.blink_lit
    }

    /// Timestamp of the last blink toggle (or of entering the fail-safe state).
    pub fn blink_toggled_at(&self) -> Millis {
        self.blink_toggled_at
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Applies a command. Returns the resulting change, or `None` when the
    /// command leaves the light untouched (a repeated fail-safe request).
    pub fn command(&mut self, command: CommandedState, now: Millis) -> Option<LightChange> {
        let from = self.state;
        match command {
            CommandedState::Error => {
                if self.state == LightState::Error {
                    return None;
                }
                self.state = LightState::Error;
                self.blink_lit = true;
                self.blink_toggled_at = now;
            }
            CommandedState::Green => self.state = LightState::Green,
            CommandedState::Red => {
                if self.state == LightState::Green {
                    self.state = LightState::Yellow;
                    self.yellow_started_at = now;
                } else {
                    self.state = LightState::Red;
                }
            }
        }

        Some(self.push_change(from))
    }

    /// Advances time-driven behavior: ends the yellow phase and toggles the
    /// fail-safe blink. Returns the change when the output moved.
    pub fn update(&mut self, now: Millis) -> Option<LightChange> {
        let from = self.state;
        match self.state {
            LightState::Yellow if now.has_elapsed(self.yellow_started_at, YELLOW_DURATION) => {
                self.state = LightState::Red;
            }
            LightState::Error if now.has_elapsed(self.blink_toggled_at, ERROR_BLINK_INTERVAL) => {
                self.blink_toggled_at = now;
                self.blink_lit = !self.blink_lit;
            }
            _ => return None,
        }

        Some(self.push_change(from))
    }

    fn push_change(&mut self, from: LightState) -> LightChange {
        let output = self.push_output();
        LightChange {
            from,
            to: self.state,
            output,
        }
    }

    fn push_output(&mut self) -> LampOutput {
        let output = self.output();
        self.driver.apply(output);
        output
    }
}
