//! Physical lamp outputs and the driver seam.

use super::LightState;

/// Levels of the three lamps of one signal head.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LampOutput {
    pub red: bool,
    pub yellow: bool,
    pub green: bool,
}

impl LampOutput {
    /// All lamps dark.
    pub const DARK: Self = Self {
        red: false,
        yellow: false,
        green: false,
    };

    /// Derives the lamp levels for a light state. `blink_lit` only matters in
    /// [`LightState::Error`], where red stays lit and yellow follows the blink phase.
    #[must_use]
    pub const fn for_state(state: LightState, blink_lit: bool) -> Self {
        match state {
            LightState::Red => Self {
                red: true,
                ..Self::DARK
            },
            LightState::Green => Self {
                green: true,
                ..Self::DARK
            },
            LightState::Yellow => Self {
                yellow: true,
                ..Self::DARK
            },
            LightState::Error => Self {
                red: true,
                yellow: blink_lit,
                green: false,
            },
        }
    }

    /// Number of lamps currently lit.
    #[must_use]
    pub fn lit_count(self) -> u8 {
        u8::from(self.red) + u8::from(self.yellow) + u8::from(self.green)
    }
}

/// Abstraction over the lamp output hardware.
pub trait LampDriver {
    /// Drives the lamps to the supplied levels.
    fn apply(&mut self, output: LampOutput);
}

/// Lamp driver that performs no hardware interaction.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopLampDriver;

impl NoopLampDriver {
    /// Creates a new no-op lamp driver.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl LampDriver for NoopLampDriver {
    fn apply(&mut self, _: LampOutput) {}
}

impl<D: LampDriver + ?Sized> LampDriver for &mut D {
    fn apply(&mut self, output: LampOutput) {
        (**self).apply(output);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn steady_states_light_exactly_one_lamp() {
        for state in [LightState::Red, LightState::Green, LightState::Yellow] {
            let output = LampOutput::for_state(state, true);
            assert_eq!(output.lit_count(), 1, "{state} should light one lamp");
        }
    }

    #[test]
    fn error_keeps_red_and_blinks_yellow() {
        let lit = LampOutput::for_state(LightState::Error, true);
        let dark = LampOutput::for_state(LightState::Error, false);

        assert!(lit.red && lit.yellow && !lit.green);
        assert!(dark.red && !dark.yellow && !dark.green);
        assert_eq!(dark.lit_count(), 1);
    }
}
