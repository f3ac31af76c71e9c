//! Runtime-tunable timing and the remote configuration listener.
//!
//! Only three durations can be changed at runtime: green time for each direction
//! and the all-red clearance between them. They arrive as a plain-text payload
//! `"<greenA>,<greenB>,<clearance>"` in whole seconds on [`CONFIG_TOPIC`]. A
//! payload is either applied in full or rejected without touching the current
//! values; the coordinator reads the values on every evaluation, so an applied
//! change takes effect at the next duration check.

use core::fmt;
use core::time::Duration;

use winnow::ModalResult;
use winnow::ascii::{dec_uint, multispace0, space0};
use winnow::combinator::{delimited, separated_pair, terminated};
use winnow::prelude::*;

use crate::node::NodeId;

/// Topic carrying configuration payloads.
pub const CONFIG_TOPIC: &str = "traffic/config";

/// Default green time for direction A.
pub const DEFAULT_GREEN_A: Duration = Duration::from_secs(20);
/// Default green time for direction B.
pub const DEFAULT_GREEN_B: Duration = Duration::from_secs(20);
/// Default all-red clearance between directions.
pub const DEFAULT_CLEARANCE: Duration = Duration::from_secs(5);

/// Durations the coordinator reads on every evaluation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TimingConfig {
    pub green_a: Duration,
    pub green_b: Duration,
    pub clearance: Duration,
}

impl TimingConfig {
    #[must_use]
    pub const fn new(green_a: Duration, green_b: Duration, clearance: Duration) -> Self {
        Self {
            green_a,
            green_b,
            clearance,
        }
    }

    /// Builds a configuration from whole seconds, as carried in payloads.
    #[must_use]
    pub const fn from_secs(green_a: u16, green_b: u16, clearance: u16) -> Self {
        Self::new(
            Duration::from_secs(green_a as u64),
            Duration::from_secs(green_b as u64),
            Duration::from_secs(clearance as u64),
        )
    }

    /// Green time for the given direction.
    #[must_use]
    pub const fn green_for(&self, direction: NodeId) -> Duration {
        match direction {
            NodeId::A => self.green_a,
            NodeId::B => self.green_b,
        }
    }

    /// Parses a configuration payload.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Malformed`] unless the payload holds exactly three
    /// comma-separated integers in `0..=65535`.
    pub fn parse(payload: &str) -> Result<Self, ConfigError> {
        terminated(timing_payload, multispace0)
            .parse(payload)
            .map_err(|err| ConfigError::Malformed {
                offset: err.offset(),
            })
    }

    /// Replaces all three durations from a payload, or none of them.
    ///
    /// # Errors
    ///
    /// Propagates [`TimingConfig::parse`] failures; `self` is left untouched.
    pub fn apply_payload(&mut self, payload: &str) -> Result<Self, ConfigError> {
        let parsed = Self::parse(payload)?;
        *self = parsed;
        Ok(parsed)
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::new(DEFAULT_GREEN_A, DEFAULT_GREEN_B, DEFAULT_CLEARANCE)
    }
}

impl fmt::Display for TimingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "green A {}s, green B {}s, clearance {}s",
            self.green_a.as_secs(),
            self.green_b.as_secs(),
            self.clearance.as_secs()
        )
    }
}

/// Reasons a configuration request was refused.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigError {
    /// Payload did not match `<u16>,<u16>,<u16>`.
    Malformed { offset: usize },
    /// Configuration was sent to a node that does not coordinate the crossing.
    NotMaster,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Malformed { offset } => write!(
                f,
                "invalid timing payload at byte {offset}, expected <greenA>,<greenB>,<clearance>"
            ),
            ConfigError::NotMaster => f.write_str("timing can only be changed on the master"),
        }
    }
}

/// Outcome of routing one pub/sub message through the listener.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ConfigOutcome {
    Applied(TimingConfig),
    Rejected(ConfigError),
    /// Message was for another topic.
    Ignored,
}

/// Listener bound to the configuration topic.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ConfigListener {
    topic: &'static str,
}

impl ConfigListener {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            topic: CONFIG_TOPIC,
        }
    }

    /// Applies `payload` to `timing` when `topic` matches the listener.
    pub fn on_message(&self, topic: &str, payload: &str, timing: &mut TimingConfig) -> ConfigOutcome {
        if topic != self.topic {
            return ConfigOutcome::Ignored;
        }

        match timing.apply_payload(payload) {
            Ok(applied) => ConfigOutcome::Applied(applied),
            Err(err) => ConfigOutcome::Rejected(err),
        }
    }
}

impl Default for ConfigListener {
    fn default() -> Self {
        Self::new()
    }
}

/// Grammar for `<greenA>,<greenB>,<clearance>`, shared with the operator console.
pub(crate) fn timing_payload(input: &mut &str) -> ModalResult<TimingConfig> {
    separated_pair(seconds, ',', separated_pair(seconds, ',', seconds))
        .map(|(a, (b, c))| TimingConfig::from_secs(a, b, c))
        .parse_next(input)
}

fn seconds(input: &mut &str) -> ModalResult<u16> {
    delimited(space0, dec_uint, space0).parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_deployment_values() {
        let timing = TimingConfig::default();
        assert_eq!(timing.green_a, Duration::from_secs(20));
        assert_eq!(timing.green_b, Duration::from_secs(20));
        assert_eq!(timing.clearance, Duration::from_secs(5));
    }

    #[test]
    fn parses_three_values() {
        assert_eq!(
            TimingConfig::parse("15,10,3"),
            Ok(TimingConfig::from_secs(15, 10, 3))
        );
        assert_eq!(
            TimingConfig::parse(" 30 , 25 ,0\r\n"),
            Ok(TimingConfig::from_secs(30, 25, 0))
        );
    }

    #[test]
    fn rejects_wrong_shapes() {
        for payload in ["", "15,10", "15,10,3,4", "a,b,c", "15;10;3", "-1,2,3", "15,10,3x"] {
            assert!(
                matches!(
                    TimingConfig::parse(payload),
                    Err(ConfigError::Malformed { .. })
                ),
                "payload {payload:?} should be rejected"
            );
        }
    }

    #[test]
    fn rejects_values_beyond_sixteen_bits() {
        assert!(TimingConfig::parse("65535,1,1").is_ok());
        assert!(TimingConfig::parse("65536,1,1").is_err());
    }

    #[test]
    fn rejected_payload_keeps_previous_values() {
        let mut timing = TimingConfig::from_secs(12, 13, 4);
        assert!(timing.apply_payload("7,8").is_err());
        assert_eq!(timing, TimingConfig::from_secs(12, 13, 4));
    }

    #[test]
    fn reports_offset_of_first_bad_byte() {
        assert_eq!(
            TimingConfig::parse("15,x,3"),
            Err(ConfigError::Malformed { offset: 3 })
        );
    }

    #[test]
    fn listener_ignores_other_topics() {
        let listener = ConfigListener::new();
        let mut timing = TimingConfig::default();

        assert_eq!(
            listener.on_message("traffic/status", "1,2,3", &mut timing),
            ConfigOutcome::Ignored
        );
        assert_eq!(timing, TimingConfig::default());

        assert_eq!(
            listener.on_message(CONFIG_TOPIC, "1,2,3", &mut timing),
            ConfigOutcome::Applied(TimingConfig::from_secs(1, 2, 3))
        );
    }
}
