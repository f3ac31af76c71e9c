//! Console command execution against a node controller.

use core::fmt;

use super::{ConsoleCommand, HELP_TOPICS, SyntaxError, help_for, parse};
use crate::config::{ConfigError, TimingConfig};
use crate::controller::{NodeController, StatusSink};
use crate::coordinator::GlobalState;
use crate::light::LampDriver;
use crate::link::RadioLink;
use crate::telemetry::StatusReport;

/// Successful console responses. `Display` renders the text shown to the
/// operator, one line per `\n`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleReply {
    Status {
        report: StatusReport,
        global: Option<GlobalState>,
        timing: Option<TimingConfig>,
    },
    ConfigApplied(TimingConfig),
    Help(&'static str),
    HelpIndex,
}

impl fmt::Display for ConsoleReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleReply::Status {
                report,
                global,
                timing,
            } => {
                write!(f, "OK status {report}")?;
                if let Some(global) = global {
                    write!(f, "\nglobal={global}")?;
                }
                if let Some(timing) = timing {
                    write!(f, "\ntiming: {timing}")?;
                }
                Ok(())
            }
            ConsoleReply::ConfigApplied(timing) => write!(f, "OK config {timing}"),
            ConsoleReply::Help(text) => f.write_str(text),
            ConsoleReply::HelpIndex => {
                f.write_str("Available commands:")?;
                for (_, text) in HELP_TOPICS {
                    write!(f, "\n  {text}")?;
                }
                Ok(())
            }
        }
    }
}

/// Console failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleError {
    Syntax(SyntaxError),
    Config(ConfigError),
    UnknownTopic,
}

impl From<SyntaxError> for ConsoleError {
    fn from(error: SyntaxError) -> Self {
        Self::Syntax(error)
    }
}

impl From<ConfigError> for ConsoleError {
    fn from(error: ConfigError) -> Self {
        Self::Config(error)
    }
}

impl fmt::Display for ConsoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsoleError::Syntax(err) => write!(f, "ERR syntax {err}"),
            ConsoleError::Config(err) => write!(f, "ERR config {err}"),
            ConsoleError::UnknownTopic => f.write_str("ERR help unknown topic"),
        }
    }
}

/// Parses and runs one console line against `controller`.
///
/// # Errors
///
/// Returns a [`ConsoleError`] for unparsable lines, refused configuration, or
/// unknown help topics.
pub fn execute<R, D, S>(
    line: &str,
    controller: &mut NodeController<R, D, S>,
) -> Result<ConsoleReply, ConsoleError>
where
    R: RadioLink,
    D: LampDriver,
    S: StatusSink,
{
    match parse(line)? {
        ConsoleCommand::Status => Ok(ConsoleReply::Status {
            report: controller.status(),
            global: controller.global_state(),
            timing: controller.timing(),
        }),
        ConsoleCommand::Config(timing) => Ok(ConsoleReply::ConfigApplied(
            controller.set_timing(timing)?,
        )),
        ConsoleCommand::Help { topic: None } => Ok(ConsoleReply::HelpIndex),
        ConsoleCommand::Help { topic: Some(topic) } => help_for(topic)
            .map(ConsoleReply::Help)
            .ok_or(ConsoleError::UnknownTopic),
    }
}
