#![allow(clippy::module_name_repetitions)]

//! Operator console grammar.
//!
//! A line-oriented command set shared by the firmware's USB console and the
//! host emulator:
//!
//! ```text
//! status
//! config <greenA>,<greenB>,<clearance>
//! help [topic]
//! ```
//!
//! Keywords are case-insensitive. Parsing is a single `winnow` pass over the
//! line; failures report the byte offset where the grammar stopped matching.

use core::fmt;

use winnow::ModalResult;
use winnow::ascii::{Caseless, alpha1, multispace0, space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::prelude::*;
use winnow::token::literal;

use crate::config::{self, TimingConfig};

mod commands;

pub use commands::{ConsoleError, ConsoleReply, execute};

/// Longest accepted console line, excluding the terminator.
pub const MAX_LINE_LEN: usize = 96;

/// One-line synopsis per command, in display order.
pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "status",
        "status                        - show light, peer link, and global state",
    ),
    (
        "config",
        "config <greenA>,<greenB>,<clr> - set green and clearance seconds (master)",
    ),
    (
        "help",
        "help [topic]                  - show help for a command",
    ),
];

/// Parsed console command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConsoleCommand<'a> {
    Status,
    Config(TimingConfig),
    Help { topic: Option<&'a str> },
}

/// Line rejected by the grammar.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SyntaxError {
    pub offset: usize,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unrecognized input at column {}", self.offset + 1)
    }
}

/// Parses one console line.
///
/// # Errors
///
/// Returns [`SyntaxError`] when the line does not match any command.
pub fn parse(line: &str) -> Result<ConsoleCommand<'_>, SyntaxError> {
    delimited(multispace0, command, multispace0)
        .parse(line)
        .map_err(|err| SyntaxError {
            offset: err.offset(),
        })
}

/// Looks up the synopsis for a help topic.
#[must_use]
pub fn help_for(topic: &str) -> Option<&'static str> {
    HELP_TOPICS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(topic))
        .map(|(_, text)| *text)
}

fn command<'a>(input: &mut &'a str) -> ModalResult<ConsoleCommand<'a>> {
    alt((
        literal(Caseless("status")).value(ConsoleCommand::Status),
        preceded(
            (literal(Caseless("config")), space1),
            config::timing_payload,
        )
        .map(ConsoleCommand::Config),
        preceded(literal(Caseless("help")), opt(preceded(space1, alpha1)))
            .map(|topic| ConsoleCommand::Help { topic }),
    ))
    .parse_next(input)
}
