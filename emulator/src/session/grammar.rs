//! Simulation controls layered on top of the node console grammar.

use std::time::Duration;

use signal_core::node::NodeId;
use winnow::ModalResult;
use winnow::ascii::{Caseless, dec_uint, multispace0, space0, space1};
use winnow::combinator::{alt, delimited, opt, preceded};
use winnow::prelude::*;
use winnow::token::literal;

pub const SIM_HELP: &[&str] = &[
    "advance <n>[ms|s]             - run the simulation forward",
    "link up|down                  - connect or cut the radio channel",
    "mute a|b / unmute a|b         - silence one node's transmitter",
    "events                        - list recent telemetry of both nodes",
];

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SimCommand {
    Advance(Duration),
    Link { up: bool },
    Mute(NodeId),
    Unmute(NodeId),
    Events,
}

/// Parses a simulation control line. `None` means the line belongs to the
/// node console.
pub fn parse(line: &str) -> Option<SimCommand> {
    delimited(multispace0, sim_command, multispace0)
        .parse(line)
        .ok()
}

fn sim_command(input: &mut &str) -> ModalResult<SimCommand> {
    alt((
        preceded((literal(Caseless("advance")), space1), span).map(SimCommand::Advance),
        preceded((literal(Caseless("link")), space1), link_state)
            .map(|up| SimCommand::Link { up }),
        preceded((literal(Caseless("unmute")), space1), node_id).map(SimCommand::Unmute),
        preceded((literal(Caseless("mute")), space1), node_id).map(SimCommand::Mute),
        literal(Caseless("events")).value(SimCommand::Events),
    ))
    .parse_next(input)
}

fn span(input: &mut &str) -> ModalResult<Duration> {
    let count: u64 = dec_uint.parse_next(input)?;
    let scale = preceded(
        space0,
        opt(alt((
            literal(Caseless("ms")).value(1_u64),
            literal(Caseless("s")).value(1_000_u64),
        ))),
    )
    .parse_next(input)?;
    Ok(Duration::from_millis(
        count.saturating_mul(scale.unwrap_or(1)),
    ))
}

fn link_state(input: &mut &str) -> ModalResult<bool> {
    alt((
        literal(Caseless("up")).value(true),
        literal(Caseless("down")).value(false),
    ))
    .parse_next(input)
}

fn node_id(input: &mut &str) -> ModalResult<NodeId> {
    alt((
        literal(Caseless("a")).value(NodeId::A),
        literal(Caseless("b")).value(NodeId::B),
    ))
    .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_advance_units() {
        assert_eq!(
            parse("advance 250ms"),
            Some(SimCommand::Advance(Duration::from_millis(250)))
        );
        assert_eq!(
            parse("advance 12 s"),
            Some(SimCommand::Advance(Duration::from_secs(12)))
        );
        assert_eq!(
            parse("ADVANCE 40"),
            Some(SimCommand::Advance(Duration::from_millis(40)))
        );
    }

    #[test]
    fn parses_link_controls() {
        assert_eq!(parse("link down"), Some(SimCommand::Link { up: false }));
        assert_eq!(parse("mute B"), Some(SimCommand::Mute(NodeId::B)));
        assert_eq!(parse("unmute a"), Some(SimCommand::Unmute(NodeId::A)));
        assert_eq!(parse(" events \n"), Some(SimCommand::Events));
    }

    #[test]
    fn leaves_console_lines_alone() {
        assert_eq!(parse("status"), None);
        assert_eq!(parse("config 15,10,3"), None);
        assert_eq!(parse("mute c"), None);
        assert_eq!(parse("advance soon"), None);
    }
}
