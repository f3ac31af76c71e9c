//! Frame codec for the node-to-node radio link.
//!
//! Two frame kinds share the link, each carried as one radio packet:
//!
//! * heartbeat `HB:<id>`, four bytes;
//! * command `CMD:<target>:<state>`, seven bytes with fields at fixed offsets.
//!
//! There is no checksum or escaping; the radio's own CRC is the only integrity
//! check. Decoding is deliberately forgiving about what follows the fixed
//! fields, and strict about identities: a byte that is neither `A` nor `B` can
//! only come from corruption.

use core::fmt;

use heapless::Vec;
use winnow::ModalResult;
use winnow::combinator::alt;
use winnow::prelude::*;
use winnow::token::{any, literal};

use crate::light::CommandedState;
use crate::node::NodeId;

/// Tag opening a heartbeat frame.
pub const HEARTBEAT_TAG: &[u8] = b"HB:";
/// Tag opening a command frame.
pub const COMMAND_TAG: &[u8] = b"CMD:";
/// Separator written between the target and state of a command frame.
pub const COMMAND_SEPARATOR: u8 = b':';

/// Largest frame the link ever carries.
pub const MAX_FRAME_LEN: usize = 16;

/// Encoded frame ready for transmission.
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// Decoded radio message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WireMessage {
    /// Periodic liveness announcement.
    Heartbeat { from: NodeId },
    /// Light directive addressed to `target`.
    Command {
        target: NodeId,
        state: CommandedState,
    },
}

impl WireMessage {
    /// Encodes the message into a frame.
    #[must_use]
    pub fn encode(&self) -> Frame {
        match *self {
            WireMessage::Heartbeat { from } => encode_heartbeat(from),
            WireMessage::Command { target, state } => encode_command(target, state),
        }
    }
}

/// Frame rejected by the decoder.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Malformed;

impl fmt::Display for Malformed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("malformed frame")
    }
}

/// Encodes `HB:<from>`.
#[must_use]
pub fn encode_heartbeat(from: NodeId) -> Frame {
    HEARTBEAT_TAG
        .iter()
        .copied()
        .chain([from.wire_byte()])
        .collect()
}

/// Encodes `CMD:<target>:<state>`.
#[must_use]
pub fn encode_command(target: NodeId, state: CommandedState) -> Frame {
    COMMAND_TAG
        .iter()
        .copied()
        .chain([target.wire_byte(), COMMAND_SEPARATOR, state.wire_byte()])
        .collect()
}

/// Decodes one received frame.
///
/// # Errors
///
/// Returns [`Malformed`] when the frame is too short, carries an unknown tag, or
/// names an identity other than `A` or `B`.
pub fn decode(frame: &[u8]) -> Result<WireMessage, Malformed> {
    let mut input = frame;
    message.parse_next(&mut input).map_err(|_| Malformed)
}

fn message(input: &mut &[u8]) -> ModalResult<WireMessage> {
    alt((heartbeat, command)).parse_next(input)
}

fn heartbeat(input: &mut &[u8]) -> ModalResult<WireMessage> {
    (literal(HEARTBEAT_TAG), node_id)
        .map(|(_, from)| WireMessage::Heartbeat { from })
        .parse_next(input)
}

fn command(input: &mut &[u8]) -> ModalResult<WireMessage> {
    // The separator is positional only; its value is not checked.
    (literal(COMMAND_TAG), node_id, any, any)
        .map(|(_, target, _, state)| WireMessage::Command {
            target,
            state: CommandedState::from_wire(state),
        })
        .parse_next(input)
}

fn node_id(input: &mut &[u8]) -> ModalResult<NodeId> {
    any.verify_map(NodeId::from_wire).parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_fixed_layouts() {
        assert_eq!(encode_heartbeat(NodeId::A).as_slice(), b"HB:A");
        assert_eq!(
            encode_command(NodeId::B, CommandedState::Green).as_slice(),
            b"CMD:B:G"
        );
        assert_eq!(
            encode_command(NodeId::A, CommandedState::Error).as_slice(),
            b"CMD:A:E"
        );
    }

    #[test]
    fn decodes_encoded_frames() {
        let command = WireMessage::Command {
            target: NodeId::B,
            state: CommandedState::Green,
        };
        assert_eq!(decode(&command.encode()), Ok(command));

        let heartbeat = WireMessage::Heartbeat { from: NodeId::A };
        assert_eq!(decode(&heartbeat.encode()), Ok(heartbeat));
    }

    #[test]
    fn short_frames_are_malformed() {
        assert!(decode(b"").is_err());
        assert!(decode(b"HB:").is_err());
        assert!(decode(b"CMD:B:").is_err());
        assert!(decode(b"CMD:B").is_err());
    }

    #[test]
    fn unknown_tags_and_identities_are_malformed() {
        assert!(decode(b"PING:A").is_err());
        assert!(decode(b"hb:A").is_err());
        assert_eq!(decode(b"HB:Z"), Err(Malformed));
        assert!(decode(b"CMD:Q:G").is_err());
    }

    #[test]
    fn unknown_state_decodes_as_red() {
        assert_eq!(
            decode(b"CMD:A:?"),
            Ok(WireMessage::Command {
                target: NodeId::A,
                state: CommandedState::Red,
            })
        );
    }

    #[test]
    fn trailing_bytes_and_separator_are_ignored() {
        assert_eq!(
            decode(b"HB:Bxyz"),
            Ok(WireMessage::Heartbeat { from: NodeId::B })
        );
        assert_eq!(
            decode(b"CMD:A-G"),
            Ok(WireMessage::Command {
                target: NodeId::A,
                state: CommandedState::Green,
            })
        );
    }
}
