//! Node identity and role.
//!
//! The crossing has exactly two nodes, `A` and `B`, one per direction. Identity
//! is fixed per physical node at deployment; the role decides whether the node
//! runs the global coordinator (master) or only follows commands (slave).

use core::fmt;

/// Identity of one of the two crossing nodes.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum NodeId {
    A,
    B,
}

impl NodeId {
    /// Returns the other node of the pair.
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            NodeId::A => NodeId::B,
            NodeId::B => NodeId::A,
        }
    }

    /// Byte used for this identity on the radio link.
    #[must_use]
    pub const fn wire_byte(self) -> u8 {
        match self {
            NodeId::A => b'A',
            NodeId::B => b'B',
        }
    }

    /// Decodes an identity byte received from the radio link.
    #[must_use]
    pub const fn from_wire(byte: u8) -> Option<Self> {
        match byte {
            b'A' => Some(NodeId::A),
            b'B' => Some(NodeId::B),
            _ => None,
        }
    }

    /// Single-letter label used in status lines and logs.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            NodeId::A => "A",
            NodeId::B => "B",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Whether a node coordinates the crossing or follows the coordinator.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Role {
    /// Runs the global direction coordinator and the configuration listener.
    Master,
    /// Applies commands from the master and fails safe on its own.
    Slave,
}

impl Role {
    #[must_use]
    pub const fn is_master(self) -> bool {
        matches!(self, Role::Master)
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Role::Master => "master",
            Role::Slave => "slave",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peer_is_the_other_node() {
        assert_eq!(NodeId::A.peer(), NodeId::B);
        assert_eq!(NodeId::B.peer(), NodeId::A);
    }

    #[test]
    fn unknown_identity_bytes_are_rejected() {
        assert_eq!(NodeId::from_wire(b'A'), Some(NodeId::A));
        assert_eq!(NodeId::from_wire(b'B'), Some(NodeId::B));
        assert_eq!(NodeId::from_wire(b'C'), None);
        assert_eq!(NodeId::from_wire(b'a'), None);
    }
}
