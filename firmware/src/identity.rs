//! Build-time node identity. The `node-b` feature selects the B/slave image.

use signal_core::node::{NodeId, Role};

#[cfg(not(feature = "node-b"))]
pub const NODE_ID: NodeId = NodeId::A;
#[cfg(not(feature = "node-b"))]
pub const ROLE: Role = Role::Master;

#[cfg(feature = "node-b")]
pub const NODE_ID: NodeId = NodeId::B;
#[cfg(feature = "node-b")]
pub const ROLE: Role = Role::Slave;

/// USB product string advertised for this image.
pub const PRODUCT: &str = match ROLE {
    Role::Master => "Crossing Signal A (master)",
    Role::Slave => "Crossing Signal B (slave)",
};

/// USB serial number string, distinguishing the two boards on one host.
pub const SERIAL: &str = match NODE_ID {
    NodeId::A => "signal-a",
    NodeId::B => "signal-b",
};
