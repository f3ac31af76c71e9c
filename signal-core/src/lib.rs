#![no_std]

// Coordination logic for a two-node signalized crossing.
//
// Everything here runs inside a single cooperative control cycle and stays free
// of the standard library so the same code drives the MCU firmware and the host
// emulator. Hardware and transport concerns enter through the collaborator traits
// in `light` and `controller`.

pub mod clock;
pub mod config;
pub mod console;
pub mod controller;
pub mod coordinator;
pub mod light;
pub mod link;
pub mod node;
pub mod telemetry;
