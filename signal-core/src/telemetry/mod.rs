//! Telemetry shared by firmware and host targets.
//!
//! Three things live here: the labels the master publishes on the global topic,
//! the periodic status line, and a fixed-capacity ring of structured records the
//! node controller fills as it runs. Adapters drain the ring into whatever log
//! sink the target has (defmt on the MCU, `tracing` on the host).

use core::fmt::{self, Write as _};
use core::time::Duration;

use heapless::{HistoryBuf, String};

use crate::clock::Millis;
use crate::config::{ConfigError, TimingConfig};
use crate::coordinator::GlobalState;
use crate::light::{CommandedState, LightState};
use crate::node::NodeId;

/// Topic receiving the periodic status line.
pub const STATUS_TOPIC: &str = "traffic/status";
/// Topic receiving global direction events.
pub const GLOBAL_TOPIC: &str = "traffic/global";
/// Client identity the master uses toward the pub/sub broker.
pub const PUBLISHER_CLIENT_ID: &str = "TrafficMaster";

/// Cadence of the master's status publication.
pub const STATUS_PUBLISH_INTERVAL: Duration = Duration::from_millis(1_000);

/// Longest status line: node, longest state name, longest peer label.
pub const MAX_STATUS_LEN: usize = 24;

/// Label published by the master on every global transition.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GlobalEvent {
    AllRedInit,
    RecoverAllRed,
    AGreen,
    BGreen,
    AllRedAfterA,
    AllRedAfterB,
    ErrorNoComm,
    ConfigUpdated,
}

impl GlobalEvent {
    /// Event for a direction turning green.
    #[must_use]
    pub const fn green(direction: NodeId) -> Self {
        match direction {
            NodeId::A => GlobalEvent::AGreen,
            NodeId::B => GlobalEvent::BGreen,
        }
    }

    /// Event for the clearance that follows a direction's green phase.
    #[must_use]
    pub const fn all_red_after(direction: NodeId) -> Self {
        match direction {
            NodeId::A => GlobalEvent::AllRedAfterA,
            NodeId::B => GlobalEvent::AllRedAfterB,
        }
    }

    /// Wire label published on [`GLOBAL_TOPIC`].
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            GlobalEvent::AllRedInit => "ALL_RED_INIT",
            GlobalEvent::RecoverAllRed => "RECOVER_ALL_RED",
            GlobalEvent::AGreen => "A_GREEN",
            GlobalEvent::BGreen => "B_GREEN",
            GlobalEvent::AllRedAfterA => "ALL_RED_AFTER_A",
            GlobalEvent::AllRedAfterB => "ALL_RED_AFTER_B",
            GlobalEvent::ErrorNoComm => "ERROR_NO_COMM",
            GlobalEvent::ConfigUpdated => "CONFIG_UPDATED",
        }
    }
}

impl fmt::Display for GlobalEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Snapshot published as `"<node>,<light>,<peer_ok|peer_lost>"`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct StatusReport {
    pub node: NodeId,
    pub light: LightState,
    pub peer_alive: bool,
}

impl StatusReport {
    #[must_use]
    pub const fn new(node: NodeId, light: LightState, peer_alive: bool) -> Self {
        Self {
            node,
            light,
            peer_alive,
        }
    }

    /// Peer field of the status line.
    #[must_use]
    pub const fn peer_label(&self) -> &'static str {
        if self.peer_alive { "peer_ok" } else { "peer_lost" }
    }

    /// Renders the status line into a bounded string.
    #[must_use]
    pub fn to_line(&self) -> String<MAX_STATUS_LEN> {
        let mut line = String::new();
        // Capacity covers the longest combination, so this cannot fail.
        let _ = write!(line, "{self}");
        line
    }
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{},{}", self.node, self.light, self.peer_label())
    }
}

/// Sequential identifier assigned to each telemetry record.
pub type EventId = u32;

/// Structured events recorded by the node controller.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TelemetryEventKind {
    /// Local light changed state (blink toggles are not recorded).
    LightChanged { from: LightState, to: LightState },
    /// Master coordinator moved between global states.
    GlobalTransition {
        from: GlobalState,
        to: GlobalState,
        event: GlobalEvent,
    },
    PeerLost,
    PeerRestored,
    CommandSent { target: NodeId, state: CommandedState },
    CommandReceived(CommandedState),
    /// Frame failed to decode and was dropped.
    FrameDropped { len: u8 },
    /// Radio refused an outbound frame.
    TransmitFailed,
    ConfigApplied(TimingConfig),
    ConfigRejected(ConfigError),
}

impl fmt::Display for TelemetryEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TelemetryEventKind::LightChanged { from, to } => write!(f, "light {from} -> {to}"),
            TelemetryEventKind::GlobalTransition { from, to, event } => {
                write!(f, "global {from} -> {to} ({event})")
            }
            TelemetryEventKind::PeerLost => f.write_str("peer-lost"),
            TelemetryEventKind::PeerRestored => f.write_str("peer-restored"),
            TelemetryEventKind::CommandSent { target, state } => {
                write!(f, "command-sent {target} {state}")
            }
            TelemetryEventKind::CommandReceived(state) => write!(f, "command-received {state}"),
            TelemetryEventKind::FrameDropped { len } => write!(f, "frame-dropped len={len}"),
            TelemetryEventKind::TransmitFailed => f.write_str("transmit-failed"),
            TelemetryEventKind::ConfigApplied(timing) => write!(f, "config-applied {timing}"),
            TelemetryEventKind::ConfigRejected(err) => write!(f, "config-rejected: {err}"),
        }
    }
}

/// Total number of telemetry entries retained in memory.
pub const TELEMETRY_RING_CAPACITY: usize = 64;

/// Telemetry record stored in the ring buffer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TelemetryRecord {
    pub id: EventId,
    pub timestamp: Millis,
    pub event: TelemetryEventKind,
}

impl fmt::Display for TelemetryRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} t={} {}", self.id, self.timestamp, self.event)
    }
}

/// Records telemetry events into a fixed-size ring buffer.
pub struct TelemetryRecorder<const CAPACITY: usize = TELEMETRY_RING_CAPACITY> {
    ring: HistoryBuf<TelemetryRecord, CAPACITY>,
    next_event_id: EventId,
}

impl<const CAPACITY: usize> TelemetryRecorder<CAPACITY> {
    /// Creates a new telemetry recorder with an empty history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            ring: HistoryBuf::new(),
            next_event_id: 0,
        }
    }

    /// Records an event and returns its identifier.
    pub fn record(&mut self, event: TelemetryEventKind, timestamp: Millis) -> EventId {
        let id = self.next_event_id;
        self.next_event_id = self.next_event_id.wrapping_add(1);
        self.ring.write(TelemetryRecord {
            id,
            timestamp,
            event,
        });
        id
    }

    /// Returns the recorded telemetry in chronological order.
    pub fn oldest_first(&self) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.ring.oldest_ordered()
    }

    /// Returns records with an identifier at or after `id`, oldest first.
    ///
    /// Adapters remember the next identifier they expect and call this once per
    /// cycle to log only what is new.
    pub fn since(&self, id: EventId) -> impl Iterator<Item = &TelemetryRecord> + '_ {
        self.oldest_first()
            .filter(move |record| record.id.wrapping_sub(id) < EventId::MAX / 2)
    }

    /// Identifier the next record will receive.
    #[must_use]
    pub const fn next_id(&self) -> EventId {
        self.next_event_id
    }

    /// Returns the most recent telemetry record, if available.
    pub fn latest(&self) -> Option<&TelemetryRecord> {
        self.ring.recent()
    }

    /// Returns the number of records currently stored.
    pub fn len(&self) -> usize {
        self.ring.len()
    }

    /// Returns `true` when no telemetry records are stored.
    pub fn is_empty(&self) -> bool {
        self.ring.is_empty()
    }
}

impl<const CAPACITY: usize> Default for TelemetryRecorder<CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_matches_wire_format() {
        let report = StatusReport::new(NodeId::A, LightState::Green, true);
        assert_eq!(report.to_line().as_str(), "A,GREEN,peer_ok");

        let report = StatusReport::new(NodeId::B, LightState::Yellow, false);
        assert_eq!(report.to_line().as_str(), "B,YELLOW,peer_lost");
    }

    #[test]
    fn global_event_labels() {
        assert_eq!(GlobalEvent::green(NodeId::B).label(), "B_GREEN");
        assert_eq!(GlobalEvent::all_red_after(NodeId::A).label(), "ALL_RED_AFTER_A");
        assert_eq!(GlobalEvent::ErrorNoComm.label(), "ERROR_NO_COMM");
        assert_eq!(GlobalEvent::ConfigUpdated.label(), "CONFIG_UPDATED");
    }

    #[test]
    fn recorder_assigns_sequential_ids_and_wraps_history() {
        let mut recorder = TelemetryRecorder::<4>::new();
        for tick in 0..6 {
            recorder.record(TelemetryEventKind::PeerLost, Millis::from_ticks(tick));
        }

        assert_eq!(recorder.len(), 4);
        assert_eq!(recorder.next_id(), 6);
        let ids: heapless::Vec<EventId, 4> = recorder.oldest_first().map(|r| r.id).collect();
        assert_eq!(ids.as_slice(), &[2, 3, 4, 5]);
        assert_eq!(recorder.latest().map(|r| r.timestamp), Some(Millis::from_ticks(5)));
    }

    #[test]
    fn since_skips_already_seen_records() {
        let mut recorder = TelemetryRecorder::<8>::new();
        recorder.record(TelemetryEventKind::PeerLost, Millis::ZERO);
        let cursor = recorder.next_id();
        recorder.record(TelemetryEventKind::PeerRestored, Millis::from_ticks(10));
        recorder.record(TelemetryEventKind::TransmitFailed, Millis::from_ticks(20));

        let fresh: heapless::Vec<TelemetryEventKind, 8> =
            recorder.since(cursor).map(|r| r.event).collect();
        assert_eq!(
            fresh.as_slice(),
            &[
                TelemetryEventKind::PeerRestored,
                TelemetryEventKind::TransmitFailed
            ]
        );
        assert_eq!(recorder.since(recorder.next_id()).count(), 0);
    }
}
