use std::collections::VecDeque;

use signal_core::clock::Millis;
use signal_core::config::TimingConfig;
use signal_core::controller::{NodeController, StatusSink};
use signal_core::coordinator::GlobalState;
use signal_core::light::{LampDriver, LampOutput, LightState};
use signal_core::link::{Frame, RadioLink, TransmitError};
use signal_core::node::{NodeId, Role};
use signal_core::telemetry::{GlobalEvent, StatusReport};

const CYCLE_MS: u32 = 10;

#[test]
fn init_goes_all_red_then_a_green_after_clearance() {
    let mut node = master(TimingConfig::default());
    node.radio_mut().deliver(b"HB:B");
    node.run_cycle(at(0));

    assert_eq!(node.global_state(), Some(GlobalState::AllRed));
    assert_eq!(node.light_state(), LightState::Red);
    assert_eq!(node.radio().commands(), ["CMD:B:R"]);

    run_with_peer(&mut node, CYCLE_MS, 4_990);
    assert_eq!(
        node.global_state(),
        Some(GlobalState::AllRed),
        "clearance must hold for the full 5 s"
    );

    run_with_peer(&mut node, 5_000, 5_000);
    assert_eq!(node.global_state(), Some(GlobalState::AGreen));
    assert_eq!(node.light_state(), LightState::Green);
    assert_eq!(node.radio().commands(), ["CMD:B:R", "CMD:B:R"]);
    assert_eq!(
        node.sink().events,
        [GlobalEvent::AllRedInit, GlobalEvent::AGreen]
    );
}

#[test]
fn full_rotation_alternates_directions_through_all_red() {
    let mut node = master(TimingConfig::default());
    node.radio_mut().deliver(b"HB:B");
    node.run_cycle(at(0));
    run_with_peer(&mut node, CYCLE_MS, 55_000);

    assert_eq!(
        node.sink().events,
        [
            GlobalEvent::AllRedInit,
            GlobalEvent::AGreen,
            GlobalEvent::AllRedAfterA,
            GlobalEvent::BGreen,
            GlobalEvent::AllRedAfterB,
            GlobalEvent::AGreen,
        ]
    );
    assert_eq!(
        node.radio().commands(),
        ["CMD:B:R", "CMD:B:R", "CMD:B:R", "CMD:B:G", "CMD:B:R", "CMD:B:R"]
    );
}

#[test]
fn local_green_ends_through_yellow() {
    let mut node = master(TimingConfig::default());
    node.radio_mut().deliver(b"HB:B");
    node.run_cycle(at(0));
    run_with_peer(&mut node, CYCLE_MS, 25_000);

    assert_eq!(node.global_state(), Some(GlobalState::AllRed));
    assert_eq!(node.light_state(), LightState::Yellow);

    run_with_peer(&mut node, 25_010, 27_990);
    assert_eq!(node.light_state(), LightState::Yellow);

    run_with_peer(&mut node, 28_000, 28_000);
    assert_eq!(node.light_state(), LightState::Red);

    let lamps = &node.light().driver().history;
    assert!(
        lamps.windows(2).all(|pair| !(pair[0].green && pair[1].red)),
        "green must never be followed directly by red"
    );
}

#[test]
fn losing_peer_during_green_fails_safe_immediately() {
    let mut node = master(TimingConfig::from_secs(20, 20, 0));
    node.radio_mut().deliver(b"HB:B");
    node.run_cycle(at(0));
    node.run_cycle(at(CYCLE_MS));
    assert_eq!(node.global_state(), Some(GlobalState::AGreen));

    run_silent(&mut node, 2 * CYCLE_MS, 10_000);
    assert_eq!(
        node.global_state(),
        Some(GlobalState::AGreen),
        "peer is still alive exactly at the timeout"
    );

    node.run_cycle(at(10_010));
    assert_eq!(node.global_state(), Some(GlobalState::Error));
    assert_eq!(node.light_state(), LightState::Error);
    assert_eq!(node.radio().commands().last().copied(), Some("CMD:B:E"));
    assert_eq!(node.sink().events.last(), Some(&GlobalEvent::ErrorNoComm));
}

#[test]
fn new_clearance_applies_to_running_all_red() {
    let mut node = master(TimingConfig::default());
    node.radio_mut().deliver(b"HB:B");
    node.run_cycle(at(0));
    run_with_peer(&mut node, CYCLE_MS, 1_000);

    let applied = node.apply_config("15,10,3").expect("payload is valid");
    assert_eq!(applied, TimingConfig::from_secs(15, 10, 3));
    assert_eq!(node.sink().events.last(), Some(&GlobalEvent::ConfigUpdated));

    run_with_peer(&mut node, 1_010, 2_990);
    assert_eq!(node.global_state(), Some(GlobalState::AllRed));

    run_with_peer(&mut node, 3_000, 3_000);
    assert_eq!(node.global_state(), Some(GlobalState::AGreen));

    run_with_peer(&mut node, 3_010, 17_990);
    assert_eq!(node.global_state(), Some(GlobalState::AGreen));
    run_with_peer(&mut node, 18_000, 18_000);
    assert_eq!(node.global_state(), Some(GlobalState::AllRed));
}

#[test]
fn invalid_config_keeps_previous_timing() {
    let mut node = master(TimingConfig::default());
    assert!(node.apply_config("15;10;3").is_err());
    assert!(node.apply_config("15,10").is_err());

    assert_eq!(node.timing(), Some(TimingConfig::default()));
    assert!(node.sink().events.is_empty());
}

#[test]
fn status_is_published_every_second() {
    let mut node = master(TimingConfig::default());
    node.radio_mut().deliver(b"HB:B");
    node.run_cycle(at(0));
    run_with_peer(&mut node, CYCLE_MS, 5_000);

    let statuses = &node.sink().statuses;
    assert_eq!(statuses.len(), 5);
    assert_eq!(statuses[0], "A,RED,peer_ok");
    assert_eq!(statuses[4], "A,GREEN,peer_ok");
}

fn at(ms: u32) -> Millis {
    Millis::from_ticks(ms)
}

fn master(timing: TimingConfig) -> NodeController<MockRadio, RecordingLamps, RecordingSink> {
    NodeController::new(
        NodeId::A,
        Role::Master,
        MockRadio::default(),
        RecordingLamps::default(),
        RecordingSink::default(),
        at(0),
    )
    .with_timing(timing)
}

/// Runs cycles from `from` to `to` inclusive, with the peer's heartbeat arriving
/// on every whole second.
fn run_with_peer<D, S>(node: &mut NodeController<MockRadio, D, S>, from: u32, to: u32)
where
    D: LampDriver,
    S: StatusSink,
{
    for now in (from..=to).step_by(CYCLE_MS as usize) {
        if now % 1_000 == 0 {
            node.radio_mut().deliver(b"HB:B");
        }
        node.run_cycle(at(now));
    }
}

fn run_silent<D, S>(node: &mut NodeController<MockRadio, D, S>, from: u32, to: u32)
where
    D: LampDriver,
    S: StatusSink,
{
    for now in (from..=to).step_by(CYCLE_MS as usize) {
        node.run_cycle(at(now));
    }
}

#[derive(Default)]
struct MockRadio {
    inbound: VecDeque<Frame>,
    sent: Vec<String>,
}

impl MockRadio {
    fn deliver(&mut self, bytes: &[u8]) {
        self.inbound
            .push_back(Frame::from_slice(bytes).expect("test frame fits"));
    }

    fn commands(&self) -> Vec<&str> {
        self.sent
            .iter()
            .map(String::as_str)
            .filter(|frame| frame.starts_with("CMD:"))
            .collect()
    }
}

impl RadioLink for MockRadio {
    type Error = ();

    fn try_receive(&mut self) -> Option<Frame> {
        self.inbound.pop_front()
    }

    fn try_transmit(&mut self, frame: &[u8]) -> Result<(), TransmitError> {
        self.sent.push(String::from_utf8_lossy(frame).into_owned());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingLamps {
    history: Vec<LampOutput>,
}

impl LampDriver for RecordingLamps {
    fn apply(&mut self, output: LampOutput) {
        self.history.push(output);
    }
}

#[derive(Default)]
struct RecordingSink {
    statuses: Vec<String>,
    events: Vec<GlobalEvent>,
}

impl StatusSink for RecordingSink {
    fn publish_status(&mut self, report: &StatusReport) {
        self.statuses.push(report.to_string());
    }

    fn publish_event(&mut self, event: GlobalEvent) {
        self.events.push(event);
    }
}
