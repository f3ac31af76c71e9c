//! Node controller: one owned context per node running the control cycle.
//!
//! A cycle takes a single timestamp and performs, in order:
//!
//! 1. time-driven light update (yellow expiry, fail-safe blink);
//! 2. drain of inbound radio frames, bounded per cycle;
//! 3. heartbeat transmission on its own cadence;
//! 4. peer liveness re-evaluation;
//! 5. master: coordinator evaluation and status publication;
//!    slave: fail-safe when the master is unreachable.
//!
//! Master-only parts (coordinator, timing, configuration listener) exist only
//! when the node is built with [`Role::Master`].

use core::time::Duration;

use crate::clock::Millis;
use crate::config::{ConfigError, ConfigListener, ConfigOutcome, TimingConfig};
use crate::coordinator::{Coordinator, GlobalState, Transition};
use crate::light::{CommandedState, LampDriver, LightState, NoopLampDriver, TrafficLight};
use crate::link::codec::{self, WireMessage};
use crate::link::{Frame, PeerLiveness, RadioLink};
use crate::node::{NodeId, Role};
use crate::telemetry::{
    GlobalEvent, STATUS_PUBLISH_INTERVAL, StatusReport, TelemetryEventKind, TelemetryRecorder,
};

mod sink;

pub use sink::{NoopStatusSink, StatusSink};

/// Cadence of outbound heartbeats.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(1_000);

/// Inbound frames handled per cycle; the rest wait for the next pass.
pub const MAX_FRAMES_PER_CYCLE: usize = 8;

struct MasterState {
    coordinator: Coordinator,
    timing: TimingConfig,
    listener: ConfigListener,
    status_published_at: Millis,
}

/// Everything one node owns: light, liveness, transport, and (on the master)
/// the coordinator with its timing.
pub struct NodeController<R, D = NoopLampDriver, S = NoopStatusSink> {
    id: NodeId,
    role: Role,
    light: TrafficLight<D>,
    liveness: PeerLiveness,
    peer_alive: bool,
    radio: R,
    sink: S,
    heartbeat_sent_at: Millis,
    last_cycle_at: Millis,
    master: Option<MasterState>,
    telemetry: TelemetryRecorder,
}

impl<R, D, S> NodeController<R, D, S>
where
    R: RadioLink,
    D: LampDriver,
    S: StatusSink,
{
    /// Builds the controller at power-up: light red, peer unknown, master parts
    /// present only for [`Role::Master`].
    pub fn new(id: NodeId, role: Role, radio: R, driver: D, sink: S, now: Millis) -> Self {
        let master = role.is_master().then(|| MasterState {
            coordinator: Coordinator::new(id),
            timing: TimingConfig::default(),
            listener: ConfigListener::new(),
            status_published_at: now,
        });

        Self {
            id,
            role,
            light: TrafficLight::new(driver, now),
            liveness: PeerLiveness::new(),
            peer_alive: false,
            radio,
            sink,
            heartbeat_sent_at: now,
            last_cycle_at: now,
            master,
            telemetry: TelemetryRecorder::new(),
        }
    }

    /// Replaces the master's starting timing. No effect on a slave.
    #[must_use]
    pub fn with_timing(mut self, timing: TimingConfig) -> Self {
        if let Some(master) = self.master.as_mut() {
            master.timing = timing;
        }
        self
    }

    /// Runs one control cycle at `now`.
    pub fn run_cycle(&mut self, now: Millis) {
        self.last_cycle_at = now;

        if let Some(change) = self.light.update(now)
            && change.is_transition()
        {
            self.record(TelemetryEventKind::LightChanged {
                from: change.from,
                to: change.to,
            });
        }

        for _ in 0..MAX_FRAMES_PER_CYCLE {
            let Some(frame) = self.radio.try_receive() else {
                break;
            };
            self.handle_frame(&frame, now);
        }

        if now.has_elapsed(self.heartbeat_sent_at, HEARTBEAT_INTERVAL) {
            self.heartbeat_sent_at = now;
            self.transmit(&codec::encode_heartbeat(self.id), None);
        }

        let alive = self.liveness.expire(now);
        if alive != self.peer_alive {
            self.peer_alive = alive;
            self.record(if alive {
                TelemetryEventKind::PeerRestored
            } else {
                TelemetryEventKind::PeerLost
            });
        }

        if self.master.is_some() {
            self.run_master(now);
        } else if !alive {
            // Slave fail-safe; recovery comes from the master's next command.
            self.command_light(CommandedState::Error, now);
        }
    }

    /// Handles one received frame. Malformed frames are dropped.
    pub fn handle_frame(&mut self, frame: &[u8], now: Millis) {
        match codec::decode(frame) {
            Ok(WireMessage::Heartbeat { from }) => {
                if from != self.id {
                    self.liveness.on_message_from_peer(now);
                }
            }
            Ok(WireMessage::Command { target, state }) => {
                if target == self.id {
                    self.record(TelemetryEventKind::CommandReceived(state));
                    self.command_light(state, now);
                    self.liveness.on_message_from_peer(now);
                }
            }
            Err(_) => {
                let len = u8::try_from(frame.len()).unwrap_or(u8::MAX);
                self.record(TelemetryEventKind::FrameDropped { len });
            }
        }
    }

    /// Applies a configuration payload to the master's timing.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Malformed`] for a bad payload (timing unchanged), or
    /// [`ConfigError::NotMaster`] on a slave.
    pub fn apply_config(&mut self, payload: &str) -> Result<TimingConfig, ConfigError> {
        let parsed = if self.master.is_some() {
            TimingConfig::parse(payload)
        } else {
            Err(ConfigError::NotMaster)
        };
        match parsed {
            Ok(timing) => self.set_timing(timing),
            Err(err) => {
                self.note_config(Err(err));
                Err(err)
            }
        }
    }

    /// Replaces the master's timing with already validated values.
    ///
    /// # Errors
    ///
    /// [`ConfigError::NotMaster`] on a slave.
    pub fn set_timing(&mut self, timing: TimingConfig) -> Result<TimingConfig, ConfigError> {
        let result = match self.master.as_mut() {
            Some(master) => {
                master.timing = timing;
                Ok(timing)
            }
            None => Err(ConfigError::NotMaster),
        };
        self.note_config(result);
        result
    }

    /// Routes a pub/sub message to the configuration listener. Slaves do not
    /// subscribe and ignore everything.
    pub fn on_remote_message(&mut self, topic: &str, payload: &str) -> ConfigOutcome {
        let outcome = match self.master.as_mut() {
            Some(master) => master
                .listener
                .on_message(topic, payload, &mut master.timing),
            None => return ConfigOutcome::Ignored,
        };

        match outcome {
            ConfigOutcome::Applied(timing) => self.note_config(Ok(timing)),
            ConfigOutcome::Rejected(err) => self.note_config(Err(err)),
            ConfigOutcome::Ignored => {}
        }
        outcome
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn light(&self) -> &TrafficLight<D> {
        &self.light
    }

    pub fn light_state(&self) -> LightState {
        self.light.state()
    }

    /// Peer liveness as sampled by the last cycle.
    pub fn peer_alive(&self) -> bool {
        self.peer_alive
    }

    pub fn liveness(&self) -> &PeerLiveness {
        &self.liveness
    }

    /// Global state, on the master.
    pub fn global_state(&self) -> Option<GlobalState> {
        self.master
            .as_ref()
            .map(|master| master.coordinator.state())
    }

    /// Current timing, on the master.
    pub fn timing(&self) -> Option<TimingConfig> {
        self.master.as_ref().map(|master| master.timing)
    }

    /// Status line content for this node.
    pub fn status(&self) -> StatusReport {
        StatusReport::new(self.id, self.light.state(), self.peer_alive)
    }

    pub fn telemetry(&self) -> &TelemetryRecorder {
        &self.telemetry
    }

    pub fn radio(&self) -> &R {
        &self.radio
    }

    pub fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    fn run_master(&mut self, now: Millis) {
        let alive = self.peer_alive;
        let transition = self.master.as_mut().and_then(|master| {
            master
                .coordinator
                .evaluate(now, alive, &master.timing)
        });
        if let Some(transition) = transition {
            self.apply_transition(transition);
        }

        let status_due = match self.master.as_mut() {
            Some(master) if now.has_elapsed(master.status_published_at, STATUS_PUBLISH_INTERVAL) => {
                master.status_published_at = now;
                true
            }
            _ => false,
        };
        if status_due {
            let report = self.status();
            self.sink.publish_status(&report);
        }
    }

    fn apply_transition(&mut self, transition: Transition) {
        self.record(TelemetryEventKind::GlobalTransition {
            from: transition.from,
            to: transition.to,
            event: transition.event,
        });
        self.command_light(transition.local, transition.at);

        let target = self.id.peer();
        let frame = codec::encode_command(target, transition.peer);
        self.transmit(
            &frame,
            Some(TelemetryEventKind::CommandSent {
                target,
                state: transition.peer,
            }),
        );

        self.sink.publish_event(transition.event);
    }

    fn command_light(&mut self, state: CommandedState, now: Millis) {
        if let Some(change) = self.light.command(state, now)
            && change.is_transition()
        {
            self.record(TelemetryEventKind::LightChanged {
                from: change.from,
                to: change.to,
            });
        }
    }

    fn transmit(&mut self, frame: &Frame, on_success: Option<TelemetryEventKind>) {
        match self.radio.try_transmit(frame) {
            Ok(()) => {
                if let Some(event) = on_success {
                    self.record(event);
                }
            }
            Err(_) => self.record(TelemetryEventKind::TransmitFailed),
        }
    }

    /// Records a configuration outcome and announces applied timing.
    fn note_config(&mut self, result: Result<TimingConfig, ConfigError>) {
        match result {
            Ok(timing) => {
                self.record(TelemetryEventKind::ConfigApplied(timing));
                self.sink.publish_event(GlobalEvent::ConfigUpdated);
            }
            Err(err) => self.record(TelemetryEventKind::ConfigRejected(err)),
        }
    }

    fn record(&mut self, event: TelemetryEventKind) {
        self.telemetry.record(event, self.last_cycle_at);
    }
}
