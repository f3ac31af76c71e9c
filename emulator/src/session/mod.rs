//! Two-node crossing simulation driven by operator lines.
//!
//! Both nodes run the real `signal-core` controller against an in-memory radio
//! channel and a virtual clock. Simulation controls (`advance`, `link`, `mute`,
//! `events`) are handled here; everything else goes to the node console.

mod air;
mod grammar;
mod transcript;

use std::io;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use signal_core::clock::Millis;
use signal_core::config::{CONFIG_TOPIC, ConfigOutcome, TimingConfig};
use signal_core::console::{self, ConsoleCommand, ConsoleError, HELP_TOPICS};
use signal_core::controller::NodeController;
use signal_core::node::{NodeId, Role};
use signal_core::telemetry::{EventId, GLOBAL_TOPIC, TelemetryEventKind, TelemetryRecord};
use tracing::{debug, info, warn};

use air::{Air, AirRadio, BusSink, LampTrace, slot};
use grammar::SimCommand;
use transcript::{TranscriptLogger, TranscriptRole};

/// Controller type both simulated nodes share.
pub type SimNode = NodeController<AirRadio, LampTrace, BusSink>;

/// Virtual time between two control cycles.
pub const DEFAULT_CYCLE: Duration = Duration::from_millis(10);

/// Records listed per node by `events`.
const EVENTS_SHOWN: usize = 12;

#[derive(Clone, Debug)]
pub struct SessionOptions {
    pub master: NodeId,
    pub timing: TimingConfig,
    pub cycle: Duration,
    pub transcript: Option<PathBuf>,
    pub header: String,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            master: NodeId::A,
            timing: TimingConfig::default(),
            cycle: DEFAULT_CYCLE,
            transcript: None,
            header: "Two-node crossing emulator transcript".to_string(),
        }
    }
}

pub struct Session {
    air: Rc<Air>,
    nodes: [SimNode; 2],
    master: NodeId,
    now: Millis,
    cycle: Duration,
    reported: [EventId; 2],
    transcript: Option<TranscriptLogger>,
}

impl Session {
    pub fn new(options: SessionOptions) -> io::Result<Self> {
        let air = Air::new();
        let build = |id: NodeId| {
            let role = if id == options.master {
                Role::Master
            } else {
                Role::Slave
            };
            NodeController::new(
                id,
                role,
                AirRadio::new(id, air.clone()),
                LampTrace::new(id),
                BusSink::default(),
                Millis::ZERO,
            )
            .with_timing(options.timing)
        };
        let nodes = [build(NodeId::A), build(NodeId::B)];

        let transcript = options
            .transcript
            .as_deref()
            .map(|path| TranscriptLogger::create(path, &options.header))
            .transpose()?;

        info!(master = %options.master, timing = %options.timing, "session started");

        Ok(Self {
            air,
            nodes,
            master: options.master,
            now: Millis::ZERO,
            cycle: options.cycle.max(Duration::from_millis(1)),
            reported: [0; 2],
            transcript,
        })
    }

    /// Handles one operator line and returns the response lines.
    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        self.append(TranscriptRole::Host, trimmed)?;
        let lines = match grammar::parse(trimmed) {
            Some(command) => self.run_sim(command),
            None => self.run_console(trimmed),
        };
        for line in &lines {
            self.append(TranscriptRole::Emulator, line)?;
        }
        Ok(lines)
    }

    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn node(&self, id: NodeId) -> &SimNode {
        &self.nodes[slot(id)]
    }

    pub fn master(&self) -> &SimNode {
        self.node(self.master)
    }

    /// Runs the simulation forward, returning what happened in the meantime.
    pub fn advance(&mut self, span: Duration) -> Vec<String> {
        let mut lines = Vec::new();
        let mut remaining = span;
        while !remaining.is_zero() {
            let step = remaining.min(self.cycle);
            remaining -= step;
            self.now = self.now + step;
            for node in &mut self.nodes {
                node.run_cycle(self.now);
            }
            lines.extend(self.collect());
        }
        lines.push(format!("OK advanced to {}", self.now));
        lines
    }

    fn run_sim(&mut self, command: SimCommand) -> Vec<String> {
        match command {
            SimCommand::Advance(span) => self.advance(span),
            SimCommand::Link { up } => {
                self.air.set_link(up);
                info!(up, "radio link changed");
                vec![format!("OK link {}", if up { "up" } else { "down" })]
            }
            SimCommand::Mute(node) => {
                self.air.set_muted(node, true);
                info!(%node, "transmitter muted");
                vec![format!("OK mute {node}")]
            }
            SimCommand::Unmute(node) => {
                self.air.set_muted(node, false);
                info!(%node, "transmitter unmuted");
                vec![format!("OK unmute {node}")]
            }
            SimCommand::Events => self.events(),
        }
    }

    fn run_console(&mut self, line: &str) -> Vec<String> {
        match console::parse(line) {
            Ok(ConsoleCommand::Config(timing)) => self.publish_config(timing),
            Ok(ConsoleCommand::Help { topic: None }) => help_index(),
            Ok(ConsoleCommand::Status) => {
                let mut lines = self.execute_on(self.master, line);
                lines.extend(self.execute_on(self.master.peer(), line));
                lines.push(format!(
                    "radio link={} mute-a={} mute-b={}",
                    on_off(self.air.link_up(), "up", "down"),
                    on_off(self.air.is_muted(NodeId::A), "on", "off"),
                    on_off(self.air.is_muted(NodeId::B), "on", "off"),
                ));
                lines
            }
            Ok(ConsoleCommand::Help { .. }) => self.execute_on(self.master, line),
            Err(err) => vec![ConsoleError::from(err).to_string()],
        }
    }

    fn execute_on(&mut self, node: NodeId, line: &str) -> Vec<String> {
        let reply = match console::execute(line, &mut self.nodes[slot(node)]) {
            Ok(reply) => reply.to_string(),
            Err(err) => err.to_string(),
        };
        reply.lines().map(str::to_owned).collect()
    }

    /// Delivers a configuration payload to the master as the broker would.
    fn publish_config(&mut self, timing: TimingConfig) -> Vec<String> {
        let payload = format!(
            "{},{},{}",
            timing.green_a.as_secs(),
            timing.green_b.as_secs(),
            timing.clearance.as_secs()
        );
        info!(topic = CONFIG_TOPIC, %payload, "config published");

        let master = slot(self.master);
        let mut lines = vec![format!("{CONFIG_TOPIC} {payload}")];
        lines.push(match self.nodes[master].on_remote_message(CONFIG_TOPIC, &payload) {
            ConfigOutcome::Applied(applied) => format!("OK config {applied}"),
            ConfigOutcome::Rejected(err) => format!("ERR config {err}"),
            ConfigOutcome::Ignored => "ERR config not subscribed".to_string(),
        });
        lines.extend(self.collect());
        lines
    }

    fn events(&self) -> Vec<String> {
        let mut lines = Vec::new();
        for node in &self.nodes {
            lines.push(format!("{} ({}):", node.id(), node.role()));
            let records: Vec<&TelemetryRecord> = node.telemetry().oldest_first().collect();
            let skip = records.len().saturating_sub(EVENTS_SHOWN);
            lines.extend(records[skip..].iter().map(|record| format!("  {record}")));
        }
        lines
    }

    /// Drains publications and new telemetry from both nodes.
    fn collect(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        let now = self.now;
        for (index, node) in self.nodes.iter_mut().enumerate() {
            let id = node.id();
            for publication in node.sink_mut().drain() {
                if publication.topic == GLOBAL_TOPIC {
                    lines.push(format!(
                        "[{:>6} ms] {} {}",
                        now.ticks(),
                        publication.topic,
                        publication.payload
                    ));
                }
            }

            for record in node.telemetry().since(self.reported[index]) {
                log_record(id, record);
                if is_notable(&record.event) {
                    lines.push(format!(
                        "[{:>6} ms] {} {}",
                        record.timestamp.ticks(),
                        id,
                        record.event
                    ));
                }
            }
            self.reported[index] = node.telemetry().next_id();
        }
        lines
    }

    fn append(&mut self, role: TranscriptRole, line: &str) -> io::Result<()> {
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(self.now, role, line),
            None => Ok(()),
        }
    }
}

fn is_notable(event: &TelemetryEventKind) -> bool {
    !matches!(
        event,
        TelemetryEventKind::CommandSent { .. }
            | TelemetryEventKind::CommandReceived(_)
            | TelemetryEventKind::GlobalTransition { .. }
    )
}

fn log_record(node: NodeId, record: &TelemetryRecord) {
    match record.event {
        TelemetryEventKind::PeerLost
        | TelemetryEventKind::TransmitFailed
        | TelemetryEventKind::FrameDropped { .. }
        | TelemetryEventKind::ConfigRejected(_) => {
            warn!(%node, at = %record.timestamp, event = %record.event, "telemetry");
        }
        _ => debug!(%node, at = %record.timestamp, event = %record.event, "telemetry"),
    }
}

fn help_index() -> Vec<String> {
    let mut lines = vec!["Available commands:".to_string()];
    lines.extend(HELP_TOPICS.iter().map(|(_, text)| format!("  {text}")));
    lines.extend(grammar::SIM_HELP.iter().map(|text| format!("  {text}")));
    lines.push("Type `help <topic>` for a specific command.".to_string());
    lines
}

fn on_off(flag: bool, on: &'static str, off: &'static str) -> &'static str {
    if flag { on } else { off }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::coordinator::GlobalState;
    use signal_core::light::LightState;

    fn session() -> Session {
        Session::new(SessionOptions::default()).expect("session without transcript")
    }

    fn run(session: &mut Session, line: &str) -> Vec<String> {
        session.handle_command(line).expect("no transcript io")
    }

    #[test]
    fn first_green_goes_to_a_after_clearance() {
        let mut session = session();
        let lines = run(&mut session, "advance 7s");

        assert!(
            lines.iter().any(|line| line.ends_with("traffic/global A_GREEN")),
            "expected A_GREEN publication, got {lines:#?}"
        );
        assert_eq!(session.master().global_state(), Some(GlobalState::AGreen));
        assert_eq!(session.node(NodeId::B).light_state(), LightState::Red);

        let status = run(&mut session, "status");
        assert_eq!(status[0], "OK status A,GREEN,peer_ok");
        assert!(status.iter().any(|line| line == "OK status B,RED,peer_ok"));
    }

    #[test]
    fn link_down_fails_both_nodes_safe() {
        let mut session = session();
        run(&mut session, "advance 7s");
        run(&mut session, "link down");
        let lines = run(&mut session, "advance 12s");

        assert!(lines.iter().any(|line| line.ends_with("traffic/global ERROR_NO_COMM")));
        assert_eq!(session.master().light_state(), LightState::Error);
        assert_eq!(session.node(NodeId::B).light_state(), LightState::Error);

        run(&mut session, "link up");
        run(&mut session, "advance 2s");
        assert_eq!(session.master().global_state(), Some(GlobalState::AllRed));
        assert_eq!(session.node(NodeId::B).light_state(), LightState::Red);
    }

    #[test]
    fn muted_slave_is_blinked_by_master_command() {
        let mut session = session();
        run(&mut session, "advance 7s");
        run(&mut session, "mute b");
        run(&mut session, "advance 12s");

        assert_eq!(session.master().global_state(), Some(GlobalState::Error));
        assert!(session.node(NodeId::B).peer_alive());
        assert_eq!(session.node(NodeId::B).light_state(), LightState::Error);
    }

    #[test]
    fn config_reaches_master_through_topic() {
        let mut session = session();
        let lines = run(&mut session, "config 15, 10, 3");

        assert_eq!(lines[0], "traffic/config 15,10,3");
        assert_eq!(lines[1], "OK config green A 15s, green B 10s, clearance 3s");
        assert_eq!(
            session.master().timing(),
            Some(TimingConfig::from_secs(15, 10, 3))
        );
    }

    #[test]
    fn unknown_lines_report_syntax_errors() {
        let mut session = session();
        let lines = run(&mut session, "reboot now");

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("ERR syntax"), "got {}", lines[0]);
    }

    #[test]
    fn events_lists_both_nodes() {
        let mut session = session();
        run(&mut session, "advance 2s");
        let lines = run(&mut session, "events");

        assert_eq!(lines[0], "A (master):");
        assert!(lines.iter().any(|line| line == "B (slave):"));
        assert!(lines.iter().any(|line| line.contains("peer-restored")));
    }

    #[test]
    fn help_lists_simulation_controls() {
        let mut session = session();
        let lines = run(&mut session, "help");

        assert!(lines.iter().any(|line| line.contains("advance")));
        assert!(lines.iter().any(|line| line.contains("config")));
    }
}
