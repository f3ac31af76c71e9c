use std::io;
use std::path::PathBuf;

#[allow(dead_code)]
#[path = "../session/mod.rs"]
mod session;

use session::{Session, SessionOptions};

const EVIDENCE_DIR: &str = "evidence";

#[derive(Clone, Copy, Debug)]
enum Scenario {
    NormalCycle,
    LinkLoss,
    ConfigUpdate,
}

impl Scenario {
    const ALL: [Scenario; 3] = [
        Scenario::NormalCycle,
        Scenario::LinkLoss,
        Scenario::ConfigUpdate,
    ];

    fn tag(self) -> &'static str {
        match self {
            Scenario::NormalCycle => "normal-cycle",
            Scenario::LinkLoss => "link-loss",
            Scenario::ConfigUpdate => "config-update",
        }
    }

    fn header(self) -> &'static str {
        match self {
            Scenario::NormalCycle => "Crossing emulator normal cycle transcript",
            Scenario::LinkLoss => "Crossing emulator link loss and recovery transcript",
            Scenario::ConfigUpdate => "Crossing emulator configuration update transcript",
        }
    }

    fn script(self) -> &'static [&'static str] {
        match self {
            Scenario::NormalCycle => &[
                "status",
                "advance 7s",
                "status",
                "advance 25s",
                "status",
                "advance 25s",
                "events",
            ],
            Scenario::LinkLoss => &[
                "advance 7s",
                "link down",
                "advance 9s",
                "status",
                "advance 3s",
                "status",
                "link up",
                "advance 2s",
                "status",
                "advance 5s",
                "mute b",
                "advance 12s",
                "status",
                "unmute b",
                "advance 2s",
                "events",
            ],
            Scenario::ConfigUpdate => &[
                "advance 2s",
                "config 15,10,3",
                "advance 4s",
                "status",
                "config 15;10",
                "config 30,25,70000",
                "advance 30s",
                "status",
            ],
        }
    }
}

fn main() -> io::Result<()> {
    for scenario in Scenario::ALL {
        record(scenario)?;
    }
    Ok(())
}

fn record(scenario: Scenario) -> io::Result<()> {
    let path = PathBuf::from(EVIDENCE_DIR).join(format!("emulator-{}.log", scenario.tag()));
    let options = SessionOptions {
        transcript: Some(path.clone()),
        header: scenario.header().to_string(),
        ..SessionOptions::default()
    };

    let mut session = Session::new(options)?;
    for line in scenario.script() {
        let _ = session.handle_command(line)?;
    }

    println!("{} -> {}", scenario.tag(), path.display());
    Ok(())
}
