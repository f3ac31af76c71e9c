mod session;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};
use signal_core::config::TimingConfig;
use signal_core::node::NodeId;
use tracing_subscriber::EnvFilter;

use session::{Session, SessionOptions};

/// Host emulator for the two-node crossing controller.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Green time for direction A, in seconds.
    #[arg(long, default_value_t = 20)]
    green_a: u16,

    /// Green time for direction B, in seconds.
    #[arg(long, default_value_t = 20)]
    green_b: u16,

    /// All-red clearance between directions, in seconds.
    #[arg(long, default_value_t = 5)]
    clearance: u16,

    /// Virtual milliseconds per control cycle.
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..=1_000))]
    cycle_ms: u64,

    /// Node that runs the coordinator.
    #[arg(long, value_enum, default_value_t = MasterNode::A)]
    master: MasterNode,

    /// Write a transcript of the session to this file.
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `signal_emulator=trace`. Falls back to `RUST_LOG`.
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum MasterNode {
    A,
    B,
}

impl From<MasterNode> for NodeId {
    fn from(node: MasterNode) -> Self {
        match node {
            MasterNode::A => NodeId::A,
            MasterNode::B => NodeId::B,
        }
    }
}

fn setup_logging(level: Option<&str>) {
    let filter = match level {
        Some(directive) => EnvFilter::new(directive),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
    };

    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> io::Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.log_level.as_deref());

    let options = SessionOptions {
        master: cli.master.into(),
        timing: TimingConfig::from_secs(cli.green_a, cli.green_b, cli.clearance),
        cycle: Duration::from_millis(cli.cycle_ms),
        transcript: cli.transcript,
        ..SessionOptions::default()
    };
    let mut session = Session::new(options)?;

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Crossing emulator ready ({} is master). Type `help` for commands or `exit` to quit.",
        session.master().id()
    )?;

    loop {
        line.clear();
        write!(writer, "[{}] > ", session.now())?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
