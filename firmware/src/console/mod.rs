//! USB console plumbing between the CDC task and the control task.
//!
//! The USB task assembles operator lines and hands them over through
//! [`ConsoleQueue`]; the control task answers with [`respond`] and also pushes
//! the master's status and global publications onto the same output channel,
//! which is the firmware's gateway toward the broker host.

use core::fmt::{self, Write as _};
use core::str;

use embassy_sync::channel::{Channel, Receiver, Sender};
use heapless::{String, Vec};
use signal_core::console::{self, ConsoleReply, MAX_LINE_LEN};
use signal_core::controller::{NodeController, StatusSink};
use signal_core::light::LampDriver;
use signal_core::link::RadioLink;
use signal_core::telemetry::{GLOBAL_TOPIC, GlobalEvent, STATUS_TOPIC, StatusReport};

use crate::status;
use crate::sync::TaskMutex;

/// Longest output line including the CRLF terminator.
pub const OUTPUT_LINE_LEN: usize = 128;
const INPUT_QUEUE_DEPTH: usize = 2;
const OUTPUT_QUEUE_DEPTH: usize = 8;

pub type ConsoleLine = Vec<u8, MAX_LINE_LEN>;
pub type OutputLine = String<OUTPUT_LINE_LEN>;

pub type LineSender<'a> = Sender<'a, TaskMutex, ConsoleLine, INPUT_QUEUE_DEPTH>;
pub type LineReceiver<'a> = Receiver<'a, TaskMutex, ConsoleLine, INPUT_QUEUE_DEPTH>;
pub type OutputSender<'a> = Sender<'a, TaskMutex, OutputLine, OUTPUT_QUEUE_DEPTH>;
pub type OutputReceiver<'a> = Receiver<'a, TaskMutex, OutputLine, OUTPUT_QUEUE_DEPTH>;

/// Channels shared by the USB and control tasks.
pub struct ConsoleQueue {
    lines_in: Channel<TaskMutex, ConsoleLine, INPUT_QUEUE_DEPTH>,
    text_out: Channel<TaskMutex, OutputLine, OUTPUT_QUEUE_DEPTH>,
}

impl ConsoleQueue {
    pub const fn new() -> Self {
        Self {
            lines_in: Channel::new(),
            text_out: Channel::new(),
        }
    }

    pub fn line_sender(&self) -> LineSender<'_> {
        self.lines_in.sender()
    }

    pub fn line_receiver(&self) -> LineReceiver<'_> {
        self.lines_in.receiver()
    }

    pub fn output_sender(&self) -> OutputSender<'_> {
        self.text_out.sender()
    }

    pub fn output_receiver(&self) -> OutputReceiver<'_> {
        self.text_out.receiver()
    }
}

impl Default for ConsoleQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Publishes status lines and global events onto the console output.
///
/// Publications are dropped while no host holds the console open, and when the
/// output queue is full; the next status line supersedes a lost one.
pub struct ConsoleSink<'a> {
    out: OutputSender<'a>,
}

impl<'a> ConsoleSink<'a> {
    pub fn new(out: OutputSender<'a>) -> Self {
        Self { out }
    }

    fn publish(&mut self, topic: &str, payload: fmt::Arguments<'_>) {
        if !status::console_attached() {
            return;
        }

        let mut line = OutputLine::new();
        if write!(line, "{topic} {payload}\r\n").is_err() {
            return;
        }
        let _ = self.out.try_send(line);
    }
}

impl StatusSink for ConsoleSink<'_> {
    fn publish_status(&mut self, report: &StatusReport) {
        self.publish(STATUS_TOPIC, format_args!("{report}"));
    }

    fn publish_event(&mut self, event: GlobalEvent) {
        self.publish(GLOBAL_TOPIC, format_args!("{}", event.label()));
    }
}

/// Runs one operator line against the controller and emits the reply, one
/// CRLF-terminated output line at a time.
pub fn respond<R, D, S, F>(line: &[u8], controller: &mut NodeController<R, D, S>, emit: F)
where
    R: RadioLink,
    D: LampDriver,
    S: StatusSink,
    F: FnMut(OutputLine),
{
    let mut out = LineWriter::new(emit);

    let Ok(text) = str::from_utf8(line) else {
        let _ = out.write_str("ERR invalid utf-8");
        out.finish();
        return;
    };

    let _ = match console::execute(text, controller) {
        Ok(reply @ ConsoleReply::Status { .. }) => {
            write!(out, "{reply}\n{}", status::snapshot())
        }
        Ok(reply) => write!(out, "{reply}"),
        Err(err) => write!(out, "{err}"),
    };
    out.finish();
}

/// Splits formatted text on `\n` and wraps lines that outgrow an output frame.
struct LineWriter<F: FnMut(OutputLine)> {
    line: OutputLine,
    emit: F,
}

impl<F: FnMut(OutputLine)> LineWriter<F> {
    // Room left for the CRLF appended on flush.
    const CONTENT_LEN: usize = OUTPUT_LINE_LEN - 2;

    fn new(emit: F) -> Self {
        Self {
            line: OutputLine::new(),
            emit,
        }
    }

    fn flush(&mut self) {
        let mut line = core::mem::take(&mut self.line);
        let _ = line.push_str("\r\n");
        (self.emit)(line);
    }

    fn finish(mut self) {
        if !self.line.is_empty() {
            self.flush();
        }
    }
}

impl<F: FnMut(OutputLine)> fmt::Write for LineWriter<F> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if ch == '\n' {
                self.flush();
                continue;
            }
            if self.line.len() + ch.len_utf8() > Self::CONTENT_LEN {
                self.flush();
            }
            let _ = self.line.push(ch);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write as _;
    use signal_core::clock::Millis;
    use signal_core::config::TimingConfig;
    use signal_core::controller::NoopStatusSink;
    use signal_core::light::{LightState, NoopLampDriver};
    use signal_core::link::NoopRadio;
    use signal_core::node::{NodeId, Role};
    use std::string::String as StdString;
    use std::vec::Vec as StdVec;

    fn master() -> NodeController<NoopRadio> {
        NodeController::new(
            NodeId::A,
            Role::Master,
            NoopRadio,
            NoopLampDriver::new(),
            NoopStatusSink,
            Millis::ZERO,
        )
    }

    fn run(line: &[u8], controller: &mut NodeController<NoopRadio>) -> StdVec<StdString> {
        let mut lines = StdVec::new();
        respond(line, controller, |out| lines.push(StdString::from(out.as_str())));
        lines
    }

    #[test]
    fn status_reply_ends_with_link_counters() {
        let mut node = master();
        let lines = run(b"status", &mut node);

        assert_eq!(lines[0], "OK status A,RED,peer_lost\r\n");
        assert!(
            lines.last().is_some_and(|line| line.starts_with("radio rx=")),
            "link counters should close the status reply: {lines:?}"
        );
        assert!(lines.iter().all(|line| line.ends_with("\r\n")));
    }

    #[test]
    fn config_line_retunes_master() {
        let mut node = master();
        let lines = run(b"CONFIG 15,10,3", &mut node);

        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("OK config"), "unexpected reply {lines:?}");
        assert_eq!(node.timing(), Some(TimingConfig::from_secs(15, 10, 3)));
    }

    #[test]
    fn rejected_lines_report_errors() {
        let mut node = master();

        assert!(run(b"reboot now", &mut node)[0].starts_with("ERR syntax"));
        assert!(run(b"config 15;10", &mut node)[0].starts_with("ERR syntax"));
        assert_eq!(run(&[0xff, 0xfe], &mut node), ["ERR invalid utf-8\r\n"]);
    }

    #[test]
    fn help_index_is_split_into_lines() {
        let mut node = master();
        let lines = run(b"help", &mut node);

        assert_eq!(lines[0], "Available commands:\r\n");
        assert_eq!(lines.len(), 1 + console::HELP_TOPICS.len());
    }

    #[test]
    fn long_output_wraps_at_frame_size() {
        let mut lines = StdVec::new();
        let mut writer = LineWriter::new(|out: OutputLine| lines.push(StdString::from(out.as_str())));
        for _ in 0..OUTPUT_LINE_LEN {
            writer.write_str("x").unwrap();
        }
        writer.finish();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].len(), OUTPUT_LINE_LEN);
    }

    #[test]
    fn publications_wait_for_an_attached_host() {
        let queue = ConsoleQueue::new();
        let mut sink = ConsoleSink::new(queue.output_sender());
        let receiver = queue.output_receiver();

        status::set_console_attached(false);
        sink.publish_event(GlobalEvent::AGreen);
        assert!(receiver.try_receive().is_err(), "nothing goes out without a host");

        status::set_console_attached(true);
        sink.publish_status(&StatusReport::new(NodeId::A, LightState::Green, true));
        sink.publish_event(GlobalEvent::AGreen);
        status::set_console_attached(false);

        assert_eq!(
            receiver.try_receive().map(|line| StdString::from(line.as_str())),
            Ok(StdString::from("traffic/status A,GREEN,peer_ok\r\n"))
        );
        assert_eq!(
            receiver.try_receive().map(|line| StdString::from(line.as_str())),
            Ok(StdString::from("traffic/global A_GREEN\r\n"))
        );
    }
}
