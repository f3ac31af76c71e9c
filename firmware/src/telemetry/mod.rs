//! Mirrors the controller's telemetry ring onto the firmware log.
//!
//! The core records structured events but never logs. After every control
//! cycle the control task drains what is new into defmt (or stdout on host
//! builds) so bring-up can follow lamp changes and link health over RTT.

use signal_core::telemetry::{EventId, TelemetryEventKind, TelemetryRecord, TelemetryRecorder};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Severity {
    Info,
    Warn,
}

fn severity(event: &TelemetryEventKind) -> Severity {
    match event {
        TelemetryEventKind::PeerLost
        | TelemetryEventKind::FrameDropped { .. }
        | TelemetryEventKind::TransmitFailed
        | TelemetryEventKind::ConfigRejected(_) => Severity::Warn,
        _ => Severity::Info,
    }
}

/// Cursor over the telemetry ring remembering what was already logged.
pub struct TelemetryLog {
    next: EventId,
}

impl TelemetryLog {
    pub const fn new() -> Self {
        Self { next: 0 }
    }

    /// Logs records added since the previous drain and returns how many.
    ///
    /// Records overwritten in the ring before a drain are skipped silently.
    pub fn drain<const N: usize>(&mut self, recorder: &TelemetryRecorder<N>) -> usize {
        let mut logged = 0;
        for record in recorder.since(self.next) {
            emit(record);
            logged += 1;
        }
        self.next = recorder.next_id();
        logged
    }
}

impl Default for TelemetryLog {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(target_os = "none")]
fn emit(record: &TelemetryRecord) {
    match severity(&record.event) {
        Severity::Info => defmt::info!("telemetry: {}", defmt::Display2Format(record)),
        Severity::Warn => defmt::warn!("telemetry: {}", defmt::Display2Format(record)),
    }
}

#[cfg(not(target_os = "none"))]
fn emit(record: &TelemetryRecord) {
    match severity(&record.event) {
        Severity::Info => println!("telemetry: {record}"),
        Severity::Warn => println!("telemetry: warn {record}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signal_core::clock::Millis;
    use signal_core::light::LightState;

    #[test]
    fn drain_only_logs_new_records() {
        let mut recorder: TelemetryRecorder = TelemetryRecorder::new();
        let mut log = TelemetryLog::new();

        recorder.record(TelemetryEventKind::PeerLost, Millis::from_ticks(10));
        recorder.record(TelemetryEventKind::PeerRestored, Millis::from_ticks(20));
        assert_eq!(log.drain(&recorder), 2);
        assert_eq!(log.drain(&recorder), 0, "second drain has nothing new");

        recorder.record(
            TelemetryEventKind::LightChanged {
                from: LightState::Red,
                to: LightState::Green,
            },
            Millis::from_ticks(30),
        );
        assert_eq!(log.drain(&recorder), 1);
    }

    #[test]
    fn overwritten_records_are_skipped() {
        let mut recorder: TelemetryRecorder<4> = TelemetryRecorder::new();
        let mut log = TelemetryLog::new();

        for tick in 0..10 {
            recorder.record(TelemetryEventKind::TransmitFailed, Millis::from_ticks(tick));
        }

        assert_eq!(log.drain(&recorder), 4, "only what the ring still holds");
    }

    #[test]
    fn link_faults_log_as_warnings() {
        assert_eq!(severity(&TelemetryEventKind::PeerLost), Severity::Warn);
        assert_eq!(severity(&TelemetryEventKind::PeerRestored), Severity::Info);
    }
}
