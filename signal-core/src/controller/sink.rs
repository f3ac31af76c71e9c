use crate::telemetry::{GlobalEvent, StatusReport};

/// Outbound side of the pub/sub collaborator.
///
/// The master publishes its status line on a fixed cadence and a label for
/// every global transition. Both are published retained, so a late subscriber
/// sees the latest value. Implementations must not block the control cycle.
pub trait StatusSink {
    /// Publishes the status line on the status topic.
    fn publish_status(&mut self, report: &StatusReport);

    /// Publishes a global event label on the global topic.
    fn publish_event(&mut self, event: GlobalEvent);
}

/// Sink that discards everything.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopStatusSink;

impl StatusSink for NoopStatusSink {
    fn publish_status(&mut self, _: &StatusReport) {}

    fn publish_event(&mut self, _: GlobalEvent) {}
}

impl<S: StatusSink + ?Sized> StatusSink for &mut S {
    fn publish_status(&mut self, report: &StatusReport) {
        (**self).publish_status(report);
    }

    fn publish_event(&mut self, event: GlobalEvent) {
        (**self).publish_event(event);
    }
}
