//! In-memory stand-ins for the radio channel, the pub/sub broker, and the lamps.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use signal_core::controller::StatusSink;
use signal_core::light::{LampDriver, LampOutput};
use signal_core::link::{Frame, RadioLink, TransmitError};
use signal_core::node::NodeId;
use signal_core::telemetry::{GLOBAL_TOPIC, GlobalEvent, PUBLISHER_CLIENT_ID, STATUS_TOPIC, StatusReport};
use tracing::{debug, trace};

/// Frames a receiver can hold before the modem starts dropping them.
const AIR_QUEUE_DEPTH: usize = 32;

/// Shared radio channel between the two nodes.
#[derive(Debug)]
pub struct Air {
    inboxes: [RefCell<VecDeque<Frame>>; 2],
    link_up: Cell<bool>,
    muted: [Cell<bool>; 2],
}

impl Air {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            inboxes: [RefCell::default(), RefCell::default()],
            link_up: Cell::new(true),
            muted: [Cell::new(false), Cell::new(false)],
        })
    }

    pub fn set_link(&self, up: bool) {
        self.link_up.set(up);
    }

    pub fn link_up(&self) -> bool {
        self.link_up.get()
    }

    pub fn set_muted(&self, node: NodeId, muted: bool) {
        self.muted[slot(node)].set(muted);
    }

    pub fn is_muted(&self, node: NodeId) -> bool {
        self.muted[slot(node)].get()
    }

    fn carries_from(&self, sender: NodeId) -> bool {
        self.link_up.get() && !self.is_muted(sender)
    }
}

/// One node's modem on the shared channel.
pub struct AirRadio {
    node: NodeId,
    air: Rc<Air>,
}

impl AirRadio {
    pub fn new(node: NodeId, air: Rc<Air>) -> Self {
        Self { node, air }
    }
}

impl RadioLink for AirRadio {
    type Error = ();

    fn try_receive(&mut self) -> Option<Frame> {
        self.air.inboxes[slot(self.node)].borrow_mut().pop_front()
    }

    fn try_transmit(&mut self, frame: &[u8]) -> Result<(), TransmitError> {
        let frame = Frame::from_slice(frame).map_err(|_| TransmitError::Other(()))?;
        if !self.air.carries_from(self.node) {
            trace!(node = %self.node, frame = %String::from_utf8_lossy(&frame), "frame lost in the air");
            return Ok(());
        }

        let mut inbox = self.air.inboxes[slot(self.node.peer())].borrow_mut();
        if inbox.len() >= AIR_QUEUE_DEPTH {
            return Err(TransmitError::QueueFull);
        }
        inbox.push_back(frame);
        Ok(())
    }
}

/// Message handed to the simulated broker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Publication {
    pub topic: &'static str,
    pub payload: String,
}

/// Status sink that queues publications for the session to drain.
#[derive(Debug, Default)]
pub struct BusSink {
    pending: Vec<Publication>,
}

impl BusSink {
    pub fn drain(&mut self) -> std::vec::Drain<'_, Publication> {
        self.pending.drain(..)
    }

    fn publish(&mut self, topic: &'static str, payload: String) {
        debug!(client = PUBLISHER_CLIENT_ID, topic, %payload, "publish");
        self.pending.push(Publication { topic, payload });
    }
}

impl StatusSink for BusSink {
    fn publish_status(&mut self, report: &StatusReport) {
        self.publish(STATUS_TOPIC, report.to_string());
    }

    fn publish_event(&mut self, event: GlobalEvent) {
        self.publish(GLOBAL_TOPIC, event.label().to_string());
    }
}

/// Lamp driver that only remembers and traces the last output.
#[derive(Debug)]
pub struct LampTrace {
    node: NodeId,
    last: LampOutput,
}

impl LampTrace {
    pub fn new(node: NodeId) -> Self {
        Self {
            node,
            last: LampOutput::DARK,
        }
    }
}

impl LampDriver for LampTrace {
    fn apply(&mut self, output: LampOutput) {
        if output != self.last {
            trace!(
                node = %self.node,
                red = output.red,
                yellow = output.yellow,
                green = output.green,
                "lamps"
            );
        }
        self.last = output;
    }
}

pub fn slot(node: NodeId) -> usize {
    match node {
        NodeId::A => 0,
        NodeId::B => 1,
    }
}
