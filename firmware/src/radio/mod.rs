//! Queues between the radio UART task and the control task.
//!
//! The modem is a transparent serial LoRa module: every frame goes out as one
//! `\n`-terminated line and comes back the same way on the peer. The UART task
//! owns the wire; the control task only sees whole frames through
//! [`ChannelRadio`].

use embassy_sync::channel::{Channel, Receiver, Sender, TrySendError};
use signal_core::link::{Frame, MAX_FRAME_LEN, RadioLink, TransmitError};

use crate::line::LineAssembler;
use crate::status;
use crate::sync::TaskMutex;

/// Frames buffered in each direction.
pub const RADIO_QUEUE_DEPTH: usize = 8;

/// UART line assembler sized for one link frame. Frames carry no escapes, so
/// only the terminators are stripped.
pub type FrameAssembler = LineAssembler<MAX_FRAME_LEN>;

pub type FrameChannel = Channel<TaskMutex, Frame, RADIO_QUEUE_DEPTH>;
pub type FrameSender<'a> = Sender<'a, TaskMutex, Frame, RADIO_QUEUE_DEPTH>;
pub type FrameReceiver<'a> = Receiver<'a, TaskMutex, Frame, RADIO_QUEUE_DEPTH>;

/// Both directions of the radio path.
pub struct RadioQueue {
    inbound: FrameChannel,
    outbound: FrameChannel,
}

impl RadioQueue {
    pub const fn new() -> Self {
        Self {
            inbound: Channel::new(),
            outbound: Channel::new(),
        }
    }

    /// Used by the UART task to hand received frames to the controller.
    pub fn inbound_sender(&self) -> FrameSender<'_> {
        self.inbound.sender()
    }

    /// Used by the UART task to pick up frames to transmit.
    pub fn outbound_receiver(&self) -> FrameReceiver<'_> {
        self.outbound.receiver()
    }
}

/// [`RadioLink`] over the radio queues. Never blocks the control cycle.
pub struct ChannelRadio<'a> {
    inbound: FrameReceiver<'a>,
    outbound: FrameSender<'a>,
}

impl<'a> ChannelRadio<'a> {
    pub fn new(queue: &'a RadioQueue) -> Self {
        Self {
            inbound: queue.inbound.receiver(),
            outbound: queue.outbound.sender(),
        }
    }
}

impl RadioLink for ChannelRadio<'_> {
    type Error = ();

    fn try_receive(&mut self) -> Option<Frame> {
        self.inbound.try_receive().ok()
    }

    fn try_transmit(&mut self, frame: &[u8]) -> Result<(), TransmitError> {
        let frame = Frame::from_slice(frame).map_err(|_| TransmitError::Other(()))?;
        match self.outbound.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                status::record_tx_dropped();
                Err(TransmitError::QueueFull)
            }
        }
    }
}
