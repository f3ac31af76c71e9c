//! Node-to-node radio link: frame codec, peer liveness, and the transport seam.

use core::fmt;

pub mod codec;
pub mod liveness;

pub use codec::{Frame, MAX_FRAME_LEN, Malformed, WireMessage, decode};
pub use liveness::{COMM_TIMEOUT, PeerLiveness};

/// Error surfaced when handing a frame to the radio fails.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TransmitError<E = ()> {
    /// Outbound queue has reached its capacity.
    QueueFull,
    /// Transport-specific failure.
    Other(E),
}

impl<E: fmt::Debug> fmt::Display for TransmitError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransmitError::QueueFull => f.write_str("radio queue full"),
            TransmitError::Other(err) => write!(f, "radio error: {err:?}"),
        }
    }
}

/// Non-blocking access to the radio transport.
///
/// Frames are whole packets with line terminators already removed. Neither call
/// may block; the control cycle polls the link once per pass.
pub trait RadioLink {
    /// Transport-specific error type.
    type Error;

    /// Returns the next received frame, if one is waiting.
    fn try_receive(&mut self) -> Option<Frame>;

    /// Queues a frame for transmission.
    ///
    /// # Errors
    ///
    /// Returns a [`TransmitError`] when the frame could not be queued; the caller
    /// does not retry.
    fn try_transmit(&mut self, frame: &[u8]) -> Result<(), TransmitError<Self::Error>>;
}

impl<R: RadioLink + ?Sized> RadioLink for &mut R {
    type Error = R::Error;

    fn try_receive(&mut self) -> Option<Frame> {
        (**self).try_receive()
    }

    fn try_transmit(&mut self, frame: &[u8]) -> Result<(), TransmitError<Self::Error>> {
        (**self).try_transmit(frame)
    }
}

/// Radio that never receives and drops every transmission.
#[derive(Copy, Clone, Debug, Default)]
pub struct NoopRadio;

impl RadioLink for NoopRadio {
    type Error = ();

    fn try_receive(&mut self) -> Option<Frame> {
        None
    }

    fn try_transmit(&mut self, _: &[u8]) -> Result<(), TransmitError> {
        Ok(())
    }
}
