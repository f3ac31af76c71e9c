//! Link counters shared between tasks.
//!
//! The UART and USB tasks cannot reach the controller's telemetry ring, so they
//! bump these atomics instead; the console `status` reply reads them back.

use core::fmt;

use portable_atomic::{AtomicBool, AtomicU32, Ordering};

/// Frames received from the modem and handed to the controller.
static RX_FRAMES: AtomicU32 = AtomicU32::new(0);
/// Frames written to the modem.
static TX_FRAMES: AtomicU32 = AtomicU32::new(0);
/// Received lines that were too long or found the inbound queue full.
static RX_DROPPED: AtomicU32 = AtomicU32::new(0);
/// Outbound frames refused because the UART task fell behind.
static TX_DROPPED: AtomicU32 = AtomicU32::new(0);
/// UART read or write errors.
static UART_ERRORS: AtomicU32 = AtomicU32::new(0);
/// Whether a host holds the USB console open.
static CONSOLE_ATTACHED: AtomicBool = AtomicBool::new(false);

pub fn record_rx_frame() {
    RX_FRAMES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_tx_frame() {
    TX_FRAMES.fetch_add(1, Ordering::Relaxed);
}

pub fn record_rx_dropped() {
    RX_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_tx_dropped() {
    TX_DROPPED.fetch_add(1, Ordering::Relaxed);
}

pub fn record_uart_error() {
    UART_ERRORS.fetch_add(1, Ordering::Relaxed);
}

pub fn set_console_attached(attached: bool) {
    CONSOLE_ATTACHED.store(attached, Ordering::Relaxed);
}

pub fn console_attached() -> bool {
    CONSOLE_ATTACHED.load(Ordering::Relaxed)
}

/// Point-in-time copy of the link counters.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct LinkStats {
    pub rx_frames: u32,
    pub tx_frames: u32,
    pub rx_dropped: u32,
    pub tx_dropped: u32,
    pub uart_errors: u32,
}

impl fmt::Display for LinkStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "radio rx={} tx={} rx-dropped={} tx-dropped={} uart-errors={}",
            self.rx_frames, self.tx_frames, self.rx_dropped, self.tx_dropped, self.uart_errors
        )
    }
}

pub fn snapshot() -> LinkStats {
    LinkStats {
        rx_frames: RX_FRAMES.load(Ordering::Relaxed),
        tx_frames: TX_FRAMES.load(Ordering::Relaxed),
        rx_dropped: RX_DROPPED.load(Ordering::Relaxed),
        tx_dropped: TX_DROPPED.load(Ordering::Relaxed),
        uart_errors: UART_ERRORS.load(Ordering::Relaxed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // The counters are process-wide, so only deltas are asserted.
    #[test]
    fn counters_accumulate() {
        let before = snapshot();
        record_rx_frame();
        record_rx_frame();
        record_uart_error();
        let after = snapshot();

        assert!(after.rx_frames >= before.rx_frames + 2);
        assert!(after.uart_errors > before.uart_errors);
    }

    #[test]
    fn stats_render_on_one_line() {
        let stats = LinkStats {
            rx_frames: 3,
            tx_frames: 4,
            ..LinkStats::default()
        };

        assert_eq!(
            stats.to_string(),
            "radio rx=3 tx=4 rx-dropped=0 tx-dropped=0 uart-errors=0"
        );
    }
}
