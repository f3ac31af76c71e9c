//! Peer liveness tracking.
//!
//! Any well-formed frame from the peer (heartbeat, or a command addressed to this
//! node) refreshes the last-seen timestamp. The peer counts as alive while the
//! silence since then does not exceed [`COMM_TIMEOUT`]; a peer never heard from
//! is not alive.

use core::time::Duration;

use crate::clock::Millis;

/// Longest silence tolerated before the peer is declared lost.
pub const COMM_TIMEOUT: Duration = Duration::from_secs(10);

/// Last-seen bookkeeping for the single peer node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PeerLiveness {
    last_seen: Option<Millis>,
    timeout: Duration,
}

impl PeerLiveness {
    /// Creates a tracker that has never heard from the peer.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_timeout(COMM_TIMEOUT)
    }

    /// Creates a tracker with a non-default timeout.
    #[must_use]
    pub const fn with_timeout(timeout: Duration) -> Self {
        Self {
            last_seen: None,
            timeout,
        }
    }

    /// Records that a well-formed frame from the peer arrived at `now`.
    pub fn on_message_from_peer(&mut self, now: Millis) {
        self.last_seen = Some(now);
    }

    /// Returns whether the peer counts as alive at `now`.
    #[must_use]
    pub fn evaluate(&self, now: Millis) -> bool {
        match self.last_seen {
            Some(seen) => now.elapsed_since(seen) <= self.timeout,
            None => false,
        }
    }

    /// Evaluates liveness and forgets a timed-out timestamp, so a silence longer
    /// than a full counter period cannot wrap back into the alive window.
    pub fn expire(&mut self, now: Millis) -> bool {
        let alive = self.evaluate(now);
        if !alive {
            self.last_seen = None;
        }
        alive
    }

    /// Timestamp of the most recent frame from the peer, if still remembered.
    #[must_use]
    pub const fn last_seen(&self) -> Option<Millis> {
        self.last_seen
    }
}

impl Default for PeerLiveness {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn never_seen_peer_is_not_alive() {
        let liveness = PeerLiveness::new();
        assert!(!liveness.evaluate(Millis::ZERO));
        assert!(!liveness.evaluate(Millis::from_ticks(123_456)));
    }

    #[test]
    fn timeout_boundary_is_inclusive() {
        let mut liveness = PeerLiveness::new();
        liveness.on_message_from_peer(Millis::from_ticks(5_000));

        assert!(liveness.evaluate(Millis::from_ticks(15_000)));
        assert!(!liveness.evaluate(Millis::from_ticks(15_001)));
    }

    #[test]
    fn peer_seen_just_before_counter_wrap_stays_alive() {
        let mut liveness = PeerLiveness::new();
        let seen = Millis::from_ticks(u32::MAX - 1_000);
        liveness.on_message_from_peer(seen);

        assert!(liveness.evaluate(seen + Duration::from_secs(5)));
        assert!(!liveness.evaluate(seen + Duration::from_secs(11)));
    }

    #[test]
    fn expire_forgets_stale_timestamp() {
        let mut liveness = PeerLiveness::new();
        liveness.on_message_from_peer(Millis::from_ticks(1_000));

        assert!(liveness.expire(Millis::from_ticks(2_000)));
        assert_eq!(liveness.last_seen(), Some(Millis::from_ticks(1_000)));

        assert!(!liveness.expire(Millis::from_ticks(20_000)));
        assert_eq!(liveness.last_seen(), None);

        // One full counter period later the old timestamp would look fresh again.
        assert!(!liveness.evaluate(Millis::from_ticks(1_500)));
    }
}
