//! Global direction coordinator.
//!
//! Runs on the master only. Once per control cycle it looks at the time spent in
//! the current global state, the configured durations, and whether the peer is
//! reachable, and decides which direction may show green. Directions alternate
//! strictly and every change of direction passes through an all-red clearance.
//!
//! The coordinator never touches hardware or the radio. [`Coordinator::evaluate`]
//! returns a [`Transition`] describing what the local light and the peer must be
//! told; the node controller carries it out.

use core::fmt;

use crate::clock::Millis;
use crate::config::TimingConfig;
use crate::light::CommandedState;
use crate::node::NodeId;
use crate::telemetry::GlobalEvent;

/// Crossing-wide state owned by the master.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum GlobalState {
    /// Power-up, nothing commanded yet.
    Init,
    /// Both directions red.
    AllRed,
    /// Direction A green, B red.
    AGreen,
    /// Direction B green, A red.
    BGreen,
    /// Peer unreachable; both sides fail safe.
    Error,
}

impl GlobalState {
    /// Direction currently allowed to show green, if any.
    #[must_use]
    pub const fn green_direction(self) -> Option<NodeId> {
        match self {
            GlobalState::AGreen => Some(NodeId::A),
            GlobalState::BGreen => Some(NodeId::B),
            GlobalState::Init | GlobalState::AllRed | GlobalState::Error => None,
        }
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            GlobalState::Init => "INIT",
            GlobalState::AllRed => "ALL_RED",
            GlobalState::AGreen => "A_GREEN",
            GlobalState::BGreen => "B_GREEN",
            GlobalState::Error => "ERROR",
        }
    }

    const fn green_for(direction: NodeId) -> Self {
        match direction {
            NodeId::A => GlobalState::AGreen,
            NodeId::B => GlobalState::BGreen,
        }
    }
}

impl fmt::Display for GlobalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Change of global state together with the commands it requires.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Transition {
    pub from: GlobalState,
    pub to: GlobalState,
    /// Command for the master's own light.
    pub local: CommandedState,
    /// Command to send to the peer over the radio link.
    pub peer: CommandedState,
    /// Label published on the global topic.
    pub event: GlobalEvent,
    pub at: Millis,
}

/// Direction state machine for the master node.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Coordinator {
    local: NodeId,
    state: GlobalState,
    entered_at: Millis,
    last_green: Option<NodeId>,
}

impl Coordinator {
    /// Creates a coordinator for the master running as `local`.
    #[must_use]
    pub const fn new(local: NodeId) -> Self {
        Self {
            local,
            state: GlobalState::Init,
            entered_at: Millis::ZERO,
            last_green: None,
        }
    }

    #[must_use]
    pub const fn state(&self) -> GlobalState {
        self.state
    }

    /// When the current state was entered.
    #[must_use]
    pub const fn entered_at(&self) -> Millis {
        self.entered_at
    }

    /// Direction that was green most recently since the last reset.
    #[must_use]
    pub const fn last_green(&self) -> Option<NodeId> {
        self.last_green
    }

    /// Direction that gets green after the next clearance. A is favoured after
    /// a reset.
    #[must_use]
    pub const fn next_direction(&self) -> NodeId {
        match self.last_green {
            Some(NodeId::A) => NodeId::B,
            Some(NodeId::B) | None => NodeId::A,
        }
    }

    /// Runs one evaluation. Returns the transition taken, if any.
    pub fn evaluate(
        &mut self,
        now: Millis,
        peer_alive: bool,
        timing: &TimingConfig,
    ) -> Option<Transition> {
        if !peer_alive {
            if self.state == GlobalState::Error {
                return None;
            }
            return Some(self.enter(
                GlobalState::Error,
                now,
                CommandedState::Error,
                CommandedState::Error,
                GlobalEvent::ErrorNoComm,
            ));
        }

        let elapsed = now.elapsed_since(self.entered_at);
        match self.state {
            GlobalState::Init => Some(self.reset_to_all_red(now, GlobalEvent::AllRedInit)),
            GlobalState::Error => Some(self.reset_to_all_red(now, GlobalEvent::RecoverAllRed)),
            GlobalState::AllRed if elapsed >= timing.clearance => {
                let direction = self.next_direction();
                self.last_green = Some(direction);
                Some(self.enter(
                    GlobalState::green_for(direction),
                    now,
                    Self::command_for(self.local, direction),
                    Self::command_for(self.local.peer(), direction),
                    GlobalEvent::green(direction),
                ))
            }
            GlobalState::AGreen | GlobalState::BGreen => {
                let direction = self.state.green_direction()?;
                if elapsed < timing.green_for(direction) {
                    return None;
                }
                Some(self.enter(
                    GlobalState::AllRed,
                    now,
                    CommandedState::Red,
                    CommandedState::Red,
                    GlobalEvent::all_red_after(direction),
                ))
            }
            GlobalState::AllRed => None,
        }
    }

    fn reset_to_all_red(&mut self, now: Millis, event: GlobalEvent) -> Transition {
        self.last_green = None;
        self.enter(
            GlobalState::AllRed,
            now,
            CommandedState::Red,
            CommandedState::Red,
            event,
        )
    }

    fn command_for(node: NodeId, green: NodeId) -> CommandedState {
        if node == green {
            CommandedState::Green
        } else {
            CommandedState::Red
        }
    }

    fn enter(
        &mut self,
        to: GlobalState,
        now: Millis,
        local: CommandedState,
        peer: CommandedState,
        event: GlobalEvent,
    ) -> Transition {
        let from = self.state;
        self.state = to;
        self.entered_at = now;
        Transition {
            from,
            to,
            local,
            peer,
            event,
            at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(ms: u32) -> Millis {
        Millis::from_ticks(ms)
    }

    #[test]
    fn first_alive_evaluation_goes_all_red() {
        let mut coordinator = Coordinator::new(NodeId::A);
        let transition = coordinator
            .evaluate(at(0), true, &TimingConfig::default())
            .expect("init should leave immediately");

        assert_eq!(transition.from, GlobalState::Init);
        assert_eq!(transition.to, GlobalState::AllRed);
        assert_eq!(transition.local, CommandedState::Red);
        assert_eq!(transition.peer, CommandedState::Red);
        assert_eq!(transition.event, GlobalEvent::AllRedInit);
    }

    #[test]
    fn init_with_dead_peer_goes_error() {
        let mut coordinator = Coordinator::new(NodeId::A);
        let transition = coordinator
            .evaluate(at(0), false, &TimingConfig::default())
            .unwrap();

        assert_eq!(transition.to, GlobalState::Error);
        assert_eq!(transition.event, GlobalEvent::ErrorNoComm);
        assert!(
            coordinator
                .evaluate(at(100), false, &TimingConfig::default())
                .is_none(),
            "error is entered once"
        );
    }

    #[test]
    fn master_on_b_commands_itself_when_b_is_green() {
        let timing = TimingConfig::from_secs(2, 2, 1);
        let mut coordinator = Coordinator::new(NodeId::B);
        coordinator.evaluate(at(0), true, &timing);

        let a_green = coordinator.evaluate(at(1_000), true, &timing).unwrap();
        assert_eq!(a_green.to, GlobalState::AGreen);
        assert_eq!(a_green.local, CommandedState::Red);
        assert_eq!(a_green.peer, CommandedState::Green);

        coordinator.evaluate(at(3_000), true, &timing).unwrap();
        let b_green = coordinator.evaluate(at(4_000), true, &timing).unwrap();
        assert_eq!(b_green.to, GlobalState::BGreen);
        assert_eq!(b_green.local, CommandedState::Green);
        assert_eq!(b_green.peer, CommandedState::Red);
    }

    #[test]
    fn recovery_favours_direction_a() {
        let timing = TimingConfig::from_secs(5, 5, 1);
        let mut coordinator = Coordinator::new(NodeId::A);
        coordinator.evaluate(at(0), true, &timing);
        coordinator.evaluate(at(1_000), true, &timing);
        coordinator.evaluate(at(6_000), true, &timing);
        coordinator.evaluate(at(7_000), true, &timing);
        assert_eq!(coordinator.state(), GlobalState::BGreen);

        coordinator.evaluate(at(8_000), false, &timing);
        let recovered = coordinator.evaluate(at(9_000), true, &timing).unwrap();
        assert_eq!(recovered.event, GlobalEvent::RecoverAllRed);
        assert_eq!(coordinator.next_direction(), NodeId::A);
    }
}
