//! Slot states, transition rules and transition history.
//!
//! # States
//!
//! - `Disconnected`: no reader open
//! - `NoTarget`: reader open, no target selected
//! - `PresentPowered`: target selected, RF field on
//! - `PresentUnpowered`: target known, reader idled
//!
//! # Valid Transitions
//!
//! - Disconnected → NoTarget
//! - NoTarget → PresentPowered
//! - PresentPowered ⇄ PresentUnpowered
//! - PresentPowered / PresentUnpowered → NoTarget (target lost)
//! - any connected state → Disconnected

use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

/// Maximum number of state transitions to keep in history.
pub const MAX_HISTORY_SIZE: usize = 100;

/// State of the virtual contact slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// No reader open.
    #[default]
    Disconnected,

    /// Reader open, no target.
    NoTarget,

    /// Target selected and powered by the RF field.
    PresentPowered,

    /// Target known, reader idle. Identity and ATR are retained but not
    /// verified until the next power-up or presence check.
    PresentUnpowered,
}

impl fmt::Display for SlotState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state_str = match self {
            SlotState::Disconnected => "Disconnected",
            SlotState::NoTarget => "Connected/NoTarget",
            SlotState::PresentPowered => "Connected/Present/Powered",
            SlotState::PresentUnpowered => "Connected/Present/Unpowered",
        };
        write!(f, "{}", state_str)
    }
}

impl SlotState {
    /// Check if transition to `target` is valid from this state.
    ///
    /// ```
    /// use ifdnfc_slot::SlotState;
    ///
    /// assert!(SlotState::Disconnected.can_transition_to(&SlotState::NoTarget));
    /// assert!(!SlotState::Disconnected.can_transition_to(&SlotState::PresentPowered));
    /// ```
    pub fn can_transition_to(&self, target: &SlotState) -> bool {
        matches!(
            (self, target),
            (SlotState::Disconnected, SlotState::NoTarget)
                | (SlotState::NoTarget, SlotState::PresentPowered | SlotState::Disconnected)
                | (
                    SlotState::PresentPowered,
                    SlotState::PresentUnpowered | SlotState::NoTarget | SlotState::Disconnected
                )
                | (
                    SlotState::PresentUnpowered,
                    SlotState::PresentPowered | SlotState::NoTarget | SlotState::Disconnected
                )
        )
    }

    pub fn is_connected(&self) -> bool {
        !matches!(self, SlotState::Disconnected)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, SlotState::PresentPowered | SlotState::PresentUnpowered)
    }

    pub fn is_powered(&self) -> bool {
        matches!(self, SlotState::PresentPowered)
    }
}

/// A single state transition with timestamp.
///
/// The timestamp is not serialized; deserialized records carry the time of
/// deserialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub from: SlotState,
    pub to: SlotState,
    #[serde(skip, default = "Instant::now")]
    pub timestamp: Instant,
}

impl StateTransition {
    pub fn new(from: SlotState, to: SlotState) -> Self {
        Self {
            from,
            to,
            timestamp: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.timestamp.elapsed()
    }
}

/// Bounded log of recent transitions, oldest first.
#[derive(Debug, Clone, Default)]
pub struct StateHistory {
    entries: VecDeque<StateTransition>,
}

impl StateHistory {
    pub fn new() -> Self {
        Self {
            entries: VecDeque::with_capacity(MAX_HISTORY_SIZE),
        }
    }

    pub fn push(&mut self, transition: StateTransition) {
        self.entries.push_back(transition);
        if self.entries.len() > MAX_HISTORY_SIZE {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StateTransition> {
        self.entries.iter()
    }

    /// The last `count` transitions, oldest first.
    pub fn last(&self, count: usize) -> Vec<StateTransition> {
        let skip = self.entries.len().saturating_sub(count);
        self.entries.iter().skip(skip).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(SlotState::Disconnected, SlotState::NoTarget, true)]
    #[case(SlotState::Disconnected, SlotState::PresentPowered, false)]
    #[case(SlotState::Disconnected, SlotState::PresentUnpowered, false)]
    #[case(SlotState::NoTarget, SlotState::PresentPowered, true)]
    #[case(SlotState::NoTarget, SlotState::PresentUnpowered, false)]
    #[case(SlotState::NoTarget, SlotState::Disconnected, true)]
    #[case(SlotState::PresentPowered, SlotState::PresentUnpowered, true)]
    #[case(SlotState::PresentPowered, SlotState::NoTarget, true)]
    #[case(SlotState::PresentUnpowered, SlotState::PresentPowered, true)]
    #[case(SlotState::PresentUnpowered, SlotState::NoTarget, true)]
    #[case(SlotState::PresentUnpowered, SlotState::Disconnected, true)]
    #[case(SlotState::PresentPowered, SlotState::PresentPowered, false)]
    fn test_transition_rules(#[case] from: SlotState, #[case] to: SlotState, #[case] valid: bool) {
        assert_eq!(from.can_transition_to(&to), valid);
    }

    #[test]
    fn test_state_flags() {
        assert!(!SlotState::Disconnected.is_connected());
        assert!(SlotState::NoTarget.is_connected());
        assert!(!SlotState::NoTarget.is_present());
        assert!(SlotState::PresentUnpowered.is_present());
        assert!(!SlotState::PresentUnpowered.is_powered());
        assert!(SlotState::PresentPowered.is_powered());
    }

    #[test]
    fn test_history_is_bounded() {
        let mut history = StateHistory::new();
        for i in 0..(MAX_HISTORY_SIZE + 20) {
            let (from, to) = if i % 2 == 0 {
                (SlotState::Disconnected, SlotState::NoTarget)
            } else {
                (SlotState::NoTarget, SlotState::Disconnected)
            };
            history.push(StateTransition::new(from, to));
        }

        assert_eq!(history.len(), MAX_HISTORY_SIZE);
        let last = history.last(2);
        assert_eq!(last.len(), 2);
        assert_eq!(last[1].to, SlotState::Disconnected);
        assert_eq!(history.last(1000).len(), MAX_HISTORY_SIZE);
    }

    #[test]
    fn test_state_serialization() {
        let json = serde_json::to_string(&SlotState::PresentUnpowered).unwrap();
        assert_eq!(json, "\"present_unpowered\"");

        let transition = StateTransition::new(SlotState::NoTarget, SlotState::PresentPowered);
        let json = serde_json::to_string(&transition).unwrap();
        let back: StateTransition = serde_json::from_str(&json).unwrap();
        assert_eq!(back.from, SlotState::NoTarget);
        assert_eq!(back.to, SlotState::PresentPowered);
    }
}
