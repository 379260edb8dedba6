//! The slot record: what is known about the target behind the virtual slot.

use ifdnfc_core::{Atr, Target};

use crate::state::SlotState;

/// Target, power flag and ATR of the virtual slot.
///
/// An absent slot always has an empty ATR; a non-empty ATR always belongs to
/// the present target.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Slot {
    target: Option<Target>,
    powered: bool,
    atr: Atr,
}

impl Slot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_present(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_powered(&self) -> bool {
        self.powered
    }

    pub fn target(&self) -> Option<&Target> {
        self.target.as_ref()
    }

    pub fn atr(&self) -> &Atr {
        &self.atr
    }

    /// Record a freshly selected target with its ATR. The target is powered.
    pub fn load(&mut self, target: Target, atr: Atr) {
        self.target = Some(target);
        self.atr = atr;
        self.powered = true;
    }

    /// Set the power flag. An absent slot stays unpowered.
    pub fn set_powered(&mut self, powered: bool) {
        self.powered = powered && self.is_present();
    }

    /// Forget the target.
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// State of this slot behind a reader that is (or is not) open.
    pub fn state(&self, connected: bool) -> SlotState {
        match (connected, self.is_present(), self.powered) {
            (false, _, _) => SlotState::Disconnected,
            (true, false, _) => SlotState::NoTarget,
            (true, true, true) => SlotState::PresentPowered,
            (true, true, false) => SlotState::PresentUnpowered,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded() -> Slot {
        let target = Target::type_a(vec![1, 2, 3, 4], vec![0x00]).unwrap();
        let atr = Atr::for_target(&target).unwrap();
        let mut slot = Slot::new();
        slot.load(target, atr);
        slot
    }

    #[test]
    fn test_empty_slot() {
        let slot = Slot::new();
        assert!(!slot.is_present());
        assert!(!slot.is_powered());
        assert!(slot.atr().is_empty());
        assert_eq!(slot.state(true), SlotState::NoTarget);
        assert_eq!(slot.state(false), SlotState::Disconnected);
    }

    #[test]
    fn test_load_and_power() {
        let mut slot = loaded();
        assert_eq!(slot.state(true), SlotState::PresentPowered);
        assert_eq!(slot.atr().as_bytes(), &[0x3B, 0x80, 0x80, 0x01, 0x01]);

        slot.set_powered(false);
        assert_eq!(slot.state(true), SlotState::PresentUnpowered);
        assert!(!slot.atr().is_empty());
    }

    #[test]
    fn test_clear_empties_atr() {
        let mut slot = loaded();
        slot.clear();
        assert!(slot.atr().is_empty());
        assert_eq!(slot.target(), None);

        slot.set_powered(true);
        assert!(!slot.is_powered());
    }
}
