//! The slot state machine.
//!
//! [`SlotMachine`] is the context object behind the virtual slot. It owns
//! the device session and the slot record, drives discovery, reselection
//! and presence checks, and keeps every transition consistent under partial
//! failure: a lost target always lands the slot in `NoTarget`, and closing
//! always lands it in `Disconnected` with the reader released.
//!
//! No operation retries. A transport failure drops the slot back to
//! `NoTarget`; the caller's next power-up or presence check rediscovers.
//!
//! # Examples
//!
//! ```
//! use ifdnfc_core::Target;
//! use ifdnfc_hardware::{Backend, mock::MockBus};
//! use ifdnfc_slot::{SlotConfig, SlotMachine, SlotState};
//!
//! let mut bus = MockBus::new();
//! let reader = bus.attach("usb:001:002".parse().unwrap());
//! reader.place_target(Target::type_a(vec![1, 2, 3, 4], vec![0x00, 0xAA, 0xBB]).unwrap());
//!
//! let mut machine = SlotMachine::new(Backend::Mock(bus), SlotConfig::default());
//! machine.open(None).unwrap();
//! let atr = machine.power_up().unwrap();
//! assert_eq!(atr.to_string(), "3B 82 80 01 AA BB 12");
//! assert_eq!(machine.state(), SlotState::PresentPowered);
//! ```

use ifdnfc_core::{Atr, ConnString, Error, Result, Target};
use ifdnfc_hardware::{Backend, DeviceSession, HardwareError};
use tracing::{debug, error, info, warn};

use crate::config::SlotConfig;
use crate::slot::Slot;
use crate::state::{SlotState, StateHistory, StateTransition};

/// Device session, slot record and transition history of one virtual slot.
#[derive(Debug)]
pub struct SlotMachine {
    config: SlotConfig,
    session: DeviceSession,
    slot: Slot,
    history: StateHistory,

    /// Reader was idled and must be re-initialized before polling.
    reader_idle: bool,
}

impl SlotMachine {
    pub fn new(backend: Backend, config: SlotConfig) -> Self {
        Self {
            config,
            session: DeviceSession::new(backend),
            slot: Slot::new(),
            history: StateHistory::new(),
            reader_idle: false,
        }
    }

    pub fn config(&self) -> &SlotConfig {
        &self.config
    }

    pub fn state(&self) -> SlotState {
        self.slot.state(self.session.is_open())
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    pub fn history(&self) -> &StateHistory {
        &self.history
    }

    pub fn is_open(&self) -> bool {
        self.session.is_open()
    }

    /// Address of the open reader.
    pub fn connstring(&self) -> Option<&ConnString> {
        self.session.connstring()
    }

    /// Open the device session and start from an empty slot.
    ///
    /// With `None` the first available reader is used. Asking for another
    /// reader closes the current session first. Reopening the reader that is
    /// already open keeps the session but forgets any present target, so a
    /// successful open always leaves the slot in `NoTarget`.
    ///
    /// # Errors
    /// `CommunicationError` if the reader cannot be opened or initialized.
    /// The slot stays `Disconnected`.
    pub fn open(&mut self, connstring: Option<&ConnString>) -> Result<ConnString> {
        let switching = self
            .session
            .connstring()
            .is_some_and(|current| connstring.is_some_and(|wanted| wanted != current));
        if switching {
            self.close();
        }

        self.track(|m| {
            let opened = m
                .session
                .open(connstring)
                .map_err(|e| Error::communication(e.to_string()))?;
            m.drop_target();
            Ok(opened)
        })
    }

    /// Poll the configured technologies in order and select the first
    /// target found. A present slot is left as is.
    ///
    /// # Errors
    /// `CardAbsent` when no technology yields a usable target.
    pub fn discover(&mut self) -> Result<Atr> {
        self.track(|m| {
            m.discover_target()?;
            Ok(m.slot.atr().clone())
        })
    }

    /// Idle the reader, keeping target identity and ATR.
    ///
    /// # Errors
    /// `PowerAction` if the reader refuses to idle; the state is unchanged.
    pub fn power_down(&mut self) -> Result<()> {
        self.track(Self::power_down_slot)
    }

    /// Power the slot: reselect a known target or discover a new one.
    ///
    /// # Errors
    /// `CommunicationError` when a known target cannot be reselected (the
    /// slot drops to `NoTarget`), `CardAbsent` when discovery finds nothing.
    pub fn power_up(&mut self) -> Result<Atr> {
        self.track(Self::power_up_slot)
    }

    /// Warm reset: deselect and reselect the same target. The ATR is
    /// unchanged.
    ///
    /// # Errors
    /// `PowerAction` when reselection fails (the slot drops to `NoTarget`).
    pub fn reset(&mut self) -> Result<Atr> {
        self.track(Self::reset_slot)
    }

    /// Check that the target still answers, or look for one.
    ///
    /// # Errors
    /// `CardAbsent` whenever no target is reachable.
    pub fn presence_check(&mut self) -> Result<()> {
        self.track(Self::check_presence)
    }

    /// Relay `tx` to the target and return its response.
    ///
    /// # Errors
    /// `CardAbsent` without a target, `CommunicationError` when the target
    /// is unpowered, the response exceeds `rx_capacity`, or the transport
    /// fails (the slot then drops to `NoTarget`).
    pub fn transmit(&mut self, tx: &[u8], rx_capacity: usize) -> Result<Vec<u8>> {
        self.track(|m| m.exchange(tx, rx_capacity))
    }

    /// ATR of the slot, discovering a target first if none is present.
    ///
    /// # Errors
    /// `CommunicationError` without an open reader, `CardAbsent` when
    /// discovery finds nothing.
    pub fn atr(&mut self) -> Result<Atr> {
        self.track(|m| {
            m.ensure_open()?;
            m.discover_target()?;
            Ok(m.slot.atr().clone())
        })
    }

    /// Release the target and the reader. Always succeeds.
    pub fn close(&mut self) {
        let before = self.state();
        self.release();
        if let Err(e) = self.record(before) {
            error!(error = %e, "close left the slot inconsistent");
        }
    }

    /// Run `op` and record the resulting state change, if any.
    fn track<T>(&mut self, op: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let before = self.state();
        let result = op(self);
        self.record(before)?;
        result
    }

    fn record(&mut self, before: SlotState) -> Result<()> {
        let after = self.state();
        if after == before {
            return Ok(());
        }
        if !before.can_transition_to(&after) {
            error!(from = %before, to = %after, "invalid slot transition");
            return Err(Error::InvalidStateTransition {
                from: before.to_string(),
                to: after.to_string(),
            });
        }

        info!(from = %before, to = %after, "slot state changed");
        self.history.push(StateTransition::new(before, after));
        Ok(())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.session.is_open() {
            Ok(())
        } else {
            Err(Error::communication("no reader open"))
        }
    }

    fn init_initiator(&mut self) -> Result<()> {
        self.session
            .initiator_init()
            .map_err(|e| Error::communication(e.to_string()))?;
        self.reader_idle = false;
        Ok(())
    }

    fn idle_reader(&mut self) -> ifdnfc_hardware::Result<()> {
        self.session.idle()?;
        self.reader_idle = true;
        Ok(())
    }

    fn discover_target(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.slot.is_present() {
            return Ok(());
        }
        if self.reader_idle {
            self.init_initiator()?;
        }

        let technologies = self.config.technologies.clone();
        for technology in technologies {
            match self
                .session
                .select(technology, None, self.config.blocking_discovery)
            {
                Ok(Some(target)) => match self.admit(target) {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        warn!(%technology, error = %e, "skipping unusable target");
                        if let Err(e) = self.session.deselect() {
                            debug!(error = %e, "deselect of skipped target failed");
                        }
                    }
                },
                Ok(None) => {}
                Err(e) => warn!(%technology, error = %e, "selection failed"),
            }
        }

        debug!("no target found");
        Err(Error::CardAbsent)
    }

    /// Synthesize the ATR of a freshly selected target and load the slot.
    fn admit(&mut self, target: Target) -> Result<()> {
        let atr = Atr::for_target(&target)?;
        if atr.len() > self.config.max_atr_size {
            return Err(Error::BufferTooSmall {
                needed: atr.len(),
                capacity: self.config.max_atr_size,
            });
        }

        info!(%target, %atr, "target connected");
        self.slot.load(target, atr);
        Ok(())
    }

    /// Select the slot's target again by its identity.
    fn reselect(&mut self) -> Result<()> {
        let target = self.slot.target().cloned().ok_or(Error::CardAbsent)?;
        self.init_initiator()?;

        match self
            .session
            .select(target.technology(), target.reselect_data(), false)
        {
            Ok(Some(found)) if found.same_identity(&target) => Ok(()),
            Ok(Some(found)) => {
                if let Err(e) = self.session.deselect() {
                    debug!(error = %e, "deselect of foreign target failed");
                }
                Err(Error::communication(format!(
                    "expected {target}, selected {found}"
                )))
            }
            Ok(None) => Err(Error::communication(format!("{target} did not answer"))),
            Err(e) => Err(Error::communication(e.to_string())),
        }
    }

    /// The target is gone: forget it.
    fn lose_target(&mut self, reason: &str) {
        if let Some(target) = self.slot.target() {
            info!(%target, reason, "target lost");
        }
        self.slot.clear();
    }

    /// Deselect and forget a present target, idling the reader.
    fn drop_target(&mut self) {
        if !self.slot.is_present() {
            return;
        }
        if self.slot.is_powered() {
            if let Err(e) = self.session.deselect() {
                debug!(error = %e, "deselect on reopen failed");
            }
        }
        if let Err(e) = self.idle_reader() {
            warn!(error = %e, "could not idle reader on reopen");
        }
        self.lose_target("reader reopened");
    }

    fn power_down_slot(&mut self) -> Result<()> {
        self.ensure_open()?;
        if self.state() == SlotState::PresentUnpowered {
            return Ok(());
        }

        self.idle_reader()
            .map_err(|e| Error::power_action(e.to_string()))?;
        self.slot.set_powered(false);
        Ok(())
    }

    fn power_up_slot(&mut self) -> Result<Atr> {
        self.ensure_open()?;
        match self.state() {
            SlotState::PresentUnpowered => {
                if let Err(e) = self.reselect() {
                    self.lose_target("reselection on power up failed");
                    return Err(Error::communication(e.to_string()));
                }
                self.slot.set_powered(true);
            }
            SlotState::NoTarget => self.discover_target()?,
            SlotState::PresentPowered | SlotState::Disconnected => {}
        }
        Ok(self.slot.atr().clone())
    }

    fn reset_slot(&mut self) -> Result<Atr> {
        self.ensure_open()?;
        if !self.slot.is_present() {
            self.discover_target()?;
            return Ok(self.slot.atr().clone());
        }

        if let Err(e) = self.session.deselect() {
            debug!(error = %e, "deselect before reset failed");
        }
        if let Err(e) = self.reselect() {
            self.lose_target("reselection on reset failed");
            return Err(Error::power_action(e.to_string()));
        }
        self.slot.set_powered(true);
        Ok(self.slot.atr().clone())
    }

    fn check_presence(&mut self) -> Result<()> {
        match self.state() {
            SlotState::Disconnected => Err(Error::CardAbsent),
            SlotState::NoTarget => self.discover_target().map_err(|e| {
                debug!(error = %e, "discovery during presence check failed");
                Error::CardAbsent
            }),
            SlotState::PresentPowered => {
                let target = self.slot.target().cloned().ok_or(Error::CardAbsent)?;
                if let Err(e) = self.session.ping(&target) {
                    if e.is_target_lost() {
                        debug!(error = %e, "presence ping failed");
                        self.lose_target("no answer to presence check");
                    } else {
                        warn!(error = %e, "reader failed during presence check");
                        self.lose_target("reader failure during presence check");
                    }
                    return Err(Error::CardAbsent);
                }
                Ok(())
            }
            SlotState::PresentUnpowered => {
                let outcome = self.reselect();
                if outcome.is_ok() {
                    if let Err(e) = self.session.deselect() {
                        debug!(error = %e, "deselect after presence check failed");
                    }
                }
                if let Err(e) = self.idle_reader() {
                    warn!(error = %e, "could not idle reader after presence check");
                }

                if let Err(e) = outcome {
                    debug!(error = %e, "reselection during presence check failed");
                    self.lose_target("no answer to presence check");
                    return Err(Error::CardAbsent);
                }
                Ok(())
            }
        }
    }

    fn exchange(&mut self, tx: &[u8], rx_capacity: usize) -> Result<Vec<u8>> {
        match self.state() {
            SlotState::Disconnected | SlotState::NoTarget => return Err(Error::CardAbsent),
            SlotState::PresentUnpowered => {
                return Err(Error::communication("target is not powered"));
            }
            SlotState::PresentPowered => {}
        }

        match self
            .session
            .transceive(tx, rx_capacity, self.config.transceive_timeout)
        {
            Ok(rx) => Ok(rx),
            Err(e @ HardwareError::Overflow { .. }) => Err(e.into()),
            Err(e) => {
                warn!(error = %e, "transceive failed");
                self.lose_target("transceive failed");
                Err(e.into())
            }
        }
    }

    fn release(&mut self) {
        if !self.session.is_open() {
            self.slot.clear();
            return;
        }

        if self.slot.is_present() && self.slot.is_powered() {
            if let Err(e) = self.session.deselect() {
                warn!(error = %e, "could not deselect target");
            }
        }
        if let Err(e) = self.session.set_field(false) {
            debug!(error = %e, "could not switch RF field off");
        }
        self.session.close();
        self.slot.clear();
        self.reader_idle = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifdnfc_core::Technology;
    use ifdnfc_hardware::mock::{MockBus, MockNfcHandle, MockOp};

    fn card_a() -> Target {
        Target::type_a(vec![0x04, 0x11, 0x22, 0x33], vec![0x00]).unwrap()
    }

    fn machine() -> (SlotMachine, MockNfcHandle) {
        let mut bus = MockBus::new();
        let handle = bus.attach(ConnString::new("usb:001:002").unwrap());
        (
            SlotMachine::new(Backend::Mock(bus), SlotConfig::default()),
            handle,
        )
    }

    #[test]
    fn test_operations_require_open_reader() {
        let (mut machine, _) = machine();
        assert_eq!(machine.state(), SlotState::Disconnected);
        assert!(matches!(machine.discover(), Err(Error::Communication(_))));
        assert!(matches!(machine.power_up(), Err(Error::Communication(_))));
        assert!(matches!(machine.atr(), Err(Error::Communication(_))));
        assert!(matches!(machine.presence_check(), Err(Error::CardAbsent)));
        assert!(matches!(machine.transmit(&[0x00], 16), Err(Error::CardAbsent)));
        assert!(machine.history().is_empty());
    }

    #[test]
    fn test_discover_prefers_type_a() {
        let (mut machine, handle) = machine();
        handle.place_target(Target::type_b([1, 2, 3, 4], [0; 4], [0; 3]));
        handle.place_target(card_a());

        machine.open(None).unwrap();
        machine.discover().unwrap();
        assert_eq!(
            machine.slot().target().map(Target::technology),
            Some(Technology::TypeA106)
        );
    }

    #[test]
    fn test_discover_skips_oversized_atr() {
        let (mut machine, handle) = machine();
        let long_ats: Vec<u8> = std::iter::once(0x00).chain(0..40).collect();
        handle.place_target(Target::type_a(vec![1, 2, 3, 4], long_ats).unwrap());

        machine.open(None).unwrap();
        assert!(matches!(machine.discover(), Err(Error::CardAbsent)));
        assert_eq!(machine.state(), SlotState::NoTarget);
        assert!(handle.count(MockOp::Deselect) >= 1);
    }

    #[test]
    fn test_power_down_failure_keeps_state() {
        let (mut machine, handle) = machine();
        handle.place_target(card_a());
        machine.open(None).unwrap();
        machine.power_up().unwrap();

        handle.fail(MockOp::Idle);
        assert!(matches!(machine.power_down(), Err(Error::PowerAction(_))));
        assert_eq!(machine.state(), SlotState::PresentPowered);
    }

    #[test]
    fn test_transmit_overflow_keeps_target() {
        let (mut machine, handle) = machine();
        handle.place_target(card_a());
        handle.set_responder(|_| vec![0u8; 8]);
        machine.open(None).unwrap();
        machine.power_up().unwrap();

        assert!(matches!(
            machine.transmit(&[0x00, 0xB0, 0x00, 0x00, 0x08], 4),
            Err(Error::BufferTooSmall { needed: 8, capacity: 4 })
        ));
        assert_eq!(machine.state(), SlotState::PresentPowered);
    }

    #[test]
    fn test_close_always_disconnects() {
        let (mut machine, handle) = machine();
        handle.place_target(card_a());
        machine.open(None).unwrap();
        machine.power_up().unwrap();

        handle.fail(MockOp::Deselect);
        handle.fail(MockOp::SetField);
        handle.fail(MockOp::Close);
        machine.close();

        assert_eq!(machine.state(), SlotState::Disconnected);
        assert!(machine.slot().atr().is_empty());
        assert!(!handle.is_open());
        machine.close();
    }
}
