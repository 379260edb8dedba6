//! Virtual contact slot backed by a contactless reader.
//!
//! This crate contains the slot record, the slot states with their
//! transition rules, and the [`SlotMachine`] context that drives discovery,
//! power transitions, presence checks and exchanges.

pub mod config;
pub mod machine;
pub mod slot;
pub mod state;

pub use config::SlotConfig;
pub use machine::SlotMachine;
pub use slot::Slot;
pub use state::{MAX_HISTORY_SIZE, SlotState, StateHistory, StateTransition};
