//! Slot configuration.

use ifdnfc_core::Technology;
use ifdnfc_core::constants::MAX_ATR_SIZE;
use ifdnfc_hardware::Timeout;
use serde::{Deserialize, Serialize};

/// How the slot discovers targets and talks to them.
///
/// # Examples
///
/// ```
/// use ifdnfc_core::Technology;
/// use ifdnfc_hardware::Timeout;
/// use ifdnfc_slot::SlotConfig;
///
/// let config = SlotConfig::default()
///     .with_technologies(vec![Technology::TypeA106])
///     .with_transceive_timeout(Timeout::Millis(500));
/// assert!(!config.blocking_discovery);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotConfig {
    /// Technologies polled during discovery, in order. First match wins.
    pub technologies: Vec<Technology>,

    /// Wait for a target during discovery instead of polling once per
    /// technology.
    pub blocking_discovery: bool,

    /// Timeout applied to every exchange with the target.
    pub transceive_timeout: Timeout,

    /// Capacity of the slot ATR buffer. Targets whose ATR does not fit are
    /// skipped.
    pub max_atr_size: usize,
}

impl Default for SlotConfig {
    fn default() -> Self {
        Self {
            technologies: vec![Technology::TypeA106, Technology::TypeB106],
            blocking_discovery: false,
            transceive_timeout: Timeout::Default,
            max_atr_size: MAX_ATR_SIZE,
        }
    }
}

impl SlotConfig {
    pub fn with_technologies(mut self, technologies: Vec<Technology>) -> Self {
        self.technologies = technologies;
        self
    }

    pub fn with_blocking_discovery(mut self, blocking: bool) -> Self {
        self.blocking_discovery = blocking;
        self
    }

    pub fn with_transceive_timeout(mut self, timeout: Timeout) -> Self {
        self.transceive_timeout = timeout;
        self
    }

    pub fn with_max_atr_size(mut self, max_atr_size: usize) -> Self {
        self.max_atr_size = max_atr_size;
        self
    }
}
