//! Handler configuration.
//!
//! [`HandlerConfig`] bundles the slot settings with the options that only
//! concern the host-facing entry points. It deserializes from JSON with every
//! field optional:
//!
//! ```
//! use ifdnfc_driver::HandlerConfig;
//!
//! let config = HandlerConfig::from_json(r#"{ "auto_activate": true }"#).unwrap();
//! assert!(config.auto_activate);
//! assert_eq!(config.log_filter, "info");
//! ```

use ifdnfc_slot::SlotConfig;
use serde::{Deserialize, Serialize};

/// Default `tracing` filter directive.
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Discovery and exchange settings of the slot.
    pub slot: SlotConfig,

    /// Open the reader bound by channel creation on first use instead of
    /// waiting for the activation utility.
    pub auto_activate: bool,

    /// Install the stderr log subscriber when the handler is created.
    pub init_logging: bool,

    /// Filter used when `IFDNFC_LOG` is not set.
    pub log_filter: String,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            slot: SlotConfig::default(),
            auto_activate: false,
            init_logging: false,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl HandlerConfig {
    /// Parse a configuration document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_slot(mut self, slot: SlotConfig) -> Self {
        self.slot = slot;
        self
    }

    pub fn with_auto_activate(mut self, auto_activate: bool) -> Self {
        self.auto_activate = auto_activate;
        self
    }

    pub fn with_logging(mut self, filter: impl Into<String>) -> Self {
        self.init_logging = true;
        self.log_filter = filter.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ifdnfc_core::Technology;
    use ifdnfc_hardware::Timeout;

    #[test]
    fn test_defaults() {
        let config = HandlerConfig::default();
        assert!(!config.auto_activate);
        assert!(!config.init_logging);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.slot, SlotConfig::default());
    }

    #[test]
    fn test_from_json_nested_slot() {
        let json = r#"{
            "slot": {
                "technologies": ["type_b106"],
                "transceive_timeout": { "millis": 250 }
            },
            "log_filter": "ifdnfc=debug"
        }"#;

        let config = HandlerConfig::from_json(json).unwrap();
        assert_eq!(config.slot.technologies, vec![Technology::TypeB106]);
        assert_eq!(config.slot.transceive_timeout, Timeout::Millis(250));
        assert!(!config.slot.blocking_discovery);
        assert_eq!(config.log_filter, "ifdnfc=debug");
    }

    #[test]
    fn test_from_json_rejects_bad_types() {
        assert!(HandlerConfig::from_json(r#"{ "auto_activate": "yes" }"#).is_err());
    }

    #[test]
    fn test_builders_round_trip() {
        let config = HandlerConfig::default()
            .with_auto_activate(true)
            .with_logging("debug");
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(HandlerConfig::from_json(&json).unwrap(), config);
    }
}
