//! Log subscriber bootstrap.
//!
//! The host loads the driver as a library, so nothing installs a subscriber
//! unless asked to. [`init`] writes formatted events to stderr, filtered by
//! the `IFDNFC_LOG` environment variable:
//!
//! ```text
//! IFDNFC_LOG=debug                      everything at debug and above
//! IFDNFC_LOG=ifdnfc_slot=trace,warn     slot transitions in detail
//! ```

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "IFDNFC_LOG";

/// Install the global stderr subscriber.
///
/// `default_filter` applies when `IFDNFC_LOG` is unset or unparsable.
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init(default_filter: &str) -> bool {
    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
