//! Tracing setup
//!
//! Every crate logs through `tracing` under `recordfake::*` targets. Test
//! suites call [`init_tracing`] to see them; the filter comes from
//! `RECORDFAKE_LOG` (e.g. `RECORDFAKE_LOG=recordfake::engine=trace`) and
//! defaults to `warn`.

use std::sync::Once;
use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives
pub const LOG_ENV: &str = "RECORDFAKE_LOG";

static INIT: Once = Once::new();

/// Install a fmt subscriber writing through the test harness.
///
/// Safe to call repeatedly; only the first call installs anything, and an
/// already-installed global subscriber is left in place.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
