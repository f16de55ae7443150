//! Logging setup built on `tracing-subscriber`.
//!
//! `RUST_LOG` always wins when set. Otherwise `-v` selects debug, `-vv`
//! trace, `-q` errors only, and the default is info for this crate and
//! warn for dependencies.

use crate::error::{Result, TrackerError};
use std::sync::Once;
use tracing_subscriber::EnvFilter;

fn default_directive(verbose: u8, quiet: bool) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => "warn,issue_tracker=info,tower_http=info",
        1 => "info,issue_tracker=debug,tower_http=debug",
        _ => "debug,issue_tracker=trace,tower_http=trace",
    }
}

/// Install the global subscriber. Logs go to stderr.
///
/// # Errors
///
/// Returns an error if the filter is invalid or a subscriber is already set.
pub fn init_logging(verbose: u8, quiet: bool, json: bool) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive(verbose, quiet))
            .map_err(|err| TrackerError::Config(format!("invalid log filter: {err}")))?,
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose > 0);

    let installed = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|err| TrackerError::Config(format!("failed to install logger: {err}")))
}

static TEST_INIT: Once = Once::new();

/// Install a test-writer subscriber once per process. Safe to call from
/// every test.
pub fn init_test_logging() {
    TEST_INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("issue_tracker=debug"));
        // Another harness may have installed a subscriber already.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}
