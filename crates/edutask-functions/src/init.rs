//! Process-wide one-time initialization.
//!
//! The deployment options are installed once at process start. Later
//! calls are no-ops that return the options already in place.

use std::sync::OnceLock;

use tracing::{debug, info};

use crate::config::FunctionOptions;

static GLOBAL_OPTIONS: OnceLock<FunctionOptions> = OnceLock::new();

/// Install the global function options. Only the first call takes
/// effect; every call returns the installed options.
pub fn init_global_options(options: FunctionOptions) -> &'static FunctionOptions {
    let mut installed = false;
    let current = GLOBAL_OPTIONS.get_or_init(|| {
        installed = true;
        options
    });

    if installed {
        info!(
            region = %current.region,
            memory_mb = current.memory_mb,
            max_instances = current.max_instances,
            timeout_secs = current.timeout.as_secs(),
            "global function options installed"
        );
    } else {
        debug!("global function options already installed, keeping the first");
    }
    current
}

/// The installed options, if [`init_global_options`] has run.
pub fn global_options() -> Option<&'static FunctionOptions> {
    GLOBAL_OPTIONS.get()
}
