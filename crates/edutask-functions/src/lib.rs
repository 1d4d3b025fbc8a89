//! EduTask function host.
//!
//! Wires the EduTask API into the gateway adapter and carries the
//! deployment concerns around it:
//!
//! - [`config`]: `functions.toml` (deployment options, CORS allow-list)
//! - [`init`]: one-time process-wide installation of the options
//! - [`trigger`]: local HTTP trigger emulating the hosting runtime
//! - [`convert`]: hyper request/response conversions for the trigger

pub mod config;
pub mod convert;
pub mod init;
pub mod trigger;

use edutask_api::RouterApp;
use edutask_gateway::Adapter;

pub use config::{ConfigError, ConfigResult, FunctionOptions, FunctionsConfig};
pub use init::{global_options, init_global_options};
pub use trigger::LocalTrigger;

/// Build the function entry point for `config`.
///
/// Installs the deployment options globally (first call wins) and
/// returns the adapter wrapping the API router.
pub fn function_entry(config: &FunctionsConfig) -> ConfigResult<Adapter<RouterApp>> {
    init_global_options(config.function_options()?);
    Ok(Adapter::new(edutask_api::build_app(config.cors_policy())))
}
