//! Output routing for interactive and report modes
//!
//! In interactive mode user-facing text goes to stdout and logs to stderr.
//! In report mode stdout is reserved for the machine-readable report (JSON or
//! TAP), so user-facing text is routed to stderr alongside the logs.

mod config;
mod display;
#[doc(hidden)]
pub mod writer;

pub use config::{OutputConfig, OutputMode};

use once_cell::sync::OnceCell;
use std::sync::RwLock;

static OUTPUT_CONFIG: OnceCell<RwLock<OutputConfig>> = OnceCell::new();

/// Initialize the output system with the specified mode
pub fn init(mode: OutputMode) {
    init_with_verbosity(mode, false);
}

/// Initialize the output system with the specified mode and verbosity.
///
/// Only the first call takes effect.
pub fn init_with_verbosity(mode: OutputMode, verbose: bool) {
    let mut config = OutputConfig::new(mode);
    if verbose {
        config.set_verbose();
    }

    if OUTPUT_CONFIG.get().is_some() {
        return;
    }
    config.init_tracing();
    let _ = OUTPUT_CONFIG.set(RwLock::new(config));
}

/// Check if output system is initialized
pub fn is_initialized() -> bool {
    OUTPUT_CONFIG.get().is_some()
}

/// Get current output mode
pub fn current_mode() -> OutputMode {
    match OUTPUT_CONFIG.get() {
        Some(config) => match config.read() {
            Ok(config) => config.mode(),
            Err(poisoned) => poisoned.into_inner().mode(),
        },
        // Default to interactive mode if not initialized
        None => OutputMode::Cli,
    }
}

/// Whether colors and spinners should be shown
pub fn is_interactive() -> bool {
    match OUTPUT_CONFIG.get() {
        Some(config) => match config.read() {
            Ok(config) => config.mode() == OutputMode::Cli && config.colors_enabled(),
            Err(_) => false,
        },
        None => false,
    }
}
