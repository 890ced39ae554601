//! Switchable, tagged logging macros plus logger initialisation.
//!
//! Every module that logs through these macros defines two constants:
//! ```ignore
//! const ENABLE_LOGS: bool = true;
//! const LOG_TAG: &str = "watchdog";
//! ```
//! and imports the macros from the crate root:
//! ```ignore
//! use crate::{log_debug, log_error, log_info, log_warn};
//! ```
//! Output is prefixed with the tag, e.g. `[watchdog] detection loop started`.

/// Info-level log, emitted only when the calling module's `ENABLE_LOGS` is set.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::info!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Warn-level variant of [`log_info!`].
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::warn!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Error-level variant of [`log_info!`].
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::error!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Debug-level variant of [`log_info!`]. Used for per-tick chatter.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        if ENABLE_LOGS {
            log::debug!("[{}] {}", LOG_TAG, format_args!($($arg)*));
        }
    };
}

/// Initialise `env_logger` from `RUST_LOG`, defaulting to `Info`.
///
/// `MINDFUL_DEBUG=1` raises the default to `Debug`. Safe to call more than
/// once; later calls are ignored.
pub fn init_logging() {
    let debug_mode = std::env::var("MINDFUL_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    let default_level = if debug_mode {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    let _ = env_logger::Builder::new()
        .filter_level(default_level)
        .parse_default_env()
        .try_init();
}
