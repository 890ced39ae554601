//! Error taxonomy surfaced by the watchdog, launcher and intention timer.

use thiserror::Error;

use crate::platform::Permission;

#[derive(Error, Debug)]
pub enum WatchdogError {
    /// A required capability has not been granted. Recoverable by the user.
    #[error("permission not granted: {0}")]
    PermissionDenied(Permission),

    /// Every launch method for the target app was exhausted.
    #[error("unable to launch {package}")]
    LaunchFailed { package: String },

    /// Transient usage-event query failure; retried on the next tick.
    #[error("usage event query failed: {0}")]
    QueryFailed(String),

    #[error("persistence failed: {0}")]
    PersistenceFailed(String),

    #[error("detection loop already running")]
    AlreadyRunning,

    #[error("an intention session is already active for {0}")]
    TimerActive(String),

    #[error("invalid intention: {0}")]
    InvalidIntention(String),
}

impl WatchdogError {
    pub(crate) fn persistence(err: anyhow::Error) -> Self {
        WatchdogError::PersistenceFailed(format!("{err:#}"))
    }

    /// Short machine-readable code for host bridges.
    pub fn code(&self) -> &'static str {
        match self {
            WatchdogError::PermissionDenied(_) => "PERMISSION_DENIED",
            WatchdogError::LaunchFailed { .. } => "LAUNCH_FAILED",
            WatchdogError::QueryFailed(_) => "QUERY_FAILED",
            WatchdogError::PersistenceFailed(_) => "PERSISTENCE_FAILED",
            WatchdogError::AlreadyRunning => "ALREADY_RUNNING",
            WatchdogError::TimerActive(_) => "TIMER_ACTIVE",
            WatchdogError::InvalidIntention(_) => "INVALID_INTENTION",
        }
    }
}

pub type Result<T, E = WatchdogError> = std::result::Result<T, E>;
