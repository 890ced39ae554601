use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{Result, WatchdogError},
    platform::{Permission, PermissionProbe},
};

use super::loop_worker::{detection_loop, DetectionContext};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "watchdog";

use crate::{log_error, log_info};

/// Owns the background detection task.
pub struct WatchdogController {
    ctx: DetectionContext,
    permissions: Arc<dyn PermissionProbe>,
    handle: Option<JoinHandle<()>>,
    cancel_token: Option<CancellationToken>,
}

impl WatchdogController {
    pub fn new(ctx: DetectionContext, permissions: Arc<dyn PermissionProbe>) -> Self {
        Self {
            ctx,
            permissions,
            handle: None,
            cancel_token: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Starts polling. Requires usage access.
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(WatchdogError::AlreadyRunning);
        }

        if !self.permissions.is_granted(Permission::UsageAccess) {
            return Err(WatchdogError::PermissionDenied(Permission::UsageAccess));
        }

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(detection_loop(self.ctx.clone(), cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        log_info!("watchdog started");
        Ok(())
    }

    /// Stops polling and waits for the loop to exit, so no detection is
    /// signalled after this returns. Calling it while stopped is a no-op.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            if let Err(err) = handle.await {
                log_error!("detection loop task failed to join: {err}");
            }
            log_info!("watchdog stopped");
        }

        Ok(())
    }
}

impl Drop for WatchdogController {
    fn drop(&mut self) {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }
    }
}
