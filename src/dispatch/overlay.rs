use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use anyhow::Result;
use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::platform::Permission;

use super::{DispatchRequest, RedirectSurface, SurfaceKind};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "overlay";

use crate::{log_debug, log_error, log_info, log_warn};

/// The "draw over other apps" window.
pub trait OverlayWindow: Send + Sync {
    fn show(&self, request: &DispatchRequest) -> Result<()>;

    fn is_visible(&self) -> bool;

    /// Brings back an overlay the OS removed.
    fn reshow(&self) -> Result<()>;

    /// True once the user closed the overlay through its own controls.
    fn was_dismissed_by_user(&self) -> bool;
}

/// Shows the overlay and keeps it up for a minimum dwell, re-showing it
/// whenever the OS takes it down early.
pub struct PersistentOverlaySurface {
    window: Arc<dyn OverlayWindow>,
    dwell: Duration,
    recheck: Duration,
    guard: Mutex<Option<CancellationToken>>,
}

impl PersistentOverlaySurface {
    pub fn new(window: Arc<dyn OverlayWindow>, dwell: Duration, recheck: Duration) -> Self {
        Self {
            window,
            dwell,
            recheck,
            guard: Mutex::new(None),
        }
    }

    fn replace_guard(&self, token: Option<CancellationToken>) {
        let mut guard = self.guard.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = guard.take() {
            previous.cancel();
        }
        *guard = token;
    }
}

impl Drop for PersistentOverlaySurface {
    fn drop(&mut self) {
        self.replace_guard(None);
    }
}

impl RedirectSurface for PersistentOverlaySurface {
    fn kind(&self) -> SurfaceKind {
        SurfaceKind::PersistentOverlay
    }

    fn required_permission(&self) -> Option<Permission> {
        Some(Permission::DrawOverlays)
    }

    fn present(&self, request: &DispatchRequest) -> Result<()> {
        self.window.show(request)?;

        let Ok(runtime) = Handle::try_current() else {
            log_warn!("no tokio runtime, overlay for {} shown without dwell guard", request.app_id);
            self.replace_guard(None);
            return Ok(());
        };

        let token = CancellationToken::new();
        self.replace_guard(Some(token.clone()));
        runtime.spawn(dwell_guard(
            self.window.clone(),
            request.app_id.clone(),
            self.dwell,
            self.recheck,
            token,
        ));

        Ok(())
    }
}

async fn dwell_guard(
    window: Arc<dyn OverlayWindow>,
    app_id: String,
    dwell: Duration,
    recheck: Duration,
    cancel_token: CancellationToken,
) {
    let deadline = Instant::now() + dwell;
    let mut ticker = time::interval_at(Instant::now() + recheck, recheck);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = time::sleep_until(deadline) => {
                log_debug!("overlay dwell elapsed for {}", app_id);
                break;
            }
            _ = cancel_token.cancelled() => break,
            _ = ticker.tick() => {
                if window.was_dismissed_by_user() {
                    log_info!("overlay for {} dismissed by user", app_id);
                    break;
                }
                if !window.is_visible() {
                    log_warn!("overlay for {} removed early, re-showing", app_id);
                    if let Err(err) = window.reshow() {
                        log_error!("failed to re-show overlay for {}: {err:#}", app_id);
                    }
                }
            }
        }
    }
}
