//! Foreground-app watchdog and intention timer for a mindful-break app.
//!
//! The host provides the OS mechanics through the traits in [`platform`],
//! [`dispatch`] and [`clock`]; [`MindfulCore`] wires them to the detection
//! loop, the suppression store, the intention timer and SQLite storage.

pub mod clock;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod intention;
pub mod launch;
pub mod platform;
pub mod registry;
pub mod settings;
pub mod signals;
pub mod suppression;
pub mod utils;
pub mod watchdog;

#[cfg(feature = "tauri")]
pub mod bridge;

use std::{path::Path, sync::Arc};

use anyhow::Context;
use tokio::sync::Mutex;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::WatchdogConfig;
pub use db::{ActivityChoice, Database, IntentionRecord, QuickMetrics, RedirectRecord};
pub use dispatch::{
    DispatchOutcome, DispatchRequest, OverlayWindow, PersistentOverlaySurface, RedirectDispatcher,
    RedirectSurface, SurfaceKind,
};
pub use error::{Result, WatchdogError};
pub use intention::{format_remaining, IntentionSnapshot, IntentionTimer, TimerStatus};
pub use launch::{store_listing_url, LaunchMethod, LaunchSequence};
pub use platform::{
    AppLauncher, NoopNotifier, Permission, PermissionProbe, PermissionStatus, SessionNotifier,
    UsageEvent, UsageEventKind, UsageEventSource,
};
pub use registry::{WatchedApp, WatchedAppRegistry};
pub use settings::{SettingsStore, UserSettings};
pub use signals::{ChannelSink, LogSink, Signal, SignalSink};
pub use suppression::{Suppression, SuppressionStore};
pub use utils::logging::init_logging;
pub use watchdog::{DetectionContext, WatchdogController};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "core";

const DATABASE_FILE: &str = "mindful.sqlite3";
const SETTINGS_FILE: &str = "settings.json";

/// Host-provided implementations of every OS seam.
#[derive(Clone)]
pub struct Platform {
    pub usage_events: Arc<dyn UsageEventSource>,
    pub permissions: Arc<dyn PermissionProbe>,
    pub launcher: Arc<dyn AppLauncher>,
    pub notifier: Arc<dyn SessionNotifier>,
    /// When present, the persistent overlay heads the dispatch chain.
    pub overlay: Option<Arc<dyn OverlayWindow>>,
    /// Remaining surfaces. The dispatcher orders them by kind.
    pub surfaces: Vec<Arc<dyn RedirectSurface>>,
    pub clock: Arc<dyn Clock>,
}

pub struct MindfulCore {
    config: WatchdogConfig,
    registry: Arc<WatchedAppRegistry>,
    suppression: Arc<SuppressionStore>,
    db: Database,
    permissions: Arc<dyn PermissionProbe>,
    clock: Arc<dyn Clock>,
    launch: Arc<LaunchSequence>,
    watchdog: Mutex<WatchdogController>,
    timer: IntentionTimer,
    settings: Option<SettingsStore>,
}

impl MindfulCore {
    pub fn new(
        config: WatchdogConfig,
        platform: Platform,
        db: Database,
        sink: Arc<dyn SignalSink>,
        registry: WatchedAppRegistry,
    ) -> anyhow::Result<Self> {
        config.validate()?;

        let registry = Arc::new(registry);
        let suppression = Arc::new(SuppressionStore::new(platform.clock.clone()));

        let mut dispatcher = RedirectDispatcher::new(platform.permissions.clone());
        if let Some(window) = platform.overlay.clone() {
            dispatcher = dispatcher.with_surface(Arc::new(PersistentOverlaySurface::new(
                window,
                config.overlay_dwell(),
                config.overlay_recheck(),
            )));
        }
        for surface in &platform.surfaces {
            dispatcher = dispatcher.with_surface(surface.clone());
        }

        let launch = Arc::new(LaunchSequence::new(
            platform.launcher.clone(),
            suppression.clone(),
            config.grace_period(),
        ));

        let ctx = DetectionContext {
            config: config.clone(),
            source: platform.usage_events.clone(),
            registry: registry.clone(),
            suppression: suppression.clone(),
            db: db.clone(),
            dispatcher: Arc::new(dispatcher),
            sink: sink.clone(),
        };

        let timer = IntentionTimer::new(
            suppression.clone(),
            launch.clone(),
            platform.notifier.clone(),
            sink,
            db.clone(),
            platform.clock.clone(),
            config.timer_tick(),
        );

        Ok(Self {
            watchdog: Mutex::new(WatchdogController::new(ctx, platform.permissions.clone())),
            config,
            registry,
            suppression,
            db,
            permissions: platform.permissions,
            clock: platform.clock,
            launch,
            timer,
            settings: None,
        })
    }

    /// Opens storage and settings under `data_dir`, runs startup recovery and
    /// resumes detection when monitoring is enabled in settings.
    pub async fn open(
        data_dir: &Path,
        platform: Platform,
        sink: Arc<dyn SignalSink>,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DATABASE_FILE))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE))?;
        let user_settings = settings.get();
        let registry = WatchedAppRegistry::with_extra(user_settings.extra_watched_apps);

        let mut core = Self::new(user_settings.watchdog, platform, db, sink, registry)?;
        core.settings = Some(settings);
        core.recover().await?;

        if user_settings.monitoring_enabled {
            core.resume_monitoring().await;
        }

        log_info!("core opened at {}", data_dir.display());
        Ok(core)
    }

    pub fn config(&self) -> &WatchdogConfig {
        &self.config
    }

    pub fn registry(&self) -> &WatchedAppRegistry {
        &self.registry
    }

    pub fn suppression(&self) -> &Arc<SuppressionStore> {
        &self.suppression
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> Option<&SettingsStore> {
        self.settings.as_ref()
    }

    pub async fn start_detection(&self) -> Result<()> {
        self.watchdog.lock().await.start()
    }

    pub async fn stop_detection(&self) -> Result<()> {
        self.watchdog.lock().await.stop().await
    }

    /// Starts detection if usage access is granted. Without it monitoring
    /// stays off until the host calls [`Self::start_detection`].
    async fn resume_monitoring(&self) {
        match self.start_detection().await {
            Ok(()) | Err(WatchdogError::AlreadyRunning) => {}
            Err(err) => log_warn!("monitoring enabled but not started: {err}"),
        }
    }

    pub async fn is_detecting(&self) -> bool {
        self.watchdog.lock().await.is_running()
    }

    /// Starts an intention session for a watched app.
    pub async fn start_intention(
        &self,
        app_id: &str,
        duration_secs: u32,
        intention: &str,
    ) -> Result<IntentionSnapshot> {
        let display_name = self.registry.display_name(app_id);
        self.timer
            .start(app_id, &display_name, duration_secs, intention)
            .await
    }

    pub async fn cancel_intention(&self) -> Result<()> {
        self.timer.cancel().await
    }

    pub async fn intention_snapshot(&self) -> IntentionSnapshot {
        self.timer.snapshot().await
    }

    pub fn launch_app(&self, package: &str) -> Result<LaunchMethod> {
        self.launch.launch(package)
    }

    /// The redirect record the UI should resume, if one is fresh. Storage
    /// failures degrade to `None`.
    pub async fn take_pending_redirect(&self) -> Option<RedirectRecord> {
        let now = self.clock.now();
        match self
            .db
            .take_fresh_redirect_record(now, self.config.redirect_freshness())
            .await
        {
            Ok(record) => record,
            Err(err) => {
                log_warn!("{}", WatchdogError::persistence(err));
                None
            }
        }
    }

    /// Clears the redirect record once the user has dealt with it.
    pub async fn dismiss_redirect(&self) -> Result<()> {
        self.db
            .clear_redirect_record()
            .await
            .map_err(WatchdogError::persistence)
    }

    pub fn permission_status(&self) -> PermissionStatus {
        self.permissions.permission_status()
    }

    pub fn request_permission(&self, permission: Permission) -> Result<()> {
        self.permissions.request(permission).map_err(|err| {
            log_warn!("failed to request {}: {err:#}", permission);
            WatchdogError::PermissionDenied(permission)
        })
    }

    /// Finalizes intention sessions left running by a previous process.
    /// Their countdown and protection are not restored.
    pub async fn recover(&self) -> Result<Vec<IntentionRecord>> {
        let recovered = self
            .db
            .recover_interrupted_intentions(self.clock.now())
            .await
            .map_err(WatchdogError::persistence)?;

        for record in &recovered {
            log_warn!(
                "Recovered interrupted intention {} for {}; marked Interrupted",
                record.id,
                record.app_id
            );
        }

        Ok(recovered)
    }
}
