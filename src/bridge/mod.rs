//! Tauri 2 plugin exposing [`MindfulCore`](crate::MindfulCore) to a webview
//! host. The host creates the core and registers it with `app.manage(core)`
//! before the first command runs.

mod commands;

use serde::Serialize;
use tauri::{
    plugin::{Builder, TauriPlugin},
    AppHandle, Emitter, Runtime,
};

use crate::{
    error::WatchdogError,
    signals::{Signal, SignalSink},
};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "bridge";

use crate::log_warn;

/// Emits every signal as a Tauri event named by [`Signal::event_name`].
pub struct TauriSignalSink<R: Runtime> {
    app_handle: AppHandle<R>,
}

impl<R: Runtime> TauriSignalSink<R> {
    pub fn new(app_handle: AppHandle<R>) -> Self {
        Self { app_handle }
    }
}

impl<R: Runtime> SignalSink for TauriSignalSink<R> {
    fn emit(&self, signal: Signal) {
        if let Err(err) = self.app_handle.emit(signal.event_name(), &signal) {
            log_warn!("failed to emit {}: {err}", signal.event_name());
        }
    }
}

/// Error payload returned to the webview.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeError {
    pub code: &'static str,
    pub message: String,
}

impl From<WatchdogError> for BridgeError {
    fn from(err: WatchdogError) -> Self {
        Self {
            code: err.code(),
            message: err.to_string(),
        }
    }
}

impl From<anyhow::Error> for BridgeError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            code: "INTERNAL",
            message: format!("{err:#}"),
        }
    }
}

pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("mindful")
        .invoke_handler(tauri::generate_handler![
            commands::start_detection,
            commands::stop_detection,
            commands::is_detecting,
            commands::permission_status,
            commands::request_permission,
            commands::start_intention,
            commands::cancel_intention,
            commands::intention_snapshot,
            commands::launch_app,
            commands::open_store_listing,
            commands::take_pending_redirect,
            commands::dismiss_redirect,
            commands::record_interruption,
            commands::record_activity_choice,
            commands::record_intention_set,
            commands::record_intention_outcome,
            commands::record_post_timer_choice,
            commands::quick_metrics,
            commands::clear_statistics,
            commands::get_settings,
            commands::update_settings,
            commands::set_monitoring_enabled,
        ])
        .build()
}
