use chrono::Utc;
use tauri::{AppHandle, Runtime, State};
use tauri_plugin_opener::OpenerExt;

use crate::{
    db::{ActivityChoice, QuickMetrics, RedirectRecord},
    error::WatchdogError,
    intention::IntentionSnapshot,
    launch::{store_listing_url, store_listing_web_url, LaunchMethod},
    platform::{Permission, PermissionStatus},
    settings::UserSettings,
    MindfulCore,
};

use super::BridgeError;

type CommandResult<T> = Result<T, BridgeError>;

#[tauri::command]
pub async fn start_detection(core: State<'_, MindfulCore>) -> CommandResult<()> {
    core.start_detection().await.map_err(Into::into)
}

#[tauri::command]
pub async fn stop_detection(core: State<'_, MindfulCore>) -> CommandResult<()> {
    core.stop_detection().await.map_err(Into::into)
}

#[tauri::command]
pub async fn is_detecting(core: State<'_, MindfulCore>) -> CommandResult<bool> {
    Ok(core.is_detecting().await)
}

#[tauri::command]
pub fn permission_status(core: State<'_, MindfulCore>) -> PermissionStatus {
    core.permission_status()
}

#[tauri::command]
pub fn request_permission(
    core: State<'_, MindfulCore>,
    permission: Permission,
) -> CommandResult<()> {
    core.request_permission(permission).map_err(Into::into)
}

#[tauri::command]
pub async fn start_intention(
    core: State<'_, MindfulCore>,
    app_id: String,
    duration_secs: u32,
    intention: String,
) -> CommandResult<IntentionSnapshot> {
    core.start_intention(&app_id, duration_secs, &intention)
        .await
        .map_err(Into::into)
}

#[tauri::command]
pub async fn cancel_intention(core: State<'_, MindfulCore>) -> CommandResult<()> {
    core.cancel_intention().await.map_err(Into::into)
}

#[tauri::command]
pub async fn intention_snapshot(core: State<'_, MindfulCore>) -> CommandResult<IntentionSnapshot> {
    Ok(core.intention_snapshot().await)
}

#[tauri::command]
pub fn launch_app(core: State<'_, MindfulCore>, package: String) -> CommandResult<LaunchMethod> {
    core.launch_app(&package).map_err(Into::into)
}

/// Opens the store listing for `package`, falling back to the web listing.
#[tauri::command]
pub fn open_store_listing<R: Runtime>(app: AppHandle<R>, package: String) -> CommandResult<()> {
    let opener = app.opener();
    if opener
        .open_url(store_listing_url(&package), None::<&str>)
        .is_ok()
    {
        return Ok(());
    }

    opener
        .open_url(store_listing_web_url(&package), None::<&str>)
        .map_err(|err| BridgeError {
            code: "OPEN_FAILED",
            message: err.to_string(),
        })
}

#[tauri::command]
pub async fn take_pending_redirect(
    core: State<'_, MindfulCore>,
) -> CommandResult<Option<RedirectRecord>> {
    Ok(core.take_pending_redirect().await)
}

#[tauri::command]
pub async fn dismiss_redirect(core: State<'_, MindfulCore>) -> CommandResult<()> {
    core.dismiss_redirect().await.map_err(Into::into)
}

#[tauri::command]
pub async fn record_interruption(
    core: State<'_, MindfulCore>,
    app_id: String,
) -> CommandResult<String> {
    let display_name = core.registry().display_name(&app_id);
    let db = core.database();
    Ok(db
        .record_interruption(&app_id, &display_name, Utc::now())
        .await?)
}

#[tauri::command]
pub async fn record_activity_choice(
    core: State<'_, MindfulCore>,
    handle: String,
    choice: ActivityChoice,
) -> CommandResult<()> {
    Ok(core.database().record_activity_choice(&handle, choice).await?)
}

#[tauri::command]
pub async fn record_intention_set(core: State<'_, MindfulCore>, handle: String) -> CommandResult<()> {
    Ok(core.database().record_intention_set(&handle).await?)
}

#[tauri::command]
pub async fn record_intention_outcome(
    core: State<'_, MindfulCore>,
    handle: String,
    fulfilled: bool,
    had_reflection: bool,
) -> CommandResult<()> {
    Ok(core
        .database()
        .record_intention_outcome(&handle, fulfilled, had_reflection)
        .await?)
}

#[tauri::command]
pub async fn record_post_timer_choice(
    core: State<'_, MindfulCore>,
    handle: String,
    returned_to_app: bool,
) -> CommandResult<()> {
    Ok(core
        .database()
        .record_post_timer_choice(&handle, returned_to_app)
        .await?)
}

#[tauri::command]
pub async fn quick_metrics(core: State<'_, MindfulCore>) -> CommandResult<QuickMetrics> {
    Ok(core.database().quick_metrics(Utc::now().date_naive()).await?)
}

#[tauri::command]
pub async fn clear_statistics(core: State<'_, MindfulCore>) -> CommandResult<()> {
    Ok(core.database().clear_statistics().await?)
}

/// Stored settings; watchdog changes apply the next time the core is opened.
#[tauri::command]
pub fn get_settings(core: State<'_, MindfulCore>) -> CommandResult<UserSettings> {
    Ok(core.settings().map(|store| store.get()).unwrap_or_default())
}

#[tauri::command]
pub fn update_settings(core: State<'_, MindfulCore>, settings: UserSettings) -> CommandResult<()> {
    match core.settings() {
        Some(store) => Ok(store.update(settings)?),
        None => Err(BridgeError {
            code: "NO_SETTINGS",
            message: "core was created without a settings file".into(),
        }),
    }
}

#[tauri::command]
pub async fn set_monitoring_enabled(
    core: State<'_, MindfulCore>,
    enabled: bool,
) -> CommandResult<()> {
    if let Some(store) = core.settings() {
        store.set_monitoring_enabled(enabled)?;
    }
    if enabled {
        match core.start_detection().await {
            Ok(()) | Err(WatchdogError::AlreadyRunning) => Ok(()),
            Err(err) => Err(err.into()),
        }
    } else {
        core.stop_detection().await.map_err(Into::into)
    }
}
