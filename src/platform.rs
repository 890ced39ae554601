//! Host-OS seams. Each trait is a thin wrapper over one platform capability so
//! the orchestration above it can run against fakes.

use std::fmt;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::WatchdogError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Permission {
    UsageAccess,
    DrawOverlays,
    IgnoreBatteryOptimizations,
}

impl Permission {
    pub const ALL: [Permission; 3] = [
        Permission::UsageAccess,
        Permission::DrawOverlays,
        Permission::IgnoreBatteryOptimizations,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UsageAccess => "usage access",
            Permission::DrawOverlays => "draw over other apps",
            Permission::IgnoreBatteryOptimizations => "battery optimization exemption",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionStatus {
    pub usage_access: bool,
    pub draw_overlays: bool,
    pub ignore_battery_optimizations: bool,
}

pub trait PermissionProbe: Send + Sync {
    fn is_granted(&self, permission: Permission) -> bool;

    /// Sends the user to the system screen that grants `permission`.
    fn request(&self, permission: Permission) -> Result<()>;

    fn permission_status(&self) -> PermissionStatus {
        PermissionStatus {
            usage_access: self.is_granted(Permission::UsageAccess),
            draw_overlays: self.is_granted(Permission::DrawOverlays),
            ignore_battery_optimizations: self
                .is_granted(Permission::IgnoreBatteryOptimizations),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UsageEventKind {
    MovedToForeground,
    MovedToBackground,
    /// Any other raw platform event code.
    Other(i32),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageEvent {
    pub app_id: String,
    pub kind: UsageEventKind,
    pub occurred_at: DateTime<Utc>,
}

impl UsageEvent {
    pub fn foreground(app_id: impl Into<String>, occurred_at: DateTime<Utc>) -> Self {
        Self {
            app_id: app_id.into(),
            kind: UsageEventKind::MovedToForeground,
            occurred_at,
        }
    }
}

/// The OS usage-event log, queried as a pure function of a time window.
///
/// Calls may block; the detection loop runs them on the blocking pool.
pub trait UsageEventSource: Send + Sync {
    /// Events in `[start, end]`, oldest first. Fails with
    /// [`WatchdogError::PermissionDenied`] when usage access is missing.
    fn query_events(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> std::result::Result<Vec<UsageEvent>, WatchdogError>;
}

/// Primitives for bringing another app to the foreground.
pub trait AppLauncher: Send + Sync {
    /// Launch through the platform's default entry point.
    /// `Ok(false)` means no entry point resolved for `package`.
    fn launch_default(&self, package: &str) -> Result<bool>;

    /// Launch an explicit `component` of `package`.
    fn launch_component(&self, package: &str, component: &str) -> Result<()>;

    /// Components of `package` that declare themselves launchers.
    fn launcher_activities(&self, package: &str) -> Result<Vec<String>>;
}

/// Ongoing "time remaining" indicator and completion surface for intention sessions.
pub trait SessionNotifier: Send + Sync {
    fn show_remaining(&self, display_name: &str, remaining_label: &str) -> Result<()>;

    fn show_completion(&self, app_id: &str, display_name: &str, intention: &str) -> Result<()>;

    fn clear(&self) -> Result<()>;
}

/// Notifier that does nothing. For hosts without a notification shade.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopNotifier;

impl SessionNotifier for NoopNotifier {
    fn show_remaining(&self, _display_name: &str, _remaining_label: &str) -> Result<()> {
        Ok(())
    }

    fn show_completion(&self, _app_id: &str, _display_name: &str, _intention: &str) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        Ok(())
    }
}
