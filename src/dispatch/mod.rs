//! Presents the interruption to the user through an ordered chain of surfaces.

pub mod overlay;

use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::{Permission, PermissionProbe};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "dispatch";

use crate::{log_info, log_warn};

pub use overlay::{OverlayWindow, PersistentOverlaySurface};

/// Declared in fallback priority order; the dispatcher sorts by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SurfaceKind {
    PersistentOverlay,
    OverlayActivity,
    FullScreenNotification,
    DirectLaunch,
}

/// Payload handed to every surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchRequest {
    pub app_id: String,
    pub display_name: String,
    pub detected_at: DateTime<Utc>,
}

pub trait RedirectSurface: Send + Sync {
    fn kind(&self) -> SurfaceKind;

    /// Capability that must be granted before this surface is attempted.
    fn required_permission(&self) -> Option<Permission> {
        None
    }

    fn present(&self, request: &DispatchRequest) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Presented(SurfaceKind),
    Exhausted,
}

/// Fallback chain. Surfaces are tried once each in [`SurfaceKind`] order,
/// stopping at the first that presents. At most one surface per kind.
pub struct RedirectDispatcher {
    surfaces: Vec<Arc<dyn RedirectSurface>>,
    permissions: Arc<dyn PermissionProbe>,
}

impl RedirectDispatcher {
    pub fn new(permissions: Arc<dyn PermissionProbe>) -> Self {
        Self {
            surfaces: Vec::new(),
            permissions,
        }
    }

    /// Registers `surface` at its priority slot, replacing any surface of the same kind.
    pub fn with_surface(mut self, surface: Arc<dyn RedirectSurface>) -> Self {
        let kind = surface.kind();
        match self.surfaces.binary_search_by_key(&kind, |existing| existing.kind()) {
            Ok(index) => {
                log_warn!("replacing registered {:?} surface", kind);
                self.surfaces[index] = surface;
            }
            Err(index) => self.surfaces.insert(index, surface),
        }
        self
    }

    pub fn surface_kinds(&self) -> Vec<SurfaceKind> {
        self.surfaces.iter().map(|surface| surface.kind()).collect()
    }

    pub fn dispatch(&self, request: &DispatchRequest) -> DispatchOutcome {
        for surface in &self.surfaces {
            let kind = surface.kind();

            if let Some(permission) = surface.required_permission() {
                if !self.permissions.is_granted(permission) {
                    log_warn!("skipping {:?} for {}: {} not granted", kind, request.app_id, permission);
                    continue;
                }
            }

            match surface.present(request) {
                Ok(()) => {
                    log_info!("presented {} via {:?}", request.display_name, kind);
                    return DispatchOutcome::Presented(kind);
                }
                Err(err) => {
                    log_warn!("{:?} failed for {}: {err:#}", kind, request.app_id);
                }
            }
        }

        log_warn!("no redirect surface could present {}", request.app_id);
        DispatchOutcome::Exhausted
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use anyhow::bail;
    use chrono::TimeZone;

    use super::*;

    pub(crate) struct FakePermissions {
        granted: Mutex<Vec<Permission>>,
    }

    impl FakePermissions {
        pub(crate) fn granting(granted: &[Permission]) -> Arc<Self> {
            Arc::new(Self {
                granted: Mutex::new(granted.to_vec()),
            })
        }

        pub(crate) fn revoke(&self, permission: Permission) {
            self.granted.lock().unwrap().retain(|p| *p != permission);
        }
    }

    impl PermissionProbe for FakePermissions {
        fn is_granted(&self, permission: Permission) -> bool {
            self.granted.lock().unwrap().contains(&permission)
        }

        fn request(&self, permission: Permission) -> Result<()> {
            self.granted.lock().unwrap().push(permission);
            Ok(())
        }
    }

    pub(crate) struct RecordingSurface {
        kind: SurfaceKind,
        permission: Option<Permission>,
        fail: bool,
        pub(crate) presented: Mutex<Vec<DispatchRequest>>,
    }

    impl RecordingSurface {
        pub(crate) fn new(kind: SurfaceKind, fail: bool) -> Arc<Self> {
            Self::requiring(kind, None, fail)
        }

        pub(crate) fn requiring(
            kind: SurfaceKind,
            permission: Option<Permission>,
            fail: bool,
        ) -> Arc<Self> {
            Arc::new(Self {
                kind,
                permission,
                fail,
                presented: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn attempts(&self) -> usize {
            self.presented.lock().unwrap().len()
        }
    }

    impl RedirectSurface for RecordingSurface {
        fn kind(&self) -> SurfaceKind {
            self.kind
        }

        fn required_permission(&self) -> Option<Permission> {
            self.permission
        }

        fn present(&self, request: &DispatchRequest) -> Result<()> {
            self.presented.lock().unwrap().push(request.clone());
            if self.fail {
                bail!("{:?} unavailable", self.kind);
            }
            Ok(())
        }
    }

    fn request() -> DispatchRequest {
        DispatchRequest {
            app_id: "com.instagram.android".into(),
            display_name: "Instagram".into(),
            detected_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    #[test]
    fn first_success_wins() {
        let overlay = RecordingSurface::new(SurfaceKind::PersistentOverlay, false);
        let notification = RecordingSurface::new(SurfaceKind::FullScreenNotification, false);
        let dispatcher = RedirectDispatcher::new(FakePermissions::granting(&Permission::ALL))
            .with_surface(overlay.clone())
            .with_surface(notification.clone());

        assert_eq!(
            dispatcher.dispatch(&request()),
            DispatchOutcome::Presented(SurfaceKind::PersistentOverlay)
        );
        assert_eq!(overlay.attempts(), 1);
        assert_eq!(notification.attempts(), 0);
    }

    #[test]
    fn failures_fall_through_without_retry() {
        let overlay = RecordingSurface::new(SurfaceKind::PersistentOverlay, true);
        let activity = RecordingSurface::new(SurfaceKind::OverlayActivity, true);
        let launch = RecordingSurface::new(SurfaceKind::DirectLaunch, false);
        let dispatcher = RedirectDispatcher::new(FakePermissions::granting(&[]))
            .with_surface(overlay.clone())
            .with_surface(activity.clone())
            .with_surface(launch.clone());

        assert_eq!(
            dispatcher.dispatch(&request()),
            DispatchOutcome::Presented(SurfaceKind::DirectLaunch)
        );
        assert_eq!(overlay.attempts(), 1);
        assert_eq!(activity.attempts(), 1);
        assert_eq!(launch.attempts(), 1);
        assert_eq!(launch.presented.lock().unwrap()[0], request());
    }

    #[test]
    fn surfaces_without_permission_are_skipped() {
        let overlay = RecordingSurface::requiring(
            SurfaceKind::PersistentOverlay,
            Some(Permission::DrawOverlays),
            false,
        );
        let notification = RecordingSurface::new(SurfaceKind::FullScreenNotification, false);
        let permissions = FakePermissions::granting(&Permission::ALL);
        permissions.revoke(Permission::DrawOverlays);
        let dispatcher = RedirectDispatcher::new(permissions)
            .with_surface(overlay.clone())
            .with_surface(notification);

        assert_eq!(
            dispatcher.dispatch(&request()),
            DispatchOutcome::Presented(SurfaceKind::FullScreenNotification)
        );
        assert_eq!(overlay.attempts(), 0);
    }

    #[test]
    fn chain_follows_priority_not_registration_order() {
        let launch = RecordingSurface::new(SurfaceKind::DirectLaunch, false);
        let notification = RecordingSurface::new(SurfaceKind::FullScreenNotification, true);
        let activity = RecordingSurface::new(SurfaceKind::OverlayActivity, true);
        let dispatcher = RedirectDispatcher::new(FakePermissions::granting(&Permission::ALL))
            .with_surface(launch.clone())
            .with_surface(notification.clone())
            .with_surface(activity.clone());

        assert_eq!(
            dispatcher.surface_kinds(),
            vec![
                SurfaceKind::OverlayActivity,
                SurfaceKind::FullScreenNotification,
                SurfaceKind::DirectLaunch,
            ]
        );
        assert_eq!(
            dispatcher.dispatch(&request()),
            DispatchOutcome::Presented(SurfaceKind::DirectLaunch)
        );
        assert_eq!(activity.attempts(), 1);
        assert_eq!(notification.attempts(), 1);
        assert_eq!(launch.attempts(), 1);
    }

    #[test]
    fn later_surface_of_same_kind_replaces_earlier() {
        let first = RecordingSurface::new(SurfaceKind::FullScreenNotification, false);
        let second = RecordingSurface::new(SurfaceKind::FullScreenNotification, false);
        let dispatcher = RedirectDispatcher::new(FakePermissions::granting(&[]))
            .with_surface(first.clone())
            .with_surface(second.clone());

        assert_eq!(
            dispatcher.surface_kinds(),
            vec![SurfaceKind::FullScreenNotification]
        );
        dispatcher.dispatch(&request());
        assert_eq!(first.attempts(), 0);
        assert_eq!(second.attempts(), 1);
    }

    #[test]
    fn exhausted_when_everything_fails() {
        let dispatcher = RedirectDispatcher::new(FakePermissions::granting(&[]))
            .with_surface(RecordingSurface::new(SurfaceKind::FullScreenNotification, true));
        assert_eq!(dispatcher.dispatch(&request()), DispatchOutcome::Exhausted);

        let empty = RedirectDispatcher::new(FakePermissions::granting(&[]));
        assert_eq!(empty.dispatch(&request()), DispatchOutcome::Exhausted);
    }
}
