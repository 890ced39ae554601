//! Bringing a watched app to the foreground on the user's behalf.

use std::{collections::HashMap, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{
    error::{Result, WatchdogError},
    platform::AppLauncher,
    registry::INSTAGRAM,
    suppression::SuppressionStore,
};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "launch";

use crate::{log_info, log_warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", content = "component", rename_all = "camelCase")]
pub enum LaunchMethod {
    DefaultEntryPoint,
    KnownComponent(String),
    LauncherActivity(String),
}

/// Launcher components for apps whose default entry point is known to be
/// unreliable, tried in order.
pub fn known_fallbacks() -> HashMap<String, Vec<String>> {
    HashMap::from([(
        INSTAGRAM.to_string(),
        vec![
            "com.instagram.android.activity.MainTabActivity".to_string(),
            "com.instagram.mainactivity.MainActivity".to_string(),
        ],
    )])
}

/// Store listing offered to the user after [`WatchdogError::LaunchFailed`].
pub fn store_listing_url(package: &str) -> String {
    format!("market://details?id={package}")
}

/// Web variant of [`store_listing_url`] for hosts without a store app.
pub fn store_listing_web_url(package: &str) -> String {
    format!("https://play.google.com/store/apps/details?id={package}")
}

pub struct LaunchSequence {
    launcher: Arc<dyn AppLauncher>,
    suppression: Arc<SuppressionStore>,
    fallbacks: HashMap<String, Vec<String>>,
    grace: chrono::Duration,
}

impl LaunchSequence {
    pub fn new(
        launcher: Arc<dyn AppLauncher>,
        suppression: Arc<SuppressionStore>,
        grace: chrono::Duration,
    ) -> Self {
        Self {
            launcher,
            suppression,
            fallbacks: known_fallbacks(),
            grace,
        }
    }

    pub fn with_fallbacks(mut self, fallbacks: HashMap<String, Vec<String>>) -> Self {
        self.fallbacks = fallbacks;
        self
    }

    /// Tries the default entry point, then known components, then the
    /// package's launcher activities. A successful launch puts `package`
    /// into its grace period.
    pub fn launch(&self, package: &str) -> Result<LaunchMethod> {
        let method = self
            .attempt(package)
            .ok_or_else(|| WatchdogError::LaunchFailed {
                package: package.to_string(),
            })?;

        let until = self.suppression.add_grace_period(package, self.grace);
        log_info!("launched {} via {:?}, grace until {}", package, method, until);
        Ok(method)
    }

    fn attempt(&self, package: &str) -> Option<LaunchMethod> {
        match self.launcher.launch_default(package) {
            Ok(true) => return Some(LaunchMethod::DefaultEntryPoint),
            Ok(false) => log_warn!("no default entry point for {}", package),
            Err(err) => log_warn!("default launch failed for {}: {err:#}", package),
        }

        if let Some(components) = self.fallbacks.get(package) {
            for component in components {
                match self.launcher.launch_component(package, component) {
                    Ok(()) => return Some(LaunchMethod::KnownComponent(component.clone())),
                    Err(err) => log_warn!("known component {} failed: {err:#}", component),
                }
            }
        }

        let activities = match self.launcher.launcher_activities(package) {
            Ok(activities) => activities,
            Err(err) => {
                log_warn!("could not resolve launcher activities for {}: {err:#}", package);
                return None;
            }
        };

        for activity in activities {
            match self.launcher.launch_component(package, &activity) {
                Ok(()) => return Some(LaunchMethod::LauncherActivity(activity)),
                Err(err) => log_warn!("launcher activity {} failed: {err:#}", activity),
            }
        }

        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use anyhow::bail;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;
    use crate::clock::{Clock, ManualClock};

    /// Launcher whose outcome per step is scripted.
    #[derive(Default)]
    pub(crate) struct ScriptedLauncher {
        pub(crate) default_resolves: bool,
        pub(crate) working_components: Vec<String>,
        pub(crate) activities: Vec<String>,
        pub(crate) calls: Mutex<Vec<String>>,
    }

    impl ScriptedLauncher {
        pub(crate) fn resolving() -> Arc<Self> {
            Arc::new(Self {
                default_resolves: true,
                ..Self::default()
            })
        }

        pub(crate) fn broken() -> Arc<Self> {
            Arc::new(Self::default())
        }

        fn record(&self, call: String) {
            self.calls.lock().unwrap().push(call);
        }
    }

    impl AppLauncher for ScriptedLauncher {
        fn launch_default(&self, package: &str) -> anyhow::Result<bool> {
            self.record(format!("default:{package}"));
            Ok(self.default_resolves)
        }

        fn launch_component(&self, package: &str, component: &str) -> anyhow::Result<()> {
            self.record(format!("component:{package}/{component}"));
            if self.working_components.iter().any(|c| c == component) {
                Ok(())
            } else {
                bail!("component {component} not exported")
            }
        }

        fn launcher_activities(&self, package: &str) -> anyhow::Result<Vec<String>> {
            self.record(format!("activities:{package}"));
            Ok(self.activities.clone())
        }
    }

    fn store() -> (Arc<ManualClock>, Arc<SuppressionStore>) {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let store = Arc::new(SuppressionStore::new(clock.clone()));
        (clock, store)
    }

    #[test]
    fn default_entry_point_sets_grace() {
        let (clock, suppression) = store();
        let sequence =
            LaunchSequence::new(ScriptedLauncher::resolving(), suppression.clone(), Duration::seconds(45));

        assert_eq!(
            sequence.launch("com.whatsapp").unwrap(),
            LaunchMethod::DefaultEntryPoint
        );
        assert_eq!(
            suppression.grace_expiry("com.whatsapp"),
            Some(clock.now() + Duration::seconds(45))
        );
    }

    #[test]
    fn known_component_fallback_sets_grace() {
        let (clock, suppression) = store();
        let launcher = Arc::new(ScriptedLauncher {
            working_components: vec!["com.instagram.mainactivity.MainActivity".into()],
            ..ScriptedLauncher::default()
        });
        let sequence = LaunchSequence::new(launcher.clone(), suppression.clone(), Duration::seconds(45));

        assert_eq!(
            sequence.launch(INSTAGRAM).unwrap(),
            LaunchMethod::KnownComponent("com.instagram.mainactivity.MainActivity".into())
        );
        assert_eq!(
            suppression.grace_expiry(INSTAGRAM),
            Some(clock.now() + Duration::seconds(45))
        );
        assert!(suppression.is_suppressed(INSTAGRAM, clock.now() + Duration::seconds(44)));
        assert_eq!(
            *launcher.calls.lock().unwrap(),
            vec![
                format!("default:{INSTAGRAM}"),
                format!("component:{INSTAGRAM}/com.instagram.android.activity.MainTabActivity"),
                format!("component:{INSTAGRAM}/com.instagram.mainactivity.MainActivity"),
            ]
        );
    }

    #[test]
    fn launcher_activities_are_last_resort() {
        let (_clock, suppression) = store();
        let launcher = Arc::new(ScriptedLauncher {
            working_components: vec!["com.reddit.Launcher".into()],
            activities: vec!["com.reddit.Splash".into(), "com.reddit.Launcher".into()],
            ..ScriptedLauncher::default()
        });
        let sequence = LaunchSequence::new(launcher, suppression, Duration::seconds(45));

        assert_eq!(
            sequence.launch("com.reddit.frontpage").unwrap(),
            LaunchMethod::LauncherActivity("com.reddit.Launcher".into())
        );
    }

    #[test]
    fn exhausted_launch_reports_package_without_grace() {
        let (_clock, suppression) = store();
        let sequence =
            LaunchSequence::new(ScriptedLauncher::broken(), suppression.clone(), Duration::seconds(45));

        match sequence.launch("com.snapchat.android") {
            Err(WatchdogError::LaunchFailed { package }) => {
                assert_eq!(package, "com.snapchat.android");
                assert_eq!(
                    store_listing_url(&package),
                    "market://details?id=com.snapchat.android"
                );
            }
            other => panic!("unexpected launch result: {other:?}"),
        }
        assert_eq!(suppression.grace_expiry("com.snapchat.android"), None);
    }
}
