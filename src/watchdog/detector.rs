use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::{
    platform::{UsageEvent, UsageEventKind},
    registry::WatchedAppRegistry,
    suppression::SuppressionStore,
};

const ENABLE_LOGS: bool = true;
const LOG_TAG: &str = "detector";

use crate::log_debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub app_id: String,
    pub display_name: String,
    /// When the OS saw the app come to the foreground.
    pub occurred_at: DateTime<Utc>,
    /// Tick time at which the detection fired.
    pub detected_at: DateTime<Utc>,
}

/// Filters one window of usage events down to at most one detection.
pub struct Detector {
    registry: Arc<WatchedAppRegistry>,
    dedup_window: Duration,
    last_detected: Option<(String, DateTime<Utc>)>,
}

impl Detector {
    pub fn new(registry: Arc<WatchedAppRegistry>, dedup_window: Duration) -> Self {
        Self {
            registry,
            dedup_window,
            last_detected: None,
        }
    }

    pub fn last_detected(&self) -> Option<(&str, DateTime<Utc>)> {
        self.last_detected
            .as_ref()
            .map(|(app_id, at)| (app_id.as_str(), *at))
    }

    /// Walks `events` in order and returns the first foreground event of a
    /// watched app that is neither suppressed nor a repeat of the previous
    /// detection within the dedup window. Suppression is read under a
    /// single lock for the whole window.
    pub fn evaluate(
        &mut self,
        events: &[UsageEvent],
        suppression: &SuppressionStore,
        now: DateTime<Utc>,
    ) -> Option<Detection> {
        let mut snapshot = suppression.snapshot();

        for event in events {
            if event.kind != UsageEventKind::MovedToForeground {
                continue;
            }

            let Some(app) = self.registry.get(&event.app_id) else {
                continue;
            };

            if let Some(reason) = snapshot.check(&app.id, now) {
                log_debug!("{} suppressed: {:?}", app.id, reason);
                continue;
            }

            if self.is_repeat(&app.id, now) {
                log_debug!("{} already detected within dedup window", app.id);
                continue;
            }

            self.last_detected = Some((app.id.clone(), now));
            return Some(Detection {
                app_id: app.id.clone(),
                display_name: app.display_name.clone(),
                occurred_at: event.occurred_at,
                detected_at: now,
            });
        }

        None
    }

    fn is_repeat(&self, app_id: &str, now: DateTime<Utc>) -> bool {
        match &self.last_detected {
            Some((last_app, last_at)) => {
                last_app == app_id && now.signed_duration_since(*last_at) < self.dedup_window
            }
            None => false,
        }
    }
}
