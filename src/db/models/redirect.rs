use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// The app that triggered the most recent detection, kept until the UI
/// consumes or dismisses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedirectRecord {
    pub app_id: String,
    pub display_name: String,
    pub detected_at: DateTime<Utc>,
}

impl RedirectRecord {
    pub fn new(
        app_id: impl Into<String>,
        display_name: impl Into<String>,
        detected_at: DateTime<Utc>,
    ) -> Self {
        Self {
            app_id: app_id.into(),
            display_name: display_name.into(),
            detected_at,
        }
    }

    /// A record from the future (clock skew) counts as fresh.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: Duration) -> bool {
        now.signed_duration_since(self.detected_at) <= max_age
    }
}
