use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum IntentionStatus {
    Running,
    Completed,
    Cancelled,
    Interrupted,
}

impl IntentionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentionStatus::Running => "Running",
            IntentionStatus::Completed => "Completed",
            IntentionStatus::Cancelled => "Cancelled",
            IntentionStatus::Interrupted => "Interrupted",
        }
    }
}

/// Journal entry for one intention session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentionRecord {
    pub id: String,
    pub app_id: String,
    pub display_name: String,
    pub intention: String,
    pub duration_secs: u64,
    pub status: IntentionStatus,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}
