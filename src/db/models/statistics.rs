use std::fmt;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// What the user picked on the interruption screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ActivityChoice {
    Breathing,
    MoodTracking,
    Simplify,
    SetIntention,
    ReturnToApp,
}

impl ActivityChoice {
    pub const ALL: [ActivityChoice; 5] = [
        ActivityChoice::Breathing,
        ActivityChoice::MoodTracking,
        ActivityChoice::Simplify,
        ActivityChoice::SetIntention,
        ActivityChoice::ReturnToApp,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityChoice::Breathing => "breathing",
            ActivityChoice::MoodTracking => "moodTracking",
            ActivityChoice::Simplify => "simplify",
            ActivityChoice::SetIntention => "setIntention",
            ActivityChoice::ReturnToApp => "returnToApp",
        }
    }

    pub fn parse(value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|choice| choice.as_str() == value)
            .ok_or_else(|| anyhow!("unknown activity choice {value}"))
    }
}

impl fmt::Display for ActivityChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopApp {
    pub app_id: String,
    pub display_name: String,
    pub interruptions: u64,
}

/// Dashboard summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuickMetrics {
    pub total_interruptions: u64,
    pub most_used_activity: Option<ActivityChoice>,
    /// Fulfilled intentions over intentions with a recorded outcome, in percent.
    pub intention_success_rate: f64,
    pub average_interruptions_per_day: f64,
    pub top_app: Option<TopApp>,
    /// Consecutive days with at least one interruption, ending today.
    pub streak_days: u32,
}

/// One recorded interruption and what followed it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterruptionRecord {
    pub id: String,
    pub app_id: String,
    pub display_name: String,
    pub occurred_at: chrono::DateTime<chrono::Utc>,
    pub choices: Vec<ActivityChoice>,
    pub intention_set: bool,
    pub intention_fulfilled: Option<bool>,
    pub reflection_added: Option<bool>,
    pub returned_to_app: Option<bool>,
}
