use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::launch::LaunchMethod;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TimerStatus {
    #[default]
    Idle,
    Running,
    Completed,
    Cancelled,
}

/// Renders seconds as `M:SS`.
pub fn format_remaining(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntentionSnapshot {
    pub status: TimerStatus,
    pub app_id: Option<String>,
    pub display_name: Option<String>,
    pub intention: Option<String>,
    pub seconds_remaining: u32,
    pub launched_via: Option<LaunchMethod>,
}

/// Outcome of one countdown step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Remaining(u32),
    Completed,
}

#[derive(Debug, Clone, Default)]
pub struct IntentionState {
    pub status: TimerStatus,
    pub session_id: Option<String>,
    pub app_id: Option<String>,
    pub display_name: Option<String>,
    pub intention: Option<String>,
    pub duration_secs: u32,
    pub seconds_remaining: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub launched_via: Option<LaunchMethod>,
    /// Bumped on every start so a ticker from an older session can tell
    /// it has been superseded.
    pub generation: u64,
}

impl IntentionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.status == TimerStatus::Running
    }

    pub fn begin(
        &mut self,
        session_id: String,
        app_id: &str,
        display_name: &str,
        intention: &str,
        duration_secs: u32,
        started_at: DateTime<Utc>,
    ) -> u64 {
        self.generation = self.generation.wrapping_add(1);
        self.status = TimerStatus::Running;
        self.session_id = Some(session_id);
        self.app_id = Some(app_id.to_string());
        self.display_name = Some(display_name.to_string());
        self.intention = Some(intention.to_string());
        self.duration_secs = duration_secs;
        self.seconds_remaining = duration_secs;
        self.started_at = Some(started_at);
        self.launched_via = None;
        self.generation
    }

    /// One second of countdown. Only meaningful while running.
    pub fn tick(&mut self) -> TickOutcome {
        self.seconds_remaining = self.seconds_remaining.saturating_sub(1);
        if self.seconds_remaining == 0 {
            self.status = TimerStatus::Completed;
            TickOutcome::Completed
        } else {
            TickOutcome::Remaining(self.seconds_remaining)
        }
    }

    pub fn cancel(&mut self) {
        self.status = TimerStatus::Cancelled;
    }

    pub fn snapshot(&self) -> IntentionSnapshot {
        IntentionSnapshot {
            status: self.status,
            app_id: self.app_id.clone(),
            display_name: self.display_name.clone(),
            intention: self.intention.clone(),
            seconds_remaining: if self.is_running() {
                self.seconds_remaining
            } else {
                0
            },
            launched_via: self.launched_via.clone(),
        }
    }
}
