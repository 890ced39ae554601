use std::time::Duration;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Tunable intervals for detection, dispatch and the intention timer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchdogConfig {
    /// Detection loop cadence
    pub tick_interval_ms: u64,

    /// Width of the usage-event window queried each tick. Must exceed the
    /// tick interval so scheduling jitter cannot open gaps.
    pub query_window_ms: u64,

    /// Same app re-detected within this window is treated as the same foregrounding
    pub dedup_window_ms: u64,

    /// Pause before interrupting so the watched app finishes its own transition
    pub dispatch_delay_ms: u64,

    /// Suppression applied after we launch an app on the user's behalf
    pub grace_period_secs: u64,

    /// Minimum time the persistent overlay stays up
    pub overlay_dwell_ms: u64,
    pub overlay_recheck_ms: u64,

    /// Redirect records older than this are stale on read
    pub redirect_freshness_secs: u64,

    pub timer_tick_ms: u64,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 1_000,
            query_window_ms: 5_000,
            dedup_window_ms: 10_000,
            dispatch_delay_ms: 500,
            grace_period_secs: 45,
            overlay_dwell_ms: 10_000,
            overlay_recheck_ms: 1_000,
            redirect_freshness_secs: 30,
            timer_tick_ms: 1_000,
        }
    }
}

impl WatchdogConfig {
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval_ms == 0 {
            bail!("tick interval must be greater than zero");
        }
        if self.query_window_ms <= self.tick_interval_ms {
            bail!(
                "query window ({}ms) must exceed the tick interval ({}ms)",
                self.query_window_ms,
                self.tick_interval_ms
            );
        }
        if self.overlay_recheck_ms == 0 {
            bail!("overlay re-check interval must be greater than zero");
        }
        if self.timer_tick_ms == 0 {
            bail!("timer tick must be greater than zero");
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn query_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(to_signed(self.query_window_ms))
    }

    pub fn dedup_window(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(to_signed(self.dedup_window_ms))
    }

    pub fn dispatch_delay(&self) -> Duration {
        Duration::from_millis(self.dispatch_delay_ms)
    }

    pub fn grace_period(&self) -> chrono::Duration {
        chrono::Duration::seconds(to_signed(self.grace_period_secs))
    }

    pub fn overlay_dwell(&self) -> Duration {
        Duration::from_millis(self.overlay_dwell_ms)
    }

    pub fn overlay_recheck(&self) -> Duration {
        Duration::from_millis(self.overlay_recheck_ms)
    }

    pub fn redirect_freshness(&self) -> chrono::Duration {
        chrono::Duration::seconds(to_signed(self.redirect_freshness_secs))
    }

    pub fn timer_tick(&self) -> Duration {
        Duration::from_millis(self.timer_tick_ms)
    }
}

// Keeps chrono durations far inside their representable range.
const MAX_CONFIG_VALUE: i64 = 1_000_000_000_000;

fn to_signed(value: u64) -> i64 {
    i64::try_from(value)
        .unwrap_or(MAX_CONFIG_VALUE)
        .min(MAX_CONFIG_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_intervals() {
        let config = WatchdogConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.query_window(), chrono::Duration::seconds(5));
        assert_eq!(config.dedup_window(), chrono::Duration::seconds(10));
        assert_eq!(config.grace_period(), chrono::Duration::seconds(45));
        assert_eq!(config.redirect_freshness(), chrono::Duration::seconds(30));
    }

    #[test]
    fn window_must_exceed_tick() {
        let config = WatchdogConfig {
            tick_interval_ms: 1_000,
            query_window_ms: 1_000,
            ..WatchdogConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: WatchdogConfig = serde_json::from_str(r#"{"tickIntervalMs": 250}"#).unwrap();
        assert_eq!(config.tick_interval_ms, 250);
        assert_eq!(config.query_window_ms, 5_000);
    }
}
