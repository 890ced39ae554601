use std::convert::TryFrom;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};

use crate::db::models::IntentionStatus;

pub fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

pub fn to_u64(value: i64, field: &str) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("{field} contains negative value {value}"))
}

pub fn parse_datetime(value: &str, field: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .with_context(|| format!("failed to parse {field}"))
}

pub fn parse_optional_datetime(
    value: Option<String>,
    field: &str,
) -> Result<Option<DateTime<Utc>>> {
    match value {
        Some(raw) => parse_datetime(&raw, field).map(Some),
        None => Ok(None),
    }
}

/// Percentage of `part` in `whole`, 0 when `whole` is zero.
pub fn percentage(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

pub fn parse_intention_status(value: &str) -> Result<IntentionStatus> {
    match value {
        "Running" => Ok(IntentionStatus::Running),
        "Completed" => Ok(IntentionStatus::Completed),
        "Cancelled" => Ok(IntentionStatus::Cancelled),
        "Interrupted" => Ok(IntentionStatus::Interrupted),
        other => Err(anyhow!("unknown intention status {other}")),
    }
}

/// Optional INTEGER column holding 0/1.
pub fn to_optional_bool(value: Option<i64>) -> Option<bool> {
    value.map(|raw| raw != 0)
}
