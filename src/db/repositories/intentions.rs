use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Row};

use crate::db::{
    helpers::{parse_datetime, parse_intention_status, parse_optional_datetime, to_i64, to_u64},
    models::{IntentionRecord, IntentionStatus},
    Database,
};

fn row_to_intention(row: &Row) -> Result<IntentionRecord> {
    let started_at: String = row.get("started_at")?;
    let ended_at: Option<String> = row.get("ended_at")?;
    let updated_at: String = row.get("updated_at")?;
    let status: String = row.get("status")?;
    let duration_secs: i64 = row.get("duration_secs")?;

    Ok(IntentionRecord {
        id: row.get("id")?,
        app_id: row.get("app_id")?,
        display_name: row.get("display_name")?,
        intention: row.get("intention")?,
        duration_secs: to_u64(duration_secs, "duration_secs")?,
        status: parse_intention_status(&status)?,
        started_at: parse_datetime(&started_at, "started_at")?,
        ended_at: parse_optional_datetime(ended_at, "ended_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_intention(&self, intention: &IntentionRecord) -> Result<()> {
        let record = intention.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO intentions (id, app_id, display_name, intention, duration_secs, status, started_at, ended_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id,
                    record.app_id,
                    record.display_name,
                    record.intention,
                    to_i64(record.duration_secs)?,
                    record.status.as_str(),
                    record.started_at.to_rfc3339(),
                    record.ended_at.as_ref().map(|dt| dt.to_rfc3339()),
                    record.updated_at.to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn mark_intention_status(
        &self,
        intention_id: &str,
        status: IntentionStatus,
        ended_at: Option<DateTime<Utc>>,
        updated_at: DateTime<Utc>,
    ) -> Result<()> {
        let intention_id = intention_id.to_string();
        self.execute(move |conn| {
            conn.execute(
                "UPDATE intentions
                 SET status = ?1,
                     ended_at = ?2,
                     updated_at = ?3
                 WHERE id = ?4",
                params![
                    status.as_str(),
                    ended_at.map(|dt| dt.to_rfc3339()),
                    updated_at.to_rfc3339(),
                    intention_id,
                ],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_intention(&self, intention_id: &str) -> Result<IntentionRecord> {
        let intention_id = intention_id.to_string();
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, app_id, display_name, intention, duration_secs, status, started_at, ended_at, updated_at
                 FROM intentions
                 WHERE id = ?1",
            )?;

            let intention = stmt
                .query_row(params![intention_id], |row| Ok(row_to_intention(row)))?
                .map_err(|e| anyhow!("Failed to parse intention: {}", e))?;

            Ok(intention)
        })
        .await
    }

    pub async fn list_intentions(&self, limit: usize) -> Result<Vec<IntentionRecord>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        self.execute(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, app_id, display_name, intention, duration_secs, status, started_at, ended_at, updated_at
                 FROM intentions
                 ORDER BY started_at DESC
                 LIMIT ?1",
            )?;

            let rows = stmt.query_map(params![limit], |row| Ok(row_to_intention(row)))?;
            let mut intentions = Vec::new();
            for row in rows {
                intentions.push(row??);
            }
            Ok(intentions)
        })
        .await
    }

    /// Marks journal rows left `Running` by a previous process as
    /// `Interrupted`. Returns the rows that were changed.
    pub async fn recover_interrupted_intentions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<IntentionRecord>> {
        self.execute(move |conn| {
            let tx = conn.transaction()?;

            let stale = {
                let mut stmt = tx.prepare(
                    "SELECT id, app_id, display_name, intention, duration_secs, status, started_at, ended_at, updated_at
                     FROM intentions
                     WHERE status = 'Running'
                     ORDER BY started_at ASC",
                )?;
                let rows = stmt.query_map([], |row| Ok(row_to_intention(row)))?;
                let mut stale = Vec::new();
                for row in rows {
                    stale.push(row??);
                }
                stale
            };

            tx.execute(
                "UPDATE intentions
                 SET status = 'Interrupted',
                     ended_at = ?1,
                     updated_at = ?1
                 WHERE status = 'Running'",
                params![now.to_rfc3339()],
            )?;
            tx.commit()?;

            Ok(stale
                .into_iter()
                .map(|record| IntentionRecord {
                    status: IntentionStatus::Interrupted,
                    ended_at: Some(now),
                    updated_at: now,
                    ..record
                })
                .collect())
        })
        .await
    }
}
