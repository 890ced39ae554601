use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, Timelike, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use uuid::Uuid;

use crate::db::{
    helpers::{parse_datetime, percentage, to_optional_bool, to_u64},
    models::{ActivityChoice, InterruptionRecord, QuickMetrics, TopApp},
    Database,
};

const DAY_FORMAT: &str = "%Y-%m-%d";

fn row_to_interruption(row: &Row) -> Result<InterruptionRecord> {
    let occurred_at: String = row.get("occurred_at")?;
    let intention_set: i64 = row.get("intention_set")?;

    Ok(InterruptionRecord {
        id: row.get("id")?,
        app_id: row.get("app_id")?,
        display_name: row.get("display_name")?,
        occurred_at: parse_datetime(&occurred_at, "occurred_at")?,
        choices: Vec::new(),
        intention_set: intention_set != 0,
        intention_fulfilled: to_optional_bool(row.get("intention_fulfilled")?),
        reflection_added: to_optional_bool(row.get("reflection_added")?),
        returned_to_app: to_optional_bool(row.get("returned_to_app")?),
    })
}

fn ensure_updated(changed: usize, handle: &str) -> Result<()> {
    if changed == 0 {
        bail!("unknown interruption handle {handle}");
    }
    Ok(())
}

fn streak_ending(today: NaiveDate, days_desc: &[NaiveDate]) -> u32 {
    let mut expected = Some(today);
    let mut streak = 0;

    for day in days_desc {
        let Some(current) = expected else { break };
        if *day > current {
            continue;
        }
        if *day != current {
            break;
        }
        streak += 1;
        expected = current.pred_opt();
    }

    streak
}

fn load_quick_metrics(conn: &Connection, today: NaiveDate) -> Result<QuickMetrics> {
    let total: i64 = conn.query_row("SELECT COUNT(*) FROM interruptions", [], |row| row.get(0))?;
    let total = to_u64(total, "interruption count")?;

    let most_used_activity = conn
        .query_row(
            "SELECT choice
             FROM activity_choices
             GROUP BY choice
             ORDER BY COUNT(*) DESC, MIN(id) ASC
             LIMIT 1",
            [],
            |row| row.get::<_, String>(0),
        )
        .optional()?
        .map(|raw| ActivityChoice::parse(&raw))
        .transpose()?;

    let (fulfilled, decided): (i64, i64) = conn.query_row(
        "SELECT COALESCE(SUM(CASE WHEN intention_fulfilled = 1 THEN 1 ELSE 0 END), 0),
                COUNT(intention_fulfilled)
         FROM interruptions",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    let top_app = conn
        .query_row(
            "SELECT app_id, MAX(display_name), COUNT(*) AS hits
             FROM interruptions
             GROUP BY app_id
             ORDER BY hits DESC, app_id ASC
             LIMIT 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()?
        .map(|(app_id, display_name, hits)| -> Result<TopApp> {
            Ok(TopApp {
                app_id,
                display_name,
                interruptions: to_u64(hits, "interruptions")?,
            })
        })
        .transpose()?;

    let mut stmt = conn.prepare("SELECT DISTINCT day FROM interruptions ORDER BY day DESC")?;
    let days = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .map(|raw| -> Result<NaiveDate> {
            let raw = raw?;
            NaiveDate::parse_from_str(&raw, DAY_FORMAT)
                .with_context(|| format!("failed to parse interruption day {raw}"))
        })
        .collect::<Result<Vec<_>>>()?;

    let average_interruptions_per_day = if days.is_empty() {
        0.0
    } else {
        total as f64 / days.len() as f64
    };

    Ok(QuickMetrics {
        total_interruptions: total,
        most_used_activity,
        intention_success_rate: percentage(
            to_u64(fulfilled, "fulfilled intentions")?,
            to_u64(decided, "decided intentions")?,
        ),
        average_interruptions_per_day,
        top_app,
        streak_days: streak_ending(today, &days),
    })
}

impl Database {
    /// Starts a statistics session for one interruption and returns its handle.
    pub async fn record_interruption(
        &self,
        app_id: &str,
        display_name: &str,
        occurred_at: DateTime<Utc>,
    ) -> Result<String> {
        let id = Uuid::new_v4().to_string();
        let handle = id.clone();
        let app_id = app_id.to_string();
        let display_name = display_name.to_string();

        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO interruptions (id, app_id, display_name, occurred_at, day, hour_of_day)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    id,
                    app_id,
                    display_name,
                    occurred_at.to_rfc3339(),
                    occurred_at.format(DAY_FORMAT).to_string(),
                    occurred_at.hour(),
                ],
            )?;
            Ok(())
        })
        .await?;

        Ok(handle)
    }

    pub async fn record_activity_choice(&self, handle: &str, choice: ActivityChoice) -> Result<()> {
        let handle = handle.to_string();
        self.execute(move |conn| {
            let tx = conn.transaction()?;
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM interruptions WHERE id = ?1",
                    params![handle],
                    |row| row.get(0),
                )
                .optional()?;
            if exists.is_none() {
                bail!("unknown interruption handle {handle}");
            }

            tx.execute(
                "INSERT INTO activity_choices (interruption_id, choice, chosen_at)
                 VALUES (?1, ?2, ?3)",
                params![handle, choice.as_str(), Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await
    }

    pub async fn record_intention_set(&self, handle: &str) -> Result<()> {
        let handle = handle.to_string();
        self.execute(move |conn| {
            let changed = conn.execute(
                "UPDATE interruptions SET intention_set = 1 WHERE id = ?1",
                params![handle],
            )?;
            ensure_updated(changed, &handle)
        })
        .await
    }

    pub async fn record_intention_outcome(
        &self,
        handle: &str,
        fulfilled: bool,
        had_reflection: bool,
    ) -> Result<()> {
        let handle = handle.to_string();
        self.execute(move |conn| {
            let changed = conn.execute(
                "UPDATE interruptions
                 SET intention_fulfilled = ?1,
                     reflection_added = ?2
                 WHERE id = ?3",
                params![fulfilled, had_reflection, handle],
            )?;
            ensure_updated(changed, &handle)
        })
        .await
    }

    pub async fn record_post_timer_choice(
        &self,
        handle: &str,
        returned_to_watched_app: bool,
    ) -> Result<()> {
        let handle = handle.to_string();
        self.execute(move |conn| {
            let changed = conn.execute(
                "UPDATE interruptions SET returned_to_app = ?1 WHERE id = ?2",
                params![returned_to_watched_app, handle],
            )?;
            ensure_updated(changed, &handle)
        })
        .await
    }

    pub async fn get_interruption(&self, handle: &str) -> Result<Option<InterruptionRecord>> {
        let handle = handle.to_string();
        self.execute(move |conn| {
            let record = conn
                .query_row(
                    "SELECT id, app_id, display_name, occurred_at, intention_set,
                            intention_fulfilled, reflection_added, returned_to_app
                     FROM interruptions
                     WHERE id = ?1",
                    params![handle],
                    |row| Ok(row_to_interruption(row)),
                )
                .optional()?
                .transpose()
                .map_err(|e| anyhow!("Failed to parse interruption: {e}"))?;

            let Some(mut record) = record else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT choice FROM activity_choices WHERE interruption_id = ?1 ORDER BY id ASC",
            )?;
            record.choices = stmt
                .query_map(params![handle], |row| row.get::<_, String>(0))?
                .map(|raw| ActivityChoice::parse(&raw?))
                .collect::<Result<Vec<_>>>()?;

            Ok(Some(record))
        })
        .await
    }

    /// Summary for the dashboard; `today` anchors the streak.
    pub async fn quick_metrics(&self, today: NaiveDate) -> Result<QuickMetrics> {
        self.execute(move |conn| load_quick_metrics(conn, today)).await
    }

    pub async fn clear_statistics(&self) -> Result<()> {
        self.execute(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM activity_choices", [])?;
            tx.execute("DELETE FROM interruptions", [])?;
            tx.commit()?;
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn noon(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn empty_database_reports_zeroes() {
        let db = Database::in_memory().unwrap();
        let metrics = db.quick_metrics(day(2024, 3, 10)).await.unwrap();

        assert_eq!(metrics.total_interruptions, 0);
        assert_eq!(metrics.most_used_activity, None);
        assert_eq!(metrics.intention_success_rate, 0.0);
        assert_eq!(metrics.top_app, None);
        assert_eq!(metrics.streak_days, 0);
    }

    #[tokio::test]
    async fn interruption_lifecycle_is_recorded() {
        let db = Database::in_memory().unwrap();
        let handle = db
            .record_interruption("com.instagram.android", "Instagram", noon(2024, 3, 10))
            .await
            .unwrap();

        db.record_activity_choice(&handle, ActivityChoice::Breathing)
            .await
            .unwrap();
        db.record_activity_choice(&handle, ActivityChoice::SetIntention)
            .await
            .unwrap();
        db.record_intention_set(&handle).await.unwrap();
        db.record_intention_outcome(&handle, true, false).await.unwrap();
        db.record_post_timer_choice(&handle, false).await.unwrap();

        let record = db.get_interruption(&handle).await.unwrap().unwrap();
        assert_eq!(
            record.choices,
            vec![ActivityChoice::Breathing, ActivityChoice::SetIntention]
        );
        assert!(record.intention_set);
        assert_eq!(record.intention_fulfilled, Some(true));
        assert_eq!(record.reflection_added, Some(false));
        assert_eq!(record.returned_to_app, Some(false));
    }

    #[tokio::test]
    async fn unknown_handle_is_an_error() {
        let db = Database::in_memory().unwrap();
        assert!(db.record_intention_set("missing").await.is_err());
        assert!(db
            .record_activity_choice("missing", ActivityChoice::Simplify)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn quick_metrics_aggregate() {
        let db = Database::in_memory().unwrap();

        let a = db
            .record_interruption("com.instagram.android", "Instagram", noon(2024, 3, 8))
            .await
            .unwrap();
        let b = db
            .record_interruption("com.instagram.android", "Instagram", noon(2024, 3, 9))
            .await
            .unwrap();
        let c = db
            .record_interruption("com.reddit.frontpage", "Reddit", noon(2024, 3, 10))
            .await
            .unwrap();
        db.record_interruption("com.instagram.android", "Instagram", noon(2024, 3, 10))
            .await
            .unwrap();

        db.record_activity_choice(&a, ActivityChoice::MoodTracking)
            .await
            .unwrap();
        db.record_activity_choice(&b, ActivityChoice::SetIntention)
            .await
            .unwrap();
        db.record_activity_choice(&c, ActivityChoice::SetIntention)
            .await
            .unwrap();

        db.record_intention_outcome(&b, true, true).await.unwrap();
        db.record_intention_outcome(&c, false, false).await.unwrap();

        let metrics = db.quick_metrics(day(2024, 3, 10)).await.unwrap();
        assert_eq!(metrics.total_interruptions, 4);
        assert_eq!(metrics.most_used_activity, Some(ActivityChoice::SetIntention));
        assert!((metrics.intention_success_rate - 50.0).abs() < f64::EPSILON);
        assert!((metrics.average_interruptions_per_day - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            metrics.top_app,
            Some(TopApp {
                app_id: "com.instagram.android".into(),
                display_name: "Instagram".into(),
                interruptions: 3,
            })
        );
        assert_eq!(metrics.streak_days, 3);
    }

    #[tokio::test]
    async fn clear_statistics_removes_everything() {
        let db = Database::in_memory().unwrap();
        let handle = db
            .record_interruption("com.whatsapp", "WhatsApp", noon(2024, 3, 10))
            .await
            .unwrap();
        db.record_activity_choice(&handle, ActivityChoice::ReturnToApp)
            .await
            .unwrap();

        db.clear_statistics().await.unwrap();

        assert_eq!(db.get_interruption(&handle).await.unwrap(), None);
        let metrics = db.quick_metrics(day(2024, 3, 10)).await.unwrap();
        assert_eq!(metrics.total_interruptions, 0);
        assert_eq!(metrics.most_used_activity, None);
    }

    #[test]
    fn streak_counts_consecutive_days_ending_today() {
        let today = day(2024, 3, 10);
        assert_eq!(streak_ending(today, &[]), 0);
        assert_eq!(
            streak_ending(today, &[day(2024, 3, 10), day(2024, 3, 9), day(2024, 3, 7)]),
            2
        );
        // Nothing today breaks the streak even with activity yesterday.
        assert_eq!(streak_ending(today, &[day(2024, 3, 9), day(2024, 3, 8)]), 0);
        // Future-dated rows are skipped.
        assert_eq!(streak_ending(today, &[day(2024, 3, 11), day(2024, 3, 10)]), 1);
    }
}
