use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::db::{models::RedirectRecord, Database};

const REDIRECT_KEY: &str = "redirected_app";

fn read_record(conn: &Connection) -> Result<Option<RedirectRecord>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value FROM kv_store WHERE key = ?1",
            params![REDIRECT_KEY],
            |row| row.get(0),
        )
        .optional()?;

    raw.map(|value| {
        serde_json::from_str(&value).context("failed to deserialize redirect record")
    })
    .transpose()
}

fn delete_record(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM kv_store WHERE key = ?1", params![REDIRECT_KEY])?;
    Ok(())
}

impl Database {
    /// Stores `record`, replacing any unconsumed one.
    pub async fn put_redirect_record(&self, record: &RedirectRecord) -> Result<()> {
        let value = serde_json::to_string(record).context("failed to serialize redirect record")?;
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![REDIRECT_KEY, value, Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
    }

    pub async fn get_redirect_record(&self) -> Result<Option<RedirectRecord>> {
        self.execute(|conn| read_record(conn)).await
    }

    pub async fn clear_redirect_record(&self) -> Result<()> {
        self.execute(|conn| delete_record(conn)).await
    }

    /// Returns the stored record when it is at most `max_age` old. A stale
    /// record is cleared and `None` returned. Unreadable records are cleared
    /// too.
    pub async fn take_fresh_redirect_record(
        &self,
        now: DateTime<Utc>,
        max_age: Duration,
    ) -> Result<Option<RedirectRecord>> {
        self.execute(move |conn| {
            let record = match read_record(conn) {
                Ok(record) => record,
                Err(err) => {
                    log::warn!("Discarding unreadable redirect record: {err:#}");
                    delete_record(conn)?;
                    return Ok(None);
                }
            };

            match record {
                Some(record) if record.is_fresh(now, max_age) => Ok(Some(record)),
                Some(_) => {
                    delete_record(conn)?;
                    Ok(None)
                }
                None => Ok(None),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[tokio::test]
    async fn put_get_clear() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.get_redirect_record().await.unwrap(), None);

        let record = RedirectRecord::new("com.instagram.android", "Instagram", at(0));
        db.put_redirect_record(&record).await.unwrap();
        assert_eq!(db.get_redirect_record().await.unwrap(), Some(record));

        db.clear_redirect_record().await.unwrap();
        assert_eq!(db.get_redirect_record().await.unwrap(), None);
    }

    #[tokio::test]
    async fn newer_record_overwrites_older() {
        let db = Database::in_memory().unwrap();
        db.put_redirect_record(&RedirectRecord::new("com.whatsapp", "WhatsApp", at(0)))
            .await
            .unwrap();
        let latest = RedirectRecord::new("com.reddit.frontpage", "Reddit", at(3));
        db.put_redirect_record(&latest).await.unwrap();

        assert_eq!(db.get_redirect_record().await.unwrap(), Some(latest));
    }

    #[tokio::test]
    async fn stale_record_is_cleared_on_take() {
        let db = Database::in_memory().unwrap();
        let record = RedirectRecord::new("com.instagram.android", "Instagram", at(0));
        db.put_redirect_record(&record).await.unwrap();

        let fresh = db
            .take_fresh_redirect_record(at(30), Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(fresh, Some(record));

        let stale = db
            .take_fresh_redirect_record(at(31), Duration::seconds(30))
            .await
            .unwrap();
        assert_eq!(stale, None);
        assert_eq!(db.get_redirect_record().await.unwrap(), None);
    }

    #[tokio::test]
    async fn record_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mindful.sqlite3");
        let record = RedirectRecord::new("com.zhiliaoapp.musically", "TikTok", at(0));

        {
            let db = Database::new(path.clone()).unwrap();
            db.put_redirect_record(&record).await.unwrap();
        }

        let reopened = Database::new(path).unwrap();
        assert_eq!(reopened.get_redirect_record().await.unwrap(), Some(record));
    }
}
