//! Repository for per-(client IP, URL) request counters.
//!
//! Each row is a single-bucket sliding window anchored to `last_time`, the
//! most recent observation. A row whose `last_time` has aged out of the window
//! reads as zero but is left in place; the next upsert restarts it at one.

use super::DbError;
use chrono::{DateTime, TimeDelta, Utc};
use sqlx::SqlitePool;

/// Storage format for `create_time` / `last_time` (UTC).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a timestamp the way the counter table stores it.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.format(TIMESTAMP_FORMAT).to_string()
}

/// Oldest `last_time` still inside a window of `window_secs` ending at `now`.
fn window_start(now: DateTime<Utc>, window_secs: u64) -> String {
    let start = i64::try_from(window_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    format_timestamp(start)
}

/// A stored request counter row.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct RequestCounter {
    /// First observation of this (client IP, URL) pair.
    pub create_time: String,
    pub client_ip: String,
    pub url: String,
    /// Requests counted in the currently tracked window.
    pub counter: i64,
    /// Most recent observation; the window anchor.
    pub last_time: String,
}

/// Repository for request counter operations.
pub struct CounterRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> CounterRepository<'a> {
    /// Create a new counter repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Record one observation of `client_ip` requesting `url` now.
    ///
    /// Returns the stored counter after the write.
    pub async fn upsert(&self, client_ip: &str, url: &str, window_secs: u64) -> Result<i64, DbError> {
        self.upsert_at(client_ip, url, window_secs, Utc::now()).await
    }

    /// Record one observation at `now`.
    ///
    /// A new pair is inserted with counter 0. An existing pair gets
    /// `counter = windowed count + 1` and `last_time = now`, where the windowed
    /// count is the stored counter if `last_time` is inside the window and 0
    /// otherwise. The whole read-modify-write is one statement, so concurrent
    /// observations of the same pair serialize on SQLite's write lock instead
    /// of racing into duplicate rows or lost increments.
    pub async fn upsert_at(
        &self,
        client_ip: &str,
        url: &str,
        window_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let now_str = format_timestamp(now);
        let cutoff = window_start(now, window_secs);

        let counter = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO request_logs (create_time, client_ip, url, counter, last_time)
            VALUES (?, ?, ?, 0, ?)
            ON CONFLICT(client_ip, url) DO UPDATE SET
                counter = CASE
                    WHEN request_logs.last_time >= ? THEN request_logs.counter + 1
                    ELSE 1
                END,
                last_time = excluded.last_time
            RETURNING counter
            "#,
        )
        .bind(&now_str)
        .bind(client_ip)
        .bind(url)
        .bind(&now_str)
        .bind(&cutoff)
        .fetch_one(self.pool)
        .await?;

        Ok(counter)
    }

    /// Counter for the pair if it was observed within the last `window_secs`, else 0.
    pub async fn windowed_count(&self, client_ip: &str, url: &str, window_secs: u64) -> Result<i64, DbError> {
        self.windowed_count_at(client_ip, url, window_secs, Utc::now()).await
    }

    /// Windowed count evaluated at `now`.
    pub async fn windowed_count_at(
        &self,
        client_ip: &str,
        url: &str,
        window_secs: u64,
        now: DateTime<Utc>,
    ) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT counter FROM request_logs WHERE client_ip = ? AND url = ? AND last_time >= ?",
        )
        .bind(client_ip)
        .bind(url)
        .bind(window_start(now, window_secs))
        .fetch_optional(self.pool)
        .await?;

        Ok(count.unwrap_or(0))
    }

    /// Fetch the raw row for a pair, stale or not.
    pub async fn get(&self, client_ip: &str, url: &str) -> Result<Option<RequestCounter>, DbError> {
        let row = sqlx::query_as::<_, RequestCounter>(
            r#"
            SELECT create_time, client_ip, url, counter, last_time
            FROM request_logs
            WHERE client_ip = ? AND url = ?
            "#,
        )
        .bind(client_ip)
        .bind(url)
        .fetch_optional(self.pool)
        .await?;

        Ok(row)
    }

    /// Number of rows stored for a client IP across all URLs.
    pub async fn count_for_ip(&self, client_ip: &str) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM request_logs WHERE client_ip = ?")
            .bind(client_ip)
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap() + TimeDelta::seconds(secs)
    }

    #[test]
    fn timestamps_use_storage_format() {
        assert_eq!(format_timestamp(at(5)), "2024-05-01 12:00:05");
        assert_eq!(window_start(at(0), 3), "2024-05-01 11:59:57");
    }

    #[test]
    fn oversized_window_covers_everything() {
        let start = window_start(at(0), u64::MAX);
        assert!(start.as_str() < "0000-01-01 00:00:00");
    }

    #[tokio::test]
    async fn first_observation_inserts_zero() {
        let db = Database::new(":memory:").await.unwrap();
        let counters = db.counters();

        let count = counters.upsert_at("127.0.0.1", "/test/ip", 3, at(0)).await.unwrap();
        assert_eq!(count, 0);

        let row = counters.get("127.0.0.1", "/test/ip").await.unwrap().unwrap();
        assert_eq!(row.counter, 0);
        assert_eq!(row.create_time, "2024-05-01 12:00:00");
        assert_eq!(row.last_time, "2024-05-01 12:00:00");
    }

    #[tokio::test]
    async fn observations_inside_window_accumulate() {
        let db = Database::new(":memory:").await.unwrap();
        let counters = db.counters();

        for (i, secs) in [0, 1, 2, 3].into_iter().enumerate() {
            let count = counters.upsert_at("10.1.1.1", "/a", 3, at(secs)).await.unwrap();
            assert_eq!(count, i as i64);
        }

        assert_eq!(counters.windowed_count_at("10.1.1.1", "/a", 3, at(3)).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn stale_row_reads_zero_but_is_kept() {
        let db = Database::new(":memory:").await.unwrap();
        let counters = db.counters();

        counters.upsert_at("10.1.1.2", "/a", 3, at(0)).await.unwrap();
        counters.upsert_at("10.1.1.2", "/a", 3, at(1)).await.unwrap();
        counters.upsert_at("10.1.1.2", "/a", 3, at(2)).await.unwrap();

        // last_time = +2s; at +6s that is outside a 3s window.
        assert_eq!(counters.windowed_count_at("10.1.1.2", "/a", 3, at(6)).await.unwrap(), 0);

        let row = counters.get("10.1.1.2", "/a").await.unwrap().unwrap();
        assert_eq!(row.counter, 2);
        assert_eq!(row.last_time, "2024-05-01 12:00:02");
    }

    #[tokio::test]
    async fn resumed_after_idle_restarts_at_one() {
        let db = Database::new(":memory:").await.unwrap();
        let counters = db.counters();

        for secs in 0..5 {
            counters.upsert_at("10.1.1.3", "/a", 3, at(secs)).await.unwrap();
        }
        assert_eq!(counters.get("10.1.1.3", "/a").await.unwrap().unwrap().counter, 4);

        let count = counters.upsert_at("10.1.1.3", "/a", 3, at(60)).await.unwrap();
        assert_eq!(count, 1);

        let row = counters.get("10.1.1.3", "/a").await.unwrap().unwrap();
        assert_eq!(row.create_time, "2024-05-01 12:00:00");
        assert_eq!(row.last_time, "2024-05-01 12:01:00");
    }

    #[tokio::test]
    async fn window_boundary_is_inclusive() {
        let db = Database::new(":memory:").await.unwrap();
        let counters = db.counters();

        counters.upsert_at("10.1.1.4", "/a", 3, at(0)).await.unwrap();
        counters.upsert_at("10.1.1.4", "/a", 3, at(1)).await.unwrap();

        assert_eq!(counters.windowed_count_at("10.1.1.4", "/a", 3, at(4)).await.unwrap(), 1);
        assert_eq!(counters.windowed_count_at("10.1.1.4", "/a", 3, at(5)).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn urls_are_tracked_separately() {
        let db = Database::new(":memory:").await.unwrap();
        let counters = db.counters();

        counters.upsert_at("10.1.1.5", "/a", 60, at(0)).await.unwrap();
        counters.upsert_at("10.1.1.5", "/a", 60, at(1)).await.unwrap();
        counters.upsert_at("10.1.1.5", "/b", 60, at(2)).await.unwrap();

        assert_eq!(counters.windowed_count_at("10.1.1.5", "/a", 60, at(2)).await.unwrap(), 1);
        assert_eq!(counters.windowed_count_at("10.1.1.5", "/b", 60, at(2)).await.unwrap(), 0);
        assert_eq!(counters.count_for_ip("10.1.1.5").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn unknown_pair_reads_zero() {
        let db = Database::new(":memory:").await.unwrap();
        let counters = db.counters();

        assert_eq!(counters.windowed_count("203.0.113.9", "/", 60).await.unwrap(), 0);
        assert!(counters.get("203.0.113.9", "/").await.unwrap().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_upserts_produce_one_row() {
        const N: i64 = 32;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("counters.db");
        let db = Database::new(path.to_str().unwrap()).await.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..N {
            let db = db.clone();
            tasks.push(tokio::spawn(async move {
                db.counters().upsert("198.51.100.1", "/login", 60).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(db.counters().count_for_ip("198.51.100.1").await.unwrap(), 1);
        let row = db.counters().get("198.51.100.1", "/login").await.unwrap().unwrap();
        // One insert at 0, then one increment per remaining observation.
        assert_eq!(row.counter, N - 1);
    }
}
