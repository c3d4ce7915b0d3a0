//! Repository for the dynamic IP blacklist.

use super::DbError;
use sqlx::SqlitePool;

/// A blacklisted address.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct BlacklistEntry {
    pub id: i64,
    pub ip: String,
}

/// Repository for blacklist operations.
pub struct BlacklistRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BlacklistRepository<'a> {
    /// Create a new blacklist repository.
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Check whether an address is blacklisted.
    pub async fn contains(&self, ip: &str) -> Result<bool, DbError> {
        let found = sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM blacklist WHERE ip = ?)")
            .bind(ip)
            .fetch_one(self.pool)
            .await?;

        Ok(found)
    }

    /// Blacklist an address.
    ///
    /// Returns `true` if a new entry was created, `false` if the address was
    /// already present. Repeated adds are not errors.
    pub async fn add(&self, ip: &str) -> Result<bool, DbError> {
        let result = sqlx::query("INSERT OR IGNORE INTO blacklist (ip) VALUES (?)")
            .bind(ip)
            .execute(self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// All entries in insertion order.
    pub async fn list(&self) -> Result<Vec<BlacklistEntry>, DbError> {
        let rows = sqlx::query_as::<_, BlacklistEntry>("SELECT id, ip FROM blacklist ORDER BY id")
            .fetch_all(self.pool)
            .await?;

        Ok(rows)
    }

    /// Number of blacklisted addresses.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM blacklist")
            .fetch_one(self.pool)
            .await?;

        Ok(count)
    }
}
