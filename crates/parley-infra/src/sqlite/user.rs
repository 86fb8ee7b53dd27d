//! SQLite user repository implementation.
//!
//! The user rows are owned by the external auth system; this repository
//! only reads them and mirrors presence (`status`, `last_seen`) back.

use chrono::{DateTime, Utc};
use sqlx::Row;

use parley_core::repository::UserRepository;
use parley_types::error::RepositoryError;
use parley_types::id::UserId;
use parley_types::presence::{PresenceStatus, User};

use super::pool::DatabasePool;

/// SQLite-backed implementation of `UserRepository`.
pub struct SqliteUserRepository {
    pool: DatabasePool,
}

impl SqliteUserRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain User.
struct UserRow {
    id: String,
    username: String,
    status: String,
    last_seen: Option<String>,
}

impl UserRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            status: row.try_get("status")?,
            last_seen: row.try_get("last_seen")?,
        })
    }

    fn into_user(self) -> Result<User, RepositoryError> {
        let status: PresenceStatus = self
            .status
            .parse()
            .map_err(|e: String| RepositoryError::Query(e))?;
        let last_seen = self
            .last_seen
            .as_deref()
            .map(parse_datetime)
            .transpose()?;

        Ok(User {
            id: UserId::new(self.id),
            username: self.username,
            status,
            last_seen,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

impl UserRepository for SqliteUserRepository {
    async fn find_user(&self, user: &UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query("SELECT id, username, status, last_seen FROM users WHERE id = ?")
            .bind(user.as_str())
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        row.map(|row| {
            UserRow::from_row(&row)
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                .into_user()
        })
        .transpose()
    }

    async fn touch_last_seen(
        &self,
        user: &UserId,
        at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET last_seen = ? WHERE id = ?")
            .bind(at.to_rfc3339())
            .bind(user.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn set_status(
        &self,
        user: &UserId,
        status: PresenceStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET status = ? WHERE id = ?")
            .bind(status.to_string())
            .bind(user.as_str())
            .execute(&self.pool.writer)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
