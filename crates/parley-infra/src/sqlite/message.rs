//! SQLite message repository implementation.
//!
//! Implements `MessageRepository` from `parley-core` using sqlx with split
//! read/write pools: raw queries, a private Row struct, reads on the reader
//! pool, inserts and read-flag updates on the writer.

use chrono::{DateTime, Utc};
use sqlx::Row;
use uuid::Uuid;

use parley_core::repository::MessageRepository;
use parley_types::error::RepositoryError;
use parley_types::id::UserId;
use parley_types::message::Message;

use super::pool::DatabasePool;

/// SQLite-backed implementation of `MessageRepository`.
pub struct SqliteMessageRepository {
    pool: DatabasePool,
}

impl SqliteMessageRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain Message.
struct MessageRow {
    id: String,
    sender: String,
    receiver: String,
    content: String,
    created_at: String,
    read: i64,
}

impl MessageRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            sender: row.try_get("sender")?,
            receiver: row.try_get("receiver")?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
            read: row.try_get("read")?,
        })
    }

    fn into_message(self) -> Result<Message, RepositoryError> {
        let id = Uuid::parse_str(&self.id)
            .map_err(|e| RepositoryError::Query(format!("invalid message id: {e}")))?;
        let created_at = parse_datetime(&self.created_at)?;

        Ok(Message {
            id,
            sender: UserId::new(self.sender),
            receiver: UserId::new(self.receiver),
            content: self.content,
            created_at,
            read: self.read != 0,
        })
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn format_datetime(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339()
}

impl MessageRepository for SqliteMessageRepository {
    async fn insert(&self, message: &Message) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"INSERT INTO messages (id, sender, receiver, content, created_at, read)
               VALUES (?, ?, ?, ?, ?, ?)"#,
        )
        .bind(message.id.to_string())
        .bind(message.sender.as_str())
        .bind(message.receiver.as_str())
        .bind(&message.content)
        .bind(format_datetime(&message.created_at))
        .bind(message.read as i64)
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(())
    }

    async fn mark_conversation_read(
        &self,
        receiver: &UserId,
        sender: &UserId,
    ) -> Result<u64, RepositoryError> {
        let result = sqlx::query(
            "UPDATE messages SET read = 1 WHERE sender = ? AND receiver = ? AND read = 0",
        )
        .bind(sender.as_str())
        .bind(receiver.as_str())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(result.rows_affected())
    }

    async fn conversation(
        &self,
        user: &UserId,
        partner: &UserId,
    ) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, sender, receiver, content, created_at, read
               FROM messages
               WHERE (sender = ?1 AND receiver = ?2) OR (sender = ?2 AND receiver = ?1)
               ORDER BY created_at ASC, id ASC"#,
        )
        .bind(user.as_str())
        .bind(partner.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(MessageRow::into_message)
            .collect()
    }

    async fn messages_touching(&self, user: &UserId) -> Result<Vec<Message>, RepositoryError> {
        let rows = sqlx::query(
            r#"SELECT id, sender, receiver, content, created_at, read
               FROM messages
               WHERE sender = ?1 OR receiver = ?1"#,
        )
        .bind(user.as_str())
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        rows.iter()
            .map(|row| MessageRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .map(MessageRow::into_message)
            .collect()
    }
}
