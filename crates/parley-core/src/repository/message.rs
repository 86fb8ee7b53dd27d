//! MessageRepository trait definition.

use parley_types::error::RepositoryError;
use parley_types::id::UserId;
use parley_types::message::Message;

/// Repository trait for message persistence.
///
/// Uses native async fn in traits (RPITIT, Rust 2024 edition). The store
/// owns the rows; the relay only requests creation and bulk read-flag
/// updates, never content edits or deletes.
pub trait MessageRepository: Send + Sync {
    /// Persist a new message exactly as built by the relay.
    fn insert(
        &self,
        message: &Message,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Flip every unread message sent by `sender` to `receiver` to read.
    ///
    /// Returns the number of rows updated; zero is a normal outcome
    /// (repeated calls are no-ops that still succeed).
    fn mark_conversation_read(
        &self,
        receiver: &UserId,
        sender: &UserId,
    ) -> impl std::future::Future<Output = Result<u64, RepositoryError>> + Send;

    /// All messages between the two users, ordered by `created_at` ASC.
    fn conversation(
        &self,
        user: &UserId,
        partner: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;

    /// Every message where `user` is sender or receiver.
    ///
    /// Input to the chat summary aggregation; no ordering guarantee.
    fn messages_touching(
        &self,
        user: &UserId,
    ) -> impl std::future::Future<Output = Result<Vec<Message>, RepositoryError>> + Send;
}
