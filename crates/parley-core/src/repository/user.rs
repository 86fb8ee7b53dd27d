//! UserRepository trait definition.

use chrono::{DateTime, Utc};
use parley_types::error::RepositoryError;
use parley_types::id::UserId;
use parley_types::presence::{PresenceStatus, User};

/// Repository trait for the user store collaborator.
///
/// Users are provisioned elsewhere; the relay only reads rows and mirrors
/// presence into them. Both writes are best-effort from the presence
/// service's perspective -- failures are logged, never propagated into the
/// in-memory state machine.
pub trait UserRepository: Send + Sync {
    fn find_user(
        &self,
        user: &UserId,
    ) -> impl std::future::Future<Output = Result<Option<User>, RepositoryError>> + Send;

    /// Persist the last-seen timestamp. `NotFound` when no such user row
    /// exists.
    fn touch_last_seen(
        &self,
        user: &UserId,
        at: DateTime<Utc>,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Mirror the presence status for clients that only poll REST.
    fn set_status(
        &self,
        user: &UserId,
        status: PresenceStatus,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;
}
