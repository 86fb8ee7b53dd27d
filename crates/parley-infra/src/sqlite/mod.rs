//! SQLite persistence: pool management and repository implementations.

pub mod message;
pub mod pool;
pub mod user;

pub use message::SqliteMessageRepository;
pub use pool::DatabasePool;
pub use user::SqliteUserRepository;
