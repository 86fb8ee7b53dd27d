//! Repository trait definitions.
//!
//! The relay consumes the message and user stores as external
//! collaborators; these traits are the full contract it relies on.
//! Implementations live in parley-infra (e.g. `SqliteMessageRepository`).

pub mod message;
pub mod user;

pub use message::MessageRepository;
pub use user::UserRepository;
