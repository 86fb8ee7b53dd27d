//! Shared domain types for Parley.
//!
//! This crate contains the core domain types used across the Parley relay:
//! identifiers, channel keys, messages, presence records, the WebSocket
//! event surface, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod channel;
pub mod error;
pub mod event;
pub mod id;
pub mod message;
pub mod presence;
