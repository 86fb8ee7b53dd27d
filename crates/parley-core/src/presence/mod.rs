//! Presence tracking: the per-user online/offline state machine and the
//! service that persists and broadcasts its transitions.

pub mod service;
pub mod tracker;

pub use service::PresenceService;
pub use tracker::PresenceTracker;
