//! Relay logic for Parley.
//!
//! This crate owns the in-memory real-time state (session registry,
//! presence tracker, broadcast hub) and the services orchestrating it
//! (message relay, presence service, chat summary aggregation). Durable
//! state is reached only through the repository traits in [`repository`];
//! concrete implementations live in parley-infra.

pub mod hub;
pub mod presence;
pub mod relay;
pub mod repository;
pub mod session;
pub mod summary;
