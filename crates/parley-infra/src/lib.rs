//! Infrastructure implementations for Parley.
//!
//! Concrete SQLite-backed repositories behind the traits defined in
//! parley-core, plus the split reader/writer database pool.

pub mod sqlite;
