//! Message relay: persist-then-broadcast for new messages, plus typing and
//! read-receipt fan-out.

pub mod service;

pub use service::MessageRelay;
