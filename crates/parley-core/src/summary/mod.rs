//! Chat summary aggregation: one row per conversation partner.

pub mod aggregator;

pub use aggregator::SummaryService;
