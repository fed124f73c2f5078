pub mod aggregator;
pub mod domain;
pub mod repository;

pub use aggregator::{ProgressAggregator, UserProgress};
pub use domain::{HistoryEntry, HistoryView, ProgressError};
pub use repository::HistoryStore;
