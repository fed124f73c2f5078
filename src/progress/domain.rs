// Pure aggregation over the usage history log
use chrono::{NaiveDate, NaiveTime, Timelike};
use serde::Serialize;

use crate::db::RepositoryError;

pub const HOURS_PER_DAY: usize = 24;

/// One spoken utterance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub id: i64,
    pub text: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub board_id: Option<i64>,
}

/// History row as shown in the progress log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryView {
    pub text: String,
    pub date: String,
    pub time: String,
}

impl From<&HistoryEntry> for HistoryView {
    fn from(entry: &HistoryEntry) -> Self {
        Self {
            text: entry.text.clone(),
            date: entry.date.format("%Y-%m-%d").to_string(),
            time: entry.time.format("%H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoardShare {
    pub board_id: i64,
    pub name: String,
    pub percentage: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ProgressError {
    #[error("bar_date is required")]
    MissingDate,

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub fn parse_date(raw: &str) -> Result<NaiveDate, ProgressError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ProgressError::MissingDate);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| ProgressError::InvalidDate(raw.into()))
}

/// Whitespace-delimited token count.
pub fn word_count(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

/// Words spoken per hour of day; entries are assumed pre-filtered to one user and date.
pub fn hourly_word_counts<'a>(
    entries: impl IntoIterator<Item = &'a HistoryEntry>,
) -> [u32; HOURS_PER_DAY] {
    let mut buckets = [0u32; HOURS_PER_DAY];
    for entry in entries {
        buckets[entry.time.hour() as usize] += word_count(&entry.text);
    }
    buckets
}

/// Share of all entries spoken from each board, in board order.
/// Every board is 0 when there are no entries.
pub fn board_shares(boards: &[(i64, String)], entries: &[HistoryEntry]) -> Vec<BoardShare> {
    let total = entries.len();
    boards
        .iter()
        .map(|(board_id, name)| {
            let percentage = if total == 0 {
                0.0
            } else {
                let hits = entries
                    .iter()
                    .filter(|e| e.board_id == Some(*board_id))
                    .count();
                hits as f64 / total as f64 * 100.0
            };
            BoardShare {
                board_id: *board_id,
                name: name.clone(),
                percentage,
            }
        })
        .collect()
}
