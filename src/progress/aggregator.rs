use chrono::NaiveDate;
use serde::Serialize;

use crate::progress::domain::{self, HistoryView, ProgressError, HOURS_PER_DAY};
use crate::progress::repository::HistoryStore;
use crate::state::DbPool;

/// Read-only views derived from the history log.
#[derive(Debug, Clone, Serialize)]
pub struct UserProgress {
    pub histories: Vec<HistoryView>,
    pub board_names: Vec<String>,
    pub board_representation: Vec<f64>,
}

pub struct ProgressAggregator {
    store: HistoryStore,
}

impl ProgressAggregator {
    pub fn new(db: DbPool) -> Self {
        Self {
            store: HistoryStore::new(db),
        }
    }

    pub fn hourly_word_counts(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<[u32; HOURS_PER_DAY], ProgressError> {
        let entries = self.store.for_user_on(user_id, date)?;
        Ok(domain::hourly_word_counts(&entries))
    }

    pub fn user_progress(&self, user_id: i64) -> Result<UserProgress, ProgressError> {
        let entries = self.store.for_user(user_id)?;
        let boards = self.store.boards_owned_by(user_id)?;

        let (board_names, board_representation): (Vec<String>, Vec<f64>) =
            domain::board_shares(&boards, &entries)
                .into_iter()
                .map(|share| (share.name, share.percentage))
                .unzip();

        Ok(UserProgress {
            histories: entries.iter().map(HistoryView::from).collect(),
            board_names,
            board_representation,
        })
    }
}
