use chrono::{NaiveDate, NaiveTime};
use rusqlite::params;

use crate::db::RepositoryError;
use crate::progress::domain::HistoryEntry;
use crate::state::DbPool;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMAT: &str = "%H:%M:%S";

/// Append-only usage history log
pub struct HistoryStore {
    db: DbPool,
}

impl HistoryStore {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    /// Append one utterance. Returns the new row id.
    pub fn record(
        &self,
        user_id: i64,
        board_id: Option<i64>,
        text: &str,
        date: NaiveDate,
        time: NaiveTime,
    ) -> Result<i64, RepositoryError> {
        let conn = self.db.get()?;

        conn.execute(
            "INSERT INTO histories (text, date, time, user_id, board_id)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                text,
                date.format(DATE_FORMAT).to_string(),
                time.format(TIME_FORMAT).to_string(),
                user_id,
                board_id
            ],
        )?;

        Ok(conn.last_insert_rowid())
    }

    /// Entries for one user on one calendar date, in insertion order.
    pub fn for_user_on(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<HistoryEntry>, RepositoryError> {
        self.query(
            "SELECT id, text, date, time, board_id FROM histories
             WHERE user_id = ?1 AND date = ?2
             ORDER BY id",
            params![user_id, date.format(DATE_FORMAT).to_string()],
        )
    }

    /// All entries for a user, most recent first.
    pub fn for_user(&self, user_id: i64) -> Result<Vec<HistoryEntry>, RepositoryError> {
        self.query(
            "SELECT id, text, date, time, board_id FROM histories
             WHERE user_id = ?1
             ORDER BY date DESC, time DESC, id DESC",
            params![user_id],
        )
    }

    /// (id, name) of the boards a user created, in creation order.
    pub fn boards_owned_by(&self, user_id: i64) -> Result<Vec<(i64, String)>, RepositoryError> {
        let conn = self.db.get()?;
        let mut stmt =
            conn.prepare("SELECT id, name FROM boards WHERE creator_id = ?1 ORDER BY id")?;
        let boards = stmt
            .query_map(params![user_id], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(boards)
    }

    fn query(
        &self,
        sql: &str,
        args: impl rusqlite::Params,
    ) -> Result<Vec<HistoryEntry>, RepositoryError> {
        let conn = self.db.get()?;
        let mut stmt = conn.prepare(sql)?;
        let entries = stmt
            .query_map(args, |row| {
                let date: String = row.get(2)?;
                let time: String = row.get(3)?;
                Ok(HistoryEntry {
                    id: row.get(0)?,
                    text: row.get(1)?,
                    date: NaiveDate::parse_from_str(&date, DATE_FORMAT)
                        .map_err(|e| conversion_error(2, e))?,
                    time: NaiveTime::parse_from_str(&time, TIME_FORMAT)
                        .map_err(|e| conversion_error(3, e))?,
                    board_id: row.get(4)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }
}

fn conversion_error(column: usize, e: chrono::ParseError) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
}
