// Repository pattern - isolates all database side effects
use async_trait::async_trait;
use chrono::NaiveTime;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::Arc;

use crate::db::models::LinkedProfile;
use crate::db::RepositoryError;
use crate::pairing::domain::*;
use crate::state::DbPool;

/// Repository trait - all database operations
#[async_trait]
pub trait PairingRepository: Send + Sync {
    /// Atomically drop every code the user holds and store `code` in their place.
    /// Returns false (and changes nothing) when another user already holds `code`.
    async fn replace_code(
        &self,
        user_id: i64,
        code: &PairingCode,
        time: NaiveTime,
    ) -> Result<bool, RepositoryError>;

    /// Load an issued code by its exact text
    async fn find_code(&self, code: &PairingCode) -> Result<Option<IssuedCode>, RepositoryError>;

    /// CareGiver profile id for a user
    async fn caregiver_profile(&self, user_id: i64) -> Result<Option<i64>, RepositoryError>;

    /// CareRecipient profile id for a user
    async fn recipient_profile(&self, user_id: i64) -> Result<Option<i64>, RepositoryError>;

    /// Idempotent link insert; true when a new row was created
    async fn link(&self, caregiver_id: i64, recipient_id: i64) -> Result<bool, RepositoryError>;

    async fn recipients_of(&self, caregiver_id: i64)
        -> Result<Vec<LinkedProfile>, RepositoryError>;

    async fn caregivers_of(&self, recipient_id: i64)
        -> Result<Vec<LinkedProfile>, RepositoryError>;
}

/// SQLite implementation
pub struct SqlitePairingRepository {
    pool: DbPool,
}

impl SqlitePairingRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Run `f` inside `BEGIN IMMEDIATE`, committing on Ok and rolling back on Err.
    fn immediate<T>(
        conn: &Connection,
        f: impl FnOnce() -> Result<T, RepositoryError>,
    ) -> Result<T, RepositoryError> {
        conn.execute("BEGIN IMMEDIATE", [])?;
        match f() {
            Ok(value) => {
                conn.execute("COMMIT", [])?;
                Ok(value)
            }
            Err(e) => {
                conn.execute("ROLLBACK", [])?;
                Err(e)
            }
        }
    }

    /// All codes currently held by a user
    #[cfg(test)]
    pub(crate) fn codes_for_user(&self, user_id: i64) -> Result<Vec<IssuedCode>, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT code, user_id, time FROM pairing_codes WHERE user_id = ?1 ORDER BY id",
        )?;
        let codes = stmt
            .query_map(params![user_id], map_issued)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(codes)
    }

    fn profile_id(&self, table: &str, user_id: i64) -> Result<Option<i64>, RepositoryError> {
        let conn = self.pool.get()?;
        let id = conn
            .query_row(
                &format!("SELECT id FROM {} WHERE user_id = ?1", table),
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }

    fn linked_profiles(&self, sql: &str, id: i64) -> Result<Vec<LinkedProfile>, RepositoryError> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(sql)?;
        let profiles = stmt
            .query_map(params![id], |row| {
                let user_id: i64 = row.get(0)?;
                Ok(LinkedProfile {
                    user_id,
                    username: row.get(1)?,
                    number_id: format!("{:06}", user_id),
                    profile_pic: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(profiles)
    }
}

fn parse_time(raw: &str) -> rusqlite::Result<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M:%S").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn map_issued(row: &rusqlite::Row<'_>) -> rusqlite::Result<IssuedCode> {
    let code: String = row.get(0)?;
    let time: String = row.get(2)?;
    Ok(IssuedCode {
        code: PairingCode::parse(&code).ok_or_else(|| {
            rusqlite::Error::InvalidColumnType(0, "code".into(), rusqlite::types::Type::Text)
        })?,
        user_id: row.get(1)?,
        time: parse_time(&time)?,
    })
}

#[async_trait]
impl PairingRepository for SqlitePairingRepository {
    async fn replace_code(
        &self,
        user_id: i64,
        code: &PairingCode,
        time: NaiveTime,
    ) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;

        Self::immediate(&conn, || {
            let held_elsewhere: bool = conn.query_row(
                "SELECT COUNT(*) > 0 FROM pairing_codes WHERE code = ?1 AND user_id != ?2",
                params![code.as_str(), user_id],
                |row| row.get(0),
            )?;
            if held_elsewhere {
                return Ok(false);
            }

            conn.execute(
                "DELETE FROM pairing_codes WHERE user_id = ?1",
                params![user_id],
            )?;
            conn.execute(
                "INSERT INTO pairing_codes (code, user_id, time) VALUES (?1, ?2, ?3)",
                params![
                    code.as_str(),
                    user_id,
                    time.format("%H:%M:%S").to_string()
                ],
            )?;
            Ok(true)
        })
    }

    async fn find_code(&self, code: &PairingCode) -> Result<Option<IssuedCode>, RepositoryError> {
        let conn = self.pool.get()?;

        let issued = conn
            .query_row(
                "SELECT code, user_id, time FROM pairing_codes WHERE code = ?1",
                params![code.as_str()],
                map_issued,
            )
            .optional()?;

        Ok(issued)
    }

    async fn caregiver_profile(&self, user_id: i64) -> Result<Option<i64>, RepositoryError> {
        self.profile_id("care_givers", user_id)
    }

    async fn recipient_profile(&self, user_id: i64) -> Result<Option<i64>, RepositoryError> {
        self.profile_id("care_recipients", user_id)
    }

    async fn link(&self, caregiver_id: i64, recipient_id: i64) -> Result<bool, RepositoryError> {
        let conn = self.pool.get()?;

        Self::immediate(&conn, || {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO caregiver_recipient_links (caregiver_id, recipient_id)
                 VALUES (?1, ?2)",
                params![caregiver_id, recipient_id],
            )?;
            Ok(inserted > 0)
        })
    }

    async fn recipients_of(
        &self,
        caregiver_id: i64,
    ) -> Result<Vec<LinkedProfile>, RepositoryError> {
        self.linked_profiles(
            "SELECT u.id, u.username, cr.profile_pic
             FROM caregiver_recipient_links l
             JOIN care_recipients cr ON cr.id = l.recipient_id
             JOIN users u ON u.id = cr.user_id
             WHERE l.caregiver_id = ?1
             ORDER BY l.linked_at, cr.id",
            caregiver_id,
        )
    }

    async fn caregivers_of(
        &self,
        recipient_id: i64,
    ) -> Result<Vec<LinkedProfile>, RepositoryError> {
        self.linked_profiles(
            "SELECT u.id, u.username, cg.profile_pic
             FROM caregiver_recipient_links l
             JOIN care_givers cg ON cg.id = l.caregiver_id
             JOIN users u ON u.id = cg.user_id
             WHERE l.recipient_id = ?1
             ORDER BY l.linked_at, cg.id",
            recipient_id,
        )
    }
}

/// Type alias for Arc-wrapped repository (for AppState)
pub type DynPairingRepository = Arc<dyn PairingRepository>;
