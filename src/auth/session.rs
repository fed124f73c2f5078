use rand::Rng;
use rusqlite::{params, OptionalExtension};

use crate::error::AppResult;
use crate::state::DbPool;

/// Identity attached to a live session token.
#[derive(Debug, Clone)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}

/// Create a new session for a user. Returns the session token.
pub fn create_session(pool: &DbPool, user_id: i64, hours: u64) -> AppResult<String> {
    let conn = pool.get()?;

    let token = generate_token();
    let id = uuid::Uuid::now_v7().to_string();

    conn.execute(
        "INSERT INTO sessions (id, user_id, token, expires_at) VALUES (?1, ?2, ?3, datetime('now', ?4))",
        params![id, user_id, token, format!("+{} hours", hours)],
    )?;

    Ok(token)
}

/// Resolve an unexpired session token to its (active) user.
pub fn lookup_session(pool: &DbPool, token: &str) -> AppResult<Option<SessionUser>> {
    let conn = pool.get()?;

    let user = conn
        .query_row(
            "SELECT u.id, u.username, u.is_staff FROM sessions s \
             JOIN users u ON u.id = s.user_id \
             WHERE s.token = ?1 AND s.expires_at > datetime('now') AND u.is_active = 1",
            params![token],
            |row| {
                Ok(SessionUser {
                    id: row.get(0)?,
                    username: row.get(1)?,
                    is_staff: row.get(2)?,
                })
            },
        )
        .optional()?;

    Ok(user)
}

/// Generate a cryptographically random 32-byte hex token.
fn generate_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}
