use rusqlite::{params, OptionalExtension};
use serde::Deserialize;
use validator::Validate;

use crate::auth::roles::Role;
use crate::db::models::User;
use crate::error::{AppError, AppResult};
use crate::state::DbPool;

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewAccount {
    #[validate(length(min = 1, max = 150, message = "Username is required"))]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub role: Role,
    #[serde(default)]
    pub is_staff: bool,
}

/// Create a user together with its role group membership and role profile.
pub fn register(pool: &DbPool, account: &NewAccount) -> AppResult<User> {
    account.validate()?;

    let group = account
        .role
        .group_name()
        .ok_or(AppError::RoleNotRecognized)?;
    let profile_table = match account.role {
        Role::Caregiver => "care_givers",
        _ => "care_recipients",
    };

    let mut conn = pool.get()?;
    let tx = conn.transaction()?;

    let taken: bool = tx.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
        params![account.username],
        |row| row.get(0),
    )?;
    if taken {
        return Err(AppError::Validation(
            "A user with that username already exists.".into(),
        ));
    }

    tx.execute(
        "INSERT INTO users (username, email, first_name, last_name, is_staff)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            account.username,
            account.email,
            account.first_name,
            account.last_name,
            account.is_staff
        ],
    )?;
    let user_id = tx.last_insert_rowid();

    tx.execute(
        "INSERT OR IGNORE INTO user_groups (user_id, group_id)
         SELECT ?1, id FROM groups WHERE name = ?2",
        params![user_id, group],
    )?;
    tx.execute(
        &format!(
            "INSERT OR IGNORE INTO {} (user_id) VALUES (?1)",
            profile_table
        ),
        params![user_id],
    )?;

    tx.commit()?;

    tracing::info!(
        "Registered user {} ({}) as {}",
        account.username,
        user_id,
        account.role
    );

    find_user(pool, user_id)?
        .ok_or_else(|| AppError::Internal(format!("User {} vanished after insert", user_id)))
}

pub fn find_user(pool: &DbPool, user_id: i64) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            "SELECT id, username, email, first_name, last_name, is_active, is_staff, date_joined
             FROM users WHERE id = ?1",
            params![user_id],
            map_user,
        )
        .optional()?;
    Ok(user)
}

pub fn find_user_by_username(pool: &DbPool, username: &str) -> AppResult<Option<User>> {
    let conn = pool.get()?;
    let user = conn
        .query_row(
            "SELECT id, username, email, first_name, last_name, is_active, is_staff, date_joined
             FROM users WHERE username = ?1",
            params![username],
            map_user,
        )
        .optional()?;
    Ok(user)
}

fn map_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        first_name: row.get(3)?,
        last_name: row.get(4)?,
        is_active: row.get(5)?,
        is_staff: row.get(6)?,
        date_joined: row.get(7)?,
    })
}
