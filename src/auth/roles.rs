// Role resolution - group membership is the single source of truth
use async_trait::async_trait;
use rusqlite::params;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::db::RepositoryError;
use crate::state::DbPool;

pub const CAREGIVER_GROUP: &str = "CAREGIVER";
pub const RECIPIENT_GROUP: &str = "RECIPIENT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Caregiver,
    Recipient,
    Unknown,
}

impl Role {
    /// Map a set of group names onto a role. Caregiver wins if both are present.
    pub fn from_groups<'a>(groups: impl IntoIterator<Item = &'a str>) -> Self {
        let mut role = Role::Unknown;
        for group in groups {
            match group {
                CAREGIVER_GROUP => return Role::Caregiver,
                RECIPIENT_GROUP => role = Role::Recipient,
                _ => {}
            }
        }
        role
    }

    pub fn group_name(&self) -> Option<&'static str> {
        match self {
            Role::Caregiver => Some(CAREGIVER_GROUP),
            Role::Recipient => Some(RECIPIENT_GROUP),
            Role::Unknown => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Caregiver => write!(f, "caregiver"),
            Role::Recipient => write!(f, "recipient"),
            Role::Unknown => write!(f, "unknown"),
        }
    }
}

/// Capability lookup against the identity store
#[async_trait]
pub trait RoleLookup: Send + Sync {
    async fn role_of(&self, user_id: i64) -> Result<Role, RepositoryError>;
}

pub struct SqliteRoleLookup {
    pool: DbPool,
}

impl SqliteRoleLookup {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RoleLookup for SqliteRoleLookup {
    async fn role_of(&self, user_id: i64) -> Result<Role, RepositoryError> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT g.name FROM user_groups ug \
             JOIN groups g ON g.id = ug.group_id \
             WHERE ug.user_id = ?1",
        )?;
        let groups: Vec<String> = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Role::from_groups(groups.iter().map(String::as_str)))
    }
}

pub type DynRoleLookup = Arc<dyn RoleLookup>;
