pub mod accounts;
pub mod roles;
pub mod session;

pub use roles::{Role, RoleLookup, SqliteRoleLookup};
