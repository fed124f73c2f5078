// Test-only seeding. Mounted by the binary only when CARELINK_TEST_SEED is set.
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::accounts::{self, NewAccount};
use crate::auth::{session, Role};
use crate::error::AppResult;
use crate::state::AppState;

pub const SEED_ENV: &str = "CARELINK_TEST_SEED";

#[derive(Deserialize)]
pub struct SeedQuery {
    #[serde(default = "default_username")]
    pub username: String,
    #[serde(default = "default_role")]
    pub role: Role,
    #[serde(default)]
    pub staff: bool,
}

#[derive(Serialize)]
pub struct SeedResponse {
    pub user_id: i64,
    pub username: String,
    pub token: String,
}

fn default_username() -> String {
    "testuser".to_string()
}

fn default_role() -> Role {
    Role::Caregiver
}

pub fn router() -> Router<AppState> {
    Router::new().route("/test/seed", get(seed))
}

/// GET /test/seed?username=&role=&staff=
/// Registers the user if missing and returns a fresh session (token + cookie).
async fn seed(
    State(state): State<AppState>,
    query: Result<Query<SeedQuery>, QueryRejection>,
) -> AppResult<impl IntoResponse> {
    let Query(seed) = query?;

    let user = match accounts::find_user_by_username(&state.db, &seed.username)? {
        Some(user) => user,
        None => accounts::register(
            &state.db,
            &NewAccount {
                username: seed.username.clone(),
                email: String::new(),
                first_name: String::new(),
                last_name: String::new(),
                role: seed.role,
                is_staff: seed.staff,
            },
        )?,
    };

    let token = session::create_session(&state.db, user.id, state.config.auth.session_hours)?;
    tracing::debug!("Seeded session for {}", user.username);

    let cookie = format!(
        "{}={}; HttpOnly; SameSite=Strict; Path=/; Max-Age=3600",
        state.config.auth.cookie_name, token
    );

    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(SeedResponse {
            user_id: user.id,
            username: user.username,
            token,
        }),
    ))
}
